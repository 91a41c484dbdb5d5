/// Remote game-document storage and the snapshot subscription.
pub mod game_store;
/// On-device key-value cache used as the offline fallback.
pub mod kv_store;
/// Wire model definitions shared by both stores.
pub mod models;
/// Storage abstraction layer for backend failures.
pub mod storage;
