//! Game-state synchronization client for a team QR scavenger hunt.
//!
//! Players register into one of two teams, scan QR codes for points, and
//! watch the shared match state evolve. The crate owns the in-memory game
//! view and keeps it reconciled against two external collaborators: a
//! realtime game-document store shared by every device (the source of
//! truth) and an on-device key-value cache used as the offline fallback.
//! Rendering, navigation, and camera decoding belong to the embedding
//! presentation layer.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;
