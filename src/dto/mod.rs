/// Scanned QR payload parsing.
pub mod payload;
/// Registration form input and validation.
pub mod register;
