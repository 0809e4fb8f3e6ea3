//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle credential hashing, token issuance, key lifecycle operations,
//! and audit logging.

pub mod api_key;
pub mod audit;
pub mod password;
pub mod token;
