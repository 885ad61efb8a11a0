//! Threshold key ceremony, blind RSA issuance, ECIES ballot sealing and
//! Ed25519 bulletin signing (§4.1, §4.3, §4.6, §4.7).
//!
//! This crate has no storage or HTTP dependency: it is pure cryptography
//! over the types `voting-types` defines, callable from `voting-core`
//! without pulling in `sqlx` or `axum`.

pub mod authority;
pub mod blind_rsa;
pub mod bulletin_sign;
pub mod ecies;
pub mod shamir;

pub use authority::AuthorityKeys;
pub use ecies::{seal, unseal, SealedEnvelope};
pub use shamir::{field_prime, reconstruct_secret, run_ceremony, CeremonyOutput};
