//! Error taxonomy shared by every crate in the workspace (§7 of the design).
//!
//! Each variant is tagged with the taxonomy class it belongs to in its doc
//! comment; `voting_server::ApiError` maps these to HTTP status codes.

use thiserror::Error;

/// Errors surfaced by the core components. Internal log records built from
/// these must never interpolate main codes, token signatures, raw shares,
/// or the election private scalar.
#[derive(Error, Debug)]
pub enum CoreError {
    // --- ValidationError ---
    #[error("validation error: {0}")]
    Validation(String),

    #[error("election {0} not found")]
    ElectionNotFound(uuid::Uuid),

    // --- StateError ---
    #[error("election is not in the required status: {0}")]
    WrongStatus(String),

    #[error("election already ceremonied")]
    AlreadyCeremonied,

    #[error("voting code already consumed")]
    CodeConsumed,

    #[error("token already used")]
    TokenReplay,

    #[error("ballot already cast for this election")]
    DuplicateBallot,

    #[error("unknown token")]
    UnknownToken,

    #[error("invalid voting code")]
    InvalidCode,

    #[error("election has no candidates")]
    NoCandidates,

    #[error("election has no eligible voters")]
    NoEligibleVoters,

    #[error("election has no ballots")]
    NoBallots,

    // --- QuorumError ---
    #[error("insufficient trustees: need {needed}, have {have}")]
    InsufficientTrustees { needed: u32, have: u32 },

    #[error("Not enough decryption shares. Need {needed}, have {have}")]
    InsufficientShares { needed: u32, have: u32 },

    // --- CryptoError ---
    #[error("invalid token signature")]
    InvalidTokenSignature,

    #[error("cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("the configured prime is not large enough: {0}")]
    PrimeTooSmall(String),

    // --- TransientError ---
    #[error("storage error: {0}")]
    Store(String),

    #[error("bulletin service unreachable: {0}")]
    BulletinUnreachable(String),
}

/// Lives here rather than in `voting-crypto` so that both `voting-crypto`
/// and `voting-core` can depend on a single definition without a cycle:
/// types is the workspace's dependency sink, crypto and core both sit
/// above it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("share reconstruction failed: {0}")]
    Reconstruction(String),

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("malformed key material: {0}")]
    MalformedKey(String),

    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
