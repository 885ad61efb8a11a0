//! Shared domain model and error taxonomy for the voting core.
//!
//! Every other crate in the workspace depends on this one; it depends on
//! nothing workspace-internal, so it carries no async runtime, no HTTP
//! framework and no storage driver — only the types the seven components
//! of §2 pass between each other.

pub mod ballot;
pub mod bulletin;
pub mod canonical;
pub mod code_sheet;
pub mod election;
pub mod error;
pub mod result;
pub mod token;
pub mod trustee;

pub use ballot::{Ballot, EncryptedVote};
pub use bulletin::{BulletinEntry, BulletinEventType};
pub use canonical::{canonical_hash, canonical_json, canonicalize};
pub use code_sheet::CodeEntry;
pub use election::{Candidate, Election, ElectionStatus};
pub use error::{CoreError, CoreResult, CryptoError};
pub use result::ElectionResult;
pub use token::AnonymousToken;
pub use trustee::{PartialDecryption, SharePackage, TrusteeSlot};
