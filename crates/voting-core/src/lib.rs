//! The seven core components of §2: KeyCeremony, CodeSheet, BlindIssuer,
//! BallotCast (covering BallotSealer's server-side contract), ThresholdTally
//! and BulletinChain, each generic over `&dyn voting_store::Store` so the
//! same code path runs against `MemoryStore` in tests and `PgStore` in
//! production (§10.1).

pub mod ballot_cast;
pub mod blind_issuer;
pub mod bulletin_chain;
pub mod code_sheet;
pub mod key_ceremony;
pub mod threshold_tally;

pub use ballot_cast::{cast, CastOutcome};
pub use blind_issuer::{sign, sign_direct, SignedToken};
pub use bulletin_chain::{append as bulletin_append, verify as bulletin_verify, ChainVerification};
pub use code_sheet::generate_bulk as generate_code_sheet;
pub use key_ceremony::generate as run_key_ceremony;
pub use threshold_tally::{tally, winner, TallyOutcome};

pub use voting_types::error::{CoreError, CoreResult, CryptoError};
