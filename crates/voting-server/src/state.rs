//! Application-context value handed explicitly to every handler, replacing
//! the distilled source's global singleton issuer keypair (Design Notes,
//! SPEC_FULL.md §9).

use std::sync::Arc;

use voting_crypto::AuthorityKeys;
use voting_store::Store;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub authority: Arc<AuthorityKeys>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, authority: Arc<AuthorityKeys>, config: Arc<Config>) -> Self {
        Self { store, authority, config }
    }
}
