//! Entry point: loads configuration and the authority credential store
//! (§4.7), wires a `PgStore` into the application state, and serves the
//! router built in `lib.rs`.

use std::sync::Arc;

use voting_crypto::AuthorityKeys;
use voting_server::{build_router, AppState, Config};
use voting_store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("configuration error (fatal, §7): {e}"))?;

    // Authority credential store (§4.7): persistent key material in
    // production, ephemeral generation only under DEBUG=true, logged at
    // WARN per the spec's explicit requirement.
    let authority = if config.debug {
        tracing::warn!("DEBUG=true: generating an ephemeral authority keypair instead of loading one from secure storage");
        AuthorityKeys::generate_ephemeral()?
    } else {
        let rsa_pem = std::env::var("AUTHORITY_RSA_PKCS8_PEM")
            .map_err(|_| anyhow::anyhow!("AUTHORITY_RSA_PKCS8_PEM is required outside DEBUG mode (fatal, §7)"))?;
        let ed25519_seed_hex = std::env::var("AUTHORITY_ED25519_SEED_HEX")
            .map_err(|_| anyhow::anyhow!("AUTHORITY_ED25519_SEED_HEX is required outside DEBUG mode (fatal, §7)"))?;
        let seed_bytes = hex::decode(&ed25519_seed_hex)?;
        let seed: [u8; 32] = seed_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("AUTHORITY_ED25519_SEED_HEX must decode to exactly 32 bytes"))?;
        AuthorityKeys::from_pem(&rsa_pem, &seed)?
    };

    let store = PgStore::connect(&config.database_url).await?;
    store.ensure_schema().await?;

    let listen_addr = config.listen_addr.clone();
    let state = AppState::new(Arc::new(store), Arc::new(authority), Arc::new(config));
    let app = build_router(state);

    tracing::info!(%listen_addr, "voting-server listening");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
