//! Environment-driven configuration (SPEC_FULL.md §10.3). Populated once at
//! startup and handed to handlers through [`crate::state::AppState`]; there
//! is no ambient `std::env::var` reading anywhere else in this crate.

use std::env;

/// Fatal per §7(vi): a malformed or missing required variable stops the
/// process before it binds a listener.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    /// Gates `BlindIssuer`'s direct-issuance fallback and permits ephemeral
    /// authority-key generation (§4.3, §4.7).
    pub debug: bool,
    pub bulletin_service_url: Option<String>,
    pub jwt_secret_key: Option<String>,
    pub access_token_expire_minutes: Option<u64>,
    pub refresh_token_expire_days: Option<u64>,
    pub allowed_origins: Vec<String>,
    /// Asserted == 2048 at startup; a mismatch is `Fatal` (§4.1, §7).
    pub safe_prime_bits: u32,
}

impl Config {
    /// Reads every variable named in §10.3. `DATABASE_URL` is required;
    /// everything else has either a default or is genuinely optional
    /// because the consuming layer (auth/CORS) is out of the core's scope.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let debug = match env::var("DEBUG") {
            Ok(v) => parse_bool("DEBUG", &v)?,
            Err(_) => false,
        };

        let bulletin_service_url = env::var("BULLETIN_SERVICE_URL").ok();
        let jwt_secret_key = env::var("JWT_SECRET_KEY").ok();

        let access_token_expire_minutes = match env::var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            Ok(v) => Some(parse_u64("ACCESS_TOKEN_EXPIRE_MINUTES", &v)?),
            Err(_) => None,
        };
        let refresh_token_expire_days = match env::var("REFRESH_TOKEN_EXPIRE_DAYS") {
            Ok(v) => Some(parse_u64("REFRESH_TOKEN_EXPIRE_DAYS", &v)?),
            Err(_) => None,
        };

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let safe_prime_bits = match env::var("SAFE_PRIME_BITS") {
            Ok(v) => parse_u64("SAFE_PRIME_BITS", &v)? as u32,
            Err(_) => 2048,
        };
        if safe_prime_bits != 2048 {
            return Err(ConfigError::Invalid {
                name: "SAFE_PRIME_BITS",
                value: safe_prime_bits.to_string(),
            });
        }

        Ok(Self {
            database_url,
            listen_addr,
            debug,
            bulletin_service_url,
            jwt_secret_key,
            access_token_expire_minutes,
            refresh_token_expire_days,
            allowed_origins,
            safe_prime_bits,
        })
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value: value.to_string() }),
    }
}

fn parse_u64(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid { name, value: value.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("DEBUG", "true").unwrap());
        assert!(parse_bool("DEBUG", "1").unwrap());
        assert!(!parse_bool("DEBUG", "false").unwrap());
        assert!(parse_bool("DEBUG", "nope").is_err());
    }
}
