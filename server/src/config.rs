use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use platform_authn::AuthConfig;

const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;
const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 366;
const MIN_SECRET_BYTES: usize = 32;

/// Session lifetimes must be positive and at most one year.
pub fn validate_ttl(minutes: i64) -> Result<i64> {
    if minutes <= 0 {
        return Err(anyhow!("session lifetime must be positive, got {minutes} minutes"));
    }
    if minutes > MAX_SESSION_TTL_MINUTES {
        return Err(anyhow!(
            "session lifetime of {minutes} minutes exceeds {MAX_SESSION_TTL_MINUTES}"
        ));
    }
    Ok(minutes)
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = lookup("AUTH_SECRET_BASE64").context("AUTH_SECRET_BASE64 missing")?;
        let secret_bytes = STANDARD
            .decode(secret.trim())
            .context("invalid AUTH_SECRET_BASE64")?;
        if secret_bytes.len() < MIN_SECRET_BYTES {
            return Err(anyhow!(
                "AUTH_SECRET_BASE64 must decode to at least {MIN_SECRET_BYTES} bytes"
            ));
        }

        let session_ttl_minutes = match lookup("SESSION_TTL_MINUTES") {
            Some(raw) => {
                let ttl = raw
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("invalid SESSION_TTL_MINUTES {raw:?}"))?;
                validate_ttl(ttl).context("invalid SESSION_TTL_MINUTES")?
            }
            None => DEFAULT_SESSION_TTL_MINUTES,
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            auth: AuthConfig::new(secret_bytes, session_ttl_minutes),
            cors_allowed_origins,
        })
    }
}
