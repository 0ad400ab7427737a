//! Runtime settings read from the environment.
//!
//! | variable | default |
//! |----------|---------|
//! | `OMNIVEN_JWT_SECRET` | required, at least 16 bytes |
//! | `OMNIVEN_TOKEN_VALIDITY_DAYS` | `365` |
//! | `DATABASE_URL` | unset (in-memory only) |
//! | `OMNIVEN_DB_MAX_CONNECTIONS` | `10` |
//! | `OMNIVEN_ARGON2_M_COST` / `_T_COST` / `_P_COST` | argon2 defaults |

use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::Duration;

use omniven_auth::{
    Argon2Hasher, DEFAULT_VALIDITY_DAYS, SecretError, SecretProvider, SigningSecret, TokenService,
};

pub const JWT_SECRET_VAR: &str = "OMNIVEN_JWT_SECRET";
const TOKEN_VALIDITY_VAR: &str = "OMNIVEN_TOKEN_VALIDITY_DAYS";
const DATABASE_URL_VAR: &str = "DATABASE_URL";
const MAX_CONNECTIONS_VAR: &str = "OMNIVEN_DB_MAX_CONNECTIONS";
const M_COST_VAR: &str = "OMNIVEN_ARGON2_M_COST";
const T_COST_VAR: &str = "OMNIVEN_ARGON2_T_COST";
const P_COST_VAR: &str = "OMNIVEN_ARGON2_P_COST";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
/// Upper bound on token lifetime (100 years).
const MAX_VALIDITY_DAYS: i64 = 36_500;

/// Explicit argon2 cost; all three must be set together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub signing_secret: SigningSecret,
    pub token_validity: Duration,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub hash_cost: Option<HashCost>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::load(&EnvSecretProvider, |key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup, secret included.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(JWT_SECRET_VAR)
            .ok_or_else(|| SecretError::Missing(JWT_SECRET_VAR.to_string()))
            .and_then(SigningSecret::new);
        Self::load(&ResolvedSecret(secret), lookup)
    }

    /// Signing key from `secrets`, everything else from `lookup`.
    pub fn load<F>(secrets: &dyn SecretProvider, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let signing_secret = secrets
            .signing_secret()
            .with_context(|| format!("{JWT_SECRET_VAR} is not usable"))?;

        let validity_days: i64 = parse_or(&lookup, TOKEN_VALIDITY_VAR, DEFAULT_VALIDITY_DAYS)?;
        if !(1..=MAX_VALIDITY_DAYS).contains(&validity_days) {
            return Err(anyhow!(
                "{TOKEN_VALIDITY_VAR} must be between 1 and {MAX_VALIDITY_DAYS}, got {validity_days}"
            ));
        }
        let token_validity = Duration::try_days(validity_days)
            .ok_or_else(|| anyhow!("{TOKEN_VALIDITY_VAR} is out of range: {validity_days}"))?;

        let max_connections = parse_or(&lookup, MAX_CONNECTIONS_VAR, DEFAULT_MAX_CONNECTIONS)?;

        let hash_cost = match (
            parse_opt::<u32, _>(&lookup, M_COST_VAR)?,
            parse_opt::<u32, _>(&lookup, T_COST_VAR)?,
            parse_opt::<u32, _>(&lookup, P_COST_VAR)?,
        ) {
            (Some(m_cost), Some(t_cost), Some(p_cost)) => Some(HashCost { m_cost, t_cost, p_cost }),
            (None, None, None) => None,
            _ => {
                return Err(anyhow!(
                    "{M_COST_VAR}, {T_COST_VAR} and {P_COST_VAR} must be set together"
                ));
            }
        };

        Ok(Self {
            signing_secret,
            token_validity,
            database_url: lookup(DATABASE_URL_VAR).filter(|url| !url.trim().is_empty()),
            max_connections,
            hash_cost,
        })
    }

    pub fn hasher(&self) -> anyhow::Result<Argon2Hasher> {
        match self.hash_cost {
            Some(cost) => Argon2Hasher::with_cost(cost.m_cost, cost.t_cost, cost.p_cost)
                .context("invalid argon2 cost parameters"),
            None => Ok(Argon2Hasher::new()),
        }
    }

    pub fn token_service(&self) -> TokenService {
        TokenService::new(&self.signing_secret, self.token_validity)
    }
}

/// Reads the signing key from `OMNIVEN_JWT_SECRET` on each call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretProvider;

impl SecretProvider for EnvSecretProvider {
    fn signing_secret(&self) -> Result<SigningSecret, SecretError> {
        let raw = std::env::var(JWT_SECRET_VAR).map_err(|_| SecretError::Missing(JWT_SECRET_VAR.to_string()))?;
        SigningSecret::new(raw)
    }
}

struct ResolvedSecret(Result<SigningSecret, SecretError>);

impl SecretProvider for ResolvedSecret {
    fn signing_secret(&self) -> Result<SigningSecret, SecretError> {
        self.0.clone()
    }
}

fn parse_opt<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| raw.trim().parse::<T>().with_context(|| format!("{key} is not a valid number: {raw:?}")))
        .transpose()
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}
