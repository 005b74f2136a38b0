use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::query::DEFAULT_MAX_PAGE_SIZE;

// ---------------------------------------------------------------------------
// StoreKind
// ---------------------------------------------------------------------------

/// Backing store for both reading collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    /// Process-local, lost on restart. Useful for demos and local testing.
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("unknown store kind: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreKind,
    /// Required when `store` is `Postgres`.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    /// Upper bound applied to the `limit` query parameter.
    pub max_page_size: u64,
    /// JSON body ceiling in bytes. Accepts `"10mb"`, `"512kb"` or a byte count.
    pub max_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let store: StoreKind = optional("STORE", "postgres").parse()?;
        let database_url = std::env::var("DATABASE_URL").ok();
        if store == StoreKind::Postgres && database_url.is_none() {
            bail!("missing required env var: DATABASE_URL");
        }

        Ok(Self {
            store,
            database_url,
            db_max_connections: optional("DB_MAX_CONNECTIONS", "10")
                .parse()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "3000")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            max_page_size: optional("MAX_PAGE_SIZE", &DEFAULT_MAX_PAGE_SIZE.to_string())
                .parse()
                .context("MAX_PAGE_SIZE must be a positive integer")?,
            max_body_bytes: parse_byte_size(&optional("MAX_BODY_SIZE", "10mb"))
                .context("MAX_BODY_SIZE must look like '10mb', '512kb' or a byte count")?,
        })
    }
}

/// Parse `"10mb"`, `"512kb"`, `"1gb"`, `"2048b"` or `"2048"` into bytes (1 kb = 1024 b).
fn parse_byte_size(raw: &str) -> Result<usize> {
    let s = raw.trim().to_ascii_lowercase();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        bail!("no number in byte size {raw:?}");
    }
    let n: usize = digits.parse().with_context(|| format!("invalid byte size {raw:?}"))?;
    let multiplier: usize = match unit.trim() {
        "" | "b" => 1,
        "kb" => 1 << 10,
        "mb" => 1 << 20,
        "gb" => 1 << 30,
        other => bail!("unknown byte size unit {other:?} in {raw:?}"),
    };
    n.checked_mul(multiplier)
        .with_context(|| format!("byte size {raw:?} is too large"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
