use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

pub const ADMIN_TOKEN_VAR: &str = "BHML_ADMIN_TOKEN";
pub const SITE_ROOT_VAR: &str = "BHML_SITE_ROOT";
pub const DATA_DIR_VAR: &str = "BHML_DATA_DIR";
pub const BIND_VAR: &str = "BHML_BIND";
pub const UPLOAD_LIMIT_VAR: &str = "BHML_UPLOAD_LIMIT_BYTES";

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_UPLOAD_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct ServerConfig {
    pub admin_token: String,
    pub site_root: PathBuf,
    pub data_dir: PathBuf,
    pub bind: SocketAddr,
    pub upload_limit: usize,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("admin_token", &"<redacted>")
            .field("site_root", &self.site_root)
            .field("data_dir", &self.data_dir)
            .field("bind", &self.bind)
            .field("upload_limit", &self.upload_limit)
            .finish()
    }
}

impl ServerConfig {
    /// Reads the process environment (after `.env`, if present).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let admin_token = lookup(ADMIN_TOKEN_VAR)
            .map(|token| token.trim().to_string())
            .unwrap_or_default();
        if admin_token.is_empty() {
            bail!("{ADMIN_TOKEN_VAR} must be set to a non-empty secret");
        }
        let site_root = lookup(SITE_ROOT_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let data_dir = lookup(DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| site_root.join("data"));
        let bind = lookup(BIND_VAR)
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .with_context(|| format!("{BIND_VAR} is not a socket address"))?;
        let upload_limit = match lookup(UPLOAD_LIMIT_VAR) {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("{UPLOAD_LIMIT_VAR} is not a byte count"))?,
            None => DEFAULT_UPLOAD_LIMIT,
        };
        Ok(Self {
            admin_token,
            site_root,
            data_dir,
            bind,
            upload_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn missing_token_is_fatal() {
        assert!(ServerConfig::from_lookup(lookup(&[])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[(ADMIN_TOKEN_VAR, "  ")])).is_err());
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::from_lookup(lookup(&[(ADMIN_TOKEN_VAR, "s3cret")])).unwrap();
        assert_eq!(config.admin_token, "s3cret");
        assert_eq!(config.site_root, PathBuf::from("."));
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.bind, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.upload_limit, DEFAULT_UPLOAD_LIMIT);
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ADMIN_TOKEN_VAR, "t"),
            (SITE_ROOT_VAR, "/srv/site"),
            (BIND_VAR, "127.0.0.1:9000"),
            (UPLOAD_LIMIT_VAR, "1024"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/site/data"));
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.upload_limit, 1024);
    }

    #[test]
    fn bad_bind_address() {
        assert!(ServerConfig::from_lookup(lookup(&[(ADMIN_TOKEN_VAR, "t"), (BIND_VAR, "nope")])).is_err());
    }
}
