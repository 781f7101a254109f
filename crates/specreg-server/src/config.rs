use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use specreg_db::SyncMode;
use specreg_quota::DEFAULT_FREE_TIER_MODEL_COUNT;

use crate::error::{ServerError, ServerResult};

/// How callers are identified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// `Authorization: Bearer <public_key>:<secret_key>`, checked against
    /// stored credentials.
    #[default]
    Credentials,
    /// Identity taken verbatim from a header set by a trusted gateway.
    TrustedHeader,
}

/// Server configuration, loadable from TOML. Every field has a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root for the blob store and metadata journal. In-memory when unset.
    pub data_dir: Option<PathBuf>,
    /// Free-tier ceiling used when `SPECREG_FREE_TIER_MODEL_COUNT` is unset.
    pub free_tier_model_count: u64,
    pub auth: AuthMode,
    /// Header read in [`AuthMode::TrustedHeader`] mode.
    pub trusted_header: String,
    pub max_body_bytes: usize,
    pub wal_sync: SyncMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            data_dir: None,
            free_tier_model_count: DEFAULT_FREE_TIER_MODEL_COUNT,
            auth: AuthMode::default(),
            trusted_header: "x-sub".into(),
            max_body_bytes: 2 * 1024 * 1024,
            wal_sync: SyncMode::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(c.free_tier_model_count, 100);
        assert_eq!(c.auth, AuthMode::Credentials);
        assert_eq!(c.trusted_header, "x-sub");
        assert!(c.data_dir.is_none());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ServerConfig::from_toml_str("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn parses_all_fields() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:9000"
            data_dir = "/var/lib/specreg"
            free_tier_model_count = 5
            auth = "trusted-header"
            trusted_header = "x-user"
            max_body_bytes = 1024
            wal_sync = "every-write"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.data_dir, Some(PathBuf::from("/var/lib/specreg")));
        assert_eq!(c.free_tier_model_count, 5);
        assert_eq!(c.auth, AuthMode::TrustedHeader);
        assert_eq!(c.trusted_header, "x-user");
        assert_eq!(c.max_body_bytes, 1024);
        assert_eq!(c.wal_sync, SyncMode::EveryWrite);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = ServerConfig::from_toml_str("colour = \"blue\"").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }
}
