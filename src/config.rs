// src/config.rs
//! Runtime settings.
//!
//! Loaded from an optional `anchor.toml` and then from `ANCHOR__`-prefixed
//! environment variables, which win. Nested keys use a double underscore, so
//! `ANCHOR__LEDGER__RPC_URL` sets `ledger.rpc_url`. The binary loads `.env`
//! first, so the same variables can live there.

use crate::blockchain::session::DEFAULT_CHAIN_ID;
use crate::models::proof::{Locators, DEFAULT_EXPLORER_URL, DEFAULT_GATEWAY_URL};
use crate::services::organization::{OrganizationClassifier, OrganizationRule};
use crate::storage::pinata::DEFAULT_PIN_URL;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default settings file, looked up relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "anchor.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    Pinata,
    Ipfs,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Registry,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlobStoreSettings {
    pub backend: BlobBackend,
    pub pinata_jwt: Option<String>,
    pub pinata_url: String,
    pub gateway_url: String,
    pub ipfs_api_url: String,
    pub timeout_secs: u64,
}

impl Default for BlobStoreSettings {
    fn default() -> Self {
        Self {
            backend: BlobBackend::Memory,
            pinata_jwt: None,
            pinata_url: DEFAULT_PIN_URL.into(),
            gateway_url: DEFAULT_GATEWAY_URL.into(),
            ipfs_api_url: "http://localhost:5001".into(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub backend: LedgerBackend,
    pub rpc_url: Option<String>,
    pub contract_address: Option<String>,
    /// Absent means a read-only session: verification works, anchoring does not
    pub private_key: Option<String>,
    pub chain_id: u64,
    pub explorer_url: String,
    pub timeout_secs: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Memory,
            rpc_url: None,
            contract_address: None,
            private_key: None,
            chain_id: DEFAULT_CHAIN_ID,
            explorer_url: DEFAULT_EXPLORER_URL.into(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// JSON file backing the local index; in-memory when absent
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerificationSettings {
    /// Subjects scanned when verifying by content address
    pub known_subjects: Vec<String>,
    pub check_blob_integrity: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub blob_store: BlobStoreSettings,
    pub ledger: LedgerSettings,
    pub index: IndexSettings,
    pub verification: VerificationSettings,
    /// Replaces the built-in organization table when present
    pub organization_rules: Option<Vec<OrganizationRule>>,
}

impl Settings {
    /// Loads `anchor.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_SETTINGS_FILE)
    }

    /// Loads the given settings file (if present) and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("ANCHOR")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("verification.known_subjects")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that the selected backends have what they need.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blob_store.backend == BlobBackend::Pinata
            && self.blob_store.pinata_jwt.as_deref().map_or(true, |jwt| jwt.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "blob_store.pinata_jwt is required for the pinata backend".into(),
            ));
        }
        if self.ledger.backend == LedgerBackend::Registry {
            for (key, value) in [
                ("ledger.rpc_url", &self.ledger.rpc_url),
                ("ledger.contract_address", &self.ledger.contract_address),
            ] {
                if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                    return Err(ConfigError::Invalid(format!(
                        "{} is required for the registry backend",
                        key
                    )));
                }
            }
        }
        if self.ledger.timeout_secs == 0 || self.blob_store.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least one second".into()));
        }
        Ok(())
    }

    pub fn locators(&self) -> Locators {
        Locators::new(&self.blob_store.gateway_url, &self.ledger.explorer_url)
    }

    pub fn classifier(&self) -> OrganizationClassifier {
        match &self.organization_rules {
            Some(rules) => OrganizationClassifier::new(rules.iter().cloned()),
            None => OrganizationClassifier::default(),
        }
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger.timeout_secs)
    }

    pub fn blob_timeout(&self) -> Duration {
        Duration::from_secs(self.blob_store.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_run_fully_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path().join("missing.toml")).unwrap();
        assert_eq!(settings.blob_store.backend, BlobBackend::Memory);
        assert_eq!(settings.ledger.backend, LedgerBackend::Memory);
        assert_eq!(settings.ledger.chain_id, 11_155_111);
        assert_eq!(settings.server.bind, "127.0.0.1:3000");
        assert!(settings.index.path.is_none());
        assert_eq!(
            settings.locators().content_link("QmX"),
            "https://gateway.pinata.cloud/ipfs/QmX"
        );
    }

    #[test]
    fn reads_a_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchor.toml");
        fs::write(
            &path,
            r#"
[blob_store]
backend = "pinata"
pinata_jwt = "jwt-token"
gateway_url = "https://ipfs.example.org/"

[ledger]
backend = "registry"
rpc_url = "http://127.0.0.1:8545"
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
chain_id = 31337

[index]
path = "data/issued.json"

[verification]
known_subjects = ["TEST001", "AYUB123"]
check_blob_integrity = true

[[organization_rules]]
keyword = "nit"
label = "National Institute of Technology"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.blob_store.backend, BlobBackend::Pinata);
        assert_eq!(settings.ledger.chain_id, 31337);
        assert_eq!(settings.index.path, Some(PathBuf::from("data/issued.json")));
        assert_eq!(settings.verification.known_subjects, ["TEST001", "AYUB123"]);
        assert!(settings.verification.check_blob_integrity);
        assert_eq!(
            settings.locators().content_link("QmX"),
            "https://ipfs.example.org/ipfs/QmX"
        );
        assert_eq!(
            settings.classifier().classify("NIT Silchar Degree"),
            "National Institute of Technology"
        );
        assert_eq!(settings.classifier().classify("CBSE Result"), "Unknown Organization");
    }

    #[test]
    fn incomplete_backends_are_rejected() {
        let mut settings = Settings::default();
        settings.blob_store.backend = BlobBackend::Pinata;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));

        let mut settings = Settings::default();
        settings.ledger.backend = LedgerBackend::Registry;
        settings.ledger.rpc_url = Some("http://127.0.0.1:8545".into());
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid(msg)) if msg.contains("contract_address")
        ));
    }
}
