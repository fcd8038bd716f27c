// src/main.rs

//! # Credential Anchoring Engine - Main Entry Point
//!
//! Loads settings, builds the configured blob store, ledger and local index,
//! and serves the HTTP API.
//!
//! ## Configuration
//! Read from `anchor.toml` (optional) and `ANCHOR__*` environment variables,
//! with `.env` loaded first. Notable keys:
//! - `ANCHOR__BLOB_STORE__BACKEND`: `pinata`, `ipfs` or `memory`
//! - `ANCHOR__BLOB_STORE__PINATA_JWT`: pinning service token
//! - `ANCHOR__LEDGER__BACKEND`: `registry` or `memory`
//! - `ANCHOR__LEDGER__RPC_URL`, `ANCHOR__LEDGER__CONTRACT_ADDRESS`
//! - `ANCHOR__LEDGER__PRIVATE_KEY`: (Optional) signing key; read-only without it
//! - `ANCHOR__INDEX__PATH`: (Optional) JSON file for the local index

use anyhow::Context;
use credential_anchor::blockchain::{Ledger, LedgerSession, MemoryLedger, RegistryLedger};
use credential_anchor::config::{BlobBackend, LedgerBackend, Settings};
use credential_anchor::index::{JsonFileStore, LocalIndex, MemoryIndexStore};
use credential_anchor::services::{
    AnchoringService, ApiServer, ChainedSubjects, KnownSubjects, SubjectSource, Verifier,
};
use credential_anchor::storage::{BlobStore, IpfsNodeStore, MemoryBlobStore, PinataStore};
use dotenv::dotenv;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

fn build_blob_store(settings: &Settings) -> anyhow::Result<Arc<dyn BlobStore>> {
    let cfg = &settings.blob_store;
    let store: Arc<dyn BlobStore> = match cfg.backend {
        BlobBackend::Pinata => Arc::new(
            PinataStore::new(
                cfg.pinata_url.clone(),
                cfg.pinata_jwt.clone().unwrap_or_default(),
                cfg.gateway_url.clone(),
                settings.blob_timeout(),
            )
            .context("Failed to initialize pinning service client")?,
        ),
        BlobBackend::Ipfs => Arc::new(
            IpfsNodeStore::new(&cfg.ipfs_api_url, cfg.gateway_url.clone(), settings.blob_timeout())
                .context("Failed to initialize IPFS client - check ipfs_api_url")?,
        ),
        BlobBackend::Memory => {
            warn!("using the in-memory blob store; uploads are lost on exit");
            Arc::new(MemoryBlobStore::with_gateway(cfg.gateway_url.clone()))
        }
    };
    Ok(store)
}

async fn build_ledger(settings: &Settings) -> anyhow::Result<Arc<dyn Ledger>> {
    let cfg = &settings.ledger;
    let ledger: Arc<dyn Ledger> = match cfg.backend {
        LedgerBackend::Registry => {
            // Both are checked by Settings::validate.
            let rpc_url = cfg.rpc_url.as_deref().unwrap_or_default();
            let contract_address = cfg.contract_address.as_deref().unwrap_or_default();

            let session = LedgerSession::connect(
                rpc_url,
                cfg.chain_id,
                cfg.private_key.as_deref(),
                settings.ledger_timeout(),
            )
            .await
            .context("Failed to connect to the ledger - check rpc_url and chain_id")?;
            if session.signer_address().is_none() {
                warn!("no ledger private key configured; anchoring is disabled");
            }
            Arc::new(
                RegistryLedger::connect(session, contract_address)
                    .await
                    .context("Failed to bind the Document Registry - verify contract_address")?,
            )
        }
        LedgerBackend::Memory => {
            warn!("using the in-memory ledger; records are lost on exit");
            Arc::new(MemoryLedger::new())
        }
    };
    Ok(ledger)
}

fn build_index(settings: &Settings) -> anyhow::Result<Arc<LocalIndex>> {
    let index = match &settings.index.path {
        Some(path) => {
            let store = JsonFileStore::new(path);
            info!("local index at {}", store.path().display());
            LocalIndex::open(Box::new(store), settings.locators())
                .with_context(|| format!("Failed to open local index at {}", path.display()))?
        }
        None => {
            let index = LocalIndex::open(Box::new(MemoryIndexStore::new()), settings.locators())?;
            info!("local index is in-memory");
            index
        }
    };
    Ok(Arc::new(index))
}

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment and settings
/// 2. Build blob store, ledger and local index
/// 3. Initialize service components
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("Failed to load settings")?;

    let blob_store = build_blob_store(&settings)?;
    let ledger = build_ledger(&settings).await?;
    let index = build_index(&settings)?;

    let known: Arc<dyn SubjectSource> = Arc::new(KnownSubjects::new(
        settings.verification.known_subjects.iter().cloned(),
    ));
    let subjects = ChainedSubjects::new().with(known).with(index.clone());

    let anchoring = AnchoringService::new(
        blob_store.clone(),
        ledger.clone(),
        index.clone(),
        settings.classifier(),
    );
    let verifier = Verifier::new(ledger, blob_store, Arc::new(subjects))
        .with_index(index.clone())
        .with_blob_integrity(settings.verification.check_blob_integrity);

    let api_server = ApiServer::new(Arc::new(anchoring), Arc::new(verifier), index);

    let addr: SocketAddr = settings
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid server.bind address {}", settings.server.bind))?;
    info!("Available endpoints:");
    info!("- POST /anchor");
    info!("- POST /verify, /verify/qr, /verify/payload, /verify/proof");
    info!("- GET  /issued, /issued/:tx_hash/proof");

    api_server.run(addr).await.context("API server failed")?;
    Ok(())
}
