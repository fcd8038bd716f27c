// src/blockchain/session.rs
//! Explicit ledger session.
//!
//! A [`LedgerSession`] is the capability object handed to the registry
//! adapter: an RPC provider, the chain it is expected to be on, and optionally
//! a signing account. Without an account the session is read-only and every
//! write fails with [`LedgerError::NoSigner`].

use crate::blockchain::LedgerError;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use log::info;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Sepolia, the chain the registry contract is deployed on by default.
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Provider wrapped with the session's signing account.
pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

#[derive(Clone)]
pub struct LedgerSession {
    provider: Arc<Provider<Http>>,
    signer: Option<Arc<SignerClient>>,
    chain_id: u64,
    timeout: Duration,
}

impl LedgerSession {
    /// Builds a session without touching the network.
    ///
    /// # Arguments
    /// * `rpc_url` - JSON-RPC endpoint
    /// * `chain_id` - Chain the session must operate on
    /// * `private_key` - Hex private key (with or without 0x); `None` for read-only
    /// * `timeout` - Upper bound for every ledger round trip
    pub fn new(
        rpc_url: &str,
        chain_id: u64,
        private_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| LedgerError::Misconfigured(format!("rpc url {}: {}", rpc_url, e)))?
            .interval(POLL_INTERVAL);

        let signer = match private_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => {
                let wallet = key
                    .trim_start_matches("0x")
                    .parse::<LocalWallet>()
                    .map_err(|e| LedgerError::Misconfigured(format!("private key: {}", e)))?
                    .with_chain_id(chain_id);
                Some(Arc::new(SignerMiddleware::new(provider.clone(), wallet)))
            }
            None => None,
        };

        Ok(Self {
            provider: Arc::new(provider),
            signer,
            chain_id,
            timeout,
        })
    }

    /// Builds a session and checks that the endpoint serves the expected chain.
    pub async fn connect(
        rpc_url: &str,
        chain_id: u64,
        private_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let session = Self::new(rpc_url, chain_id, private_key, timeout)?;
        session.check_network().await?;
        info!(
            "ledger session on chain {} ({})",
            chain_id,
            if session.signer.is_some() { "read-write" } else { "read-only" }
        );
        Ok(session)
    }

    /// Fails with `WrongNetwork` if the provider reports another chain id.
    pub async fn check_network(&self) -> Result<(), LedgerError> {
        let provider = self.provider.clone();
        let actual = self
            .bounded(async move {
                provider
                    .get_chainid()
                    .await
                    .map_err(|e| LedgerError::Unreachable(e.to_string()))
            })
            .await?
            .low_u64();
        if actual != self.chain_id {
            return Err(LedgerError::WrongNetwork {
                expected: self.chain_id,
                actual,
            });
        }
        Ok(())
    }

    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    /// The signing client, or `NoSigner` for a read-only session.
    pub fn signer(&self) -> Result<Arc<SignerClient>, LedgerError> {
        self.signer.clone().ok_or(LedgerError::NoSigner)
    }

    /// Address records issued through this session will carry as issuer.
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.signer().address())
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Runs `call` under the session timeout.
    pub async fn bounded<T, F>(&self, call: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, LedgerError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| LedgerError::Timeout(self.timeout.as_secs()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL_RPC: &str = "http://127.0.0.1:8545";
    const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn read_only_session_has_no_signer() {
        let session = LedgerSession::new(LOCAL_RPC, DEFAULT_CHAIN_ID, None, Duration::from_secs(5))
            .unwrap();
        assert!(matches!(session.signer(), Err(LedgerError::NoSigner)));
        assert!(session.signer_address().is_none());
        assert_eq!(session.chain_id(), DEFAULT_CHAIN_ID);
    }

    #[test]
    fn blank_key_is_treated_as_read_only() {
        let session =
            LedgerSession::new(LOCAL_RPC, 31337, Some("  "), Duration::from_secs(5)).unwrap();
        assert!(session.signer_address().is_none());
    }

    #[test]
    fn private_key_yields_signer_address() {
        let timeout = Duration::from_secs(5);
        let session = LedgerSession::new(LOCAL_RPC, 31337, Some(HARDHAT_KEY), timeout).unwrap();
        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(session.signer_address(), Some(expected));
        assert!(session.signer().is_ok());
    }

    #[test]
    fn malformed_inputs_are_configuration_errors() {
        let bad_url = LedgerSession::new("not a url", 1, None, Duration::from_secs(1));
        assert!(matches!(bad_url, Err(LedgerError::Misconfigured(_))));
        let bad_key = LedgerSession::new(LOCAL_RPC, 1, Some("zz"), Duration::from_secs(1));
        assert!(matches!(bad_key, Err(LedgerError::Misconfigured(_))));
    }

    #[tokio::test]
    async fn slow_calls_surface_as_timeouts() {
        let session = LedgerSession::new(LOCAL_RPC, 1, None, Duration::from_millis(20)).unwrap();
        let result: Result<(), _> = session.bounded(std::future::pending()).await;
        assert!(matches!(result, Err(LedgerError::Timeout(0))));
    }
}
