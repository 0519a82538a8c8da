//! Signing capability
//!
//! The pipeline never holds keys. It talks to a [`TransactionSigner`], which
//! may be a browser wallet bridge, a remote signer or, for the CLI, a local
//! keypair file ([`KeypairSigner`]). `sign` may wait on a human for an
//! unbounded amount of time; callers race it against an abort signal.

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::VersionedTransaction,
};
use std::sync::Arc;

use crate::errors::{SwapError, SwapResult};

/// External signing capability
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Whether a wallet is connected and able to sign right now
    fn is_ready(&self) -> bool;

    /// Fee payer / owner of the swapped token accounts
    fn pubkey(&self) -> Pubkey;

    /// Sign `transaction`, returning the signed copy
    async fn sign(&self, transaction: VersionedTransaction) -> SwapResult<VersionedTransaction>;
}

/// Local keypair signer
#[derive(Clone)]
pub struct KeypairSigner {
    keypair: Arc<Keypair>,
}

impl KeypairSigner {
    /// Load a keypair file (JSON byte array as written by `solana-keygen`, or raw 64 bytes)
    pub fn from_file(path: &str) -> Result<Self> {
        let path = expand_home(path);
        let keypair_bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read keypair file: {}", path))?;

        let bytes: Vec<u8> = if keypair_bytes.len() == 64 {
            keypair_bytes
        } else {
            serde_json::from_slice(&keypair_bytes).context("Failed to parse keypair JSON")?
        };
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 64 {
            anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", bytes.len());
        }
        if bytes.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }
        let keypair = Keypair::try_from(bytes).context("Invalid keypair bytes")?;
        Ok(Self::from_keypair(keypair))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn is_ready(&self) -> bool {
        true
    }

    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign(&self, transaction: VersionedTransaction) -> SwapResult<VersionedTransaction> {
        VersionedTransaction::try_new(transaction.message, &[self.keypair.as_ref()])
            .map_err(|e| SwapError::Signing(e.to_string()))
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}
