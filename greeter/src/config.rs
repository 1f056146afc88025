//! Cluster and payer settings read from the Solana CLI configuration.

use std::path::Path;
use std::str::FromStr;

use solana_client::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signer::keypair::{read_keypair_file, Keypair};

use crate::{Error, Result};

/// Settings needed to talk to a cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub json_rpc_url: String,
    /// Path to the payer’s keypair file.
    pub keypair_path: String,
    pub commitment: CommitmentConfig,
}

impl Config {
    /// Loads settings from given configuration file.
    ///
    /// If `path` is `None`, uses the Solana CLI’s default configuration file
    /// if it exists and falls back to the CLI’s defaults otherwise.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let cli = match path {
            Some(path) => solana_cli_config::Config::load(path)?,
            None => match solana_cli_config::CONFIG_FILE.as_deref() {
                Some(path) if Path::new(path).exists() => {
                    solana_cli_config::Config::load(path)?
                }
                _ => solana_cli_config::Config::default(),
            },
        };
        let commitment = CommitmentConfig::from_str(&cli.commitment)
            .unwrap_or_else(|_| {
                if !cli.commitment.is_empty() {
                    log::warn!(
                        "Unknown commitment ‘{}’; using confirmed",
                        cli.commitment
                    );
                }
                CommitmentConfig::confirmed()
            });
        Ok(Self {
            json_rpc_url: cli.json_rpc_url,
            keypair_path: cli.keypair_path,
            commitment,
        })
    }

    /// Reads the payer’s keypair.
    pub fn load_payer(&self) -> Result<Keypair> {
        read_keypair_file(&self.keypair_path).map_err(|err| Error::Keypair {
            path: self.keypair_path.clone(),
            err,
        })
    }

    /// Creates RPC client for the configured cluster.
    pub fn rpc_client(&self) -> RpcClient {
        RpcClient::new_with_commitment(
            self.json_rpc_url.clone(),
            self.commitment,
        )
    }
}
