//! Interfaces to the cluster: querying ledger state and submitting
//! transactions.
//!
//! [`Ledger`] and [`Gateway`] are the only points where the library talks to
//! the network.  With the `rpc` feature both are implemented for
//! [`RpcClient`](solana_client::rpc_client::RpcClient).

use std::time::{Duration, Instant};

use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, TransactionError};

use crate::transaction::SignedEnvelope;
use crate::Result;

/// Outcome of a processed transaction as reported by the cluster.
pub type TransactionStatus = core::result::Result<(), TransactionError>;


/// Read access to the ledger.
pub trait Ledger {
    /// Returns the account or `None` if it doesn’t exist.
    fn account(&self, key: &Pubkey) -> Result<Option<Account>>;

    /// Returns data of the account or `None` if it doesn’t exist.
    fn account_data(&self, key: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(self.account(key)?.map(|account| account.data))
    }

    /// Returns a recent blockhash to anchor new transactions to.
    fn latest_anchor(&self) -> Result<Hash>;

    /// Checks whether transactions anchored at `anchor` can still land.
    fn is_anchor_valid(
        &self,
        anchor: &Hash,
        commitment: CommitmentConfig,
    ) -> Result<bool>;

    /// Returns minimum balance for an account of `size` bytes to be rent
    /// exempt.
    fn minimum_balance(&self, size: usize) -> Result<u64>;

    fn balance(&self, key: &Pubkey) -> Result<u64>;

    /// Returns fee the cluster charges for given message.
    fn fee_for_message(&self, message: &Message) -> Result<u64>;
}

/// Transaction submission.
pub trait Gateway {
    /// Sends a signed transaction; returns its signature.
    fn send(&self, transaction: &Transaction) -> Result<Signature>;

    /// Returns status of the transaction or `None` if the cluster hasn’t seen
    /// it at given commitment level.
    fn status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<Option<TransactionStatus>>;
}


/// Reference to a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Handle {
    pub signature: Signature,
    pub anchor: Hash,
}

/// Result of waiting for a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Confirmation {
    /// Transaction executed successfully at the requested commitment.
    Confirmed,
    /// Transaction was processed but its execution failed.
    Failed(TransactionError),
    /// The blockhash expired and the transaction was never seen.  It can no
    /// longer land.
    Expired,
    /// The wait elapsed.  The outcome is unknown; the transaction may still
    /// land.
    TimedOut,
}

impl From<TransactionStatus> for Confirmation {
    fn from(status: TransactionStatus) -> Self {
        match status {
            Ok(()) => Self::Confirmed,
            Err(err) => Self::Failed(err),
        }
    }
}

/// How long to wait for confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
            poll_interval: Duration::from_millis(500),
        }
    }
}


/// Sends a signed transaction.
pub fn submit(
    gateway: &(impl Gateway + ?Sized),
    envelope: &SignedEnvelope,
) -> Result<Handle> {
    let signature = gateway.send(envelope.transaction())?;
    log::info!("Sent transaction {signature}");
    Ok(Handle { signature, anchor: envelope.anchor() })
}

/// Polls the status of a submitted transaction until it settles, its anchor
/// expires or the wait times out.
///
/// Giving up on the wait has no side effects; the transaction may still land.
/// Failed status or anchor queries are logged and polling continues, so
/// a connection that keeps failing ends in [`Confirmation::TimedOut`] rather
/// than an error: the transaction is already on the wire.
pub fn await_confirmation<C: Ledger + Gateway + ?Sized>(
    conn: &C,
    handle: &Handle,
    commitment: CommitmentConfig,
    wait: &WaitConfig,
) -> Result<Confirmation> {
    let sig = &handle.signature;
    let start = Instant::now();
    loop {
        match conn.status(sig, commitment) {
            Ok(Some(status)) => {
                log::debug!("{sig}: {status:?}");
                return Ok(status.into());
            }
            Ok(None) => (),
            Err(err) => log::warn!("{sig}: status query failed: {err}"),
        }
        match conn.is_anchor_valid(&handle.anchor, commitment) {
            Ok(true) => (),
            Ok(false) => {
                // The transaction may have landed right before the blockhash
                // expired.
                return Ok(match conn.status(sig, commitment) {
                    Ok(status) => {
                        status.map_or(Confirmation::Expired, Confirmation::from)
                    }
                    Err(err) => {
                        log::warn!("{sig}: status query failed: {err}");
                        Confirmation::TimedOut
                    }
                });
            }
            Err(err) => log::warn!("{sig}: blockhash check failed: {err}"),
        }
        if start.elapsed() >= wait.timeout {
            log::warn!("{sig}: no confirmation after {:?}", wait.timeout);
            return Ok(Confirmation::TimedOut);
        }
        std::thread::sleep(wait.poll_interval);
    }
}


#[cfg(feature = "rpc")]
mod rpc {
    use solana_client::client_error::ClientError;
    use solana_client::rpc_client::RpcClient;

    use super::*;
    use crate::Error;

    impl Ledger for RpcClient {
        fn account(&self, key: &Pubkey) -> Result<Option<Account>> {
            Ok(self.get_account_with_commitment(key, self.commitment())?.value)
        }

        fn latest_anchor(&self) -> Result<Hash> {
            Ok(self.get_latest_blockhash()?)
        }

        fn is_anchor_valid(
            &self,
            anchor: &Hash,
            commitment: CommitmentConfig,
        ) -> Result<bool> {
            Ok(self.is_blockhash_valid(anchor, commitment)?)
        }

        fn minimum_balance(&self, size: usize) -> Result<u64> {
            Ok(self.get_minimum_balance_for_rent_exemption(size)?)
        }

        fn balance(&self, key: &Pubkey) -> Result<u64> {
            Ok(self.get_balance(key)?)
        }

        fn fee_for_message(&self, message: &Message) -> Result<u64> {
            Ok(self.get_fee_for_message(message)?)
        }
    }

    impl Gateway for RpcClient {
        fn send(&self, transaction: &Transaction) -> Result<Signature> {
            self.send_transaction(transaction).map_err(rejection)
        }

        fn status(
            &self,
            signature: &Signature,
            commitment: CommitmentConfig,
        ) -> Result<Option<TransactionStatus>> {
            Ok(self.get_signature_status_with_commitment(signature, commitment)?)
        }
    }

    /// Distinguishes the cluster rejecting the transaction (for example in
    /// preflight simulation) from transport failures.
    fn rejection(err: ClientError) -> Error {
        match err.get_transaction_error() {
            Some(tx_err) => Error::SubmissionRejected(tx_err.to_string()),
            None => Error::Client(err),
        }
    }
}
