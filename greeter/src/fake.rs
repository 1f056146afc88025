//! In-memory stand-in for a cluster used in tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::gateway::{Gateway, Ledger, TransactionStatus};
use crate::{Error, Result};

/// Rent the default cluster charges per byte, with the exemption threshold
/// applied.
const LAMPORTS_PER_BYTE: u64 = 6960;
const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;
pub(crate) const LAMPORTS_PER_SIGNATURE: u64 = 5000;

/// Records sent transactions and answers status queries from a script.
///
/// Status queries pop scripted answers first and then fall back to the
/// default status which confirms everything unless changed.
pub(crate) struct FakeCluster {
    accounts: RefCell<HashMap<Pubkey, Account>>,
    anchor: Hash,
    anchor_valid: Cell<bool>,
    sent: RefCell<Vec<Transaction>>,
    statuses: RefCell<VecDeque<Option<TransactionStatus>>>,
    default_status: RefCell<Option<TransactionStatus>>,
    status_queries: Cell<usize>,
    reject: RefCell<Option<String>>,
    status_fails_after: Cell<Option<usize>>,
    anchor_checks_fail: Cell<bool>,
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self {
            accounts: Default::default(),
            anchor: Hash::new_unique(),
            anchor_valid: Cell::new(true),
            sent: Default::default(),
            statuses: Default::default(),
            default_status: RefCell::new(Some(Ok(()))),
            status_queries: Cell::new(0),
            reject: Default::default(),
            status_fails_after: Cell::new(None),
            anchor_checks_fail: Cell::new(false),
        }
    }
}

impl FakeCluster {
    pub fn anchor(&self) -> Hash { self.anchor }

    pub fn sent(&self) -> Vec<Transaction> { self.sent.borrow().clone() }

    pub fn status_queries(&self) -> usize { self.status_queries.get() }

    pub fn insert_account(&self, key: Pubkey, account: Account) {
        self.accounts.borrow_mut().insert(key, account);
    }

    pub fn insert_data(&self, key: Pubkey, owner: Pubkey, data: Vec<u8>) {
        let lamports = self.rent(data.len());
        self.insert_account(key, Account {
            lamports,
            data,
            owner,
            executable: false,
            rent_epoch: 0,
        });
    }

    pub fn set_balance(&self, key: Pubkey, lamports: u64) {
        self.accounts.borrow_mut().entry(key).or_default().lamports = lamports;
    }

    pub fn push_status(&self, status: Option<TransactionStatus>) {
        self.statuses.borrow_mut().push_back(status);
    }

    pub fn set_default_status(&self, status: Option<TransactionStatus>) {
        *self.default_status.borrow_mut() = status;
    }

    pub fn expire_anchor(&self) { self.anchor_valid.set(false); }

    pub fn reject_with(&self, reason: &str) {
        *self.reject.borrow_mut() = Some(reason.into());
    }

    /// Makes status and blockhash queries fail as if the connection dropped.
    pub fn fail_queries(&self) {
        self.fail_status_after(0);
        self.anchor_checks_fail.set(true);
    }

    /// Lets `count` more status queries through and fails the rest.
    pub fn fail_status_after(&self, count: usize) {
        self.status_fails_after.set(Some(count));
    }

    fn connection_reset() -> Error {
        Error::Io(std::io::Error::other("connection reset"))
    }

    fn rent(&self, size: usize) -> u64 {
        (ACCOUNT_STORAGE_OVERHEAD + size as u64) * LAMPORTS_PER_BYTE
    }
}

impl Ledger for FakeCluster {
    fn account(&self, key: &Pubkey) -> Result<Option<Account>> {
        Ok(self.accounts.borrow().get(key).cloned())
    }

    fn latest_anchor(&self) -> Result<Hash> { Ok(self.anchor) }

    fn is_anchor_valid(
        &self,
        anchor: &Hash,
        _commitment: CommitmentConfig,
    ) -> Result<bool> {
        if self.anchor_checks_fail.get() {
            return Err(Self::connection_reset());
        }
        Ok(*anchor == self.anchor && self.anchor_valid.get())
    }

    fn minimum_balance(&self, size: usize) -> Result<u64> {
        Ok(self.rent(size))
    }

    fn balance(&self, key: &Pubkey) -> Result<u64> {
        Ok(self.accounts.borrow().get(key).map_or(0, |acc| acc.lamports))
    }

    fn fee_for_message(&self, message: &Message) -> Result<u64> {
        let signatures = u64::from(message.header.num_required_signatures);
        Ok(signatures * LAMPORTS_PER_SIGNATURE)
    }
}

impl Gateway for FakeCluster {
    fn send(&self, transaction: &Transaction) -> Result<Signature> {
        if let Some(reason) = self.reject.borrow().clone() {
            return Err(Error::SubmissionRejected(reason));
        }
        self.sent.borrow_mut().push(transaction.clone());
        Ok(transaction.signatures[0])
    }

    fn status(
        &self,
        _signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> Result<Option<TransactionStatus>> {
        self.status_queries.set(self.status_queries.get() + 1);
        match self.status_fails_after.get() {
            Some(0) => return Err(Self::connection_reset()),
            Some(count) => self.status_fails_after.set(Some(count - 1)),
            None => (),
        }
        let scripted = self.statuses.borrow_mut().pop_front();
        Ok(scripted.unwrap_or_else(|| self.default_status.borrow().clone()))
    }
}
