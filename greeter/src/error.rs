use solana_program::pubkey::{Pubkey, PubkeyError};
use solana_sdk::signature::Signature;
use solana_sdk::signer::SignerError;

use crate::layout::LayoutError;


/// Errors returned by the library.
#[derive(Debug, derive_more::Display, derive_more::From)]
pub enum Error {
    /// Bytes don’t match the record layout.  Retrying won’t help; either the
    /// schema or the data is wrong.
    #[display("layout mismatch: {_0}")]
    Layout(LayoutError),

    /// The account doesn’t exist (possibly because it hasn’t been created
    /// yet).
    #[display("account {_0} not found")]
    #[from(ignore)]
    AccountNotFound(Pubkey),

    /// Transaction is missing signatures of listed required signers.
    #[display("missing signatures of {missing:?}")]
    #[from(ignore)]
    MissingSignature { missing: Vec<Pubkey> },

    /// Listed signers produced signatures which don’t verify.
    #[display("invalid signatures of {signers:?}")]
    #[from(ignore)]
    InvalidSignature { signers: Vec<Pubkey> },

    /// Signer isn’t required by the transaction or failed to sign.
    #[display("signing failed: {_0}")]
    Signer(SignerError),

    /// The cluster rejected the transaction or its execution failed.
    #[display("transaction rejected: {_0}")]
    #[from(ignore)]
    SubmissionRejected(String),

    /// Confirmation wasn’t observed in time.  The transaction may still land;
    /// query its status before deciding to retry.
    #[display("transaction {_0} not confirmed in time; outcome unknown")]
    #[from(ignore)]
    ConfirmationTimeout(Signature),

    /// The recent blockhash expired before the transaction landed.  The
    /// transaction will never be executed and has to be rebuilt.
    #[display("transaction {_0} expired")]
    #[from(ignore)]
    Expired(Signature),

    #[display("program {_0} is not deployed")]
    #[from(ignore)]
    ProgramNotDeployed(Pubkey),

    #[display("program {_0} is not executable")]
    #[from(ignore)]
    ProgramNotExecutable(Pubkey),

    #[display("insufficient funds: have {balance} lamports, need {required}")]
    #[from(ignore)]
    InsufficientFunds { balance: u64, required: u64 },

    Pubkey(PubkeyError),

    #[cfg(feature = "rpc")]
    Client(solana_client::client_error::ClientError),

    Io(std::io::Error),

    #[display("{path}: {err}")]
    #[from(ignore)]
    Keypair { path: String, err: Box<dyn std::error::Error> },
}

impl std::error::Error for Error {}
