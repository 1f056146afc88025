//! High-level operations on the greeter program.

use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::signer::Signer;

use crate::gateway::{self, Confirmation, Gateway, Ledger, WaitConfig};
use crate::instruction::{self, GreetAccounts, TransferAccounts};
use crate::state::{self, GreetingAccount};
use crate::transaction::{Envelope, SignedEnvelope};
use crate::{Error, Result};

/// Number of transactions the payer should be able to pay fees for on top of
/// the greeting account rent.
const FEE_BUDGET_TRANSACTIONS: u64 = 100;

/// Lamports sent to the greeting account with every greeting.
pub const GREETING_TIP: u64 = LAMPORTS_PER_SOL / 100;


/// Connection, program and payer used by all operations.
pub struct Client<'a, C: ?Sized> {
    conn: &'a C,
    program_id: Pubkey,
    payer: &'a dyn Signer,
    commitment: CommitmentConfig,
    wait: WaitConfig,
}

impl<'a, C: Ledger + Gateway + ?Sized> Client<'a, C> {
    pub fn new(conn: &'a C, program_id: Pubkey, payer: &'a dyn Signer) -> Self {
        Self {
            conn,
            program_id,
            payer,
            commitment: CommitmentConfig::confirmed(),
            wait: WaitConfig::default(),
        }
    }

    pub fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.commitment = commitment;
        self
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    pub fn program_id(&self) -> &Pubkey { &self.program_id }

    pub fn payer(&self) -> Pubkey { self.payer.pubkey() }

    /// Checks that the program is deployed.
    pub fn check_program(&self) -> Result {
        match self.conn.account(&self.program_id)? {
            None => Err(Error::ProgramNotDeployed(self.program_id)),
            Some(account) if !account.executable => {
                Err(Error::ProgramNotExecutable(self.program_id))
            }
            Some(_) => {
                log::info!("Using program {}", self.program_id);
                Ok(())
            }
        }
    }

    pub fn greeting_address(&self) -> Result<Pubkey> {
        Ok(instruction::greeting_address(&self.payer(), &self.program_id)?)
    }

    /// Returns lamports the payer needs to create the greeting account and pay
    /// for a batch of transactions.
    pub fn funding_required(&self) -> Result<u64> {
        let rent = state::rent_exempt_balance::<GreetingAccount>(self.conn)?;
        let payer = self.payer();
        let transfer =
            Message::new(&[instruction::fund(&payer, &payer, 0)], Some(&payer));
        let fee = self.conn.fee_for_message(&transfer)?;
        Ok(rent.saturating_add(fee.saturating_mul(FEE_BUDGET_TRANSACTIONS)))
    }

    /// Checks that the payer holds at least [`Self::funding_required`]
    /// lamports; returns its balance.
    pub fn ensure_funded(&self) -> Result<u64> {
        let required = self.funding_required()?;
        let balance = self.conn.balance(&self.payer())?;
        log::debug!("Payer balance {balance}, required {required}");
        if balance < required {
            return Err(Error::InsufficientFunds { balance, required });
        }
        Ok(balance)
    }

    /// Creates the greeting account unless it already exists; returns its
    /// address.
    pub fn ensure_greeting_account(&self) -> Result<Pubkey> {
        let greeting = self.greeting_address()?;
        if self.conn.account(&greeting)?.is_some() {
            return Ok(greeting);
        }
        log::info!("Creating account {greeting} to say hello to");
        let lamports = state::rent_exempt_balance::<GreetingAccount>(self.conn)?;
        let (_, ix) = instruction::create_greeting_account(
            &self.payer(),
            &self.program_id,
            lamports,
        )?;
        self.send_and_confirm(&[ix], &[])?;
        Ok(greeting)
    }

    /// Transfers lamports from the payer to the greeting account.
    pub fn send_money(&self, lamports: u64) -> Result<Signature> {
        let greeting = self.greeting_address()?;
        log::info!("Sending {lamports} lamports to {greeting}");
        let ix = instruction::fund(&self.payer(), &greeting, lamports);
        self.send_and_confirm(&[ix], &[])
    }

    /// Greets the greeting account.
    ///
    /// Sends a single transaction which tips the greeting account with
    /// [`GREETING_TIP`] lamports and calls the Greet instruction.  `user` must
    /// be the signer of `accounts.user`.
    pub fn say_hello(
        &self,
        user: &dyn Signer,
        accounts: &GreetAccounts,
    ) -> Result<Signature> {
        log::info!("Saying hello to {}", accounts.greeting);
        let tip =
            instruction::fund(&self.payer(), &accounts.greeting, GREETING_TIP);
        let greet = instruction::greet(self.program_id, accounts)?;
        self.send_and_confirm(&[tip, greet], &[user])
    }

    /// Has the program transfer tokens from its token account.
    ///
    /// Only the payer signs; the program authorises the transfer with its
    /// own authority address.
    pub fn transfer_tokens(
        &self,
        accounts: &TransferAccounts,
    ) -> Result<Signature> {
        log::info!(
            "Transferring tokens from {} to {}",
            accounts.source,
            accounts.destination
        );
        let ix = instruction::transfer_tokens(self.program_id, accounts)?;
        self.send_and_confirm(&[ix], &[])
    }

    /// Reads the greeting account.
    pub fn report(&self) -> Result<GreetingAccount> {
        state::read_state(self.conn, &self.greeting_address()?)
    }

    /// Assembles instructions anchored at the latest blockhash and paid for by
    /// the payer.
    pub fn assemble(&self, instructions: &[Instruction]) -> Result<Envelope> {
        let anchor = self.conn.latest_anchor()?;
        Ok(Envelope::assemble(instructions, &self.payer(), anchor))
    }

    /// Assembles, signs with the payer and `signers`, submits and waits for
    /// the transaction.
    ///
    /// Errors with [`Error::ConfirmationTimeout`] if the outcome isn’t known in
    /// time.  In that case the transaction may still land so don’t build
    /// a new one before checking the state (see [`Self::recover`]).
    pub fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        signers: &[&dyn Signer],
    ) -> Result<Signature> {
        let mut envelope = self.assemble(instructions)?;
        let payer: &[&dyn Signer] = &[self.payer];
        envelope.sign(payer)?;
        if !signers.is_empty() {
            envelope.sign(signers)?;
        }
        let envelope = envelope.into_signed()?;
        let signature = *envelope.signature();
        match self.submit_and_wait(&envelope)? {
            Confirmation::Confirmed => Ok(signature),
            Confirmation::Failed(err) => {
                Err(Error::SubmissionRejected(err.to_string()))
            }
            Confirmation::Expired => Err(Error::Expired(signature)),
            Confirmation::TimedOut => Err(Error::ConfirmationTimeout(signature)),
        }
    }

    /// Submits an envelope and waits for it.
    ///
    /// Fails with [`Error::MissingSignature`] without contacting the cluster
    /// if the envelope isn’t fully signed.
    pub fn submit(&self, envelope: Envelope) -> Result<Confirmation> {
        self.submit_and_wait(&envelope.into_signed()?)
    }

    pub fn submit_and_wait(
        &self,
        envelope: &SignedEnvelope,
    ) -> Result<Confirmation> {
        let handle = gateway::submit(self.conn, envelope)?;
        gateway::await_confirmation(
            self.conn,
            &handle,
            self.commitment,
            &self.wait,
        )
    }

    /// Resolves a transaction whose confirmation timed out.
    ///
    /// Queries the transaction status.  If the transaction is still unknown
    /// but its blockhash is valid, resends the very same envelope (which is
    /// idempotent) and waits again.  If the blockhash has expired returns
    /// [`Confirmation::Expired`]; only then is it safe to build a new
    /// transaction.
    pub fn recover(&self, envelope: &SignedEnvelope) -> Result<Confirmation> {
        let signature = envelope.signature();
        if let Some(status) = self.conn.status(signature, self.commitment)? {
            return Ok(status.into());
        }
        if !self.conn.is_anchor_valid(&envelope.anchor(), self.commitment)? {
            log::info!("{signature} expired without landing");
            return Ok(Confirmation::Expired);
        }
        log::info!("Resending {signature}");
        self.submit_and_wait(envelope)
    }
}
