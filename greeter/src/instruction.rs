//! Constructing instructions for the greeter program and the system
//! program.
//!
//! The greeter program identifies accounts by position so the order in which
//! accounts are added to an [`InstructionBuilder`] is kept as is.  The builder
//! doesn’t check that the accounts match what the program expects; that’s
//! what the helper functions such as [`greet`] are for.

use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::{Pubkey, PubkeyError};

use crate::layout::{Layout, LayoutError};
use crate::state::GreetingAccount;

type Result<T = Instruction, E = LayoutError> = core::result::Result<T, E>;

/// Seed used to derive address of the greeting account from the payer’s key.
pub const GREETING_SEED: &str = "hello";


/// Builder of an instruction with arguments encoded by the layout codec.
#[derive(Clone, Debug)]
pub struct InstructionBuilder {
    program_id: Pubkey,
    accounts: Vec<AccountMeta>,
}

impl InstructionBuilder {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id, accounts: Vec::new() }
    }

    /// Appends an account.
    pub fn account(mut self, meta: AccountMeta) -> Self {
        self.accounts.push(meta);
        self
    }

    pub fn writable(self, key: Pubkey) -> Self {
        self.account(AccountMeta::new(key, false))
    }

    pub fn readonly(self, key: Pubkey) -> Self {
        self.account(AccountMeta::new_readonly(key, false))
    }

    /// Appends a writable account which must sign the transaction.
    pub fn signer(self, key: Pubkey) -> Self {
        self.account(AccountMeta::new(key, true))
    }

    pub fn readonly_signer(self, key: Pubkey) -> Self {
        self.account(AccountMeta::new_readonly(key, true))
    }

    /// Builds the instruction with `args` as instruction data.
    ///
    /// Fails if `A` encodes to no bytes; use
    /// [`build_without_args`](Self::build_without_args) for instructions
    /// without data.
    pub fn build<A: Layout>(self, args: &A) -> Result {
        if A::SPAN == 0 {
            return Err(LayoutError::Empty { schema: A::SCHEMA.name });
        }
        Ok(Instruction {
            program_id: self.program_id,
            accounts: self.accounts,
            data: args.encode(),
        })
    }

    pub fn build_without_args(self) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: self.accounts,
            data: Vec::new(),
        }
    }
}


crate::layout! {
    /// Instruction data of the greeter program: a single selector byte.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Selector {
        pub tag: u8,
    }
}

/// Instructions understood by the greeter program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GreeterInstruction {
    /// Transfers tokens from the program’s token account.
    Transfer = 0,
    /// Increments greeting counter and records a pseudo-random number.
    Greet = 1,
}

impl GreeterInstruction {
    pub fn selector(self) -> Selector { Selector { tag: self as u8 } }
}


/// Accounts of the [`GreeterInstruction::Greet`] instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GreetAccounts {
    /// The greeting account owned by the program.
    pub greeting: Pubkey,
    /// User receiving lamports from the greeting account.  Must sign.
    pub user: Pubkey,
    /// Fee payer.  Must sign.
    pub payer: Pubkey,
    pub mint: Pubkey,
    /// The program’s token authority.
    pub authority: Pubkey,
    pub program_token: Pubkey,
    pub user_token: Pubkey,
}

/// Builds the Greet instruction.
///
/// Accounts are passed in order: greeting account, clock sysvar, user, payer,
/// mint, authority, program token account and user token account.
pub fn greet(program_id: Pubkey, accounts: &GreetAccounts) -> Result {
    InstructionBuilder::new(program_id)
        .writable(accounts.greeting)
        .readonly(solana_program::sysvar::clock::ID)
        .signer(accounts.user)
        .signer(accounts.payer)
        .readonly(accounts.mint)
        .readonly(accounts.authority)
        .readonly(accounts.program_token)
        .readonly(accounts.user_token)
        .build(&GreeterInstruction::Greet.selector())
}

/// Accounts of the [`GreeterInstruction::Transfer`] instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferAccounts {
    pub destination: Pubkey,
    pub token_program: Pubkey,
    pub source: Pubkey,
    pub authority: Pubkey,
    /// The greeter program itself; its address seeds the authority PDA.
    pub program: Pubkey,
}

/// Builds the Transfer instruction.
pub fn transfer_tokens(program_id: Pubkey, accounts: &TransferAccounts) -> Result {
    InstructionBuilder::new(program_id)
        .writable(accounts.destination)
        .readonly(accounts.token_program)
        .writable(accounts.source)
        .readonly(accounts.authority)
        .readonly(accounts.program)
        .build(&GreeterInstruction::Transfer.selector())
}


/// Returns address of the greeting account of given payer.
pub fn greeting_address(
    payer: &Pubkey,
    program_id: &Pubkey,
) -> Result<Pubkey, PubkeyError> {
    Pubkey::create_with_seed(payer, GREETING_SEED, program_id)
}

/// Builds system instruction creating the payer’s greeting account.
///
/// The account gets [`GreetingAccount::SPAN`] bytes of space and is owned by
/// `program_id`.  Returns the account’s address with the instruction.
pub fn create_greeting_account(
    payer: &Pubkey,
    program_id: &Pubkey,
    lamports: u64,
) -> Result<(Pubkey, Instruction), PubkeyError> {
    let greeting = greeting_address(payer, program_id)?;
    let instruction =
        solana_system_interface::instruction::create_account_with_seed(
            payer,
            &greeting,
            payer,
            GREETING_SEED,
            lamports,
            GreetingAccount::SPAN as u64,
            program_id,
        );
    Ok((greeting, instruction))
}

/// Builds system instruction transferring lamports.
pub fn fund(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    solana_system_interface::instruction::transfer(from, to, lamports)
}
