//! Contents of accounts owned by the greeter program.

use solana_program::pubkey::Pubkey;

use crate::gateway::Ledger;
use crate::layout::Layout;
use crate::{Error, Result};

crate::layout! {
    /// State stored in a greeting account.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct GreetingAccount {
        /// Number of times the account has been greeted.
        pub counter: u32,
        /// Number the program derived from the slot of the last greeting.
        pub randnum: u32,
    }
}

/// Reads and decodes state of an account.
///
/// Fails with [`Error::AccountNotFound`] if the account doesn’t exist and with
/// [`Error::Layout`] if its data doesn’t have `T`’s layout.
pub fn read_state<T: Layout>(
    ledger: &(impl Ledger + ?Sized),
    key: &Pubkey,
) -> Result<T> {
    let data = ledger.account_data(key)?.ok_or(Error::AccountNotFound(*key))?;
    Ok(T::decode(&data)?)
}

/// Returns lamports an account holding `T` needs to be rent exempt.
pub fn rent_exempt_balance<T: Layout>(
    ledger: &(impl Ledger + ?Sized),
) -> Result<u64> {
    ledger.minimum_balance(T::SPAN)
}
