//! Assembling instructions into transactions and signing them.
//!
//! An [`Envelope`] holds a message (instructions, fee payer and recent
//! blockhash) together with one signature slot per required signer.  Once
//! every slot is filled it can be turned into a [`SignedEnvelope`] which is
//! the only thing [`gateway::submit`](crate::gateway::submit) accepts.
//!
//! The blockhash bounds how long a transaction can land.  Once it expires the
//! envelope is useless and has to be assembled again with a fresh blockhash
//! and signed again.

use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::signer::signers::Signers;
use solana_sdk::transaction::Transaction;

use crate::{Error, Result};


/// How far signing of an envelope has progressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigningState {
    Unsigned,
    PartiallySigned,
    FullySigned,
}

/// A transaction being signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    tx: Transaction,
}

impl Envelope {
    /// Assembles instructions into an unsigned transaction paid for by
    /// `fee_payer` and anchored at `anchor` blockhash.
    ///
    /// Assembly is deterministic: same arguments always produce the same
    /// [`payload`](Self::payload).  Order of accounts within each instruction
    /// is preserved.
    pub fn assemble(
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        anchor: Hash,
    ) -> Self {
        let message =
            Message::new_with_blockhash(instructions, Some(fee_payer), &anchor);
        Self { tx: Transaction::new_unsigned(message) }
    }

    /// Returns the bytes the signatures cover.
    pub fn payload(&self) -> Vec<u8> { self.tx.message_data() }

    pub fn message(&self) -> &Message { &self.tx.message }

    pub fn anchor(&self) -> Hash { self.tx.message.recent_blockhash }

    pub fn fee_payer(&self) -> &Pubkey {
        // Message::new_with_blockhash always puts the payer first.
        &self.tx.message.account_keys[0]
    }

    /// Returns keys whose signatures the transaction requires, fee payer
    /// first.
    pub fn required_signers(&self) -> &[Pubkey] {
        let count = usize::from(self.tx.message.header.num_required_signatures);
        &self.tx.message.account_keys[..count]
    }

    /// Returns required signers which haven’t signed yet.
    pub fn missing_signers(&self) -> Vec<Pubkey> {
        self.required_signers()
            .iter()
            .zip(self.tx.signatures.iter())
            .filter(|(_, sig)| **sig == Signature::default())
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn state(&self) -> SigningState {
        let missing = self.missing_signers().len();
        if missing == 0 {
            SigningState::FullySigned
        } else if missing == self.required_signers().len() {
            SigningState::Unsigned
        } else {
            SigningState::PartiallySigned
        }
    }

    /// Signs the transaction with given signers.
    ///
    /// Signatures are placed by signer identity so signers may be given in any
    /// order and over multiple calls.  Fails if any of the signers isn’t
    /// required by the transaction.
    pub fn sign<T: Signers + ?Sized>(
        &mut self,
        signers: &T,
    ) -> Result<SigningState> {
        let anchor = self.anchor();
        self.tx.try_partial_sign(signers, anchor)?;
        let state = self.state();
        log::debug!("Signed by {:?}; {state:?}", signers.pubkeys());
        Ok(state)
    }

    /// Finalises signing.
    ///
    /// Fails with [`Error::MissingSignature`] if any required signer hasn’t
    /// signed and with [`Error::InvalidSignature`] if any signature doesn’t
    /// verify.
    pub fn into_signed(self) -> Result<SignedEnvelope> {
        let missing = self.missing_signers();
        if !missing.is_empty() {
            return Err(Error::MissingSignature { missing });
        }
        let signers: Vec<Pubkey> = self
            .tx
            .verify_with_results()
            .into_iter()
            .zip(self.required_signers())
            .filter(|(ok, _)| !ok)
            .map(|(_, key)| *key)
            .collect();
        if !signers.is_empty() {
            return Err(Error::InvalidSignature { signers });
        }
        Ok(SignedEnvelope { tx: self.tx })
    }

    /// Signs the transaction and finalises signing.
    pub fn signed<T: Signers + ?Sized>(
        mut self,
        signers: &T,
    ) -> Result<SignedEnvelope> {
        self.sign(signers)?;
        self.into_signed()
    }
}


/// A fully signed transaction ready for submission.
///
/// Can’t be modified.  If its blockhash expires it must be rebuilt from
/// scratch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedEnvelope {
    tx: Transaction,
}

impl SignedEnvelope {
    pub fn transaction(&self) -> &Transaction { &self.tx }

    /// Returns fee payer’s signature which identifies the transaction.
    pub fn signature(&self) -> &Signature { &self.tx.signatures[0] }

    pub fn anchor(&self) -> Hash { self.tx.message.recent_blockhash }

    pub fn payload(&self) -> Vec<u8> { self.tx.message_data() }
}


#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use solana_sdk::instruction::AccountMeta;
    use solana_sdk::signer::keypair::Keypair;
    use solana_sdk::signer::{Signer, SignerError};

    use super::*;

    fn instruction(accounts: Vec<AccountMeta>) -> Instruction {
        Instruction {
            program_id: Pubkey::new_from_array([42; 32]),
            accounts,
            data: vec![1],
        }
    }

    /// Returns keys of the accounts passed to the first instruction, in the
    /// order the program sees them.
    fn instruction_keys(message: &Message) -> Vec<Pubkey> {
        message.instructions[0]
            .accounts
            .iter()
            .map(|&idx| message.account_keys[usize::from(idx)])
            .collect()
    }

    #[test]
    fn test_deterministic_payload() {
        let payer = Pubkey::new_unique();
        let user = Pubkey::new_unique();
        let ixs = [instruction(vec![
            AccountMeta::new(Pubkey::new_unique(), false),
            AccountMeta::new(user, true),
        ])];
        let anchor = Hash::new_unique();
        let first = Envelope::assemble(&ixs, &payer, anchor);
        let second = Envelope::assemble(&ixs, &payer, anchor);
        assert_eq!(first.payload(), second.payload());
        assert_eq!(first, second);

        let other = Envelope::assemble(&ixs, &payer, Hash::new_unique());
        assert_ne!(first.payload(), other.payload());
    }

    #[test]
    fn test_account_order_preserved() {
        // Keys chosen so that sorting by writability, signer flag or key
        // would each produce a different order.
        let keys = [
            Pubkey::new_from_array([9; 32]),
            Pubkey::new_from_array([1; 32]),
            Pubkey::new_from_array([5; 32]),
            Pubkey::new_from_array([3; 32]),
        ];
        let payer = Keypair::new();
        let ix = instruction(vec![
            AccountMeta::new_readonly(keys[0], false),
            AccountMeta::new(keys[1], false),
            AccountMeta::new_readonly(keys[2], true),
            AccountMeta::new(keys[3], true),
        ]);
        let envelope = Envelope::assemble(
            core::slice::from_ref(&ix),
            &payer.pubkey(),
            Hash::new_unique(),
        );
        assert_eq!(keys.to_vec(), instruction_keys(envelope.message()));

        // Walk the serialised message: header, account keys, blockhash and
        // then the instruction.  All lengths fit in a single compact-u16 byte.
        let payload = envelope.payload();
        let num_keys = usize::from(payload[3]);
        let account_keys: Vec<Pubkey> = payload[4..4 + num_keys * 32]
            .chunks(32)
            .map(|chunk| Pubkey::try_from(chunk).unwrap())
            .collect();
        let at = 4 + num_keys * 32 + 32;
        assert_eq!(1, payload[at]);
        let num_accounts = usize::from(payload[at + 2]);
        let indices = &payload[at + 3..at + 3 + num_accounts];
        let got: Vec<Pubkey> = indices
            .iter()
            .map(|&idx| account_keys[usize::from(idx)])
            .collect();
        assert_eq!(keys.to_vec(), got);
        let at = at + 3 + num_accounts;
        assert_eq!(&[1, 1][..], &payload[at..]);
        assert_eq!(ix.data, envelope.message().instructions[0].data);
    }

    #[test]
    fn test_required_signers() {
        let payer = Pubkey::new_unique();
        let user = Pubkey::new_unique();
        let ix = instruction(vec![
            AccountMeta::new(Pubkey::new_unique(), false),
            AccountMeta::new_readonly(user, true),
        ]);
        let envelope = Envelope::assemble(&[ix], &payer, Hash::new_unique());
        assert_eq!(&payer, envelope.fee_payer());
        assert_eq!(&[payer, user][..], envelope.required_signers());
        assert_eq!(vec![payer, user], envelope.missing_signers());
        assert_eq!(SigningState::Unsigned, envelope.state());
    }

    #[test]
    fn test_missing_signature() {
        let payer = Keypair::new();
        let user = Keypair::new();
        let ix = instruction(vec![AccountMeta::new(user.pubkey(), true)]);
        let mut envelope =
            Envelope::assemble(&[ix], &payer.pubkey(), Hash::new_unique());

        let state = envelope.sign(&[&payer]).unwrap();
        assert_eq!(SigningState::PartiallySigned, state);
        assert_eq!(vec![user.pubkey()], envelope.missing_signers());
        assert_matches!(
            envelope.into_signed(),
            Err(Error::MissingSignature { missing })
                if missing == vec![user.pubkey()]
        );
    }

    #[test]
    fn test_sign_order_irrelevant() {
        let payer = Keypair::new();
        let user = Keypair::new();
        let ix = instruction(vec![AccountMeta::new(user.pubkey(), true)]);
        let anchor = Hash::new_unique();

        let mut first = Envelope::assemble(
            core::slice::from_ref(&ix),
            &payer.pubkey(),
            anchor,
        );
        first.sign(&[&user]).unwrap();
        assert_eq!(SigningState::FullySigned, first.sign(&[&payer]).unwrap());

        let second = Envelope::assemble(&[ix], &payer.pubkey(), anchor)
            .signed(&[&user, &payer])
            .unwrap();

        let first = first.into_signed().unwrap();
        assert_eq!(first, second);
        assert_eq!(payer.sign_message(&first.payload()), *first.signature());
        assert!(first.transaction().verify().is_ok());
    }

    /// Signer which signs something other than the message it’s given.
    struct WrongBytes(Keypair);

    impl Signer for WrongBytes {
        fn try_pubkey(&self) -> Result<Pubkey, SignerError> {
            self.0.try_pubkey()
        }

        fn try_sign_message(
            &self,
            _message: &[u8],
        ) -> Result<Signature, SignerError> {
            self.0.try_sign_message(b"not the message")
        }

        fn is_interactive(&self) -> bool { false }
    }

    #[test]
    fn test_invalid_signature() {
        let payer = Keypair::new();
        let user = WrongBytes(Keypair::new());
        let ix = instruction(vec![AccountMeta::new(user.pubkey(), true)]);
        let mut envelope =
            Envelope::assemble(&[ix], &payer.pubkey(), Hash::new_unique());

        envelope.sign(&[&payer]).unwrap();
        let user_signers: &[&dyn Signer] = &[&user];
        let state = envelope.sign(user_signers).unwrap();
        assert_eq!(SigningState::FullySigned, state);
        assert_matches!(
            envelope.into_signed(),
            Err(Error::InvalidSignature { signers })
                if signers == vec![user.pubkey()]
        );
    }

    #[test]
    fn test_unexpected_signer() {
        let payer = Keypair::new();
        let stranger = Keypair::new();
        let ix = instruction(Vec::new());
        let mut envelope =
            Envelope::assemble(&[ix], &payer.pubkey(), Hash::new_unique());
        assert_matches!(
            envelope.sign(&[&stranger]),
            Err(Error::Signer(SignerError::KeypairPubkeyMismatch))
        );
        assert_eq!(SigningState::Unsigned, envelope.state());
    }
}
