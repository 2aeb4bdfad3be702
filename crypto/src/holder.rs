//! # Key holder
//!
//! Module dedicated to the [`KeyHolder`] capability: what the generic
//! [`Crypto`](crate::Crypto) engine needs to know about a set of keys
//! to sign, encrypt and decrypt with them.

use crate::{key::Key, passphrase::Passphrase, Result};

/// A set of keys bound to a user or to an address.
pub trait KeyHolder {
    type Key: Key;

    /// Human-readable name of the holder, used in error messages.
    fn name(&self) -> &str;

    /// Keys currently held, in storage order.
    fn current_keys(&self) -> &[Self::Key];

    /// The primary key, if any.
    fn primary_key(&self) -> Option<&Self::Key> {
        self.current_keys().iter().find(|key| key.is_primary())
    }

    /// Resolves the passphrase unlocking the given key.
    fn passphrase_for(&self, key: &Self::Key) -> Result<Passphrase>;

    /// Armored private key of the given key.
    fn private_key_of<'a>(&self, key: &'a Self::Key) -> &'a str {
        key.private_key()
    }
}
