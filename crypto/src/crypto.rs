//! # Crypto
//!
//! Module dedicated to the [`Crypto`] engine, generic over a
//! [`KeyHolder`]. It resolves the keys of the holder and their
//! passphrases, builds transient key rings out of them and runs the
//! requested operation.

use chrono::{DateTime, Utc};
use native::SignedPublicKey;
use tracing::{debug, warn};

use crate::{
    decrypt::DecryptionResult,
    holder::KeyHolder,
    key::Key,
    keyring::{KeyRing, UnlockedKey},
    trial::first_success,
    utils::{public_key_of, read_skey_from_string},
    CipherText, Error, Result,
};

/// Cryptographic operations bound to a key holder.
#[derive(Clone, Debug)]
pub struct Crypto<H> {
    holder: H,
}

impl<H: KeyHolder> Crypto<H> {
    pub fn new(holder: H) -> Self {
        Self { holder }
    }

    pub fn holder(&self) -> &H {
        &self.holder
    }

    /// Resolves the passphrase of the given key and unlocks it into a
    /// fresh key ring.
    ///
    /// The passphrase lives as long as the returned ring.
    pub fn unlock_key(&self, key: &H::Key) -> Result<KeyRing> {
        self.unlocked_key(key).map(KeyRing::from)
    }

    pub(crate) fn unlocked_key(&self, key: &H::Key) -> Result<UnlockedKey> {
        let passphrase = self.holder.passphrase_for(key)?;
        UnlockedKey::unlock(key.id().clone(), self.holder.private_key_of(key), passphrase)
    }

    /// Runs the given closure with a key ring holding the unlocked
    /// primary key only.
    pub fn with_primary_key<T>(&self, f: impl FnOnce(&KeyRing) -> Result<T>) -> Result<T> {
        let key = self
            .holder
            .primary_key()
            .ok_or_else(|| Error::FindPrimaryKeyError(self.holder.name().to_owned()))?;
        let ring = self.unlock_key(key)?;
        f(&ring)
    }

    /// Runs the given closure against each current key of the holder,
    /// in order, and returns the first success.
    ///
    /// A key failing to unlock counts as a failure of that key. Fails
    /// only when every key failed, naming the holder and the number of
    /// keys tried.
    pub fn with_current_keys<T>(
        &self,
        action: &'static str,
        mut f: impl FnMut(&KeyRing) -> Result<T>,
    ) -> Result<T> {
        let keys = self.holder.current_keys();

        first_success(keys, |key| {
            let ring = self.unlock_key(key)?;
            f(&ring)
        })
        .map_err(|failures| Error::AllKeysFailedError {
            action,
            holder: self.holder.name().to_owned(),
            count: keys.len(),
            causes: failures.causes(),
        })
    }

    /// Makes an armored detached signature of the given bytes using
    /// the primary key.
    pub fn sign(&self, data: impl AsRef<[u8]>) -> Result<String> {
        self.with_primary_key(|ring| ring.sign(data.as_ref()))
    }

    /// Encrypts the given text to the primary key of the holder,
    /// optionally signed with that same key.
    pub fn encrypt(&self, text: impl AsRef<str>, sign: bool) -> Result<CipherText> {
        self.with_primary_key(|ring| ring.encrypt("", text.as_ref().as_bytes(), sign))
    }

    /// Decrypts the given cipher text with the current keys, verifying
    /// its signature against them at the current time.
    pub fn decrypt(&self, ct: &CipherText) -> Result<DecryptionResult> {
        self.decrypt_with(ct, &self.verification_keys(), Utc::now())
    }

    /// Decrypts the given cipher text with the current keys, verifying
    /// its signature against the given keys at time `at`.
    pub fn decrypt_with(
        &self,
        ct: &CipherText,
        verification_keys: &[SignedPublicKey],
        at: DateTime<Utc>,
    ) -> Result<DecryptionResult> {
        self.with_current_keys("decrypt message", |ring| ring.decrypt(ct, verification_keys, at))
    }

    /// Derives the armored public key of the given armored private
    /// key.
    pub fn build_armored_public_key(&self, private_key: &str) -> Result<String> {
        let skey = read_skey_from_string(private_key)?;
        public_key_of(&skey)
            .to_armored_string(None)
            .map_err(Error::ExportPublicKeyToArmorError)
    }

    /// Same as [`Crypto::build_armored_public_key`], but logs the
    /// failure and returns `None` instead.
    pub fn build_armored_public_key_or_none(&self, private_key: &str) -> Option<String> {
        match self.build_armored_public_key(private_key) {
            Ok(pkey) => Some(pkey),
            Err(err) => {
                debug!(?err, "cannot build armored public key, ignoring it");
                None
            }
        }
    }

    /// Public keys of the current keys of the holder.
    ///
    /// Keys that cannot be parsed are skipped.
    pub fn verification_keys(&self) -> Vec<SignedPublicKey> {
        self.holder
            .current_keys()
            .iter()
            .filter_map(|key| match read_skey_from_string(self.holder.private_key_of(key)) {
                Ok(skey) => Some(public_key_of(&skey)),
                Err(err) => {
                    warn!(?err, "cannot read key {}, skipping it", key.id());
                    None
                }
            })
            .collect()
    }

    /// Armored public keys of the current keys of the holder.
    pub fn armored_verification_keys(&self) -> Vec<String> {
        self.verification_keys()
            .iter()
            .filter_map(|pkey| match pkey.to_armored_string(None) {
                Ok(armored) => Some(armored),
                Err(err) => {
                    warn!(?err, "cannot export public key, skipping it");
                    None
                }
            })
            .collect()
    }
}
