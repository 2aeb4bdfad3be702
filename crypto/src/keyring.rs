//! # Key ring
//!
//! Module dedicated to the [`KeyRing`], a transient aggregate of
//! unlocked keys used together for an operation.
//!
//! A key ring is built on demand, never stored, and its private
//! material is cleared when it is dropped, whatever the exit path.

use chrono::{DateTime, Utc};
use native::{types::SecretKeyTrait, SignedPublicKey, SignedSecretKey};
use tracing::trace;

use crate::{
    decrypt::{decrypt_and_verify, DecryptionResult},
    encrypt::encrypt,
    key::KeyId,
    passphrase::Passphrase,
    session::{self, SessionKey},
    sign::sign,
    trial::first_success,
    utils::{public_key_of, read_skey_from_string},
    verify::verify,
    CipherText, Error, Result,
};

/// A secret key proven to be unlockable with its passphrase.
pub struct UnlockedKey {
    id: KeyId,
    skey: SignedSecretKey,
    passphrase: Passphrase,
}

impl UnlockedKey {
    /// Parses the given armored secret key and checks that the given
    /// passphrase unlocks it, together with its subkeys.
    pub fn unlock(id: KeyId, armored_key: &str, passphrase: Passphrase) -> Result<Self> {
        let skey = read_skey_from_string(armored_key)?;

        skey.unlock(passphrase.to_engine_password(), |_| Ok(()))
            .map_err(|err| Error::UnlockSecretKeyError(err, id.clone()))?;

        for subkey in &skey.secret_subkeys {
            subkey
                .key
                .unlock(passphrase.to_engine_password(), |_| Ok(()))
                .map_err(|err| Error::UnlockSecretKeyError(err, id.clone()))?;
        }

        trace!("key {id} unlocked");

        Ok(Self {
            id,
            skey,
            passphrase,
        })
    }

    pub fn id(&self) -> &KeyId {
        &self.id
    }

    pub fn public_key(&self) -> SignedPublicKey {
        public_key_of(&self.skey)
    }
}

/// Aggregate of unlocked keys.
///
/// Operations needing a single key (signing, embedded signatures) use
/// the first key of the ring.
#[derive(Default)]
pub struct KeyRing {
    keys: Vec<UnlockedKey>,
}

impl KeyRing {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &KeyId> {
        self.keys.iter().map(UnlockedKey::id)
    }

    pub fn public_keys(&self) -> Vec<SignedPublicKey> {
        self.keys.iter().map(UnlockedKey::public_key).collect()
    }

    fn first_key(&self, action: &'static str) -> Result<&UnlockedKey> {
        self.keys.first().ok_or(Error::EmptyKeyRingError(action))
    }

    /// Encrypts the given bytes to every key of the ring.
    ///
    /// The literal data carries the given file name, empty for text.
    /// When `sign` is set, the message embeds a signature made with
    /// the first key of the ring.
    pub fn encrypt(&self, file_name: &str, data: &[u8], sign: bool) -> Result<CipherText> {
        let signer = if sign {
            let key = self.first_key("sign message")?;
            Some((&key.skey, &key.passphrase))
        } else {
            None
        };

        encrypt(&self.public_keys(), file_name, data, signer)
    }

    /// Makes an armored detached signature of the given bytes using
    /// the first key of the ring.
    pub fn sign(&self, data: &[u8]) -> Result<String> {
        let key = self.first_key("sign data")?;
        sign(&key.skey, &key.passphrase, data)
    }

    /// Verifies an armored detached signature against the public keys
    /// of the ring, returning the signature creation time on success.
    pub fn verify(
        &self,
        signature: &str,
        data: &[u8],
        at: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        verify(signature, &self.public_keys(), data, at)
    }

    /// Decrypts the given cipher text with the first key of the ring
    /// able to, verifying its signature against the given keys.
    pub fn decrypt(
        &self,
        ct: &CipherText,
        verification_keys: &[SignedPublicKey],
        at: DateTime<Utc>,
    ) -> Result<DecryptionResult> {
        self.try_each_key("decrypt message", |key| {
            decrypt_and_verify(ct, &key.skey, &key.passphrase, verification_keys, at)
        })
    }

    /// Unwraps the session key of the given key packet with the first
    /// key of the ring able to.
    pub fn decrypt_session_key(&self, key_packet: &[u8]) -> Result<SessionKey> {
        self.try_each_key("decrypt session key", |key| {
            session::decrypt_session_key(key_packet, &key.skey, &key.passphrase)
        })
    }

    fn try_each_key<T>(
        &self,
        action: &'static str,
        op: impl FnMut(&UnlockedKey) -> Result<T>,
    ) -> Result<T> {
        if self.keys.is_empty() {
            return Err(Error::EmptyKeyRingError(action));
        }

        first_success(&self.keys, op).map_err(|failures| Error::AllKeysFailedError {
            action,
            holder: String::from("key ring"),
            count: failures.len(),
            causes: failures.causes(),
        })
    }

    /// Drops every unlocked key, wiping its passphrase.
    pub fn clear_private_params(&mut self) {
        if !self.keys.is_empty() {
            trace!("clearing private params of {} keys", self.keys.len());
        }
        self.keys.clear();
    }
}

impl Drop for KeyRing {
    fn drop(&mut self) {
        self.clear_private_params();
    }
}

impl From<UnlockedKey> for KeyRing {
    fn from(key: UnlockedKey) -> Self {
        Self { keys: vec![key] }
    }
}

impl FromIterator<UnlockedKey> for KeyRing {
    fn from_iter<I: IntoIterator<Item = UnlockedKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
