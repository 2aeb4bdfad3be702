//! # User crypto
//!
//! Module dedicated to the account-level keys of a user. Every user
//! key is unlocked by the same mailbox passphrase, supplied by the
//! [`SecretStore`].

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::{
    decrypt::DecryptionResult,
    holder::KeyHolder,
    key::{KeyInformation, UserKey},
    passphrase::{Passphrase, SecretStore},
    verify::{verify, VerificationResult},
    CipherText, Crypto, Error, Result,
};

/// The account-level keys of a user.
#[derive(Clone)]
pub struct UserKeys {
    user_id: String,
    name: String,
    keys: Vec<UserKey>,
    secrets: Arc<dyn SecretStore>,
}

impl UserKeys {
    pub fn new(user_id: impl ToString, keys: Vec<UserKey>, secrets: Arc<dyn SecretStore>) -> Self {
        let user_id = user_id.to_string();

        Self {
            name: format!("user {user_id}"),
            user_id,
            keys,
            secrets,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Gets the mailbox passphrase of the user from the secret store.
    ///
    /// Fails when the store does not hold any passphrase for this
    /// user.
    pub fn mailbox_passphrase(&self) -> Result<Passphrase> {
        self.secrets
            .mailbox_passphrase(&self.user_id)
            .map_err(|err| Error::GetMailboxPassphraseError(Box::new(err), self.user_id.clone()))?
            .ok_or_else(|| Error::GetMailboxPassphraseNotFoundError(self.user_id.clone()))
    }
}

impl fmt::Debug for UserKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserKeys")
            .field("user_id", &self.user_id)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl KeyHolder for UserKeys {
    type Key = UserKey;

    fn name(&self) -> &str {
        &self.name
    }

    fn current_keys(&self) -> &[UserKey] {
        &self.keys
    }

    fn passphrase_for(&self, _key: &UserKey) -> Result<Passphrase> {
        self.mailbox_passphrase()
    }
}

/// Cryptographic operations bound to the keys of a user.
pub type UserCrypto = Crypto<UserKeys>;

impl Crypto<UserKeys> {
    /// Verifies an armored detached signature over `data` against the
    /// public keys of the user, at time `at`.
    ///
    /// Never fails: any error is reported as not verified.
    pub fn verify(
        &self,
        data: impl AsRef<[u8]>,
        signature: &str,
        at: DateTime<Utc>,
    ) -> VerificationResult {
        match verify(signature, &self.verification_keys(), data.as_ref(), at) {
            Ok(Some(timestamp)) => VerificationResult::verified(timestamp),
            Ok(None) => VerificationResult::not_verified(),
            Err(err) => {
                debug!(?err, "cannot verify signature");
                VerificationResult::not_verified()
            }
        }
    }

    /// Decrypts the given armored message with the keys of the user.
    ///
    /// Fails straight away when the mailbox passphrase is not
    /// available, instead of failing once per key.
    pub fn decrypt_message(&self, armored: &str) -> Result<DecryptionResult> {
        self.holder().mailbox_passphrase()?;
        let ct = CipherText::from_armored(armored)?;
        self.decrypt(&ct)
    }

    /// Derives display information out of the given armored key.
    ///
    /// Any failure results in the unknown key information.
    pub fn derive_key_info(&self, armored_key: &str) -> KeyInformation {
        match KeyInformation::from_armored(armored_key, Utc::now()) {
            Ok(info) => info,
            Err(err) => {
                trace!(?err, "cannot derive key information");
                KeyInformation::default()
            }
        }
    }
}
