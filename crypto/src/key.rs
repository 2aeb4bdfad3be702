//! # Key
//!
//! Module dedicated to the key material handled by the library: user
//! keys, address keys and the read-only [`KeyInformation`] derived
//! from them.
//!
//! Keys are owned by the caller (usually a user or address model
//! loaded from storage) and are only borrowed by [`Crypto`] for the
//! duration of an operation.
//!
//! [`Crypto`]: crate::Crypto

use std::fmt;

use chrono::{DateTime, Utc};
use native::{types::KeyTrait, SignedPublicKey};

use crate::{
    utils::{public_key_of, read_pkey_from_string, read_skey_from_string},
    Error, Result,
};

/// The unique identifier of a key.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct KeyId(String);

impl KeyId {
    pub fn new(id: impl ToString) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for KeyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for KeyId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Common view over user and address keys.
pub trait Key {
    /// The unique identifier of the key.
    fn id(&self) -> &KeyId;

    /// The armored, passphrase-protected private key.
    fn private_key(&self) -> &str;

    /// Whether the key is the primary key of its holder.
    fn is_primary(&self) -> bool;

    /// Whether the key is flagged as active.
    fn is_active(&self) -> bool;
}

/// Account-level key, unlocked by the mailbox passphrase.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct UserKey {
    pub id: KeyId,
    pub private_key: String,
    pub primary: bool,
    pub active: bool,
}

impl UserKey {
    /// Creates an active, non-primary user key.
    pub fn new(id: impl Into<KeyId>, private_key: impl ToString) -> Self {
        Self {
            id: id.into(),
            private_key: private_key.to_string(),
            primary: false,
            active: true,
        }
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

impl Key for UserKey {
    fn id(&self) -> &KeyId {
        &self.id
    }

    fn private_key(&self) -> &str {
        &self.private_key
    }

    fn is_primary(&self) -> bool {
        self.primary
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Address-level key.
///
/// Modern address keys carry a token (an armored message encrypted to
/// one of the user keys) and the detached signature of that token.
/// The decrypted token is the passphrase of the key. Legacy address
/// keys carry neither and share the mailbox passphrase.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct AddressKey {
    pub id: KeyId,
    pub private_key: String,
    pub token: Option<String>,
    pub signature: Option<String>,
    pub primary: bool,
    pub active: bool,
}

impl AddressKey {
    /// Creates an active, non-primary legacy address key.
    pub fn new(id: impl Into<KeyId>, private_key: impl ToString) -> Self {
        Self {
            id: id.into(),
            private_key: private_key.to_string(),
            token: None,
            signature: None,
            primary: false,
            active: true,
        }
    }

    pub fn with_token(mut self, token: impl ToString, signature: impl ToString) -> Self {
        self.token = Some(token.to_string());
        self.signature = Some(signature.to_string());
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Returns the token and its signature, only when both are set.
    pub fn token_pair(&self) -> Option<(&str, &str)> {
        match (&self.token, &self.signature) {
            (Some(token), Some(signature)) => Some((token, signature)),
            _ => None,
        }
    }
}

impl Key for AddressKey {
    fn id(&self) -> &KeyId {
        &self.id
    }

    fn private_key(&self) -> &str {
        &self.private_key
    }

    fn is_primary(&self) -> bool {
        self.primary
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Read-only summary of a key, used for display and diagnostics.
///
/// The default value stands for an unknown key.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyInformation {
    /// Lowercase hexadecimal fingerprint of the primary key.
    pub fingerprint: Option<String>,
    /// Armored public counterpart of the key.
    pub public_key: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the primary key or one of its subkeys can encrypt.
    pub can_encrypt: bool,
    pub is_expired: bool,
}

impl KeyInformation {
    /// Derives information from an armored secret or public key,
    /// evaluating the expiration against `now`.
    pub fn from_armored(armored_key: &str, now: DateTime<Utc>) -> Result<Self> {
        let pkey = match read_skey_from_string(armored_key) {
            Ok(skey) => public_key_of(&skey),
            Err(_) => read_pkey_from_string(armored_key)?,
        };

        Self::from_public_key(&pkey, now)
    }

    pub fn from_public_key(pkey: &SignedPublicKey, now: DateTime<Utc>) -> Result<Self> {
        let fingerprint = pkey
            .fingerprint()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<String>();

        let public_key = pkey
            .to_armored_string(None)
            .map_err(Error::ExportPublicKeyToArmorError)?;

        let expires_at = pkey.expires_at();
        let is_expired = expires_at.is_some_and(|expires_at| expires_at <= now);

        let can_encrypt = pkey.is_encryption_key()
            || pkey
                .public_subkeys
                .iter()
                .any(|subkey| subkey.is_encryption_key());

        Ok(Self {
            fingerprint: Some(fingerprint),
            public_key: Some(public_key),
            created_at: Some(*pkey.primary_key.created_at()),
            expires_at,
            can_encrypt,
            is_expired,
        })
    }

    /// Whether this is the unknown sentinel.
    pub fn is_unknown(&self) -> bool {
        self.fingerprint.is_none()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{AddressKey, KeyInformation};
    use crate::utils::gen_key_pair;

    #[test]
    fn token_pair_requires_both_halves() {
        let key = AddressKey::new("key", "armored");
        assert_eq!(key.token_pair(), None);

        let mut key = key.with_token("token", "signature");
        assert_eq!(key.token_pair(), Some(("token", "signature")));

        key.signature = None;
        assert_eq!(key.token_pair(), None);
    }

    #[test_log::test]
    fn key_information_from_secret_key() {
        let (skey, pkey) = gen_key_pair("alice@localhost", "").unwrap();
        let armored = skey.to_armored_string(None).unwrap();

        let info = KeyInformation::from_armored(&armored, Utc::now()).unwrap();

        assert!(!info.is_unknown());
        assert!(info.can_encrypt);
        assert!(!info.is_expired);
        assert_eq!(info.expires_at, None);

        let from_pkey =
            KeyInformation::from_armored(&pkey.to_armored_string(None).unwrap(), Utc::now())
                .unwrap();
        assert_eq!(info.fingerprint, from_pkey.fingerprint);
    }

    #[test]
    fn key_information_from_garbage() {
        assert!(KeyInformation::from_armored("garbage", Utc::now()).is_err());
        assert!(KeyInformation::default().is_unknown());
    }
}
