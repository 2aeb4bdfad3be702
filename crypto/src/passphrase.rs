//! # Passphrase
//!
//! Module dedicated to secrets unlocking private keys: the
//! [`Passphrase`] type and the [`SecretStore`] supplying the mailbox
//! passphrase of a user.

use std::{collections::HashMap, fmt};

use zeroize::Zeroizing;

use crate::Result;

/// Secret bytes unlocking a private key.
///
/// The buffer is wiped when the passphrase is dropped, whatever the
/// exit path of the code holding it.
///
/// The wipe does not reach inside the engine: its password callbacks
/// return an owned `String`, and the copy handed over on each call is
/// dropped by the engine without being zeroized.
#[derive(Clone, Eq, PartialEq)]
pub struct Passphrase(Zeroizing<Vec<u8>>);

impl Passphrase {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the passphrase, runs the given closure with it then
    /// wipes it.
    pub fn expose<T>(self, f: impl FnOnce(&[u8]) -> T) -> T {
        f(self.as_bytes())
    }

    /// Builds the password callback expected by the engine.
    ///
    /// The engine works with strings, so non UTF-8 bytes are replaced
    /// lossily. The string captured by the callback is wiped once the
    /// callback is dropped, but not the clone returned by each call.
    pub(crate) fn to_engine_password(&self) -> impl FnOnce() -> String + Clone {
        let password = Zeroizing::new(String::from_utf8_lossy(self.as_bytes()).into_owned());
        move || String::clone(&password)
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

impl From<&str> for Passphrase {
    fn from(passphrase: &str) -> Self {
        Self::new(passphrase.as_bytes())
    }
}

impl From<String> for Passphrase {
    fn from(passphrase: String) -> Self {
        Self::new(passphrase.into_bytes())
    }
}

impl From<Vec<u8>> for Passphrase {
    fn from(passphrase: Vec<u8>) -> Self {
        Self::new(passphrase)
    }
}

/// Store of mailbox passphrases.
///
/// Implementations usually keep the passphrase encrypted at rest and
/// decrypt it on demand. The library only holds the decrypted form
/// for the duration of an operation.
pub trait SecretStore: Send + Sync {
    /// Returns the mailbox passphrase of the given user, if any.
    fn mailbox_passphrase(&self, user_id: &str) -> Result<Option<Passphrase>>;
}

/// In-memory secret store.
#[derive(Clone, Debug, Default)]
pub struct MemorySecretStore {
    passphrases: HashMap<String, Passphrase>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_passphrase(
        mut self,
        user_id: impl ToString,
        passphrase: impl Into<Passphrase>,
    ) -> Self {
        self.set_passphrase(user_id, passphrase);
        self
    }

    pub fn set_passphrase(&mut self, user_id: impl ToString, passphrase: impl Into<Passphrase>) {
        self.passphrases
            .insert(user_id.to_string(), passphrase.into());
    }

    pub fn remove_passphrase(&mut self, user_id: &str) {
        self.passphrases.remove(user_id);
    }
}

impl SecretStore for MemorySecretStore {
    fn mailbox_passphrase(&self, user_id: &str) -> Result<Option<Passphrase>> {
        Ok(self.passphrases.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemorySecretStore, Passphrase, SecretStore};

    #[test]
    fn debug_is_redacted() {
        let passphrase = Passphrase::from("hunter2");
        assert_eq!(format!("{passphrase:?}"), "Passphrase(<redacted>)");
    }

    #[test]
    fn engine_password_is_lossy_utf8() {
        let password = Passphrase::from("passphrase").to_engine_password();
        assert_eq!(password.clone()(), "passphrase");
        assert_eq!(password(), "passphrase");

        let password = Passphrase::new(vec![b'a', 0xff]).to_engine_password();
        assert_eq!(password(), "a\u{fffd}");
    }

    #[test]
    fn expose_hands_bytes_over() {
        let len = Passphrase::from("secret").expose(|bytes| bytes.len());
        assert_eq!(len, 6);
    }

    #[test]
    fn memory_store() {
        let mut store = MemorySecretStore::new().with_passphrase("user", "passphrase");

        let passphrase = store.mailbox_passphrase("user").unwrap().unwrap();
        assert_eq!(passphrase.as_bytes(), b"passphrase");
        assert!(store.mailbox_passphrase("other").unwrap().is_none());

        store.remove_passphrase("user");
        assert!(store.mailbox_passphrase("user").unwrap().is_none());
    }
}
