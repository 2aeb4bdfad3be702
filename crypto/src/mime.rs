//! # MIME
//!
//! Module dedicated to the MIME decryption collaborator. The library
//! does not parse MIME itself: it hands an unlocked key ring over to a
//! [`MimeDecryptor`], which reports what it finds through
//! [`MimeCallbacks`].

use std::error;

use chrono::{DateTime, Utc};
use native::SignedPublicKey;

use crate::{decrypt::SignatureStatus, keyring::KeyRing, CipherText, Error};

/// Hooks called by a [`MimeDecryptor`] while walking a decrypted MIME
/// message. Every hook does nothing by default.
pub trait MimeCallbacks {
    /// Called with the body of the message and its MIME type.
    fn on_body(&mut self, _body: &str, _mime_type: &str) {}

    /// Called once per attachment.
    fn on_attachment(&mut self, _file_name: &str, _content: &[u8]) {}

    /// Called once the signature of the message has been checked.
    fn on_verified(&mut self, _status: SignatureStatus) {}

    /// Called for every non-fatal error met while walking the message.
    fn on_error(&mut self, _err: &Error) {}
}

/// Decrypts and walks a PGP/MIME message.
pub trait MimeDecryptor {
    /// Decrypts the given message with the given key ring, checks its
    /// signature against the given keys at time `at`, and drives the
    /// callbacks.
    fn decrypt(
        &self,
        message: &CipherText,
        ring: &KeyRing,
        verification_keys: &[SignedPublicKey],
        at: DateTime<Utc>,
        callbacks: &mut dyn MimeCallbacks,
    ) -> Result<(), Box<dyn error::Error + Send + Sync>>;
}
