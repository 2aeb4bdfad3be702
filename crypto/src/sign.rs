//! Module dedicated to PGP signing.
//!
//! This module exposes a simple function [`sign`] producing armored
//! detached signatures.

use native::{crypto::hash::HashAlgorithm, Message, SignedSecretKey};

use crate::{passphrase::Passphrase, Error, Result};

/// Signs given bytes using the given secret key and its passphrase,
/// returning an armored detached signature.
pub fn sign(skey: &SignedSecretKey, passphrase: &Passphrase, plain_bytes: &[u8]) -> Result<String> {
    let msg = Message::new_literal_bytes("", plain_bytes)
        .sign(skey, passphrase.to_engine_password(), HashAlgorithm::SHA2_256)
        .map_err(Error::SignMessageError)?;

    let signature_bytes = msg
        .into_signature()
        .to_armored_bytes(None)
        .map_err(Error::ExportSignatureToArmorError)?;

    String::from_utf8(signature_bytes).map_err(Error::DecodeUtf8Error)
}
