//! # Decrypt
//!
//! Module dedicated to PGP decryption. This module exposes
//! [`decrypt`], [`decrypt_and_verify`] and [`decrypt_with_password`],
//! together with the [`DecryptionResult`] they produce.

use chrono::{DateTime, Utc};
use native::{Message, SignedPublicKey, SignedSecretKey};
use tracing::trace;

use crate::{
    encrypt::pkey_and_subkeys, passphrase::Passphrase, verify::is_within_validity, CipherText,
    Error, Result,
};

/// Signature state of a decrypted message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum SignatureStatus {
    /// The message does not carry any signature.
    #[default]
    NotSigned,
    /// The message is signed but no verification key was given.
    NotVerified,
    /// The signature verifies against one of the verification keys.
    Valid,
    /// The signature does not verify against any verification key, or
    /// was made outside of the key validity window.
    Invalid,
}

/// A decrypted message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptionResult {
    data: Vec<u8>,
    signature: SignatureStatus,
}

impl DecryptionResult {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Decodes the content as UTF-8 text.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.data.clone()).map_err(Error::DecodeUtf8Error)
    }

    pub fn signature(&self) -> SignatureStatus {
        self.signature
    }

    pub fn is_signed(&self) -> bool {
        self.signature != SignatureStatus::NotSigned
    }

    pub fn has_valid_signature(&self) -> bool {
        self.signature == SignatureStatus::Valid
    }

    pub fn has_invalid_signature(&self) -> bool {
        self.signature == SignatureStatus::Invalid
    }
}

/// Decrypts the given cipher text using the given secret key and its
/// passphrase, without verifying its signature.
pub fn decrypt(
    ct: &CipherText,
    skey: &SignedSecretKey,
    passphrase: &Passphrase,
) -> Result<DecryptionResult> {
    decrypt_and_verify(ct, skey, passphrase, &[], Utc::now())
}

/// Decrypts the given cipher text, then checks its embedded signature
/// against the given verification keys at time `at`.
pub fn decrypt_and_verify(
    ct: &CipherText,
    skey: &SignedSecretKey,
    passphrase: &Passphrase,
    verification_keys: &[SignedPublicKey],
    at: DateTime<Utc>,
) -> Result<DecryptionResult> {
    let msg = ct.to_message()?;
    let (decryptor, _) = msg
        .decrypt(passphrase.to_engine_password(), &[skey])
        .map_err(Error::DecryptMessageError)?;
    let msgs = decryptor
        .collect::<native::errors::Result<Vec<_>>>()
        .map_err(Error::DecryptMessageError)?;
    let msg = msgs.into_iter().next().ok_or(Error::GetMessageEmptyError)?;
    let msg = msg.decompress().map_err(Error::DecompressMessageError)?;

    let data = msg
        .get_content()
        .map_err(Error::GetMessageContentError)?
        .ok_or(Error::GetMessageContentEmptyError)?;

    let signature = signature_status(&msg, verification_keys, at);

    Ok(DecryptionResult { data, signature })
}

/// Decrypts the given cipher text using the given password.
pub fn decrypt_with_password(ct: &CipherText, password: &Passphrase) -> Result<Vec<u8>> {
    let msg = ct.to_message()?;
    let decryptor = msg
        .decrypt_with_password(password.to_engine_password())
        .map_err(Error::DecryptMessageWithPasswordError)?;
    let msgs = decryptor
        .collect::<native::errors::Result<Vec<_>>>()
        .map_err(Error::DecryptMessageWithPasswordError)?;
    let msg = msgs.into_iter().next().ok_or(Error::GetMessageEmptyError)?;
    let msg = msg.decompress().map_err(Error::DecompressMessageError)?;

    msg.get_content()
        .map_err(Error::GetMessageContentError)?
        .ok_or(Error::GetMessageContentEmptyError)
}

fn signature_status(
    msg: &Message,
    pkeys: &[SignedPublicKey],
    at: DateTime<Utc>,
) -> SignatureStatus {
    let Message::Signed { signature, .. } = msg else {
        return SignatureStatus::NotSigned;
    };

    if pkeys.is_empty() {
        return SignatureStatus::NotVerified;
    }

    let verified = pkeys.iter().any(|pkey| {
        let verified = pkey_and_subkeys(pkey).any(|key| match msg.verify(&key) {
            Ok(()) => true,
            Err(err) => {
                trace!(?err, "embedded signature does not verify against key or subkey");
                false
            }
        });
        verified && is_within_validity(signature, pkey, at)
    });

    if verified {
        SignatureStatus::Valid
    } else {
        SignatureStatus::Invalid
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{decrypt, decrypt_and_verify, SignatureStatus};
    use crate::{encrypt::encrypt, utils::gen_key_pair, Passphrase};

    #[test_log::test]
    fn signed_message_status() {
        let (alice_skey, alice_pkey) = gen_key_pair("alice@localhost", "").unwrap();
        let (_bob_skey, bob_pkey) = gen_key_pair("bob@localhost", "").unwrap();
        let passphrase = Passphrase::from("");

        let ct = encrypt(
            &[alice_pkey.clone()],
            "",
            b"signed message",
            Some((&alice_skey, &passphrase)),
        )
        .unwrap();
        let now = Utc::now() + Duration::seconds(1);

        let msg = decrypt(&ct, &alice_skey, &passphrase).unwrap();
        assert_eq!(msg.signature(), SignatureStatus::NotVerified);
        assert!(msg.is_signed());

        let msg =
            decrypt_and_verify(&ct, &alice_skey, &passphrase, &[alice_pkey.clone()], now).unwrap();
        assert!(msg.has_valid_signature());
        assert_eq!(msg.text().unwrap(), "signed message");

        let msg = decrypt_and_verify(&ct, &alice_skey, &passphrase, &[bob_pkey], now).unwrap();
        assert!(msg.has_invalid_signature());

        let past = Utc::now() - Duration::days(365 * 10);
        let msg = decrypt_and_verify(&ct, &alice_skey, &passphrase, &[alice_pkey], past).unwrap();
        assert!(msg.has_invalid_signature());
    }

    #[test_log::test]
    fn unsigned_message_status() {
        let (skey, pkey) = gen_key_pair("alice@localhost", "").unwrap();
        let passphrase = Passphrase::from("");

        let ct = encrypt(&[pkey.clone()], "", b"message", None).unwrap();
        let msg = decrypt_and_verify(&ct, &skey, &passphrase, &[pkey], Utc::now()).unwrap();

        assert_eq!(msg.signature(), SignatureStatus::NotSigned);
        assert!(!msg.is_signed());
    }
}
