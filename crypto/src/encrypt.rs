//! # Encrypt
//!
//! Module dedicated to PGP encryption. This module exposes
//! [`encrypt`] (to public keys, optionally signed) and
//! [`encrypt_with_password`].

use std::{io, iter};

use native::{
    crypto::{hash::HashAlgorithm, public_key::PublicKeyAlgorithm, sym::SymmetricKeyAlgorithm},
    types::{CompressionAlgorithm, KeyId, KeyTrait, Mpi, PublicKeyTrait, StringToKey},
    Message, SignedPublicKey, SignedPublicSubKey, SignedSecretKey,
};
use rand::{thread_rng, CryptoRng, Rng};

use crate::{passphrase::Passphrase, CipherText, Error, Result};

/// Wrapper around [`native`] public key types.
///
/// This enum is used to find the right encryption-capable public
/// (sub)key, and to verify signatures made by subkeys.
#[derive(Debug)]
pub enum SignedPublicKeyOrSubkey<'a> {
    Key(&'a SignedPublicKey),
    Subkey(&'a SignedPublicSubKey),
}

impl KeyTrait for SignedPublicKeyOrSubkey<'_> {
    fn fingerprint(&self) -> Vec<u8> {
        match self {
            Self::Key(k) => k.fingerprint(),
            Self::Subkey(k) => k.fingerprint(),
        }
    }

    fn key_id(&self) -> KeyId {
        match self {
            Self::Key(k) => k.key_id(),
            Self::Subkey(k) => k.key_id(),
        }
    }

    fn algorithm(&self) -> PublicKeyAlgorithm {
        match self {
            Self::Key(k) => k.algorithm(),
            Self::Subkey(k) => k.algorithm(),
        }
    }
}

impl PublicKeyTrait for SignedPublicKeyOrSubkey<'_> {
    fn verify_signature(
        &self,
        hash: HashAlgorithm,
        data: &[u8],
        sig: &[Mpi],
    ) -> native::errors::Result<()> {
        match self {
            Self::Key(k) => k.verify_signature(hash, data, sig),
            Self::Subkey(k) => k.verify_signature(hash, data, sig),
        }
    }

    fn encrypt<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
        plain: &[u8],
    ) -> native::errors::Result<Vec<Mpi>> {
        match self {
            Self::Key(k) => k.encrypt(rng, plain),
            Self::Subkey(k) => k.encrypt(rng, plain),
        }
    }

    fn to_writer_old(&self, writer: &mut impl io::Write) -> native::errors::Result<()> {
        match self {
            Self::Key(k) => k.to_writer_old(writer),
            Self::Subkey(k) => k.to_writer_old(writer),
        }
    }
}

/// Finds the primary key or subkey to use for encryption.
///
/// The primary key is used when it can encrypt, otherwise the first
/// encryption-capable subkey. Returns `None` if the public key cannot
/// be used for encryption.
pub(crate) fn find_pkey_for_encryption(
    key: &SignedPublicKey,
) -> Option<SignedPublicKeyOrSubkey<'_>> {
    if key.is_encryption_key() {
        Some(SignedPublicKeyOrSubkey::Key(key))
    } else {
        key.public_subkeys
            .iter()
            .find(|subkey| subkey.is_encryption_key())
            .map(SignedPublicKeyOrSubkey::Subkey)
    }
}

/// Lists the primary key and every subkey of the given public key,
/// as signature verification candidates.
pub(crate) fn pkey_and_subkeys(
    pkey: &SignedPublicKey,
) -> impl Iterator<Item = SignedPublicKeyOrSubkey<'_>> {
    iter::once(SignedPublicKeyOrSubkey::Key(pkey)).chain(
        pkey.public_subkeys
            .iter()
            .map(SignedPublicKeyOrSubkey::Subkey),
    )
}

/// Encrypts given bytes using the given list of public keys.
///
/// The literal data carries the given file name (empty for text
/// messages). When a signer is given, the message embeds a signature
/// made with that secret key.
pub fn encrypt(
    pkeys: &[SignedPublicKey],
    file_name: &str,
    plain_bytes: &[u8],
    signer: Option<(&SignedSecretKey, &Passphrase)>,
) -> Result<CipherText> {
    let mut rng = thread_rng();

    let pkeys: Vec<SignedPublicKeyOrSubkey> =
        pkeys.iter().filter_map(find_pkey_for_encryption).collect();
    if pkeys.is_empty() {
        return Err(Error::FindEncryptionKeyError);
    }
    let pkeys_refs: Vec<&SignedPublicKeyOrSubkey> = pkeys.iter().collect();

    let mut msg = Message::new_literal_bytes(file_name, plain_bytes);

    if let Some((skey, passphrase)) = signer {
        msg = msg
            .sign(skey, passphrase.to_engine_password(), HashAlgorithm::SHA2_256)
            .map_err(Error::SignMessageError)?;
    }

    let msg = msg
        .compress(CompressionAlgorithm::ZLIB)
        .map_err(Error::CompressMessageError)?
        .encrypt_to_keys(&mut rng, SymmetricKeyAlgorithm::AES256, &pkeys_refs)
        .map_err(Error::EncryptMessageError)?;

    CipherText::from_message(&msg)
}

/// Encrypts given bytes using the given password.
pub fn encrypt_with_password(password: &Passphrase, plain_bytes: &[u8]) -> Result<CipherText> {
    let mut rng = thread_rng();
    let s2k = StringToKey::new_default(&mut rng);

    let msg = Message::new_literal_bytes("", plain_bytes)
        .compress(CompressionAlgorithm::ZLIB)
        .map_err(Error::CompressMessageError)?
        .encrypt_with_password(
            &mut rng,
            s2k,
            SymmetricKeyAlgorithm::AES256,
            password.to_engine_password(),
        )
        .map_err(Error::EncryptMessageWithPasswordError)?;

    CipherText::from_message(&msg)
}

#[cfg(test)]
mod tests {
    use super::{encrypt, encrypt_with_password, find_pkey_for_encryption};
    use crate::{
        decrypt::{decrypt, decrypt_with_password},
        utils::gen_key_pair,
        Error, Passphrase,
    };

    #[test_log::test]
    fn encrypt_then_decrypt() {
        let (alice_skey, alice_pkey) = gen_key_pair("alice@localhost", "").unwrap();
        let (bob_skey, bob_pkey) = gen_key_pair("bob@localhost", "").unwrap();
        let (carl_skey, _carl_pkey) = gen_key_pair("carl@localhost", "").unwrap();
        let passphrase = Passphrase::from("");

        let msg = b"encrypted message";
        let encrypted_msg = encrypt(&[alice_pkey, bob_pkey], "", msg, None).unwrap();

        let alice_msg = decrypt(&encrypted_msg, &alice_skey, &passphrase).unwrap();
        assert_eq!(alice_msg.data(), msg);

        let bob_msg = decrypt(&encrypted_msg, &bob_skey, &passphrase).unwrap();
        assert_eq!(bob_msg.data(), msg);

        let carl_err = decrypt(&encrypted_msg, &carl_skey, &passphrase).unwrap_err();
        assert!(matches!(
            carl_err,
            Error::DecryptMessageError(native::errors::Error::MissingKey),
        ));
    }

    #[test_log::test]
    fn encryption_key_is_the_ecdh_subkey() {
        let (_skey, pkey) = gen_key_pair("alice@localhost", "").unwrap();
        assert!(matches!(
            find_pkey_for_encryption(&pkey),
            Some(super::SignedPublicKeyOrSubkey::Subkey(_)),
        ));
    }

    #[test_log::test]
    fn encrypt_then_decrypt_with_password() {
        let password = Passphrase::from("password");
        let encrypted_msg = encrypt_with_password(&password, b"secret").unwrap();

        let plain = decrypt_with_password(&encrypted_msg, &password).unwrap();
        assert_eq!(plain, b"secret");

        let wrong = Passphrase::from("wrong");
        assert!(decrypt_with_password(&encrypted_msg, &wrong).is_err());
    }
}
