//! Module dedicated to PGP helpers.

use std::io::Cursor;

use native::{
    crypto::{hash::HashAlgorithm, sym::SymmetricKeyAlgorithm},
    types::{CompressionAlgorithm, SecretKeyTrait},
    Deserializable, KeyType, SecretKeyParamsBuilder, SignedPublicKey, SignedPublicSubKey,
    SignedSecretKey, StandaloneSignature, SubkeyParamsBuilder,
};
use rand::{thread_rng, RngCore};
use smallvec::smallvec;

use crate::{Error, Result};

/// Generates a new pair of secret and public keys for the given email
/// address and passphrase.
///
/// An empty passphrase leaves the secret key unprotected.
pub fn gen_key_pair(
    email: impl ToString,
    passphrase: impl ToString,
) -> Result<(SignedSecretKey, SignedPublicKey)> {
    let passphrase = passphrase.to_string();
    let passphrase = if passphrase.trim().is_empty() {
        None
    } else {
        Some(passphrase)
    };

    let key_params = SecretKeyParamsBuilder::default()
        .key_type(KeyType::EdDSA)
        .can_create_certificates(true)
        .can_sign(true)
        .primary_user_id(email.to_string())
        .passphrase(passphrase.clone())
        .preferred_symmetric_algorithms(smallvec![SymmetricKeyAlgorithm::AES256])
        .preferred_hash_algorithms(smallvec![HashAlgorithm::SHA2_256])
        .preferred_compression_algorithms(smallvec![CompressionAlgorithm::ZLIB])
        .subkey(
            SubkeyParamsBuilder::default()
                .key_type(KeyType::ECDH)
                .can_encrypt(true)
                .passphrase(passphrase.clone())
                .build()
                .map_err(Error::BuildSubkeyParamsError)?,
        )
        .build()
        .map_err(Error::BuildSecretKeyParamsError)?;

    let password = passphrase.unwrap_or_default();

    let skey = key_params
        .generate()
        .map_err(Error::GenerateSecretKeyError)?;
    let skey = skey
        .sign({
            let password = password.clone();
            move || password
        })
        .map_err(Error::SignSecretKeyError)?;
    skey.verify().map_err(Error::VerifySecretKeyError)?;

    let pkey = skey.public_key();
    let pkey = pkey
        .sign(&skey, move || password)
        .map_err(Error::SignPublicKeyError)?;
    pkey.verify().map_err(Error::VerifyPublicKeyError)?;

    Ok((skey, pkey))
}

/// Reads a signed secret key from the given armored string.
///
/// The string needs to contain a single armored secret key, otherwise
/// it fails.
pub fn read_skey_from_string(armored: &str) -> Result<SignedSecretKey> {
    let (skey, _) = SignedSecretKey::from_armor_single(Cursor::new(armored.as_bytes()))
        .map_err(Error::ParseArmoredSecretKeyError)?;
    Ok(skey)
}

/// Reads a signed public key from the given armored string.
pub fn read_pkey_from_string(armored: &str) -> Result<SignedPublicKey> {
    let (pkey, _) = SignedPublicKey::from_armor_single(Cursor::new(armored.as_bytes()))
        .map_err(Error::ParseArmoredPublicKeyError)?;
    Ok(pkey)
}

/// Reads a standalone signature from the given armored string.
pub fn read_sig_from_string(armored: &str) -> Result<StandaloneSignature> {
    let (sig, _) = StandaloneSignature::from_armor_single(Cursor::new(armored.as_bytes()))
        .map_err(Error::ImportSignatureFromArmorError)?;
    Ok(sig)
}

/// Derives the signed public key of the given secret key.
///
/// Self-signatures are carried over as they are, so the secret
/// material does not need to be unlocked.
pub fn public_key_of(skey: &SignedSecretKey) -> SignedPublicKey {
    let mut public_subkeys = skey.public_subkeys.clone();
    public_subkeys.extend(skey.secret_subkeys.iter().map(|subkey| {
        SignedPublicSubKey::new(subkey.key.public_key(), subkey.signatures.clone())
    }));

    SignedPublicKey::new(
        skey.primary_key.public_key(),
        skey.details.clone(),
        public_subkeys,
    )
}

/// Generates `len` cryptographically secure random bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0; len];
    thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use native::types::KeyTrait;

    use super::{gen_key_pair, public_key_of, random_bytes, read_pkey_from_string};

    #[test_log::test]
    fn derived_public_key_matches_generated_one() {
        let (skey, pkey) = gen_key_pair("alice@localhost", "passphrase").unwrap();

        let derived = public_key_of(&skey);
        derived.verify().unwrap();

        let armored = derived.to_armored_string(None).unwrap();
        let parsed = read_pkey_from_string(&armored).unwrap();

        assert_eq!(parsed.fingerprint(), pkey.fingerprint());
        assert_eq!(parsed.public_subkeys.len(), pkey.public_subkeys.len());
    }

    #[test]
    fn random_bytes_have_requested_length() {
        assert_eq!(random_bytes(32).len(), 32);
        assert_ne!(random_bytes(32), random_bytes(32));
    }
}
