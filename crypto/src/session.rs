//! # Session key
//!
//! Module dedicated to session keys, the symmetric keys encrypting
//! the data packet of a message. Session keys are wrapped into key
//! packets, either for a public key or for a password, so that an
//! attachment can be shared without encrypting its data again.

use std::{fmt, io::Cursor};

use native::{
    crypto::{checksum, ecdh, rsa, sym::SymmetricKeyAlgorithm},
    packet::{Packet, PacketParser, PublicKeyEncryptedSessionKey, SymKeyEncryptedSessionKey},
    ser::Serialize,
    types::{KeyTrait, Mpi, SecretKeyRepr, SecretKeyTrait, StringToKey},
    Esk, SignedPublicKey, SignedSecretKey,
};
use rand::thread_rng;
use tracing::trace;
use zeroize::Zeroizing;

use crate::{encrypt::find_pkey_for_encryption, passphrase::Passphrase, Error, Result};

/// Symmetric key of a message, wiped on drop.
#[derive(Clone)]
pub struct SessionKey {
    algorithm: SymmetricKeyAlgorithm,
    key: Zeroizing<Vec<u8>>,
}

impl SessionKey {
    pub fn new(algorithm: SymmetricKeyAlgorithm, key: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            key: Zeroizing::new(key.into()),
        }
    }

    /// Generates a random session key for the given algorithm.
    pub fn generate(algorithm: SymmetricKeyAlgorithm) -> Self {
        Self::new(algorithm, algorithm.new_session_key(&mut thread_rng()))
    }

    pub fn algorithm(&self) -> SymmetricKeyAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.key == other.key
    }
}

impl Eq for SessionKey {}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("algorithm", &self.algorithm)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Wraps the session key for the given public key, returning the key
/// packet bytes.
pub fn encrypt_session_key(session_key: &SessionKey, pkey: &SignedPublicKey) -> Result<Vec<u8>> {
    let pkey = find_pkey_for_encryption(pkey).ok_or(Error::FindEncryptionKeyError)?;

    let pkesk = PublicKeyEncryptedSessionKey::from_session_key(
        &mut thread_rng(),
        session_key.as_bytes(),
        session_key.algorithm(),
        &pkey,
    )
    .map_err(Error::EncryptSessionKeyError)?;

    Esk::PublicKeyEncryptedSessionKey(pkesk)
        .to_bytes()
        .map_err(Error::ExportPacketError)
}

/// Wraps the session key for the given password, returning the key
/// packet bytes.
pub fn encrypt_session_key_with_password(
    session_key: &SessionKey,
    password: &Passphrase,
) -> Result<Vec<u8>> {
    let s2k = StringToKey::new_default(&mut thread_rng());

    let skesk = SymKeyEncryptedSessionKey::encrypt(
        password.to_engine_password(),
        session_key.as_bytes(),
        s2k,
        session_key.algorithm(),
    )
    .map_err(Error::EncryptSessionKeyWithPasswordError)?;

    Esk::SymKeyEncryptedSessionKey(skesk)
        .to_bytes()
        .map_err(Error::ExportPacketError)
}

/// Unwraps the session key of the given key packet(s) using the given
/// secret key and its passphrase.
///
/// The key packet addressed to the primary key or to one of the
/// secret subkeys is used. Fails when none of them is addressed to
/// this secret key.
pub fn decrypt_session_key(
    key_packet: &[u8],
    skey: &SignedSecretKey,
    passphrase: &Passphrase,
) -> Result<SessionKey> {
    for packet in PacketParser::new(Cursor::new(key_packet)) {
        let packet = packet.map_err(Error::ParseKeyPacketError)?;
        let Packet::PublicKeyEncryptedSessionKey(pkesk) = packet else {
            continue;
        };

        let unwrapped = if pkesk.id() == &skey.primary_key.key_id() {
            unwrap_session_key(&skey.primary_key, passphrase, pkesk.mpis())
        } else if let Some(subkey) = skey
            .secret_subkeys
            .iter()
            .find(|subkey| pkesk.id() == &subkey.key.key_id())
        {
            unwrap_session_key(&subkey.key, passphrase, pkesk.mpis())
        } else {
            trace!("key packet addressed to another key, skipping it");
            continue;
        };

        return unwrapped.map_err(Error::DecryptSessionKeyError);
    }

    Err(Error::FindKeyPacketError)
}

/// Unlocks the given secret key and decrypts the session key out of
/// the given key packet values.
///
/// The decrypted value is made of the algorithm identifier, the key
/// itself then a two-octet checksum of the key.
fn unwrap_session_key(
    key: &(impl SecretKeyTrait + KeyTrait),
    passphrase: &Passphrase,
    mpis: &[Mpi],
) -> native::errors::Result<SessionKey> {
    let mut session_key = None;

    key.unlock(passphrase.to_engine_password(), |repr| {
        let decrypted = Zeroizing::new(match repr {
            SecretKeyRepr::RSA(k) => rsa::decrypt(k, mpis, &key.fingerprint())?,
            SecretKeyRepr::ECDH(k) => ecdh::decrypt(k, mpis, &key.fingerprint())?,
            _ => {
                return Err(native::errors::Error::Unsupported(String::from(
                    "signing key cannot decrypt session keys",
                )))
            }
        });

        let (&id, rest) = decrypted
            .split_first()
            .ok_or_else(|| invalid_session_key("session key is empty"))?;
        let algorithm =
            symmetric_algorithm(id).ok_or_else(|| invalid_session_key("invalid algorithm"))?;

        let key_len = match repr {
            SecretKeyRepr::ECDH(_) => rest.len().checked_sub(2),
            _ => Some(algorithm.key_size()),
        }
        .filter(|len| len + 2 <= rest.len())
        .ok_or_else(|| invalid_session_key("session key is truncated"))?;

        let (k, sum) = rest.split_at(key_len);
        checksum::simple(sum, k)?;

        session_key = Some(SessionKey::new(algorithm, k));
        Ok(())
    })?;

    session_key.ok_or_else(|| invalid_session_key("secret key did not unlock"))
}

fn invalid_session_key(reason: &str) -> native::errors::Error {
    native::errors::Error::Message(format!("cannot decode session key: {reason}"))
}

fn symmetric_algorithm(id: u8) -> Option<SymmetricKeyAlgorithm> {
    use SymmetricKeyAlgorithm::*;

    [
        IDEA,
        TripleDES,
        CAST5,
        Blowfish,
        AES128,
        AES192,
        AES256,
        Twofish,
        Camellia128,
        Camellia192,
        Camellia256,
    ]
    .into_iter()
    .find(|alg| *alg as u8 == id)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use native::{
        crypto::sym::SymmetricKeyAlgorithm,
        packet::{Packet, PacketParser},
    };

    use super::{
        decrypt_session_key, encrypt_session_key, encrypt_session_key_with_password,
        symmetric_algorithm, SessionKey,
    };
    use crate::{
        decrypt::decrypt, encrypt::encrypt, utils::gen_key_pair, CipherText, Error, Passphrase,
    };

    #[test_log::test]
    fn wrap_then_unwrap() {
        let (skey, pkey) = gen_key_pair("alice@localhost", "").unwrap();
        let (other_skey, _other_pkey) = gen_key_pair("bob@localhost", "").unwrap();
        let passphrase = Passphrase::from("");
        let session_key = SessionKey::generate(SymmetricKeyAlgorithm::AES256);

        let key_packet = encrypt_session_key(&session_key, &pkey).unwrap();
        let unwrapped = decrypt_session_key(&key_packet, &skey, &passphrase).unwrap();
        assert_eq!(unwrapped, session_key);

        assert!(matches!(
            decrypt_session_key(&key_packet, &other_skey, &passphrase).unwrap_err(),
            Error::FindKeyPacketError,
        ));
    }

    #[test_log::test]
    fn unwrap_with_locked_key() {
        let (skey, pkey) = gen_key_pair("alice@localhost", "passphrase").unwrap();
        let session_key = SessionKey::generate(SymmetricKeyAlgorithm::AES128);

        let key_packet = encrypt_session_key(&session_key, &pkey).unwrap();

        let unwrapped =
            decrypt_session_key(&key_packet, &skey, &Passphrase::from("passphrase")).unwrap();
        assert_eq!(unwrapped, session_key);
        assert_eq!(unwrapped.algorithm(), SymmetricKeyAlgorithm::AES128);

        assert!(matches!(
            decrypt_session_key(&key_packet, &skey, &Passphrase::from("wrong")).unwrap_err(),
            Error::DecryptSessionKeyError(_),
        ));
    }

    #[test]
    fn symmetric_algorithm_from_id() {
        assert_eq!(symmetric_algorithm(9), Some(SymmetricKeyAlgorithm::AES256));
        assert_eq!(symmetric_algorithm(0), None);
        assert_eq!(symmetric_algorithm(42), None);
    }

    #[test_log::test]
    fn forward_attachment_by_rewrapping_its_session_key() {
        let (alice_skey, alice_pkey) = gen_key_pair("alice@localhost", "").unwrap();
        let (bob_skey, bob_pkey) = gen_key_pair("bob@localhost", "").unwrap();
        let passphrase = Passphrase::from("");

        let ct = encrypt(&[alice_pkey], "file.txt", b"attachment", None).unwrap();
        let session_key = decrypt_session_key(ct.key_packet(), &alice_skey, &passphrase).unwrap();

        let bob_key_packet = encrypt_session_key(&session_key, &bob_pkey).unwrap();
        let forwarded = CipherText::from_packets(bob_key_packet, ct.data_packet()).unwrap();

        let msg = decrypt(&forwarded, &bob_skey, &passphrase).unwrap();
        assert_eq!(msg.data(), b"attachment");
    }

    #[test_log::test]
    fn wrap_with_password() {
        let session_key = SessionKey::generate(SymmetricKeyAlgorithm::AES256);
        let key_packet =
            encrypt_session_key_with_password(&session_key, &Passphrase::from("password")).unwrap();

        let packets: Vec<_> = PacketParser::new(Cursor::new(key_packet))
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(matches!(packets.as_slice(), [Packet::SymKeyEncryptedSessionKey(_)]));
    }

    #[test]
    fn debug_is_redacted() {
        let session_key = SessionKey::new(SymmetricKeyAlgorithm::AES256, vec![1; 32]);
        assert!(!format!("{session_key:?}").contains("[1"));
    }
}
