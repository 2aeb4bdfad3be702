//! # Address crypto
//!
//! Module dedicated to the keys of an address.
//!
//! The passphrase of a modern address key is a token: 32 hexadecimal
//! characters encrypted to one of the user keys, together with a
//! detached signature made by that user key. Resolving the passphrase
//! means finding a user key able to decrypt the token, then checking
//! both the format of the token and its signature. A token failing
//! one of these checks is never used.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use native::SignedPublicKey;
use tracing::{debug, warn};

use crate::{
    config::CryptoConfig,
    decrypt::{decrypt_with_password, DecryptionResult},
    encrypt::encrypt_with_password,
    holder::KeyHolder,
    key::{AddressKey, Key, UserKey},
    keyring::{KeyRing, UnlockedKey},
    mime::{MimeCallbacks, MimeDecryptor},
    passphrase::Passphrase,
    session::{encrypt_session_key, encrypt_session_key_with_password, SessionKey},
    trial::{all_successes, first_success},
    user::UserKeys,
    utils::{random_bytes, read_pkey_from_string},
    CipherText, Crypto, Error, Result,
};

/// Length of a decrypted address key token.
pub const TOKEN_LENGTH: usize = 32;

/// Length of the random part of an EO token, in bytes.
const EO_TOKEN_LENGTH: usize = 32;

/// Checks that a decrypted token is made of exactly [`TOKEN_LENGTH`]
/// hexadecimal digits.
pub fn validate_token_format(token: &[u8]) -> Result<()> {
    if token.len() != TOKEN_LENGTH {
        return Err(Error::InvalidTokenLengthError {
            expected: TOKEN_LENGTH,
            len: token.len(),
        });
    }

    if let Some(i) = token.iter().position(|byte| !byte.is_ascii_hexdigit()) {
        return Err(Error::InvalidTokenCharacterError(i));
    }

    Ok(())
}

/// The keys of an address, together with the keys of the user owning
/// it.
#[derive(Clone, Debug)]
pub struct AddressKeys {
    address_id: String,
    name: String,
    keys: Vec<AddressKey>,
    user: UserKeys,
    config: CryptoConfig,
}

impl AddressKeys {
    pub fn new(address_id: impl ToString, keys: Vec<AddressKey>, user: UserKeys) -> Self {
        let address_id = address_id.to_string();

        Self {
            name: format!("address {address_id}"),
            address_id,
            keys,
            user,
            config: CryptoConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CryptoConfig) -> Self {
        self.config = config;
        self
    }

    pub fn address_id(&self) -> &str {
        &self.address_id
    }

    pub fn user(&self) -> &UserKeys {
        &self.user
    }

    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }

    fn passphrase_from_token(
        &self,
        key: &AddressKey,
        token: &str,
        signature: &str,
    ) -> Result<Passphrase> {
        let mailbox_passphrase = self.user.mailbox_passphrase()?;
        let user_keys = self.user.current_keys();

        let token =
            CipherText::from_armored(token).map_err(|err| Error::GetAddressKeyPassphraseError {
                key: key.id.clone(),
                count: 0,
                causes: err.chain(),
            })?;

        first_success(user_keys, |user_key| {
            self.decrypt_token(user_key, &token, signature, &mailbox_passphrase)
        })
        .map_err(|failures| Error::GetAddressKeyPassphraseError {
            key: key.id.clone(),
            count: user_keys.len(),
            causes: failures.causes(),
        })
    }

    /// Decrypts the given token with the given user key, then checks
    /// its format and its signature.
    fn decrypt_token(
        &self,
        user_key: &UserKey,
        token: &CipherText,
        signature: &str,
        mailbox_passphrase: &Passphrase,
    ) -> Result<Passphrase> {
        let ring = UnlockedKey::unlock(
            user_key.id.clone(),
            &user_key.private_key,
            mailbox_passphrase.clone(),
        )
        .map(KeyRing::from)
        .map_err(|err| {
            debug!(?err, "cannot unlock user key {}, skipping it", user_key.id);
            err
        })?;

        let decrypted = ring.decrypt(token, &[], Utc::now()).map_err(|err| {
            debug!(?err, "cannot decrypt token with user key {}, skipping it", user_key.id);
            err
        })?;
        let passphrase = Passphrase::from(decrypted.into_data());

        validate_token_format(passphrase.as_bytes()).map_err(|err| {
            warn!(?err, "invalid token decrypted with user key {}", user_key.id);
            err
        })?;

        match ring.verify(signature, passphrase.as_bytes(), Utc::now()) {
            Ok(Some(_)) => (),
            Ok(None) => {
                warn!("token signature does not verify against user key {}", user_key.id);
                return Err(Error::InvalidTokenSignatureError(user_key.id.clone()));
            }
            Err(err) => {
                warn!(?err, "cannot verify token signature with user key {}", user_key.id);
                return Err(err);
            }
        }

        if !user_key.is_active() {
            if !self.config.inactive_token_signer.is_allowed() {
                warn!("token validated by inactive user key {}, rejecting it", user_key.id);
                return Err(Error::InactiveTokenSignerError(user_key.id.clone()));
            }

            warn!("token validated by inactive user key {}, accepting it", user_key.id);
        }

        Ok(passphrase)
    }
}

impl KeyHolder for AddressKeys {
    type Key = AddressKey;

    fn name(&self) -> &str {
        &self.name
    }

    fn current_keys(&self) -> &[AddressKey] {
        &self.keys
    }

    fn passphrase_for(&self, key: &AddressKey) -> Result<Passphrase> {
        if let Some((token, signature)) = key.token_pair() {
            return self.passphrase_from_token(key, token, signature);
        }

        if key.token.is_some() || key.signature.is_some() {
            warn!("address key {} carries half a token pair, rejecting it", key.id);
            return Err(Error::IncompleteTokenPairError(key.id.clone()));
        }

        self.user.mailbox_passphrase()
    }
}

/// Token protecting an encrypted-outside message.
#[derive(Debug)]
pub struct EoToken {
    /// The base64-encoded random token.
    pub token: Passphrase,
    /// The token encrypted with the password of the message.
    pub encrypted: CipherText,
}

/// Cryptographic operations bound to the keys of an address.
pub type AddressCrypto = Crypto<AddressKeys>;

impl Crypto<AddressKeys> {
    /// Unlocks every address key that can be unlocked into a single
    /// key ring.
    ///
    /// Keys failing to unlock are left out. Fails only when no key
    /// could be unlocked, listing every cause.
    pub fn create_and_unlock_key_ring(&self) -> Result<KeyRing> {
        let keys = self.holder().current_keys();

        let (unlocked, failures) =
            all_successes(keys, |key| self.unlocked_key(key)).map_err(|failures| {
                Error::UnlockKeyRingError {
                    holder: self.holder().name().to_owned(),
                    count: keys.len(),
                    causes: failures.causes(),
                }
            })?;

        if !failures.is_empty() {
            debug!(
                "{} out of {} keys of {} left out of the key ring: {failures}",
                failures.len(),
                keys.len(),
                self.holder().name(),
            );
        }

        Ok(unlocked.into_iter().collect())
    }

    /// Encrypts an attachment with the primary key.
    pub fn encrypt_with_primary(
        &self,
        data: impl AsRef<[u8]>,
        file_name: &str,
    ) -> Result<CipherText> {
        self.with_primary_key(|ring| ring.encrypt(file_name, data.as_ref(), false))
    }

    /// Wraps the given session key for the given armored public key.
    pub fn encrypt_key_packet(
        &self,
        session_key: &SessionKey,
        public_key: &str,
    ) -> Result<Vec<u8>> {
        let pkey = read_pkey_from_string(public_key)?;
        encrypt_session_key(session_key, &pkey)
    }

    /// Wraps the given session key for the given password.
    pub fn encrypt_key_packet_with_password(
        &self,
        session_key: &SessionKey,
        password: &Passphrase,
    ) -> Result<Vec<u8>> {
        encrypt_session_key_with_password(session_key, password)
    }

    /// Unwraps the session key of the given key packet with the first
    /// address key able to.
    pub fn decrypt_key_packet(&self, key_packet: &[u8]) -> Result<SessionKey> {
        self.with_current_keys("decrypt key packet", |ring| ring.decrypt_session_key(key_packet))
    }

    /// Decrypts an attachment out of its key and data packets.
    pub fn decrypt_attachment(
        &self,
        key_packet: &[u8],
        data_packet: &[u8],
    ) -> Result<DecryptionResult> {
        let ct = CipherText::from_packets(key_packet, data_packet)?;
        self.with_current_keys("decrypt attachment", |ring| ring.decrypt(&ct, &[], Utc::now()))
    }

    /// Decrypts a PGP/MIME message using the given decryptor and a key
    /// ring holding every address key that can be unlocked.
    pub fn decrypt_mime(
        &self,
        message: &CipherText,
        verification_keys: &[SignedPublicKey],
        at: DateTime<Utc>,
        decryptor: &dyn MimeDecryptor,
        callbacks: &mut dyn MimeCallbacks,
    ) -> Result<()> {
        let ring = self.create_and_unlock_key_ring()?;

        decryptor
            .decrypt(message, &ring, verification_keys, at, callbacks)
            .map_err(Error::DecryptMimeError)
    }

    /// Generates a random token for an encrypted-outside message and
    /// encrypts it with the given password.
    pub fn generate_eo_token(&self, password: &Passphrase) -> Result<EoToken> {
        let token = Passphrase::new(random_bytes(EO_TOKEN_LENGTH))
            .expose(|bytes| Passphrase::from(STANDARD.encode(bytes)));
        let encrypted = encrypt_with_password(password, token.as_bytes())?;

        Ok(EoToken { token, encrypted })
    }

    /// Decrypts the token of an encrypted-outside message with the
    /// given password.
    pub fn decrypt_eo_token(
        &self,
        encrypted: &CipherText,
        password: &Passphrase,
    ) -> Result<Passphrase> {
        decrypt_with_password(encrypted, password).map(Passphrase::from)
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_token_format, TOKEN_LENGTH};
    use crate::Error;

    #[test]
    fn well_formed_token() {
        assert!(validate_token_format(b"0123456789abcdefABCDEF0123456789").is_ok());
    }

    #[test]
    fn token_of_wrong_length() {
        assert!(matches!(
            validate_token_format(b"0123456789abcdef").unwrap_err(),
            Error::InvalidTokenLengthError { expected: TOKEN_LENGTH, len: 16 },
        ));
        assert!(matches!(
            validate_token_format(&[b'a'; 33]).unwrap_err(),
            Error::InvalidTokenLengthError { len: 33, .. },
        ));
    }

    #[test]
    fn token_with_non_hex_byte() {
        let mut token = [b'a'; TOKEN_LENGTH];
        token[7] = b'g';

        assert!(matches!(
            validate_token_format(&token).unwrap_err(),
            Error::InvalidTokenCharacterError(7),
        ));
    }
}
