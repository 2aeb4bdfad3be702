//! Rust library to select, unlock and use the OpenPGP keys of a mail
//! account.
//!
//! Keys come in two flavours: [`UserKey`]s, unlocked by the mailbox
//! passphrase of the account, and [`AddressKey`]s, unlocked by a
//! signed token that only a user key can decrypt. Both are used
//! through the same [`Crypto`] engine: see [`UserCrypto`] and
//! [`AddressCrypto`].
//!
//! The OpenPGP primitives are provided by the [`pgp`] crate,
//! re-exported as [`native`].
//!
//! [`pgp`]: https://docs.rs/pgp

pub mod address;
pub mod cipher_text;
pub mod config;
pub mod crypto;
pub mod decrypt;
pub mod encrypt;
pub mod error;
pub mod holder;
pub mod key;
pub mod keyring;
pub mod mime;
pub mod passphrase;
pub mod session;
pub mod sign;
pub mod trial;
pub mod user;
pub mod utils;
pub mod verify;

#[doc(inline)]
pub use native;

#[doc(inline)]
pub use self::{
    address::{AddressCrypto, AddressKeys, EoToken},
    cipher_text::CipherText,
    config::{CryptoConfig, InactiveSignerPolicy},
    crypto::Crypto,
    decrypt::{DecryptionResult, SignatureStatus},
    error::{Error, Result},
    holder::KeyHolder,
    key::{AddressKey, Key, KeyId, KeyInformation, UserKey},
    keyring::{KeyRing, UnlockedKey},
    mime::{MimeCallbacks, MimeDecryptor},
    passphrase::{MemorySecretStore, Passphrase, SecretStore},
    session::SessionKey,
    user::{UserCrypto, UserKeys},
    utils::gen_key_pair,
    verify::VerificationResult,
};
