use std::{error, result, string::FromUtf8Error};

use native::{SecretKeyParamsBuilderError, SubkeyParamsBuilderError};
use thiserror::Error;

use crate::key::KeyId;

/// The global `Result` alias of the library.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse armored secret key")]
    ParseArmoredSecretKeyError(#[source] native::errors::Error),
    #[error("cannot parse armored public key")]
    ParseArmoredPublicKeyError(#[source] native::errors::Error),
    #[error("cannot import pgp signature from armor")]
    ImportSignatureFromArmorError(#[source] native::errors::Error),
    #[error("cannot export pgp public key as armored string")]
    ExportPublicKeyToArmorError(#[source] native::errors::Error),

    #[error("cannot import armored pgp message")]
    ImportMessageFromArmorError(#[source] native::errors::Error),
    #[error("cannot import pgp message from key and data packets")]
    ImportMessageFromPacketsError(#[source] native::errors::Error),
    #[error("cannot export encrypted pgp message as armored string")]
    ExportMessageToArmorError(#[source] native::errors::Error),
    #[error("cannot export pgp packet")]
    ExportPacketError(#[source] native::errors::Error),
    #[error("cannot split pgp message: message is not encrypted")]
    SplitMessageNotEncryptedError,
    #[error("cannot split pgp message: message has no key packet")]
    SplitMessageMissingKeyPacketError,
    #[error("cannot join pgp packets: {0} packet is empty")]
    JoinEmptyPacketError(&'static str),

    #[error("cannot compress pgp message")]
    CompressMessageError(#[source] native::errors::Error),
    #[error("cannot encrypt pgp message")]
    EncryptMessageError(#[source] native::errors::Error),
    #[error("cannot encrypt pgp message using password")]
    EncryptMessageWithPasswordError(#[source] native::errors::Error),
    #[error("cannot find pgp public key or subkey usable for encryption")]
    FindEncryptionKeyError,

    #[error("cannot decrypt pgp message")]
    DecryptMessageError(#[source] native::errors::Error),
    #[error("cannot decrypt pgp message using password")]
    DecryptMessageWithPasswordError(#[source] native::errors::Error),
    #[error("cannot decompress pgp message")]
    DecompressMessageError(#[source] native::errors::Error),
    #[error("cannot get pgp message content")]
    GetMessageContentError(#[source] native::errors::Error),
    #[error("cannot get pgp message content: content is empty")]
    GetMessageContentEmptyError,
    #[error("cannot get pgp message: decrypted message is empty")]
    GetMessageEmptyError,
    #[error("cannot decode pgp message content as utf-8")]
    DecodeUtf8Error(#[source] FromUtf8Error),

    #[error("cannot sign pgp message")]
    SignMessageError(#[source] native::errors::Error),
    #[error("cannot export pgp signature as armored string")]
    ExportSignatureToArmorError(#[source] native::errors::Error),

    #[error("cannot unlock pgp secret key {1}")]
    UnlockSecretKeyError(#[source] native::errors::Error, KeyId),
    #[error("cannot {0}: key ring is empty")]
    EmptyKeyRingError(&'static str),

    #[error("cannot encrypt session key")]
    EncryptSessionKeyError(#[source] native::errors::Error),
    #[error("cannot encrypt session key using password")]
    EncryptSessionKeyWithPasswordError(#[source] native::errors::Error),
    #[error("cannot decrypt session key")]
    DecryptSessionKeyError(#[source] native::errors::Error),
    #[error("cannot parse key packet")]
    ParseKeyPacketError(#[source] native::errors::Error),
    #[error("cannot decrypt session key: no key packet matches the secret key")]
    FindKeyPacketError,

    #[error("cannot build pgp secret key params")]
    BuildSecretKeyParamsError(#[source] SecretKeyParamsBuilderError),
    #[error("cannot build pgp public subkey params")]
    BuildSubkeyParamsError(#[source] SubkeyParamsBuilderError),
    #[error("cannot generate pgp secret key")]
    GenerateSecretKeyError(#[source] native::errors::Error),
    #[error("cannot sign pgp secret key")]
    SignSecretKeyError(#[source] native::errors::Error),
    #[error("cannot verify pgp secret key")]
    VerifySecretKeyError(#[source] native::errors::Error),
    #[error("cannot sign pgp public key")]
    SignPublicKeyError(#[source] native::errors::Error),
    #[error("cannot verify pgp public key")]
    VerifyPublicKeyError(#[source] native::errors::Error),

    #[error("cannot find primary key of {0}")]
    FindPrimaryKeyError(String),
    #[error("cannot get mailbox passphrase of user {0}: passphrase not available")]
    GetMailboxPassphraseNotFoundError(String),
    #[error("cannot get mailbox passphrase of user {1}")]
    GetMailboxPassphraseError(#[source] Box<dyn error::Error + Send + Sync>, String),

    #[error("cannot {action} using any of the {count} keys of {holder}: {causes}")]
    AllKeysFailedError {
        action: &'static str,
        holder: String,
        count: usize,
        causes: String,
    },
    #[error("cannot unlock any of the {count} keys of {holder}: {causes}")]
    UnlockKeyRingError {
        holder: String,
        count: usize,
        causes: String,
    },
    #[error("failed getting passphrase for key {key} using user keys ({count} tried): {causes}")]
    GetAddressKeyPassphraseError {
        key: KeyId,
        count: usize,
        causes: String,
    },

    #[error("cannot get passphrase of address key {0}: token and signature must come together")]
    IncompleteTokenPairError(KeyId),

    #[error("cannot validate token: expected {expected} bytes, got {len}")]
    InvalidTokenLengthError { expected: usize, len: usize },
    #[error("cannot validate token: byte at index {0} is not an hexadecimal digit")]
    InvalidTokenCharacterError(usize),
    #[error("cannot validate token: signature does not verify against user key {0}")]
    InvalidTokenSignatureError(KeyId),
    #[error("cannot validate token: user key {0} is inactive")]
    InactiveTokenSignerError(KeyId),

    #[error("cannot decrypt mime message")]
    DecryptMimeError(#[source] Box<dyn error::Error + Send + Sync>),
}

impl Error {
    /// Renders the error together with its chain of sources, on a
    /// single line.
    pub fn chain(&self) -> String {
        chain(self)
    }
}

/// Renders any error together with its chain of sources.
pub(crate) fn chain(err: &dyn error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();

    while let Some(err) = source {
        msg.push_str(": ");
        msg.push_str(&err.to_string());
        source = err.source();
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn chain_includes_sources() {
        let err = String::from_utf8(vec![0xff]).unwrap_err();
        let err = Error::DecodeUtf8Error(err);

        assert!(err
            .chain()
            .starts_with("cannot decode pgp message content as utf-8: invalid utf-8"));
    }
}
