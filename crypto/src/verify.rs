//! Module dedicated to PGP verification.
//!
//! This module exposes [`verify`], checking an armored detached
//! signature against a set of public keys at a given time, and the
//! [`VerificationResult`] reported to callers.

use chrono::{DateTime, Utc};
use native::{packet::Signature, SignedPublicKey};
use tracing::{debug, trace};

use crate::{encrypt::pkey_and_subkeys, utils::read_sig_from_string, Result};

/// Outcome of a detached signature verification.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct VerificationResult {
    pub verified: bool,
    /// Creation time of the verified signature.
    pub timestamp: Option<DateTime<Utc>>,
}

impl VerificationResult {
    pub fn verified(timestamp: DateTime<Utc>) -> Self {
        Self {
            verified: true,
            timestamp: Some(timestamp),
        }
    }

    pub fn not_verified() -> Self {
        Self::default()
    }
}

/// Checks whether the signature was made while the given key was
/// valid, and not after `at`.
pub(crate) fn is_within_validity(
    signature: &Signature,
    pkey: &SignedPublicKey,
    at: DateTime<Utc>,
) -> bool {
    let Some(created) = signature.created() else {
        trace!("signature has no creation time");
        return false;
    };

    if *created > at {
        trace!(%created, %at, "signature made after reference time");
        return false;
    }

    if created < pkey.primary_key.created_at() {
        trace!(%created, "signature predates the signing key");
        return false;
    }

    if let Some(expires_at) = pkey.expires_at() {
        if *created >= expires_at {
            trace!(%created, %expires_at, "signature made after key expiration");
            return false;
        }
    }

    true
}

/// Verifies the given armored detached signature over `data`.
///
/// Returns the signature creation time when one of the given public
/// keys (or one of their subkeys) verifies it within its validity
/// window, `None` otherwise. Fails only when the signature cannot be
/// parsed.
pub fn verify(
    signature: &str,
    pkeys: &[SignedPublicKey],
    data: &[u8],
    at: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    let sig = read_sig_from_string(signature)?;

    for pkey in pkeys {
        let verified = pkey_and_subkeys(pkey).any(|key| match sig.verify(&key, data) {
            Ok(()) => true,
            Err(err) => {
                trace!(?err, "signature does not verify against key or subkey");
                false
            }
        });

        if verified && is_within_validity(&sig.signature, pkey, at) {
            return Ok(sig.signature.created().copied());
        }
    }

    debug!("no public key among {} verifies the signature", pkeys.len());
    Ok(None)
}
