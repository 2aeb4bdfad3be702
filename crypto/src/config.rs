//! Module dedicated to crypto configuration.

/// The crypto configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct CryptoConfig {
    /// What to do when the user key validating an address key token
    /// is flagged inactive.
    #[cfg_attr(feature = "derive", serde(default))]
    pub inactive_token_signer: InactiveSignerPolicy,
}

impl CryptoConfig {
    pub fn with_inactive_token_signer(mut self, policy: InactiveSignerPolicy) -> Self {
        self.inactive_token_signer = policy;
        self
    }
}

/// Policy applied to inactive user keys authorizing an address key
/// token.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum InactiveSignerPolicy {
    /// Accept the token and log a warning.
    #[default]
    Allow,

    /// Reject the token, the next user key is tried instead.
    Deny,
}

impl InactiveSignerPolicy {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}
