//! Error types for the Safe/Roles executor

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the executor
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Role key is required for Roles execution")]
    MissingRoleKey,

    // Validation errors
    #[error("{label} value {value} is outside uint{bits} range")]
    ValueOutOfRange {
        label: &'static str,
        value: String,
        bits: u32,
    },

    #[error("{label} must be a base-10 integer, got {value:?}")]
    InvalidDecimal {
        label: &'static str,
        value: String,
    },

    #[error("Calldata selector {found} does not match {expected}")]
    SelectorMismatch { expected: String, found: String },

    #[error("ABI coding failed for {function}: {message}")]
    Abi { function: String, message: String },

    #[error("Claim receiver {receiver} does not match proxy {expected}")]
    ClaimReceiverMismatch { receiver: String, expected: String },

    #[error("No accrued rewards available for superformId={superform_id} asset={asset}; got {accrued}")]
    NoAccruedRewards {
        superform_id: String,
        asset: String,
        accrued: String,
    },

    #[error("Withdraw calldata amount ({claimed}) must equal accrued rewards ({accrued})")]
    AccruedRewardsMismatch { claimed: String, accrued: String },

    // Trust errors
    #[error("Signing account {actual} does not match configured module {expected}")]
    ModuleAccountMismatch { actual: String, expected: String },

    #[error("Roles module {roles} is wired to avatar={avatar} target={target}, expected {expected}")]
    RolesWiringMismatch {
        roles: String,
        avatar: String,
        target: String,
        expected: String,
    },

    #[error("Failed to verify Roles wiring for {roles}: {message}")]
    RolesVerification { roles: String, message: String },

    // Transport errors
    #[error("Quote service request failed ({status} {status_text}): {body}")]
    QuoteService {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Transaction send failed: {0}")]
    TransactionSend(String),
}

impl Error {
    /// Coarse classification used for operator-facing log prefixes
    pub fn category(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::MissingRoleKey => "configuration",
            Error::ValueOutOfRange { .. }
            | Error::InvalidDecimal { .. }
            | Error::SelectorMismatch { .. }
            | Error::Abi { .. }
            | Error::ClaimReceiverMismatch { .. }
            | Error::NoAccruedRewards { .. }
            | Error::AccruedRewardsMismatch { .. } => "validation",
            Error::ModuleAccountMismatch { .. }
            | Error::RolesWiringMismatch { .. }
            | Error::RolesVerification { .. } => "trust",
            Error::QuoteService { .. }
            | Error::Http(_)
            | Error::Deserialization(_)
            | Error::Rpc(_)
            | Error::TransactionSend(_) => "transport",
        }
    }

    /// Check if this error is a trust-boundary violation
    pub fn is_trust_violation(&self) -> bool {
        matches!(
            self,
            Error::ModuleAccountMismatch { .. }
                | Error::RolesWiringMismatch { .. }
                | Error::RolesVerification { .. }
        )
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Deserialization(e.to_string())
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}
