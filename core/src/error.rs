//! # Error Taxonomy
//!
//! One error enum for the whole service. Every variant carries a stable
//! string code (see [`CoreError::code`]) that the HTTP layer surfaces
//! verbatim, so clients can branch on codes instead of parsing prose.
//!
//! Two variants deserve a note:
//!
//! - [`CoreError::AddressMismatch`] is a bug signal, not an operational
//!   error. The mined salt and the chain's deploy op disagreed about where
//!   a contract would land. It must never be swallowed — the provisioner
//!   aborts and logs at `error` level.
//! - [`CoreError::DependencyUnavailable`] is the only variant callers
//!   should retry on. Store and chain transport failures fold into it so
//!   internal detail never leaks past the process boundary.

use thiserror::Error;

/// Convenience alias used throughout the core crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors produced by the VaultLink core flows.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The caller's identity could not be established upstream.
    #[error("unauthorized")]
    Unauthorized,

    /// The request was syntactically or semantically malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The requested vault name is already reserved or deployed.
    #[error("vault name already taken: {0}")]
    NameTaken(String),

    /// The account has no linked wallet to provision against.
    #[error("no wallet found for account {0}")]
    WalletNotFound(String),

    /// The caller named a chain id that isn't in the registry.
    #[error("unknown chain id: {0}")]
    UnknownChain(String),

    /// Salt mining exhausted its iteration or time budget.
    #[error("salt mining exceeded its budget")]
    SaltMiningTimeout,

    /// The chain deployed a contract somewhere other than the address we
    /// derived from the mined salt. Indicates a derivation or chain-service
    /// bug; never silently accepted.
    #[error("deployed address {deployed} does not match predicted {predicted}")]
    AddressMismatch {
        /// The address the salt miner derived ahead of time.
        predicted: String,
        /// The address the deploy call actually reported.
        deployed: String,
    },

    /// A backing store or chain collaborator could not be reached.
    /// Retryable by the caller.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Catch-all for conditions that should not happen. Logged, surfaced
    /// as a generic failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable code for this error. Part of the public
    /// API contract — codes are append-only, never renamed.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Unauthorized => "UNAUTHORIZED",
            CoreError::InvalidInput(_) => "INVALID_INPUT",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::NameTaken(_) => "NAME_TAKEN",
            CoreError::WalletNotFound(_) => "WALLET_NOT_FOUND",
            CoreError::UnknownChain(_) => "UNKNOWN_CHAIN",
            CoreError::SaltMiningTimeout => "SALT_MINING_TIMEOUT",
            CoreError::AddressMismatch { .. } => "ADDRESS_MISMATCH",
            CoreError::DependencyUnavailable(_) => "DEPENDENCY_UNAVAILABLE",
            CoreError::Internal(_) => "INTERNAL",
        }
    }

    /// Whether a caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::DependencyUnavailable(_))
    }
}

impl From<sled::Error> for CoreError {
    fn from(e: sled::Error) -> Self {
        CoreError::DependencyUnavailable(format!("store: {e}"))
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        // A record that won't (de)serialize means on-disk corruption or a
        // schema drift bug, not a transient outage.
        CoreError::Internal(format!("codec: {e}"))
    }
}
