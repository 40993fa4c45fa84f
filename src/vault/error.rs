//! Error types for vault operations.
//!
//! Every error aborts the whole operation: vault and host state are restored
//! to what they were before the call.

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::host::HostError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("deposits are disabled")]
    DepositsDisabled,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("deposit of {0} would mint zero shares")]
    ZeroShares(U256),

    #[error("insufficient shares: requested {requested}, available {available}")]
    InsufficientShares { requested: U256, available: U256 },

    #[error("insufficient share allowance: requested {requested}, available {available}")]
    InsufficientShareAllowance { requested: U256, available: U256 },

    #[error("pending reward {pending} is below the reinvest minimum {minimum}")]
    ThresholdNotMet { pending: U256, minimum: U256 },

    #[error("vault has no shares outstanding")]
    EmptyVault,

    #[error("combined fees exceed 10000 bips (admin {admin}, dev {dev}, reinvest {reinvest})")]
    FeeBoundExceeded { admin: u64, dev: u64, reinvest: u64 },

    #[error("rescue returned {returned}, below the accepted minimum {minimum}")]
    RescueAmountTooLow { returned: U256, minimum: U256 },

    #[error("{caller} is not authorized (requires {required})")]
    Unauthorized { caller: Address, required: Address },

    #[error("the zero address is not a valid {0}")]
    ZeroAddress(&'static str),

    #[error("token {0} holds depositor funds and cannot be recovered")]
    ProtectedToken(Address),

    #[error("invalid conversion route: {0}")]
    InvalidRoute(String),

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error(transparent)]
    Collaborator(#[from] HostError),
}
