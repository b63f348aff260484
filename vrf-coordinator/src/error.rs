// Randomness coordinator - Errors
use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError,
    program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the coordinator program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// Subscription account missing or not the one named by the id
    #[error("Invalid subscription")]
    InvalidSubscription,

    /// Requester is not a registered consumer of the subscription
    #[error("Invalid consumer")]
    InvalidConsumer,

    #[error("Only the subscription owner can perform this action")]
    MustBeSubOwner,

    #[error("Too many consumers")]
    TooManyConsumers,

    #[error("Too many random words requested")]
    NumWordsTooBig,

    #[error("Invalid request confirmations")]
    InvalidRequestConfirmations,

    #[error("Callback gas limit too big")]
    GasLimitTooBig,

    /// No outstanding request with this id
    #[error("Nonexistent request")]
    NonexistentRequest,

    #[error("Insufficient subscription balance")]
    InsufficientBalance,

    /// Override words do not match the requested word count
    #[error("Invalid random words")]
    InvalidRandomWords,

    /// Request account is not the address for the next request id
    #[error("Invalid request account")]
    InvalidRequestAccount,

    /// Only the coordinator admin may choose the delivered words
    #[error("Only the coordinator admin can supply random words")]
    MustBeAdmin,
}

impl From<CoordinatorError> for ProgramError {
    fn from(e: CoordinatorError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for CoordinatorError {
    fn type_of() -> &'static str {
        "Coordinator Error"
    }
}

impl PrintProgramError for CoordinatorError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
