// Raffle Program - Errors
use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError,
    program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the Raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Payment is below the entrance fee
    #[error("Not enough lamports entered")]
    NotEnoughLamportsEntered,

    /// Entry attempted while a winner is being picked
    #[error("Raffle is not open")]
    NotOpen,

    /// Upkeep was performed while the upkeep condition does not hold
    #[error("Upkeep not needed")]
    UpkeepNotNeeded,

    #[error("Transfer to winner failed")]
    TransferFailed,

    #[error("Player index out of range")]
    IndexOutOfRange,

    /// Fulfillment does not match the outstanding request
    #[error("Nonexistent request")]
    NonexistentRequest,

    /// Fulfillment was not signed by the configured coordinator
    #[error("Only the coordinator can fulfill")]
    OnlyCoordinatorCanFulfill,

    /// The supplied winner account is not the drawn player
    #[error("Winner account mismatch")]
    WinnerAccountMismatch,

    #[error("Raffle is full")]
    RaffleFull,

    #[error("Invalid raffle configuration")]
    InvalidConfig,

    /// The coordinator returned no request id or no random words
    #[error("Invalid coordinator response")]
    InvalidCoordinatorResponse,
}

/// Broad classes of raffle failures, for clients deciding whether to retry
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something the raffle refuses
    InputRejected,
    /// The raffle is not in a state that allows the operation
    StateConflict,
    PayoutFailure,
    LookupFailure,
}

impl RaffleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RaffleError::NotEnoughLamportsEntered
            | RaffleError::OnlyCoordinatorCanFulfill
            | RaffleError::WinnerAccountMismatch
            | RaffleError::InvalidConfig
            | RaffleError::InvalidCoordinatorResponse => ErrorKind::InputRejected,
            RaffleError::NotOpen
            | RaffleError::UpkeepNotNeeded
            | RaffleError::RaffleFull
            | RaffleError::NonexistentRequest => ErrorKind::StateConflict,
            RaffleError::TransferFailed => ErrorKind::PayoutFailure,
            RaffleError::IndexOutOfRange => ErrorKind::LookupFailure,
        }
    }
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
