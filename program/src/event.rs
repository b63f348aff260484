// Raffle Program - Events
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// Notifications for off-chain listeners. Emitted as a log line plus a borsh
/// payload through `sol_log_data`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    RaffleEnter { player: Pubkey },
    RequestedRaffleWinner { request_id: u64 },
    WinnerPicked { winner: Pubkey },
}

impl RaffleEvent {
    pub fn emit(&self) {
        match self {
            RaffleEvent::RaffleEnter { player } => msg!("Raffle entered by {}", player),
            RaffleEvent::RequestedRaffleWinner { request_id } => {
                msg!("Requested raffle winner, request id {}", request_id)
            }
            RaffleEvent::WinnerPicked { winner } => msg!("Winner picked: {}", winner),
        }
        if let Ok(payload) = self.try_to_vec() {
            sol_log_data(&[&payload]);
        }
    }
}
