// Raffle Program
// Players enter with a fixed fee; once the interval has passed an upkeep call
// closes the round and asks the randomness coordinator for a word, and the
// coordinator's callback pays the whole pool to the drawn player.

pub mod config;
pub mod error;
pub mod event;
pub mod instruction;
pub mod oracle;
pub mod processor;
pub mod state;
pub mod utils;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
