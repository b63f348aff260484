// Randomness coordinator
// Subscription-funded random words, delivered to consumer programs through a signed callback

pub mod consumer;
pub mod error;
pub mod event;
pub mod instruction;
pub mod processor;
pub mod state;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

pub use processor::derive_random_words;
pub use state::{find_authority_address, RandomWord};

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
