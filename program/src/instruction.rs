// Raffle Program - Instructions
use std::convert::TryInto;
use std::mem::size_of;

use arrayref::{array_ref, array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use vrf_coordinator::{
    consumer::{unpack_fulfill_random_words, FULFILL_RANDOM_WORDS_TAG},
    state::{find_coordinator_address, find_request_address, find_subscription_address},
    RandomWord,
};

use crate::{config::RaffleConfig, utils::find_raffle_address};

/// Answer of `CheckUpkeep`, set as program return data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CheckUpkeepResponse {
    pub upkeep_needed: bool,
    pub perform_data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create a raffle
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The creator, pays for the raffle account
    /// 1. `[writable]` The raffle account (PDA of the creator)
    /// 2. `[]` The randomness coordinator program
    /// 3. `[]` The system program
    InitializeRaffle { config: RaffleConfig },

    /// Enter the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player, pays `amount`
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Lamports paid, at least the entrance fee
        amount: u64,
    },

    /// Report whether the round may close. Read only; the answer is a
    /// `CheckUpkeepResponse` in the return data.
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep { check_data: Vec<u8> },

    /// Close the round and request randomness from the coordinator
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The caller, pays for the coordinator's request account
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The randomness coordinator program
    /// 3. `[writable]` The coordinator config account
    /// 4. `[]` The coordinator subscription account
    /// 5. `[writable]` The coordinator request account for the next request id
    /// 6. `[]` The system program
    PerformUpkeep { perform_data: Vec<u8> },

    /// Coordinator callback delivering the random words
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator authority
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winning player
    FulfillRandomWords {
        request_id: u64,
        random_words: Vec<RandomWord>,
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match *tag {
            0 => Self::InitializeRaffle {
                config: Self::unpack_config(rest)?,
            },
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { amount }
            }
            2 => Self::CheckUpkeep {
                check_data: rest.to_vec(),
            },
            3 => Self::PerformUpkeep {
                perform_data: rest.to_vec(),
            },
            FULFILL_RANDOM_WORDS_TAG => {
                let (request_id, random_words) = unpack_fulfill_random_words(rest)?;
                Self::FulfillRandomWords {
                    request_id,
                    random_words,
                }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match self {
            Self::InitializeRaffle { config } => {
                buf.push(0);
                buf.extend_from_slice(&config.entrance_fee.to_le_bytes());
                buf.extend_from_slice(&config.interval.to_le_bytes());
                buf.extend_from_slice(&config.key_hash);
                buf.extend_from_slice(&config.subscription_id.to_le_bytes());
                buf.extend_from_slice(&config.callback_gas_limit.to_le_bytes());
            }
            Self::EnterRaffle { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep { check_data } => {
                buf.push(2);
                buf.extend_from_slice(check_data);
            }
            Self::PerformUpkeep { perform_data } => {
                buf.push(3);
                buf.extend_from_slice(perform_data);
            }
            Self::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                return vrf_coordinator::consumer::pack_fulfill_random_words(
                    *request_id,
                    random_words,
                );
            }
        }
        buf
    }

    fn unpack_config(input: &[u8]) -> Result<RaffleConfig, ProgramError> {
        if input.len() < RaffleConfig::LEN {
            return Err(ProgramError::InvalidInstructionData);
        }
        let input = array_ref![input, 0, RaffleConfig::LEN];
        let (entrance_fee, interval, key_hash, subscription_id, callback_gas_limit) =
            array_refs![input, 8, 8, 32, 8, 4];
        Ok(RaffleConfig {
            entrance_fee: u64::from_le_bytes(*entrance_fee),
            interval: u64::from_le_bytes(*interval),
            key_hash: *key_hash,
            subscription_id: u64::from_le_bytes(*subscription_id),
            callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
        })
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(u64::from_le_bytes)
            .ok_or(ProgramError::InvalidInstructionData)?;
        Ok((value, &input[8..]))
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    creator: &Pubkey,
    coordinator_program: &Pubkey,
    config: RaffleConfig,
) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id, creator);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*creator, true),
            AccountMeta::new(raffle, false),
            AccountMeta::new_readonly(*coordinator_program, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::InitializeRaffle { config }.pack(),
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(program_id: &Pubkey, player: &Pubkey, raffle: &Pubkey, amount: u64) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*player, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::EnterRaffle { amount }.pack(),
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, raffle: &Pubkey, check_data: Vec<u8>) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*raffle, false)],
        data: RaffleInstruction::CheckUpkeep { check_data }.pack(),
    }
}

/// Create perform_upkeep instruction. `request_id` is the coordinator's next
/// request id, which names the request account the coordinator will create.
#[allow(clippy::too_many_arguments)]
pub fn perform_upkeep(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle: &Pubkey,
    coordinator_program: &Pubkey,
    subscription_id: u64,
    request_id: u64,
    perform_data: Vec<u8>,
) -> Instruction {
    let (coordinator, _) = find_coordinator_address(coordinator_program);
    let (subscription, _) = find_subscription_address(coordinator_program, subscription_id);
    let (request, _) = find_request_address(coordinator_program, request_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*caller, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new_readonly(*coordinator_program, false),
            AccountMeta::new(coordinator, false),
            AccountMeta::new_readonly(subscription, false),
            AccountMeta::new(request, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::PerformUpkeep { perform_data }.pack(),
    }
}

/// Accounts a fulfiller forwards to the raffle through the coordinator
pub fn fulfillment_accounts(raffle: &Pubkey, winner: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*raffle, false),
        AccountMeta::new(*winner, false),
    ]
}

/// Create fulfill_random_words instruction, signed by `authority`
pub fn fulfill_random_words(
    program_id: &Pubkey,
    authority: &Pubkey,
    raffle: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<RandomWord>,
) -> Instruction {
    let mut accounts = vec![AccountMeta::new_readonly(*authority, true)];
    accounts.extend(fulfillment_accounts(raffle, winner));
    Instruction {
        program_id: *program_id,
        accounts,
        data: RaffleInstruction::FulfillRandomWords {
            request_id,
            random_words,
        }
        .pack(),
    }
}
