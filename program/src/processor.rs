// Raffle Program - Instruction Processor
use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};
use vrf_coordinator::{instruction::RandomWordsRequest, RandomWord};

use crate::{
    config::RaffleConfig,
    error::RaffleError,
    event::RaffleEvent,
    instruction::{CheckUpkeepResponse, RaffleInstruction},
    oracle,
    state::{Raffle, NUM_WORDS, RAFFLE_SEED, REQUEST_CONFIRMATIONS},
    utils,
};

/// Program state handler.
pub struct Processor {}

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle { config } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(program_id, accounts, config)
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(program_id, accounts, amount)
            }
            RaffleInstruction::CheckUpkeep { .. } => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            RaffleInstruction::PerformUpkeep { .. } => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(program_id, accounts)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, &random_words)
            }
        }
    }

    fn process_initialize_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        config: RaffleConfig,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let creator_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !creator_info.is_signer {
            msg!("Creator must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        config.validate()?;

        if !coordinator_program_info.executable {
            msg!("Coordinator {} is not a program", coordinator_program_info.key);
            return Err(ProgramError::IncorrectProgramId);
        }

        let (expected_raffle, bump) = utils::find_raffle_address(program_id, creator_info.key);
        if *raffle_info.key != expected_raffle {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidArgument);
        }
        if raffle_info.owner == program_id {
            msg!("Raffle account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        let rent = Rent::get()?;
        invoke_signed(
            &system_instruction::create_account(
                creator_info.key,
                raffle_info.key,
                rent.minimum_balance(Raffle::LEN),
                Raffle::LEN as u64,
                program_id,
            ),
            &[
                creator_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
            &[&[RAFFLE_SEED, creator_info.key.as_ref(), &[bump]]],
        )?;

        let now = Clock::get()?.unix_timestamp;
        let raffle = Raffle::new(
            &config,
            *creator_info.key,
            *coordinator_program_info.key,
            bump,
            now,
        );
        raffle.save(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: entrance fee {}, interval {}s, coordinator {}",
            config.entrance_fee,
            config.interval,
            coordinator_program_info.key
        );
        Ok(())
    }

    fn process_enter_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = load_raffle(program_id, raffle_info)?;
        raffle.enter(*player_info.key, amount)?;

        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, amount),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        raffle.save(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Transferred {} lamports, {} players in round",
            amount,
            raffle.number_of_players()
        );
        RaffleEvent::RaffleEnter {
            player: *player_info.key,
        }
        .emit();
        Ok(())
    }

    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        let raffle = load_raffle(program_id, raffle_info)?;
        let now = Clock::get()?.unix_timestamp;
        let check = raffle.check_upkeep(now, utils::pooled_balance(raffle_info)?);
        msg!("Upkeep check: {}", check);

        let response = CheckUpkeepResponse {
            upkeep_needed: check.upkeep_needed(),
            perform_data: Vec::new(),
        };
        let data = response
            .try_to_vec()
            .map_err(|_| ProgramError::InvalidAccountData)?;
        set_return_data(&data);
        Ok(())
    }

    fn process_perform_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = load_raffle(program_id, raffle_info)?;
        if *coordinator_program_info.key != raffle.vrf_coordinator() {
            msg!("Raffle uses coordinator {}", raffle.vrf_coordinator());
            return Err(ProgramError::IncorrectProgramId);
        }

        let now = Clock::get()?.unix_timestamp;
        let pooled = utils::pooled_balance(raffle_info)?;
        let check = raffle.check_upkeep(now, pooled);
        if !check.upkeep_needed() {
            msg!(
                "Upkeep not needed: {}, balance: {}, players: {}, state: {:?}",
                check,
                pooled,
                raffle.number_of_players(),
                raffle.raffle_state()
            );
            return Err(RaffleError::UpkeepNotNeeded.into());
        }

        let request = RandomWordsRequest {
            key_hash: raffle.key_hash(),
            subscription_id: raffle.subscription_id(),
            minimum_request_confirmations: REQUEST_CONFIRMATIONS,
            callback_gas_limit: raffle.callback_gas_limit(),
            num_words: NUM_WORDS,
        };
        let creator = raffle.creator();
        let request_id = oracle::request_random_words(
            coordinator_program_info.key,
            raffle_info.key,
            caller_info.key,
            request_info.key,
            request,
            &[
                raffle_info.clone(),
                caller_info.clone(),
                coordinator_info.clone(),
                subscription_info.clone(),
                request_info.clone(),
                system_program_info.clone(),
                coordinator_program_info.clone(),
            ],
            &[RAFFLE_SEED, creator.as_ref(), &[raffle.bump()]],
        )?;

        raffle.begin_calculating(request_id);
        raffle.save(&mut raffle_info.data.borrow_mut())?;

        RaffleEvent::RequestedRaffleWinner { request_id }.emit();
        Ok(())
    }

    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[RandomWord],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        let mut raffle = load_raffle(program_id, raffle_info)?;
        oracle::verify_coordinator_authority(authority_info, &raffle.vrf_coordinator())?;

        let prize = utils::pooled_balance(raffle_info)?;
        let now = Clock::get()?.unix_timestamp;
        let winner = raffle.settle(request_id, random_words, now)?;

        if winner != *winner_info.key {
            msg!("Winner is {}, got account {}", winner, winner_info.key);
            return Err(RaffleError::WinnerAccountMismatch.into());
        }
        if !winner_info.is_writable {
            msg!("Winner account {} cannot receive the prize", winner_info.key);
            return Err(RaffleError::TransferFailed.into());
        }

        let raffle_lamports = raffle_info
            .lamports()
            .checked_sub(prize)
            .ok_or(RaffleError::TransferFailed)?;
        let winner_lamports = winner_info
            .lamports()
            .checked_add(prize)
            .ok_or(RaffleError::TransferFailed)?;
        **raffle_info.lamports.borrow_mut() = raffle_lamports;
        **winner_info.lamports.borrow_mut() = winner_lamports;

        raffle.save(&mut raffle_info.data.borrow_mut())?;

        msg!("Paid {} lamports to {}", prize, winner);
        RaffleEvent::WinnerPicked { winner }.emit();
        Ok(())
    }
}

fn load_raffle(program_id: &Pubkey, raffle_info: &AccountInfo) -> Result<Raffle, ProgramError> {
    if raffle_info.owner != program_id {
        msg!("Raffle account must be owned by this program");
        return Err(ProgramError::IncorrectProgramId);
    }
    Raffle::load(&raffle_info.data.borrow())
}
