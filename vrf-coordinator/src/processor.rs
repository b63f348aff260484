// Randomness coordinator - Instruction Processor
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    instruction::{AccountMeta, Instruction},
    keccak,
    msg,
    program::{invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    consumer::pack_fulfill_random_words,
    error::CoordinatorError,
    event::CoordinatorEvent,
    instruction::{CoordinatorInstruction, RandomWordsRequest},
    state::{
        find_authority_address, find_coordinator_address, find_request_address,
        find_subscription_address, Coordinator, RandomWord, RandomnessRequest, Subscription,
        AUTHORITY_SEED, COORDINATOR_SEED, MAX_CONSUMERS, MAX_GAS_LIMIT, MAX_NUM_WORDS,
        MAX_REQUEST_CONFIRMATIONS, REQUEST_SEED, SUBSCRIPTION_SEED,
    },
};

/// Words delivered for `request_id` when the fulfiller supplies none:
/// word `i` is `keccak256(request_id_le || i_le)`.
pub fn derive_random_words(request_id: u64, num_words: u32) -> Vec<RandomWord> {
    (0..num_words)
        .map(|i| keccak::hashv(&[&request_id.to_le_bytes(), &i.to_le_bytes()]).0)
        .collect()
}

/// Program state handler.
pub struct Processor {}

impl Processor {
    pub fn process(program_id: &Pubkey, accounts: &[AccountInfo], input: &[u8]) -> ProgramResult {
        let instruction = CoordinatorInstruction::unpack(input)?;

        match instruction {
            CoordinatorInstruction::Initialize {
                base_fee,
                gas_price_link,
            } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(program_id, accounts, base_fee, gas_price_link)
            }
            CoordinatorInstruction::CreateSubscription => {
                msg!("Instruction: Create Subscription");
                Self::process_create_subscription(program_id, accounts)
            }
            CoordinatorInstruction::FundSubscription {
                subscription_id,
                amount,
            } => {
                msg!("Instruction: Fund Subscription");
                Self::process_fund_subscription(program_id, accounts, subscription_id, amount)
            }
            CoordinatorInstruction::AddConsumer {
                subscription_id,
                consumer,
            } => {
                msg!("Instruction: Add Consumer");
                Self::process_add_consumer(program_id, accounts, subscription_id, consumer)
            }
            CoordinatorInstruction::RemoveConsumer {
                subscription_id,
                consumer,
            } => {
                msg!("Instruction: Remove Consumer");
                Self::process_remove_consumer(program_id, accounts, subscription_id, consumer)
            }
            CoordinatorInstruction::RequestRandomWords(request) => {
                msg!("Instruction: Request Random Words");
                Self::process_request_random_words(program_id, accounts, request)
            }
            CoordinatorInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, random_words)
            }
        }
    }

    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        base_fee: u64,
        gas_price_link: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !admin_info.is_signer {
            msg!("Admin must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_coordinator, bump) = find_coordinator_address(program_id);
        if *coordinator_info.key != expected_coordinator {
            msg!("Invalid coordinator account address");
            return Err(ProgramError::InvalidArgument);
        }

        create_pda_account(
            admin_info,
            coordinator_info,
            system_program_info,
            Coordinator::LEN,
            program_id,
            &[COORDINATOR_SEED, &[bump]],
        )?;

        let coordinator = Coordinator {
            is_initialized: true,
            admin: *admin_info.key,
            base_fee,
            gas_price_link,
            current_subscription_id: 0,
            next_request_id: 1,
        };
        coordinator.save(&mut coordinator_info.data.borrow_mut())?;

        msg!(
            "Coordinator initialized: base fee {}, gas price {}",
            base_fee,
            gas_price_link
        );
        Ok(())
    }

    fn process_create_subscription(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            msg!("Subscription owner must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut coordinator = load_coordinator(program_id, coordinator_info)?;
        let subscription_id = coordinator
            .current_subscription_id
            .checked_add(1)
            .ok_or(ProgramError::ArithmeticOverflow)?;

        let (expected_subscription, bump) = find_subscription_address(program_id, subscription_id);
        if *subscription_info.key != expected_subscription {
            msg!("Subscription account is not the address for id {}", subscription_id);
            return Err(CoordinatorError::InvalidSubscription.into());
        }

        create_pda_account(
            owner_info,
            subscription_info,
            system_program_info,
            Subscription::LEN,
            program_id,
            &[SUBSCRIPTION_SEED, &subscription_id.to_le_bytes(), &[bump]],
        )?;

        let subscription = Subscription {
            is_initialized: true,
            id: subscription_id,
            owner: *owner_info.key,
            balance: 0,
            consumers: Vec::new(),
        };
        subscription.save(&mut subscription_info.data.borrow_mut())?;

        coordinator.current_subscription_id = subscription_id;
        coordinator.save(&mut coordinator_info.data.borrow_mut())?;

        CoordinatorEvent::SubscriptionCreated {
            subscription_id,
            owner: *owner_info.key,
        }
        .emit();
        Ok(())
    }

    fn process_fund_subscription(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        subscription_id: u64,
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let funder_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;

        if !funder_info.is_signer {
            msg!("Funder must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut subscription = load_subscription(program_id, subscription_info, subscription_id)?;
        let old_balance = subscription.balance;
        subscription.balance = old_balance
            .checked_add(amount)
            .ok_or(ProgramError::ArithmeticOverflow)?;
        subscription.save(&mut subscription_info.data.borrow_mut())?;

        CoordinatorEvent::SubscriptionFunded {
            subscription_id,
            old_balance,
            new_balance: subscription.balance,
        }
        .emit();
        Ok(())
    }

    fn process_add_consumer(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        subscription_id: u64,
        consumer: Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;

        let mut subscription = load_subscription(program_id, subscription_info, subscription_id)?;
        check_subscription_owner(&subscription, owner_info)?;

        if subscription.is_consumer(&consumer) {
            msg!("Consumer {} already registered", consumer);
            return Ok(());
        }
        if subscription.consumers.len() >= MAX_CONSUMERS {
            return Err(CoordinatorError::TooManyConsumers.into());
        }

        subscription.consumers.push(consumer);
        subscription.save(&mut subscription_info.data.borrow_mut())?;

        CoordinatorEvent::ConsumerAdded {
            subscription_id,
            consumer,
        }
        .emit();
        Ok(())
    }

    fn process_remove_consumer(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        subscription_id: u64,
        consumer: Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;

        let mut subscription = load_subscription(program_id, subscription_info, subscription_id)?;
        check_subscription_owner(&subscription, owner_info)?;

        let position = subscription
            .consumers
            .iter()
            .position(|registered| *registered == consumer)
            .ok_or(CoordinatorError::InvalidConsumer)?;
        subscription.consumers.remove(position);

        // Shrinking the list leaves stale bytes past the new end
        let mut data = subscription_info.data.borrow_mut();
        data.fill(0);
        subscription.save(&mut data)?;

        CoordinatorEvent::ConsumerRemoved {
            subscription_id,
            consumer,
        }
        .emit();
        Ok(())
    }

    fn process_request_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request: RandomWordsRequest,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let requester_info = next_account_info(account_info_iter)?;
        let payer_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !requester_info.is_signer || !payer_info.is_signer {
            msg!("Requester and payer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut coordinator = load_coordinator(program_id, coordinator_info)?;
        let subscription =
            load_subscription(program_id, subscription_info, request.subscription_id)?;

        if !subscription.is_consumer(requester_info.key) {
            msg!(
                "{} is not a consumer of subscription {}",
                requester_info.key,
                request.subscription_id
            );
            return Err(CoordinatorError::InvalidConsumer.into());
        }
        if request.num_words > MAX_NUM_WORDS {
            return Err(CoordinatorError::NumWordsTooBig.into());
        }
        if request.minimum_request_confirmations > MAX_REQUEST_CONFIRMATIONS {
            return Err(CoordinatorError::InvalidRequestConfirmations.into());
        }
        if request.callback_gas_limit > MAX_GAS_LIMIT {
            return Err(CoordinatorError::GasLimitTooBig.into());
        }

        let request_id = coordinator.next_request_id;
        let (expected_request, bump) = find_request_address(program_id, request_id);
        if *request_info.key != expected_request {
            msg!("Request account is not the address for id {}", request_id);
            return Err(CoordinatorError::InvalidRequestAccount.into());
        }

        create_pda_account(
            payer_info,
            request_info,
            system_program_info,
            RandomnessRequest::LEN,
            program_id,
            &[REQUEST_SEED, &request_id.to_le_bytes(), &[bump]],
        )?;

        let randomness_request = RandomnessRequest {
            is_initialized: true,
            request_id,
            subscription_id: request.subscription_id,
            consumer: *requester_info.key,
            callback_program: *requester_info.owner,
            key_hash: request.key_hash,
            minimum_request_confirmations: request.minimum_request_confirmations,
            callback_gas_limit: request.callback_gas_limit,
            num_words: request.num_words,
            requested_at_slot: Clock::get()?.slot,
        };
        randomness_request.save(&mut request_info.data.borrow_mut())?;

        coordinator.next_request_id = request_id
            .checked_add(1)
            .ok_or(ProgramError::ArithmeticOverflow)?;
        coordinator.save(&mut coordinator_info.data.borrow_mut())?;

        set_return_data(&request_id.to_le_bytes());

        CoordinatorEvent::RandomWordsRequested {
            key_hash: request.key_hash,
            request_id,
            subscription_id: request.subscription_id,
            minimum_request_confirmations: request.minimum_request_confirmations,
            callback_gas_limit: request.callback_gas_limit,
            num_words: request.num_words,
            sender: *requester_info.key,
        }
        .emit();
        Ok(())
    }

    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: Option<Vec<RandomWord>>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let fulfiller_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;
        let consumer_program_info = next_account_info(account_info_iter)?;
        let forwarded: Vec<AccountInfo> = account_info_iter.cloned().collect();

        if !fulfiller_info.is_signer {
            msg!("Fulfiller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        // A fulfilled request's account is closed, so it reads as nonexistent
        let (expected_request, _) = find_request_address(program_id, request_id);
        if *request_info.key != expected_request || request_info.owner != program_id {
            msg!("No outstanding request with id {}", request_id);
            return Err(CoordinatorError::NonexistentRequest.into());
        }
        let request = RandomnessRequest::load(&request_info.data.borrow())?;
        if request.request_id != request_id {
            return Err(CoordinatorError::NonexistentRequest.into());
        }

        let coordinator = load_coordinator(program_id, coordinator_info)?;
        let mut subscription =
            load_subscription(program_id, subscription_info, request.subscription_id)?;

        let (expected_authority, authority_bump) = find_authority_address(program_id);
        if *authority_info.key != expected_authority {
            msg!("Invalid coordinator authority account");
            return Err(ProgramError::InvalidArgument);
        }
        if *consumer_program_info.key != request.callback_program {
            msg!(
                "Request {} must be delivered to {}",
                request_id,
                request.callback_program
            );
            return Err(ProgramError::IncorrectProgramId);
        }

        let words = match random_words {
            Some(words) => {
                if *fulfiller_info.key != coordinator.admin {
                    msg!("Only admin {} may supply random words", coordinator.admin);
                    return Err(CoordinatorError::MustBeAdmin.into());
                }
                if words.len() != request.num_words as usize {
                    msg!(
                        "Expected {} random words, got {}",
                        request.num_words,
                        words.len()
                    );
                    return Err(CoordinatorError::InvalidRandomWords.into());
                }
                words
            }
            None => derive_random_words(request_id, request.num_words),
        };

        let payment = coordinator.payment_for(request.callback_gas_limit)?;
        subscription.balance = subscription
            .balance
            .checked_sub(payment)
            .ok_or(CoordinatorError::InsufficientBalance)?;
        subscription.save(&mut subscription_info.data.borrow_mut())?;

        // Close the request before calling out
        let refund = request_info.lamports();
        **request_info.lamports.borrow_mut() = 0;
        **fulfiller_info.lamports.borrow_mut() = fulfiller_info
            .lamports()
            .checked_add(refund)
            .ok_or(ProgramError::ArithmeticOverflow)?;
        request_info.data.borrow_mut().fill(0);

        let mut metas = vec![AccountMeta::new_readonly(*authority_info.key, true)];
        metas.extend(forwarded.iter().map(|info| AccountMeta {
            pubkey: *info.key,
            is_signer: info.is_signer,
            is_writable: info.is_writable,
        }));
        let callback = Instruction {
            program_id: request.callback_program,
            accounts: metas,
            data: pack_fulfill_random_words(request_id, &words),
        };

        let mut callback_infos = vec![authority_info.clone()];
        callback_infos.extend(forwarded);
        callback_infos.push(consumer_program_info.clone());

        invoke_signed(
            &callback,
            &callback_infos,
            &[&[AUTHORITY_SEED, &[authority_bump]]],
        )?;

        CoordinatorEvent::RandomWordsFulfilled {
            request_id,
            payment,
            success: true,
        }
        .emit();
        Ok(())
    }
}

/// Create a program-owned PDA funded for rent exemption by `payer_info`.
fn create_pda_account<'a>(
    payer_info: &AccountInfo<'a>,
    new_account_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    space: usize,
    program_id: &Pubkey,
    seeds: &[&[u8]],
) -> ProgramResult {
    if new_account_info.owner == program_id {
        msg!("Account {} already exists", new_account_info.key);
        return Err(ProgramError::AccountAlreadyInitialized);
    }

    let rent = Rent::get()?;
    invoke_signed(
        &system_instruction::create_account(
            payer_info.key,
            new_account_info.key,
            rent.minimum_balance(space),
            space as u64,
            program_id,
        ),
        &[
            payer_info.clone(),
            new_account_info.clone(),
            system_program_info.clone(),
        ],
        &[seeds],
    )
}

fn load_coordinator(program_id: &Pubkey, coordinator_info: &AccountInfo) -> Result<Coordinator, ProgramError> {
    let (expected_coordinator, _) = find_coordinator_address(program_id);
    if *coordinator_info.key != expected_coordinator || coordinator_info.owner != program_id {
        msg!("Invalid coordinator account");
        return Err(ProgramError::InvalidArgument);
    }
    Coordinator::load(&coordinator_info.data.borrow())
}

fn load_subscription(
    program_id: &Pubkey,
    subscription_info: &AccountInfo,
    subscription_id: u64,
) -> Result<Subscription, ProgramError> {
    let (expected_subscription, _) = find_subscription_address(program_id, subscription_id);
    if *subscription_info.key != expected_subscription || subscription_info.owner != program_id {
        msg!("Subscription {} does not exist", subscription_id);
        return Err(CoordinatorError::InvalidSubscription.into());
    }
    Subscription::load(&subscription_info.data.borrow())
}

fn check_subscription_owner(subscription: &Subscription, owner_info: &AccountInfo) -> ProgramResult {
    if !owner_info.is_signer || subscription.owner != *owner_info.key {
        msg!("Only the owner of subscription {} may change it", subscription.id);
        return Err(CoordinatorError::MustBeSubOwner.into());
    }
    Ok(())
}
