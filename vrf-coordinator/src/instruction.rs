// Randomness coordinator - Instructions
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::state::{
    find_authority_address, find_coordinator_address, find_request_address,
    find_subscription_address, RandomWord,
};

/// Parameters a consumer supplies when asking for random words
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RandomWordsRequest {
    /// Gas lane: selects the price tier / proving key the request is served from
    pub key_hash: [u8; 32],
    /// Subscription paying for the fulfillment
    pub subscription_id: u64,
    /// Confirmations to wait before answering
    pub minimum_request_confirmations: u16,
    /// Budget for the consumer callback
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum CoordinatorInstruction {
    /// Create the coordinator config account
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The admin, pays for the config account
    /// 1. `[writable]` The coordinator config account (PDA)
    /// 2. `[]` The system program
    Initialize {
        /// Flat fee charged per fulfillment
        base_fee: u64,
        /// Fee per unit of callback gas limit
        gas_price_link: u64,
    },

    /// Create a new subscription owned by the signer
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The subscription owner, pays for the account
    /// 1. `[writable]` The coordinator config account
    /// 2. `[writable]` The subscription account (PDA for the next subscription id)
    /// 3. `[]` The system program
    CreateSubscription,

    /// Credit a subscription's balance
    ///
    /// Accounts expected:
    /// 0. `[signer]` The funder
    /// 1. `[writable]` The subscription account
    FundSubscription { subscription_id: u64, amount: u64 },

    /// Allow a consumer to request randomness on a subscription
    ///
    /// Accounts expected:
    /// 0. `[signer]` The subscription owner
    /// 1. `[writable]` The subscription account
    AddConsumer { subscription_id: u64, consumer: Pubkey },

    /// Revoke a consumer
    ///
    /// Accounts expected:
    /// 0. `[signer]` The subscription owner
    /// 1. `[writable]` The subscription account
    RemoveConsumer { subscription_id: u64, consumer: Pubkey },

    /// Record a randomness request. The request id is returned via program return data.
    ///
    /// Accounts expected:
    /// 0. `[signer]` The requesting consumer
    /// 1. `[signer, writable]` The payer for the request account
    /// 2. `[writable]` The coordinator config account
    /// 3. `[]` The subscription account
    /// 4. `[writable]` The request account (PDA for the next request id)
    /// 5. `[]` The system program
    RequestRandomWords(RandomWordsRequest),

    /// Deliver random words to the consumer of a request
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The fulfiller, receives the request account's rent
    /// 1. `[]` The coordinator config account
    /// 2. `[writable]` The subscription account
    /// 3. `[writable]` The request account
    /// 4. `[]` The coordinator authority (PDA), signs the callback
    /// 5. `[]` The consumer program
    /// 6.. Accounts forwarded to the consumer callback
    FulfillRandomWords {
        request_id: u64,
        /// Words to deliver instead of the derived ones
        random_words: Option<Vec<RandomWord>>,
    },
}

impl CoordinatorInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| ProgramError::InvalidInstructionData)
    }

    pub fn pack(&self) -> Vec<u8> {
        // Serializing into a Vec cannot fail
        self.try_to_vec().unwrap_or_default()
    }
}

pub fn initialize(
    program_id: &Pubkey,
    admin: &Pubkey,
    base_fee: u64,
    gas_price_link: u64,
) -> Instruction {
    let (coordinator, _) = find_coordinator_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*admin, true),
            AccountMeta::new(coordinator, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: CoordinatorInstruction::Initialize {
            base_fee,
            gas_price_link,
        }
        .pack(),
    }
}

/// `subscription_id` must be the id the coordinator will assign next
pub fn create_subscription(program_id: &Pubkey, owner: &Pubkey, subscription_id: u64) -> Instruction {
    let (coordinator, _) = find_coordinator_address(program_id);
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new(coordinator, false),
            AccountMeta::new(subscription, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: CoordinatorInstruction::CreateSubscription.pack(),
    }
}

pub fn fund_subscription(
    program_id: &Pubkey,
    funder: &Pubkey,
    subscription_id: u64,
    amount: u64,
) -> Instruction {
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*funder, true),
            AccountMeta::new(subscription, false),
        ],
        data: CoordinatorInstruction::FundSubscription {
            subscription_id,
            amount,
        }
        .pack(),
    }
}

pub fn add_consumer(
    program_id: &Pubkey,
    owner: &Pubkey,
    subscription_id: u64,
    consumer: &Pubkey,
) -> Instruction {
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(subscription, false),
        ],
        data: CoordinatorInstruction::AddConsumer {
            subscription_id,
            consumer: *consumer,
        }
        .pack(),
    }
}

pub fn remove_consumer(
    program_id: &Pubkey,
    owner: &Pubkey,
    subscription_id: u64,
    consumer: &Pubkey,
) -> Instruction {
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(subscription, false),
        ],
        data: CoordinatorInstruction::RemoveConsumer {
            subscription_id,
            consumer: *consumer,
        }
        .pack(),
    }
}

/// Build a request for the account at `request_account`, which must be the
/// address of the coordinator's next request id.
pub fn request_random_words(
    program_id: &Pubkey,
    requester: &Pubkey,
    payer: &Pubkey,
    request_account: &Pubkey,
    request: RandomWordsRequest,
) -> Instruction {
    let (coordinator, _) = find_coordinator_address(program_id);
    let (subscription, _) = find_subscription_address(program_id, request.subscription_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*requester, true),
            AccountMeta::new(*payer, true),
            AccountMeta::new(coordinator, false),
            AccountMeta::new_readonly(subscription, false),
            AccountMeta::new(*request_account, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: CoordinatorInstruction::RequestRandomWords(request).pack(),
    }
}

/// Request builder for off-chain callers that know the next request id.
pub fn request_random_words_with_id(
    program_id: &Pubkey,
    requester: &Pubkey,
    payer: &Pubkey,
    request_id: u64,
    request: RandomWordsRequest,
) -> Instruction {
    let (request_account, _) = find_request_address(program_id, request_id);
    request_random_words(program_id, requester, payer, &request_account, request)
}

#[allow(clippy::too_many_arguments)]
pub fn fulfill_random_words(
    program_id: &Pubkey,
    fulfiller: &Pubkey,
    subscription_id: u64,
    request_id: u64,
    consumer_program: &Pubkey,
    random_words: Option<Vec<RandomWord>>,
    consumer_accounts: Vec<AccountMeta>,
) -> Instruction {
    let (coordinator, _) = find_coordinator_address(program_id);
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    let (request, _) = find_request_address(program_id, request_id);
    let (authority, _) = find_authority_address(program_id);

    let mut accounts = vec![
        AccountMeta::new(*fulfiller, true),
        AccountMeta::new_readonly(coordinator, false),
        AccountMeta::new(subscription, false),
        AccountMeta::new(request, false),
        AccountMeta::new_readonly(authority, false),
        AccountMeta::new_readonly(*consumer_program, false),
    ];
    accounts.extend(consumer_accounts);

    Instruction {
        program_id: *program_id,
        accounts,
        data: CoordinatorInstruction::FulfillRandomWords {
            request_id,
            random_words,
        }
        .pack(),
    }
}
