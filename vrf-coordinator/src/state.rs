// Randomness coordinator - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    borsh::try_from_slice_unchecked,
    clock::Slot,
    program_error::ProgramError,
    program_pack::{IsInitialized, Sealed},
    pubkey::Pubkey,
};

use crate::error::CoordinatorError;

pub const COORDINATOR_SEED: &[u8] = b"coordinator";
pub const SUBSCRIPTION_SEED: &[u8] = b"subscription";
pub const REQUEST_SEED: &[u8] = b"request";
pub const AUTHORITY_SEED: &[u8] = b"authority";

pub const MAX_CONSUMERS: usize = 100;
pub const MAX_NUM_WORDS: u32 = 500;
pub const MAX_REQUEST_CONFIRMATIONS: u16 = 200;
pub const MAX_GAS_LIMIT: u32 = 2_500_000;

/// A 256-bit random value, big-endian.
pub type RandomWord = [u8; 32];

/// Global coordinator settings and id counters
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Coordinator {
    pub is_initialized: bool,
    /// Account that initialized the coordinator
    pub admin: Pubkey,
    /// Flat fee charged per fulfillment
    pub base_fee: u64,
    /// Fee per unit of callback gas limit
    pub gas_price_link: u64,
    /// Id of the most recently created subscription (0 = none yet)
    pub current_subscription_id: u64,
    /// Id handed to the next request; ids start at 1
    pub next_request_id: u64,
}

/// A funded subscription and the consumers allowed to draw on it
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub is_initialized: bool,
    pub id: u64,
    pub owner: Pubkey,
    pub balance: u64,
    pub consumers: Vec<Pubkey>,
}

/// An outstanding request. The account is closed when the request is fulfilled.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RandomnessRequest {
    pub is_initialized: bool,
    pub request_id: u64,
    pub subscription_id: u64,
    /// Account that signed the request
    pub consumer: Pubkey,
    /// Program invoked with the random words (owner of `consumer`)
    pub callback_program: Pubkey,
    pub key_hash: [u8; 32],
    pub minimum_request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
    pub requested_at_slot: Slot,
}

impl Sealed for Coordinator {}
impl Sealed for Subscription {}
impl Sealed for RandomnessRequest {}

impl IsInitialized for Coordinator {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl IsInitialized for Subscription {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl IsInitialized for RandomnessRequest {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Coordinator {
    pub const LEN: usize = 1 + 32 + 8 + 8 + 8 + 8;

    pub fn load(data: &[u8]) -> Result<Self, ProgramError> {
        let coordinator: Self =
            try_from_slice_unchecked(data).map_err(|_| ProgramError::InvalidAccountData)?;
        if !coordinator.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(coordinator)
    }

    pub fn save(&self, data: &mut [u8]) -> Result<(), ProgramError> {
        write_account(self, data)
    }

    /// Amount charged to a subscription for fulfilling one request.
    pub fn payment_for(&self, callback_gas_limit: u32) -> Result<u64, ProgramError> {
        self.gas_price_link
            .checked_mul(u64::from(callback_gas_limit))
            .and_then(|gas_fee| gas_fee.checked_add(self.base_fee))
            .ok_or(ProgramError::ArithmeticOverflow)
    }
}

impl Subscription {
    pub const LEN: usize = 1 + 8 + 32 + 8 + 4 + 32 * MAX_CONSUMERS;

    pub fn load(data: &[u8]) -> Result<Self, ProgramError> {
        let subscription: Self = try_from_slice_unchecked(data)
            .map_err(|_| ProgramError::from(CoordinatorError::InvalidSubscription))?;
        if !subscription.is_initialized {
            return Err(CoordinatorError::InvalidSubscription.into());
        }
        Ok(subscription)
    }

    pub fn save(&self, data: &mut [u8]) -> Result<(), ProgramError> {
        write_account(self, data)
    }

    pub fn is_consumer(&self, consumer: &Pubkey) -> bool {
        self.consumers.contains(consumer)
    }
}

impl RandomnessRequest {
    pub const LEN: usize = 1 + 8 + 8 + 32 + 32 + 32 + 2 + 4 + 4 + 8;

    pub fn load(data: &[u8]) -> Result<Self, ProgramError> {
        let request: Self = try_from_slice_unchecked(data)
            .map_err(|_| ProgramError::from(CoordinatorError::NonexistentRequest))?;
        if !request.is_initialized {
            return Err(CoordinatorError::NonexistentRequest.into());
        }
        Ok(request)
    }

    pub fn save(&self, data: &mut [u8]) -> Result<(), ProgramError> {
        write_account(self, data)
    }
}

fn write_account<T: BorshSerialize>(value: &T, mut data: &mut [u8]) -> Result<(), ProgramError> {
    value
        .serialize(&mut data)
        .map_err(|_| ProgramError::AccountDataTooSmall)
}

pub fn find_coordinator_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[COORDINATOR_SEED], program_id)
}

pub fn find_subscription_address(program_id: &Pubkey, subscription_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SUBSCRIPTION_SEED, &subscription_id.to_le_bytes()], program_id)
}

pub fn find_request_address(program_id: &Pubkey, request_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[REQUEST_SEED, &request_id.to_le_bytes()], program_id)
}

/// Signer the coordinator uses when calling back into consumers.
pub fn find_authority_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[AUTHORITY_SEED], program_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use borsh::BorshSerialize;

    #[test]
    fn lengths_match_serialized_sizes() {
        let coordinator = Coordinator {
            is_initialized: true,
            admin: Pubkey::new_unique(),
            base_fee: 1,
            gas_price_link: 2,
            current_subscription_id: 3,
            next_request_id: 4,
        };
        assert_eq!(coordinator.try_to_vec().unwrap().len(), Coordinator::LEN);

        let subscription = Subscription {
            is_initialized: true,
            id: 1,
            owner: Pubkey::new_unique(),
            balance: 0,
            consumers: vec![Pubkey::new_unique(); MAX_CONSUMERS],
        };
        assert_eq!(subscription.try_to_vec().unwrap().len(), Subscription::LEN);

        let request = RandomnessRequest {
            is_initialized: true,
            request_id: 1,
            subscription_id: 1,
            consumer: Pubkey::new_unique(),
            callback_program: Pubkey::new_unique(),
            key_hash: [7; 32],
            minimum_request_confirmations: 3,
            callback_gas_limit: 500_000,
            num_words: 1,
            requested_at_slot: 10,
        };
        assert_eq!(request.try_to_vec().unwrap().len(), RandomnessRequest::LEN);
    }

    #[test]
    fn payment_is_base_fee_plus_gas() {
        let coordinator = Coordinator {
            is_initialized: true,
            admin: Pubkey::default(),
            base_fee: 250_000_000_000_000_000,
            gas_price_link: 1_000_000_000,
            current_subscription_id: 0,
            next_request_id: 1,
        };
        assert_eq!(
            coordinator.payment_for(500_000).unwrap(),
            250_000_000_000_000_000 + 500_000_000_000_000
        );
    }

    #[test]
    fn zeroed_request_account_is_nonexistent() {
        let data = [0u8; RandomnessRequest::LEN];
        assert_eq!(
            RandomnessRequest::load(&data),
            Err(CoordinatorError::NonexistentRequest.into())
        );
        assert_eq!(
            RandomnessRequest::load(&[]),
            Err(CoordinatorError::NonexistentRequest.into())
        );
    }
}
