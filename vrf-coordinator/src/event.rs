// Randomness coordinator - Events
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// Notifications logged by the coordinator. Each is written as a readable
/// line and as a borsh payload through `sol_log_data`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum CoordinatorEvent {
    SubscriptionCreated {
        subscription_id: u64,
        owner: Pubkey,
    },
    SubscriptionFunded {
        subscription_id: u64,
        old_balance: u64,
        new_balance: u64,
    },
    ConsumerAdded {
        subscription_id: u64,
        consumer: Pubkey,
    },
    ConsumerRemoved {
        subscription_id: u64,
        consumer: Pubkey,
    },
    RandomWordsRequested {
        key_hash: [u8; 32],
        request_id: u64,
        subscription_id: u64,
        minimum_request_confirmations: u16,
        callback_gas_limit: u32,
        num_words: u32,
        sender: Pubkey,
    },
    RandomWordsFulfilled {
        request_id: u64,
        payment: u64,
        success: bool,
    },
}

impl CoordinatorEvent {
    pub fn emit(&self) {
        msg!("Event: {:?}", self);
        if let Ok(payload) = self.try_to_vec() {
            sol_log_data(&[&payload]);
        }
    }
}
