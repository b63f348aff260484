// Raffle Program - State
use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    borsh::try_from_slice_unchecked,
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Sealed},
    pubkey::Pubkey,
};
use vrf_coordinator::RandomWord;

use crate::{config::RaffleConfig, error::RaffleError, oracle::winner_index};

pub const RAFFLE_SEED: &[u8] = b"raffle";

/// Largest round the raffle account can hold
pub const MAX_PLAYERS: usize = 256;
/// Random words requested per round
pub const NUM_WORDS: u32 = 1;
/// Confirmations the coordinator should wait before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Accepting entries
    Open,
    /// Entry closed, waiting for the coordinator to deliver randomness
    Calculating,
}

/// The four conditions that together allow a round to close
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub is_open: bool,
    pub time_passed: bool,
    pub has_players: bool,
    pub has_balance: bool,
}

impl UpkeepCheck {
    pub fn upkeep_needed(&self) -> bool {
        self.is_open && self.time_passed && self.has_players && self.has_balance
    }
}

impl fmt::Display for UpkeepCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "is_open: {}, time_passed: {}, has_players: {}, has_balance: {}",
            self.is_open, self.time_passed, self.has_players, self.has_balance
        )
    }
}

/// Raffle account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Raffle {
    is_initialized: bool,
    bump: u8,
    /// Account that created the raffle, part of its address
    creator: Pubkey,
    /// Coordinator program randomness is requested from
    vrf_coordinator: Pubkey,
    entrance_fee: u64,
    interval: u64,
    key_hash: [u8; 32],
    subscription_id: u64,
    callback_gas_limit: u32,
    raffle_state: RaffleState,
    last_timestamp: UnixTimestamp,
    /// Winner of the last settled round, default until the first one
    recent_winner: Pubkey,
    /// Set while calculating
    pending_request_id: Option<u64>,
    /// Entries of the current round in entry order; one identity may appear many times
    players: Vec<Pubkey>,
}

impl Sealed for Raffle {}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Raffle {
    pub const LEN: usize =
        1 + 1 + 32 + 32 + 8 + 8 + 32 + 8 + 4 + 1 + 8 + 32 + (1 + 8) + (4 + 32 * MAX_PLAYERS);

    pub fn new(
        config: &RaffleConfig,
        creator: Pubkey,
        vrf_coordinator: Pubkey,
        bump: u8,
        now: UnixTimestamp,
    ) -> Self {
        Self {
            is_initialized: true,
            bump,
            creator,
            vrf_coordinator,
            entrance_fee: config.entrance_fee,
            interval: config.interval,
            key_hash: config.key_hash,
            subscription_id: config.subscription_id,
            callback_gas_limit: config.callback_gas_limit,
            raffle_state: RaffleState::Open,
            last_timestamp: now,
            recent_winner: Pubkey::default(),
            pending_request_id: None,
            players: Vec::new(),
        }
    }

    pub fn load(data: &[u8]) -> Result<Self, ProgramError> {
        let raffle: Self =
            try_from_slice_unchecked(data).map_err(|_| ProgramError::InvalidAccountData)?;
        if !raffle.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(raffle)
    }

    pub fn save(&self, mut data: &mut [u8]) -> Result<(), ProgramError> {
        self.serialize(&mut data)
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    /// Record one entry for `player`, who pays `payment` lamports.
    pub fn enter(&mut self, player: Pubkey, payment: u64) -> Result<(), RaffleError> {
        if payment < self.entrance_fee {
            return Err(RaffleError::NotEnoughLamportsEntered);
        }
        if self.raffle_state != RaffleState::Open {
            return Err(RaffleError::NotOpen);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(RaffleError::RaffleFull);
        }
        self.players.push(player);
        Ok(())
    }

    /// Evaluate whether the round may close at `now` with `pooled` lamports held.
    pub fn check_upkeep(&self, now: UnixTimestamp, pooled: u64) -> UpkeepCheck {
        let interval = i64::try_from(self.interval).unwrap_or(i64::MAX);
        UpkeepCheck {
            is_open: self.raffle_state == RaffleState::Open,
            time_passed: now.saturating_sub(self.last_timestamp) >= interval,
            has_players: !self.players.is_empty(),
            has_balance: pooled > 0,
        }
    }

    /// Close entry and remember the request the coordinator will answer.
    pub fn begin_calculating(&mut self, request_id: u64) {
        self.raffle_state = RaffleState::Calculating;
        self.pending_request_id = Some(request_id);
    }

    /// Pick the winner of the pending round and reopen the raffle.
    pub fn settle(
        &mut self,
        request_id: u64,
        random_words: &[RandomWord],
        now: UnixTimestamp,
    ) -> Result<Pubkey, RaffleError> {
        if self.raffle_state != RaffleState::Calculating
            || self.pending_request_id != Some(request_id)
        {
            return Err(RaffleError::NonexistentRequest);
        }
        let word = random_words
            .first()
            .ok_or(RaffleError::InvalidCoordinatorResponse)?;
        let index = winner_index(word, self.players.len()).ok_or(RaffleError::IndexOutOfRange)?;
        let winner = self.players[index];

        self.recent_winner = winner;
        self.players.clear();
        self.raffle_state = RaffleState::Open;
        self.last_timestamp = now;
        self.pending_request_id = None;
        Ok(winner)
    }

    pub fn entrance_fee(&self) -> u64 {
        self.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn raffle_state(&self) -> RaffleState {
        self.raffle_state
    }

    pub fn player(&self, index: usize) -> Result<Pubkey, RaffleError> {
        self.players
            .get(index)
            .copied()
            .ok_or(RaffleError::IndexOutOfRange)
    }

    pub fn players(&self) -> &[Pubkey] {
        &self.players
    }

    pub fn number_of_players(&self) -> usize {
        self.players.len()
    }

    pub fn recent_winner(&self) -> Pubkey {
        self.recent_winner
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn pending_request_id(&self) -> Option<u64> {
        self.pending_request_id
    }

    pub fn num_words(&self) -> u32 {
        NUM_WORDS
    }

    pub fn request_confirmations(&self) -> u16 {
        REQUEST_CONFIRMATIONS
    }

    pub fn creator(&self) -> Pubkey {
        self.creator
    }

    pub fn bump(&self) -> u8 {
        self.bump
    }

    pub fn vrf_coordinator(&self) -> Pubkey {
        self.vrf_coordinator
    }

    pub fn key_hash(&self) -> [u8; 32] {
        self.key_hash
    }

    pub fn subscription_id(&self) -> u64 {
        self.subscription_id
    }

    pub fn callback_gas_limit(&self) -> u32 {
        self.callback_gas_limit
    }
}
