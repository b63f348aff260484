// Raffle Program - Configuration
use borsh::{BorshDeserialize, BorshSerialize};
use vrf_coordinator::state::MAX_GAS_LIMIT;

use crate::error::RaffleError;

/// 0.1 SOL
pub const DEFAULT_ENTRANCE_FEE: u64 = 100_000_000;
pub const DEFAULT_INTERVAL: u64 = 30;
pub const DEFAULT_SUBSCRIPTION_ID: u64 = 1;
pub const DEFAULT_CALLBACK_GAS_LIMIT: u32 = 500_000;

/// Gas lane used by local deployments
pub const DEFAULT_KEY_HASH: [u8; 32] = [
    0x47, 0x4e, 0x34, 0xa0, 0x77, 0xdf, 0x58, 0x80, 0x7d, 0xbe, 0x9c, 0x96, 0xd3, 0xc0, 0x09,
    0xb2, 0x3b, 0x3c, 0x6d, 0x0c, 0xce, 0x43, 0x3e, 0x59, 0xbb, 0xf5, 0xb3, 0x4f, 0x82, 0x3b,
    0xc5, 0x6c,
];

/// Parameters fixed when a raffle is created
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum payment to enter, in lamports
    pub entrance_fee: u64,
    /// Minimum seconds between rounds
    pub interval: u64,
    /// Coordinator gas lane
    pub key_hash: [u8; 32],
    /// Coordinator subscription paying for randomness
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            entrance_fee: DEFAULT_ENTRANCE_FEE,
            interval: DEFAULT_INTERVAL,
            key_hash: DEFAULT_KEY_HASH,
            subscription_id: DEFAULT_SUBSCRIPTION_ID,
            callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
        }
    }
}

impl RaffleConfig {
    pub const LEN: usize = 8 + 8 + 32 + 8 + 4;

    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.entrance_fee == 0 {
            return Err(RaffleError::InvalidConfig);
        }
        // Elapsed time is compared as i64
        if i64::try_from(self.interval).is_err() {
            return Err(RaffleError::InvalidConfig);
        }
        if self.callback_gas_limit > MAX_GAS_LIMIT {
            return Err(RaffleError::InvalidConfig);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = RaffleConfig::default();
        assert_eq!(config.entrance_fee, 100_000_000);
        assert_eq!(config.interval, 30);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_values() {
        let zero_fee = RaffleConfig {
            entrance_fee: 0,
            ..RaffleConfig::default()
        };
        assert_eq!(zero_fee.validate(), Err(RaffleError::InvalidConfig));

        let huge_interval = RaffleConfig {
            interval: u64::MAX,
            ..RaffleConfig::default()
        };
        assert_eq!(huge_interval.validate(), Err(RaffleError::InvalidConfig));

        let gas_limit_too_big = RaffleConfig {
            callback_gas_limit: MAX_GAS_LIMIT + 1,
            ..RaffleConfig::default()
        };
        assert_eq!(gas_limit_too_big.validate(), Err(RaffleError::InvalidConfig));
    }
}
