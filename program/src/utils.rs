// Raffle Program - Utility Functions
use solana_program::{
    account_info::AccountInfo, program_error::ProgramError, pubkey::Pubkey, rent::Rent,
    sysvar::Sysvar,
};

use crate::state::RAFFLE_SEED;

/// Find the raffle account owned by `creator`
pub fn find_raffle_address(program_id: &Pubkey, creator: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED, creator.as_ref()], program_id)
}

/// Lamports held above the rent-exempt minimum
pub fn pooled_lamports(lamports: u64, data_len: usize, rent: &Rent) -> u64 {
    lamports.saturating_sub(rent.minimum_balance(data_len))
}

pub fn pooled_balance(raffle_info: &AccountInfo) -> Result<u64, ProgramError> {
    let rent = Rent::get()?;
    Ok(pooled_lamports(
        raffle_info.lamports(),
        raffle_info.data_len(),
        &rent,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_excludes_rent() {
        let rent = Rent::default();
        let reserve = rent.minimum_balance(100);
        assert_eq!(pooled_lamports(reserve, 100, &rent), 0);
        assert_eq!(pooled_lamports(reserve + 42, 100, &rent), 42);
        assert_eq!(pooled_lamports(reserve - 1, 100, &rent), 0);
    }
}
