// Raffle Program - Randomness coordinator interface
use std::convert::TryInto;

use solana_program::{
    account_info::AccountInfo,
    msg,
    program::{get_return_data, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
};
use vrf_coordinator::{
    find_authority_address,
    instruction::{self as coordinator_instruction, RandomWordsRequest},
    RandomWord,
};

use crate::error::RaffleError;

/// Ask the coordinator for random words and return the id it assigned.
///
/// `account_infos` must hold every account named by the coordinator's request
/// instruction; `signer_seeds` sign for `requester`.
#[allow(clippy::too_many_arguments)]
pub fn request_random_words<'a>(
    coordinator_program: &Pubkey,
    requester: &Pubkey,
    payer: &Pubkey,
    request_account: &Pubkey,
    request: RandomWordsRequest,
    account_infos: &[AccountInfo<'a>],
    signer_seeds: &[&[u8]],
) -> Result<u64, ProgramError> {
    let instruction = coordinator_instruction::request_random_words(
        coordinator_program,
        requester,
        payer,
        request_account,
        request,
    );
    invoke_signed(&instruction, account_infos, &[signer_seeds])?;

    match get_return_data() {
        Some((program_id, data)) if program_id == *coordinator_program => {
            let bytes: [u8; 8] = data
                .as_slice()
                .try_into()
                .map_err(|_| RaffleError::InvalidCoordinatorResponse)?;
            Ok(u64::from_le_bytes(bytes))
        }
        _ => {
            msg!("Coordinator returned no request id");
            Err(RaffleError::InvalidCoordinatorResponse.into())
        }
    }
}

/// Fulfillments are only accepted when signed by the coordinator's authority.
pub fn verify_coordinator_authority(
    authority_info: &AccountInfo,
    coordinator_program: &Pubkey,
) -> Result<(), RaffleError> {
    let (expected_authority, _) = find_authority_address(coordinator_program);
    if *authority_info.key != expected_authority || !authority_info.is_signer {
        msg!("Fulfillment not signed by coordinator {}", coordinator_program);
        return Err(RaffleError::OnlyCoordinatorCanFulfill);
    }
    Ok(())
}

/// Reduce a big-endian 256-bit random word modulo `player_count`.
pub fn winner_index(word: &RandomWord, player_count: usize) -> Option<usize> {
    if player_count == 0 {
        return None;
    }
    let modulus = player_count as u128;
    let remainder = word
        .iter()
        .fold(0u128, |acc, byte| ((acc << 8) | u128::from(*byte)) % modulus);
    Some(remainder as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_full_width() {
        // 2^256 - 1 = 1 (mod 7) and 5 (mod 10)
        assert_eq!(winner_index(&[0xFF; 32], 7), Some(1));
        assert_eq!(winner_index(&[0xFF; 32], 10), Some(5));
    }

    #[test]
    fn low_bytes_only() {
        let mut word = [0u8; 32];
        word[31] = 6;
        assert_eq!(winner_index(&word, 4), Some(2));
        assert_eq!(winner_index(&word, 1), Some(0));
    }

    #[test]
    fn high_byte_counts() {
        // 2^248 = 1 (mod 3); truncating to the low bytes would give 0
        let mut word = [0u8; 32];
        word[0] = 1;
        assert_eq!(winner_index(&word, 3), Some(1));
    }

    #[test]
    fn no_players_no_winner() {
        assert_eq!(winner_index(&[0xAB; 32], 0), None);
    }
}
