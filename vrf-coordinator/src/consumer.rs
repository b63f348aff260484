// Randomness coordinator - Consumer callback interface
//
// Consumer programs receive random words through an instruction whose data is
// `FULFILL_RANDOM_WORDS_TAG`, then the request id (u64 LE), the word count
// (u32 LE) and the words themselves, 32 bytes each. The first account of the
// callback is always the coordinator authority, signed by the coordinator.
use std::convert::TryInto;

use solana_program::program_error::ProgramError;

use crate::state::RandomWord;

/// First byte of a fulfillment callback
pub const FULFILL_RANDOM_WORDS_TAG: u8 = 0xFF;

pub fn pack_fulfill_random_words(request_id: u64, random_words: &[RandomWord]) -> Vec<u8> {
    let mut data = Vec::with_capacity(1 + 8 + 4 + 32 * random_words.len());
    data.push(FULFILL_RANDOM_WORDS_TAG);
    data.extend_from_slice(&request_id.to_le_bytes());
    data.extend_from_slice(&(random_words.len() as u32).to_le_bytes());
    for word in random_words {
        data.extend_from_slice(word);
    }
    data
}

/// Decode a callback body, the bytes after the tag.
pub fn unpack_fulfill_random_words(rest: &[u8]) -> Result<(u64, Vec<RandomWord>), ProgramError> {
    if rest.len() < 12 {
        return Err(ProgramError::InvalidInstructionData);
    }
    let (id_bytes, rest) = rest.split_at(8);
    let (count_bytes, words) = rest.split_at(4);
    let request_id = id_bytes
        .try_into()
        .map(u64::from_le_bytes)
        .map_err(|_| ProgramError::InvalidInstructionData)?;
    let count = count_bytes
        .try_into()
        .map(u32::from_le_bytes)
        .map_err(|_| ProgramError::InvalidInstructionData)? as usize;

    if count.checked_mul(32) != Some(words.len()) {
        return Err(ProgramError::InvalidInstructionData);
    }

    let random_words = words
        .chunks_exact(32)
        .map(|chunk| {
            let mut word = [0u8; 32];
            word.copy_from_slice(chunk);
            word
        })
        .collect();

    Ok((request_id, random_words))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_layout() {
        let data = pack_fulfill_random_words(7, &[[0xAB; 32]]);
        assert_eq!(data.len(), 1 + 8 + 4 + 32);
        assert_eq!(data[0], FULFILL_RANDOM_WORDS_TAG);
        assert_eq!(&data[1..9], &7u64.to_le_bytes());
        assert_eq!(&data[9..13], &1u32.to_le_bytes());

        let (request_id, words) = unpack_fulfill_random_words(&data[1..]).unwrap();
        assert_eq!(request_id, 7);
        assert_eq!(words, vec![[0xAB; 32]]);
    }

    #[test]
    fn word_count_must_match_payload() {
        let mut data = pack_fulfill_random_words(1, &[[1; 32], [2; 32]]);
        data.pop();
        assert_eq!(
            unpack_fulfill_random_words(&data[1..]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            unpack_fulfill_random_words(&[0; 5]),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    #[test]
    fn empty_word_list_is_well_formed() {
        let data = pack_fulfill_random_words(3, &[]);
        assert_eq!(unpack_fulfill_random_words(&data[1..]).unwrap(), (3, vec![]));
    }
}
