//! Slime chunk prediction.
//!
//! The game seeds a Mersenne Twister (MT19937) from the chunk coordinates and
//! tests its first output for divisibility by ten, using the same
//! multiply-high reciprocal trick the game's compiler emits. The world seed is
//! not an input.

const MT_M: usize = 397;
const MT_MATRIX_A: u32 = 0x9908_b0df;
const MT_UPPER_MASK: u32 = 0x8000_0000;
const MT_LOWER_MASK: u32 = 0x7fff_ffff;

/// First tempered output of MT19937 seeded with `seed`.
///
/// Only state words 0, 1 and 397 feed the first output, so the state is
/// initialized only that far.
fn mt19937_first(seed: u32) -> u32 {
    let mut state = [0u32; MT_M + 1];
    state[0] = seed;
    for i in 1..=MT_M {
        let prev = state[i - 1];
        state[i] = 1_812_433_253u32
            .wrapping_mul(prev ^ (prev >> 30))
            .wrapping_add(i as u32);
    }

    let y = (state[0] & MT_UPPER_MASK) | (state[1] & MT_LOWER_MASK);
    let mut x = state[MT_M] ^ (y >> 1);
    if y & 1 != 0 {
        x ^= MT_MATRIX_A;
    }

    let mut out = x;
    out ^= out >> 11;
    out ^= (out << 7) & 0x9d2c_5680;
    out ^= (out << 15) & 0xefc6_0000;
    out ^= out >> 18;
    out
}

/// Returns `true` if slimes spawn in chunk (`chunk_x`, `chunk_z`).
pub fn is_slime_chunk(chunk_x: i32, chunk_z: i32) -> bool {
    let seed = (chunk_x as u32).wrapping_mul(0x1f1f_1f1f) ^ (chunk_z as u32);
    let n = mt19937_first(seed);
    let hi = ((u64::from(n) * 0xcccc_cccd) >> 32) as u32;
    let res = (hi >> 3).wrapping_mul(5).wrapping_mul(2);
    n == res
}
