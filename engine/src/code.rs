//! Join-code drawing.
//!
//! Codes are 6 uppercase characters from an alphabet without the easily
//! confused glyphs (no I/L/O/0/1). Uniqueness among active meetings is the
//! caller's job: draw, check the store, redraw on collision up to
//! [`CODE_RETRY_BUDGET`] times, and accept the final draw after that.

use rand::Rng;

pub const CODE_LEN: usize = 6;
pub const CODE_RETRY_BUDGET: usize = 5;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub fn draw_code(rng: &mut impl Rng) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Canonical form used for storage and lookup, so code matching is
/// case-insensitive.
pub fn normalize_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn codes_use_the_restricted_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = draw_code(&mut rng);
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn draws_are_distinct_in_practice() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            seen.insert(draw_code(&mut rng));
        }
        // 31^6 possibilities; a thousand draws colliding would mean the rng
        // is broken.
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn normalize_uppercases_and_trims() {
        assert_eq!(normalize_code("  ab23cd "), "AB23CD");
        assert_eq!(normalize_code("XYZ789"), "XYZ789");
    }
}
