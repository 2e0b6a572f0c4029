//! Pairing code alphabet and generation (I1).
//!
//! The alphabet drops visually ambiguous characters (`0`/`O`, `1`/`I`) so a
//! code read aloud or typed on a phone keyboard doesn't get mistyped.

use rand::Rng;

pub const CODE_LENGTH: usize = 8;

/// `A-Z` ∪ `2-9` minus `{0,O,1,I}` — 32 unambiguous symbols.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Draw one uniformly random code over [`ALPHABET`]. Collision checking
/// against live codes is the caller's responsibility (rejection sampling
/// lives in `PairingService::create_pairing_request` /
/// `create_wallet_pairing_code`, which can see both tables).
#[must_use]
pub fn generate() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect()
}

/// Normalize user-supplied input the way `validateCode` does: upper-case
/// and trim before lookup.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_only_the_unambiguous_alphabet() {
        for _ in 0..200 {
            let code = generate();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| ALPHABET.contains(&(c as u8))));
            assert!(!code.contains(['0', 'O', '1', 'I']));
        }
    }

    #[test]
    fn normalize_trims_and_upper_cases() {
        assert_eq!(normalize("  ab3dEfgh \n"), "AB3DEFGH");
    }
}
