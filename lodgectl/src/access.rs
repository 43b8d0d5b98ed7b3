//! Boarder access codes and other short random identifiers.
//!
//! Codes are read aloud and typed on phones, so the alphabet leaves out characters that are easy to
//! confuse (`0`/`O`, `1`/`I`/`L`).

use rand::{Rng, thread_rng};

/// Uppercase letters and digits without look-alikes
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub const DEFAULT_ACCESS_CODE_LENGTH: usize = 8;

/// Draws `length` characters uniformly from [`CODE_ALPHABET`].
pub fn random_code(length: usize) -> String {
    let mut rng = thread_rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generates a boarder access code.
///
/// # Examples
///
/// ```
/// use lodgectl::access::generate_access_code;
///
/// let code = generate_access_code(8);
/// assert_eq!(code.len(), 8);
/// ```
pub fn generate_access_code(length: usize) -> String {
    random_code(length)
}

/// Normalizes a code typed by a person: surrounding whitespace and case are ignored
pub fn normalize_access_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
