//! High-entropy secret generation for signing keys.

use crate::error::{AccountError, AccountResult};

/// Default length of a generated secret
pub const DEFAULT_SECRET_LENGTH: usize = 64;

/// Letters, digits and punctuation that survive shell and `.env` quoting
const ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#%*+,-./:=?@^_~";

/// Generate a random secret of `length` characters.
///
/// Characters are drawn uniformly from [`ALPHABET`] using the thread-local
/// OS-seeded generator. Lengths below the minimum signing secret length are
/// rejected.
pub fn generate_secret(length: usize) -> AccountResult<String> {
    if length < crate::token::MIN_SECRET_LENGTH {
        return Err(AccountError::Internal(format!(
            "Secret length must be at least {} (got {})",
            crate::token::MIN_SECRET_LENGTH,
            length
        )));
    }

    let mut rng = rand::rng();
    let secret = std::iter::repeat_with(|| {
        let idx = rand::RngExt::random_range(&mut rng, 0..ALPHABET.len());
        ALPHABET[idx] as char
    })
    .take(length)
    .collect();

    Ok(secret)
}
