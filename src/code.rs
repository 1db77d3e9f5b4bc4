//! Secure one-time code generation.

use rand::{rngs::OsRng, CryptoRng, Rng, RngCore};

/// Backup codes issued once at TOTP enrollment.
pub const BACKUP_CODE_COUNT: usize = 8;

const BACKUP_CODE_LEN: usize = 8;
// 32 characters: no 0/O/1/I, and 256 % 32 == 0 so a plain byte modulo
// stays uniform.
const BACKUP_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate a fixed-length numeric code, uniform over
/// `[10^(digits-1), 10^digits - 1]`.
///
/// `digits` is clamped to `1..=18`. The draw goes through the rand
/// uniform sampler, so there is no modulo step to bias the low range.
#[must_use]
pub fn generate_numeric_code(digits: u32) -> String {
    generate_numeric_code_with_rng(&mut OsRng, digits)
}

pub(crate) fn generate_numeric_code_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
    digits: u32,
) -> String {
    let digits = digits.clamp(1, 18);
    let lower = 10u64.pow(digits - 1);
    let upper = 10u64.pow(digits) - 1;
    // digits == 1 gives [1, 9]: the leading digit is never zero.
    rng.gen_range(lower..=upper).to_string()
}

/// Generate `count` opaque one-time backup codes.
#[must_use]
pub fn generate_backup_codes(count: usize) -> Vec<String> {
    generate_backup_codes_with_rng(&mut OsRng, count)
}

pub(crate) fn generate_backup_codes_with_rng<R: RngCore>(rng: &mut R, count: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            let mut raw = [0u8; BACKUP_CODE_LEN];
            rng.fill_bytes(&mut raw);
            raw.iter()
                .map(|byte| BACKUP_CODE_ALPHABET[usize::from(*byte) % BACKUP_CODE_ALPHABET.len()] as char)
                .collect()
        })
        .collect()
}
