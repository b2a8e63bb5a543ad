//! Password hashing for user credentials.
//!
//! # Responsibility
//! - Derive salted PBKDF2-HMAC-SHA512 hashes stored as `salt:hash` (hex).
//! - Verify plaintext against a stored value.
//!
//! # Invariants
//! - Every hash call draws a fresh random salt.
//! - Verification compares digests in constant time for equal lengths.
//! - Malformed stored values verify as `false`, never panic.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha512;

pub const PBKDF2_ROUNDS: u32 = 1000;
const SALT_BYTES: usize = 16;
const DIGEST_BYTES: usize = 64;

/// Hashes `plaintext` with a new random salt, returning `salt:hash`.
pub fn hash_password(plaintext: &str) -> String {
    let mut salt = [0_u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);
    let digest = derive(plaintext, &salt_hex);
    format!("{salt_hex}:{}", hex::encode(digest))
}

/// Re-derives with the salt stored in `stored` and compares the digests.
pub fn verify_password(plaintext: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once(':') else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };
    if salt_hex.is_empty() || expected.len() != DIGEST_BYTES {
        return false;
    }

    let actual = derive(plaintext, salt_hex);
    constant_time_eq(&actual, &expected)
}

fn derive(plaintext: &str, salt: &str) -> [u8; DIGEST_BYTES] {
    let mut digest = [0_u8; DIGEST_BYTES];
    pbkdf2_hmac::<Sha512>(
        plaintext.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ROUNDS,
        &mut digest,
    );
    digest
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
