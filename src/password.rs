//! Password hashing and verification.
//!
//! Stored hashes are bcrypt with a per-hash random salt, so the same
//! password hashes differently each time. Verification distinguishes a
//! plain mismatch (`Ok(false)`) from a corrupt or truncated stored hash
//! (`Err`), which callers treat as a server fault rather than a failed
//! login.

use bcrypt::BcryptError;

/// Work factor for new hashes.
const HASH_COST: u32 = 12;

pub fn hash(password: &str) -> Result<String, BcryptError> {
    bcrypt::hash(password, HASH_COST)
}

pub fn verify(password: &str, stored_hash: &str) -> Result<bool, BcryptError> {
    bcrypt::verify(password, stored_hash)
}
