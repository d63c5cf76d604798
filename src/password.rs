//! Password hashing and verification.

/// bcrypt work factor. Matches the cost the account data was created with.
const HASH_COST: u32 = 10;

/// Hash a plaintext password with a per-hash random salt.
pub fn hash_password(plain: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plain, HASH_COST)
}

/// Check a plaintext password against a stored digest.
pub fn verify_password(plain: &str, digest: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(plain, digest)
}
