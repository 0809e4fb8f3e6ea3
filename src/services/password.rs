//! Credential hashing.
//!
//! Passwords and API key secrets are stored only as bcrypt hashes. bcrypt is
//! intentionally slow with a configurable cost factor, and `bcrypt::verify`
//! compares in constant time, so a stored hash leaks nothing useful and timing
//! does not reveal how close a guess was.

/// Hash a secret with the configured cost factor.
///
/// Used for both signup passwords and generated API key secrets.
pub fn hash_secret(secret: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(secret, cost)
}

/// Verify a presented secret against a stored hash.
///
/// Returns `Ok(false)` on mismatch; an `Err` means the stored hash itself is
/// malformed, which is an internal error rather than a bad credential.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(secret, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum cost keeps the tests fast; production cost comes from config.
    const TEST_COST: u32 = 4;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_secret("longenough1", TEST_COST).unwrap();
        assert_ne!(hash, "longenough1");
        assert!(verify_secret("longenough1", &hash).unwrap());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let hash = hash_secret("correct-horse", TEST_COST).unwrap();
        assert!(!verify_secret("wrong-horse", &hash).unwrap());
    }

    #[test]
    fn same_secret_hashes_differently() {
        // Salted: two hashes of one secret must not match each other.
        let a = hash_secret("secret", TEST_COST).unwrap();
        let b = hash_secret("secret", TEST_COST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(verify_secret("anything", "not-a-bcrypt-hash").is_err());
    }
}
