use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use argon2::password_hash::SaltString;
use rand_core::OsRng;

use crate::error::{Result, StoreError};

/// Argon2id cost parameters used when hashing new passwords.
///
/// Verification reads the parameters back out of the stored PHC string, so
/// changing the policy never invalidates existing hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordPolicy {
    /// Lowest cost Argon2 accepts. For tests only.
    pub const fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| StoreError::Hash(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hash with a fresh random salt. Returns the PHC string.
pub fn hash_password(policy: &PasswordPolicy, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = policy
        .hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Recompute and compare in constant time. A stored hash that does not parse
/// never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: PasswordPolicy = PasswordPolicy::minimal();

    #[test]
    fn hash_then_verify() {
        let hash = hash_password(&POLICY, "pw1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("pw1", &hash));
    }

    #[test]
    fn wrong_password_fails() {
        let hash = hash_password(&POLICY, "pw1").unwrap();
        assert!(!verify_password("pw2", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn salts_differ() {
        let a = hash_password(&POLICY, "same").unwrap();
        let b = hash_password(&POLICY, "same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("pw1", "not a phc string"));
        assert!(!verify_password("pw1", ""));
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let policy = PasswordPolicy {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(matches!(
            hash_password(&policy, "pw"),
            Err(StoreError::Hash(_))
        ));
    }
}
