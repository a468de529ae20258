//! Password hashing: scrypt with N=2^15, r=8, p=1 over a per-password salt.
//! Verification is constant-time through the PHC verifier.

use scrypt::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use scrypt::{Params, Scrypt};

use crate::error::{AuthError, AuthResult};

const LOG_N: u8 = 15;
const R: u32 = 8;
const P: u32 = 1;

pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(LOG_N, R, P, Params::RECOMMENDED_LEN)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    let hash = Scrypt
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Scrypt.verify_password(password.as_bytes(), &parsed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
