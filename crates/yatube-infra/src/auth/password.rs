//! Password hashes in the PHC string format, computed with Argon2id.

use argon2::Argon2;
use argon2::password_hash::{
    self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};

use yatube_core::ports::{AuthError, PasswordService};

fn hashing_failed(err: password_hash::Error) -> AuthError {
    AuthError::HashingError(err.to_string())
}

/// Argon2id with the crate's default cost parameters.
#[derive(Default)]
pub struct Argon2PasswordService {
    argon2: Argon2<'static>,
}

impl Argon2PasswordService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordService for Argon2PasswordService {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(hashing_failed)?;
        Ok(hash.to_string())
    }

    /// A wrong password is `Ok(false)`; only an unreadable hash is an error.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(hashing_failed)?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(hashing_failed(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_matches_its_own_hash_only() {
        let service = Argon2PasswordService::new();

        let hash = service.hash("123456789").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify("123456789", &hash).unwrap());
        assert!(!service.verify("987654321", &hash).unwrap());
    }

    #[test]
    fn test_each_hash_gets_a_fresh_salt() {
        let service = Argon2PasswordService::new();
        assert_ne!(
            service.hash("123456789").unwrap(),
            service.hash("123456789").unwrap()
        );
    }

    #[test]
    fn test_unreadable_hash_is_an_error() {
        let service = Argon2PasswordService::new();
        assert!(matches!(
            service.verify("123456789", "not-a-phc-string"),
            Err(AuthError::HashingError(_))
        ));
    }
}
