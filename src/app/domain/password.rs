use argon2::{
    password_hash::SaltString,
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand_core::OsRng;
use validator::ValidationError;

/// Plaintext password. Construct with `parse` to enforce strength rules,
/// or `for_verification` when checking against a stored hash (login).
#[derive(Clone)]
pub struct Password(String);

impl Password {
    /// Accept any plaintext for verification against a stored hash.
    /// Strength rules apply at registration, not login.
    pub fn for_verification(plaintext: String) -> Self {
        Self(plaintext)
    }

    /// Validate strength rules: 8..=128 chars, at least one letter and one digit.
    pub fn parse(plaintext: String) -> Result<Self, ValidationError> {
        if plaintext.len() < 8 || plaintext.len() > 128 {
            let mut error = ValidationError::new("password_length");
            error.message = Some("Password must be 8 to 128 characters".into());
            return Err(error);
        }

        let has_letter = plaintext.chars().any(|c| c.is_alphabetic());
        let has_digit = plaintext.chars().any(|c| c.is_numeric());
        if !(has_letter && has_digit) {
            let mut error = ValidationError::new("weak_password");
            error.message = Some("Password must contain a letter and a digit".into());
            return Err(error);
        }

        Ok(Self(plaintext))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(..)")
    }
}

/// Argon2id hash of a password, stored as its PHC string.
#[derive(Debug, Clone)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Hash with a fresh random salt.
    pub fn from_password(password: &Password) -> Result<Self, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(Self(hash.to_string()))
    }

    /// Verify a plaintext against this hash.
    pub fn verify(&self, password: &Password) -> Result<(), argon2::password_hash::Error> {
        let parsed = PasswordHash::new(&self.0)?;
        Argon2::default().verify_password(password.as_bytes(), &parsed)
    }

    /// Wrap a hash loaded from the database.
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_letter_and_digit() {
        assert!(Password::parse("hunter2hunter2".to_string()).is_ok());
    }

    #[test]
    fn rejects_short() {
        assert!(Password::parse("ab1".to_string()).is_err());
    }

    #[test]
    fn rejects_digitless() {
        assert!(Password::parse("onlyletters".to_string()).is_err());
    }

    #[test]
    fn rejects_letterless() {
        assert!(Password::parse("1234567890".to_string()).is_err());
    }

    #[test]
    fn hash_then_verify() {
        let password = Password::parse("correct1horse".to_string()).unwrap();
        let hash = HashedPassword::from_password(&password).unwrap();
        assert!(hash.verify(&password).is_ok());

        let wrong = Password::for_verification("wrong1horse".to_string());
        assert!(hash.verify(&wrong).is_err());
    }

    #[test]
    fn for_verification_skips_strength_rules() {
        // login must accept legacy plaintexts that current rules reject
        assert!(Password::parse("weak".to_string()).is_err());
        let weak = Password::for_verification("weak".to_string());
        let hash = HashedPassword::from_password(&weak).unwrap();
        assert!(hash.verify(&weak).is_ok());
    }

    #[test]
    fn debug_hides_plaintext() {
        let p = Password::for_verification("sekrit123".to_string());
        assert_eq!(format!("{:?}", p), "Password(..)");
    }
}
