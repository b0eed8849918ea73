//! User registration

use agora_core::commands::Registration;
use agora_core::errors::{ExError, ExErrorKind};
use agora_core::model::UserId;
use agora_core::MutationOutcome;
use agora_store::errors::Result;
use agora_store::{Statement, StoreAdapter};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password with Argon2id, returning the PHC string
///
/// # Errors
/// `Internal` if the hasher rejects its input.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            ExError::new(ExErrorKind::Internal)
                .with_op("hash_password")
                .with_message(format!("Failed to hash password: {e}"))
        })
}

/// Check a password against a stored PHC hash
///
/// # Errors
/// `InvalidInput` if the stored hash is not a PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        ExError::new(ExErrorKind::InvalidInput)
            .with_op("verify_password")
            .with_message(format!("Invalid password hash format: {e}"))
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Insert a user with a hashed password and zero karma
///
/// # Errors
/// `AlreadyExists` if the username is taken.
pub fn register_user(store: &StoreAdapter, registration: &Registration) -> Result<MutationOutcome> {
    let password_hash = hash_password(registration.password.expose())?;

    let step = store.execute(
        "register_user",
        &Statement::new(
            "INSERT INTO users (username, password_hash, karma, created_at) VALUES (?, ?, 0, ?)",
        )
        .bind(registration.username.clone())
        .bind(password_hash)
        .bind(super::now()),
    )?;

    Ok(MutationOutcome::UserRegistered {
        user_id: UserId::new(step.last_insert_rowid),
        username: registration.username.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let err = verify_password("pw", "not-a-hash").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }
}
