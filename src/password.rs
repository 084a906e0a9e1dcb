use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AppError;

/// Password handling errors.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hashing(argon2::password_hash::Error),
    #[error("stored password hash is malformed: {0}")]
    InvalidHash(argon2::password_hash::Error),
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::internal("Não foi possível processar a senha", err)
    }
}

/// Hashes a plain-text password with Argon2id and a fresh random salt.
/// Returns the PHC string that is stored in the `password` column.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(PasswordError::Hashing)
}

/// Checks `password` against a stored PHC hash.
///
/// `Ok(false)` means the password is wrong; `Err` means the stored hash could not be read.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(PasswordError::InvalidHash)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
