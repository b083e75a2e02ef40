use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand_core::OsRng;

use crate::error::ApiError;

pub const MIN_LENGTH: usize = 8;
// Attribute values shorter than this are not compared.
const SIMILARITY_MIN_LENGTH: usize = 3;

// Lowercased. Checked as whole-password matches.
const COMMON_PASSWORDS: &[&str] = &[
    "123456789", "12345678", "1234567890", "password", "password1", "password123",
    "qwertyuiop", "qwerty123", "iloveyou", "sunshine", "princess", "football",
    "baseball", "welcome1", "superman", "trustno1", "starwars", "letmein1",
    "whatever", "passw0rd", "abcdefgh", "11111111", "00000000", "changeme",
];

/// Hashes a password with argon2id and a random salt (PHC string format).
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Verifies a password against a stored PHC hash. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Hashing is CPU-bound; keep it off the async workers.
pub async fn hash_password_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
}

pub async fn verify_password_blocking(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}

/// policy_violations
///
/// Returns every password policy message that applies; empty means acceptable.
/// `attributes` pairs a label with the account value the password must not
/// resemble, e.g. `("username", "alice")`.
pub fn policy_violations(password: &str, attributes: &[(&str, &str)]) -> Vec<String> {
    let mut messages = Vec::new();

    if password.chars().count() < MIN_LENGTH {
        messages.push(format!(
            "This password is too short. It must contain at least {MIN_LENGTH} characters."
        ));
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        messages.push("This password is too common.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        messages.push("This password is entirely numeric.".to_string());
    }

    for (label, value) in attributes {
        if resembles(&lowered, value) {
            messages.push(format!("The password is too similar to the {label}."));
        }
    }

    messages
}

/// Compares against the whole value and, for emails, the local part.
fn resembles(lowered_password: &str, value: &str) -> bool {
    let value = value.to_lowercase();
    let local = value.split_once('@').map(|(local, _)| local);
    std::iter::once(value.as_str())
        .chain(local)
        .filter(|candidate| candidate.chars().count() >= SIMILARITY_MIN_LENGTH)
        .any(|candidate| {
            lowered_password.contains(candidate) || candidate.contains(lowered_password)
        })
}
