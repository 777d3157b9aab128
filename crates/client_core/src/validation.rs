use crate::error::ClientError;

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Fails on the first blank field, in the given order.
pub fn require_filled(fields: &[(&'static str, &str)]) -> Result<(), ClientError> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((field, _)) => Err(ClientError::BlankField { field: *field }),
        None => Ok(()),
    }
}

/// Same rule the backend applies on password reset.
pub fn check_password_policy(password: &str) -> Result<(), ClientError> {
    let missing: Vec<&str> = [
        (
            password.chars().count() >= PASSWORD_MIN_LEN,
            "at least 8 characters",
        ),
        (password.chars().any(|c| c.is_ascii_digit()), "a digit"),
        (
            password.chars().any(|c| c.is_ascii_lowercase()),
            "a lowercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_uppercase()),
            "an uppercase letter",
        ),
        (
            password.chars().any(|c| PASSWORD_SPECIALS.contains(c)),
            "a special character",
        ),
    ]
    .into_iter()
    .filter(|(ok, _)| !ok)
    .map(|(_, rule)| rule)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ClientError::Validation(format!(
            "password must contain {}",
            missing.join(", ")
        )))
    }
}
