//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of the shareable poll code.
pub const POLL_CODE_LENGTH: usize = 6;

/// Validates that a poll code is exactly 6 uppercase alphanumeric characters.
///
/// # Examples
///
/// ```ignore
/// validate_poll_code("AB12CD") // Ok
/// validate_poll_code("ab12cd") // Err - lowercase
/// validate_poll_code("AB12C")  // Err - too short
/// ```
pub fn validate_poll_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != POLL_CODE_LENGTH {
        let mut err = ValidationError::new("poll_code_length");
        err.message = Some(
            format!(
                "Poll code must be exactly {} characters (got {})",
                POLL_CODE_LENGTH,
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase())
    {
        let mut err = ValidationError::new("poll_code_format");
        err.message =
            Some("Poll code must contain only uppercase letters and digits".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_poll_code_valid() {
        assert!(validate_poll_code("AB12CD").is_ok());
        assert!(validate_poll_code("ZZZZZZ").is_ok());
        assert!(validate_poll_code("000000").is_ok());
    }

    #[test]
    fn test_validate_poll_code_invalid_length() {
        assert!(validate_poll_code("AB12C").is_err()); // too short
        assert!(validate_poll_code("AB12CDE").is_err()); // too long
        assert!(validate_poll_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_poll_code_invalid_format() {
        assert!(validate_poll_code("ab12cd").is_err()); // lowercase
        assert!(validate_poll_code("AB12c!").is_err()); // punctuation
        assert!(validate_poll_code("AB 2CD").is_err()); // space
    }
}
