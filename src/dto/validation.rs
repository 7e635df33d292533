//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of a room code.
pub const ROOM_CODE_LENGTH: usize = 6;
/// Longest display name accepted.
pub const USERNAME_MAX_CHARS: usize = 20;

/// Validates that a room code is exactly six ASCII alphanumeric characters.
///
/// Case is not checked; codes are upper-cased before they are stored or matched.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("ABC123") // Ok
/// validate_room_code("abc123") // Ok
/// validate_room_code("ABC12")  // Err - too short
/// validate_room_code("ABC-12") // Err - punctuation
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != ROOM_CODE_LENGTH {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(
            format!(
                "Room code must be exactly {ROOM_CODE_LENGTH} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a display name is non-blank and at most 20 characters.
pub fn validate_username(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("username_blank");
        err.message = Some("Username must not be blank".into());
        return Err(err);
    }

    let length = name.chars().count();
    if length > USERNAME_MAX_CHARS {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!("Username must be at most {USERNAME_MAX_CHARS} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_room_code_valid() {
        assert!(validate_room_code("ABC123").is_ok());
        assert!(validate_room_code("abc123").is_ok());
        assert!(validate_room_code("000000").is_ok());
    }

    #[test]
    fn test_validate_room_code_invalid_length() {
        assert!(validate_room_code("ABC12").is_err());
        assert!(validate_room_code("ABC1234").is_err());
        assert!(validate_room_code("").is_err());
    }

    #[test]
    fn test_validate_room_code_invalid_format() {
        assert!(validate_room_code("ABC-12").is_err());
        assert!(validate_room_code("ABC 12").is_err());
        assert!(validate_room_code("ÀBC12").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("Alice").is_ok());
        assert!(validate_username("ééééééééééééééééééé").is_ok());
        assert!(validate_username("   ").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("this name is far too long").is_err());
    }
}
