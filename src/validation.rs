use validator::ValidationError;

/// Validates that a paise amount is positive (greater than 0)
pub fn validate_positive_paise(amount: i64) -> Result<(), ValidationError> {
    if amount <= 0 {
        let mut error = ValidationError::new("invalid_amount");
        error.message = Some("Amount must be greater than 0 paise".into());
        return Err(error);
    }
    Ok(())
}
