use validator::ValidationError;

/// Signatures are relayed as parallel arrays, one signature per token.
pub fn validate_signature_batch(tokens: usize, signatures: usize) -> Result<(), ValidationError> {
    if tokens == 0 {
        return Err(ValidationError::new("empty_token_list"));
    }

    if tokens != signatures {
        return Err(ValidationError::new("token_signature_count_mismatch"));
    }

    Ok(())
}

pub fn validate_signature_v(v: u8) -> Result<(), ValidationError> {
    match v {
        0 | 1 | 27 | 28 => Ok(()),
        _ => Err(ValidationError::new("invalid_recovery_id")),
    }
}
