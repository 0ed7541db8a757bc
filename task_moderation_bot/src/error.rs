use teloxide::types::UserId;

/// Failures that abort a moderation call. The caller must not let the
/// submission through when it gets one of these.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("Moderation store is unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
    #[error("Invalid user ID: {0}")]
    InvalidUserId(UserId),
}

/// OCR failures. Photos are let through when these happen.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR service is unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
    #[error("OCR service did not answer in time")]
    TimedOut,
}

/// Similarity comparison failures. Treated as "not similar".
#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    #[error("Similarity comparison did not finish in time")]
    Timeout,
    #[error("Similarity comparison failed: {0}")]
    Failed(String),
}

/// Rejects user IDs that can't belong to a real user or can't be stored.
pub fn check_user_id(user_id: UserId) -> Result<(), ModerationError> {
    if user_id.0 == 0 || i64::try_from(user_id.0).is_err() {
        return Err(ModerationError::InvalidUserId(user_id));
    }
    Ok(())
}
