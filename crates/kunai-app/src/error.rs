use thiserror::Error;

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    TriggerError(#[from] kunai_trigger::TriggerError),

    #[error(transparent)]
    CoreError(#[from] kunai_core::error::CoreError),

    #[error("Trigger {trigger}: {source}")]
    TriggerSetup {
        trigger: String,
        source: kunai_trigger::TriggerError,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
