//! Service error type
//!
//! Every variant maps onto one caller-visible error code.

use conveyor_core::credentials::CipherError;
use conveyor_core::domain::target::TargetKind;
use thiserror::Error;

use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Entity missing or not visible to the caller
    #[error("{0}")]
    NotFound(String),

    /// Structural stage or request configuration error
    #[error("{0}")]
    InvalidInput(String),

    /// Stage does not belong to the pipeline it was addressed through
    #[error("{0}")]
    InvalidStage(String),

    #[error("{0}")]
    InvalidTargetStage(String),

    #[error("{0}")]
    InvalidSourceAction(String),

    #[error("{0}")]
    InvalidSourceSnapshot(String),

    #[error("{0}")]
    InvalidSourceInstance(String),

    #[error("{0}")]
    InvalidSourceDevice(String),

    /// Target belongs to a different application than the pipeline
    #[error("The {kind} must belong to the same application as the pipeline")]
    ApplicationMismatch { kind: TargetKind },

    #[error(transparent)]
    Credentials(#[from] CipherError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable error code returned to callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidStage(_) => "invalid_stage",
            Self::InvalidTargetStage(_) => "invalid_target_stage",
            Self::InvalidSourceAction(_) => "invalid_source_action",
            Self::InvalidSourceSnapshot(_) => "invalid_source_snapshot",
            Self::InvalidSourceInstance(_) => "invalid_source_instance",
            Self::InvalidSourceDevice(_) => "invalid_source_device",
            Self::ApplicationMismatch { kind } => match kind {
                TargetKind::Instance => "invalid_instancesHaveSameApplication",
                TargetKind::Device => "invalid_devicesHaveSameApplication",
                TargetKind::DeviceGroup => "invalid_deviceGroupsHaveSameApplication",
            },
            Self::Credentials(_) => "corrupt_credentials",
            Self::Repository(_) => "database_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn not_found(what: impl std::fmt::Display, id: uuid::Uuid) -> Self {
        Self::NotFound(format!("{} {} not found", what, id))
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_mismatch_codes() {
        let code = |kind| ServiceError::ApplicationMismatch { kind }.code();
        assert_eq!(code(TargetKind::Instance), "invalid_instancesHaveSameApplication");
        assert_eq!(code(TargetKind::Device), "invalid_devicesHaveSameApplication");
        assert_eq!(
            code(TargetKind::DeviceGroup),
            "invalid_deviceGroupsHaveSameApplication"
        );
    }

    #[test]
    fn test_cipher_errors_are_corrupt_credentials() {
        let err: ServiceError = CipherError::CorruptCredentials.into();
        assert_eq!(err.code(), "corrupt_credentials");
    }
}
