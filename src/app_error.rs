use crate::catalog::FetchError;
use crate::store::StoreError;
use crate::tracker::StartError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    RuntimeFailure = 1,
    Usage = 2,
    Internal = 3,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    kind: ExitCode,
    message: String,
}

impl AppError {
    pub fn usage<T: Into<String>>(message: T) -> Self {
        Self {
            kind: ExitCode::Usage,
            message: message.into(),
        }
    }

    pub fn runtime<T: Into<String>>(message: T) -> Self {
        Self {
            kind: ExitCode::RuntimeFailure,
            message: message.into(),
        }
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self {
            kind: ExitCode::Internal,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        self.kind as i32
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::runtime(format!("{err} (re-run the command to retry)"))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Config(_) => AppError::usage(err.to_string()),
            other => AppError::runtime(other.to_string()),
        }
    }
}

impl From<StartError> for AppError {
    fn from(err: StartError) -> Self {
        AppError::usage(err.to_string())
    }
}
