use crate::model::ValidationError;

pub const USER_INVALID_INPUT: &str = "user.invalid_input";
pub const USER_OUTPUT_MODE_CONFLICT: &str = "user.output_mode_conflict";
pub const RUNTIME_PROVIDER_INIT: &str = "runtime.provider_init_failed";
pub const RUNTIME_SERIALIZE: &str = "runtime.serialize_failed";
pub const RUNTIME_IO: &str = "runtime.io_failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    User,
    Runtime,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Runtime => "runtime",
        }
    }
}

/// Command-level failure. Pipeline failures never reach this type; they are
/// reported as notices on the rendered view instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn user(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::User,
            code,
            message: message.into(),
        }
    }

    pub fn runtime(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::User => 2,
            ErrorKind::Runtime => 1,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        Self::user(USER_INVALID_INPUT, value.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error[{}]: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_validation_maps_to_invalid_input() {
        let error = AppError::from(ValidationError::InvalidDays(0));
        assert_eq!(error.kind, ErrorKind::User);
        assert_eq!(error.code, USER_INVALID_INPUT);
        assert_eq!(error.exit_code(), 2);
        assert!(error.message.contains("between 1 and 7"));
    }

    #[test]
    fn error_runtime_exit_code_is_one() {
        let error = AppError::runtime(RUNTIME_IO, "broken pipe");
        assert_eq!(error.exit_code(), 1);
        assert_eq!(error.kind.label(), "runtime");
        assert_eq!(error.to_string(), "error[runtime.io_failed]: broken pipe");
    }
}
