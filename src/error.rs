use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("camera stopped delivering frames")]
    CaptureFailure,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    NotAnInteger { key: &'static str, value: String },
    #[error("{key} must be one of 1/0, true/false, yes/no, on/off, got {value:?}")]
    NotAFlag { key: &'static str, value: String },
    #[error("{key} must be at least 1")]
    Zero { key: &'static str },
}
