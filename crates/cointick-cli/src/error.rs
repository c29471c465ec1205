use cointick_core::{ApiError, ConfigError, ValidationError};
use thiserror::Error;

/// Failure of a single tool invocation, rendered into the error envelope.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("malformed tool request: {0}")]
    InvalidRequest(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "tool.unknown",
            Self::InvalidRequest(_) => "tool.invalid_request",
            Self::InvalidArguments { .. } => "tool.invalid_arguments",
            Self::Validation(_) => "validation.invalid_input",
            Self::Api(error) => error.code(),
            Self::Serialization(_) => "internal.serialization",
        }
    }

    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::UnknownTool(_)
            | Self::InvalidRequest(_)
            | Self::InvalidArguments { .. }
            | Self::Validation(_) => 2,
            Self::Api(_) => 3,
            Self::Serialization(_) => 4,
        }
    }
}

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Tool(error) => error.exit_code(),
            Self::Command(_) => 2,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
