use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation error on '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("{entity} not found: {id}")]
    NotFoundError { entity: String, id: String },

    #[error("Business rule violated: {message}")]
    BusinessRuleError { message: String },

    #[error("External service '{service}' failed: {message}")]
    ExternalServiceError { service: String, message: String },

    #[error("Invariant violated: {message}")]
    InvariantViolation { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    State,
    External,
    Configuration,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl PipelineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFoundError {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::BusinessRuleError {
            message: message.into(),
        }
    }

    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalServiceError {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError { .. } => ErrorCategory::Input,
            Self::NotFoundError { .. } | Self::BusinessRuleError { .. } => ErrorCategory::State,
            Self::ExternalServiceError { .. } => ErrorCategory::External,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::InvariantViolation { .. }
            | Self::IoError(_)
            | Self::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::State => ErrorSeverity::High,
            // 外部服務可能只是暫時不可用，可以重試
            ErrorCategory::External => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// HTTP status the thin HTTP layer answers with for this error.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::ValidationError { .. } => StatusCode::BAD_REQUEST,
            Self::NotFoundError { .. } => StatusCode::NOT_FOUND,
            Self::BusinessRuleError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ExternalServiceError { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code used in error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationError { .. } => "validation_error",
            Self::NotFoundError { .. } => "not_found",
            Self::BusinessRuleError { .. } => "business_rule_error",
            Self::ExternalServiceError { .. } => "external_service_error",
            Self::InvariantViolation { .. } => "invariant_violation",
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => "config_error",
            Self::IoError(_) => "io_error",
            Self::SerializationError(_) => "serialization_error",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError { field, message } => {
                format!("Invalid input for '{}': {}", field, message)
            }
            Self::NotFoundError { entity, id } => format!("{} '{}' does not exist", entity, id),
            Self::BusinessRuleError { message } => format!("Request rejected: {}", message),
            Self::ExternalServiceError { service, .. } => {
                format!("The {} service is unavailable or returned an error", service)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Correct the request parameters and submit again",
            ErrorCategory::State => "Check the current state of the referenced records before retrying",
            ErrorCategory::External => {
                "Verify the collaborator endpoints are reachable; the operation is safe to re-invoke"
            }
            ErrorCategory::Configuration => "Check the configuration file and environment variables",
            ErrorCategory::Internal => "Inspect the logs; this indicates a bug or corrupted state",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
