//! Error types shared by Muscledia services
//!
//! Each concern gets its own `thiserror` enum. Library code returns these
//! directly; binaries wrap them in `anyhow`. Identity errors carry a coarse
//! [`IdentityErrorKind`] so callers can tell bad input and missing records
//! apart from exhaustion and storage failures.

use thiserror::Error;

/// Marker implemented by every error in this crate
pub trait UserServiceError: std::error::Error + Send + Sync + 'static {}

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Failures while loading or checking configuration
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Config file {path} does not exist")]
    FileNotFound { path: String },

    #[error("Could not read configuration: {details}")]
    ParseError { details: String },

    /// A field holds a value outside what the service accepts
    #[error("Bad value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Could not read environment variable {var}: {details}")]
    EnvironmentError { var: String, details: String },

    #[error("Configuration rejected: {details}")]
    ValidationFailed { details: String },
}

impl UserServiceError for ConfigurationError {}

impl ConfigurationError {
    pub fn validation_failed(details: impl Into<String>) -> Self {
        Self::ValidationFailed {
            details: details.into(),
        }
    }
}

/// Failures of the backing database
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Could not connect to the database: {source}")]
    ConnectionFailed {
        #[source]
        source: BoxedSource,
    },

    #[error("Query `{query}` failed: {source}")]
    QueryFailed {
        query: String,
        #[source]
        source: BoxedSource,
    },

    #[error("Schema migration failed: {details}")]
    MigrationFailed { details: String },

    /// A stored row could not be turned back into a domain value
    #[error("Corrupt data in {location}: {details}")]
    DataCorruption { location: String, details: String },

    /// A write was rejected by a uniqueness rule, named `table.column`
    #[error("Unique constraint {constraint} violated")]
    ConstraintViolation { constraint: String },

    #[error("Nothing stored for {details}")]
    NotFound { details: String },
}

impl UserServiceError for PersistenceError {}

impl PersistenceError {
    /// Wrap a failed statement together with its driver error
    pub fn query_failed(
        query: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::QueryFailed {
            query: query.into(),
            source: Box::new(source),
        }
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }

    pub fn violated_constraint(&self) -> Option<&str> {
        match self {
            Self::ConstraintViolation { constraint } => Some(constraint),
            _ => None,
        }
    }
}

/// Rejected user input
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{field} is not valid: {value}")]
    InvalidFormat { field: String, value: String },

    #[error("{field} is required")]
    MissingField { field: String },

    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: String, max: usize },
}

impl UserServiceError for ValidationError {}

/// Identifier allocation and resolution errors
#[derive(Error, Debug)]
pub enum IdentityError {
    /// Every attempt within the budget collided with an existing record
    #[error("Unable to allocate a unique identifier after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },

    /// Input is neither a plain integer nor a canonical UUID
    #[error("Invalid identifier format: {value}")]
    InvalidFormat { value: String },

    /// Well-formed identifier with no matching record
    #[error("No record found for identifier {identifier}")]
    NotFound { identifier: String },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl UserServiceError for IdentityError {}

/// How an [`IdentityError`] should surface to the end caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityErrorKind {
    /// Retry later
    ServiceUnavailable,
    InvalidInput,
    NotFound,
    Internal,
}

impl IdentityError {
    pub fn invalid_format(value: impl Into<String>) -> Self {
        Self::InvalidFormat {
            value: value.into(),
        }
    }

    pub fn not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            identifier: identifier.to_string(),
        }
    }

    pub fn kind(&self) -> IdentityErrorKind {
        match self {
            Self::AllocationExhausted { .. } => IdentityErrorKind::ServiceUnavailable,
            Self::InvalidFormat { .. } => IdentityErrorKind::InvalidInput,
            Self::NotFound { .. } => IdentityErrorKind::NotFound,
            Self::Persistence(_) => IdentityErrorKind::Internal,
        }
    }

    /// Whether retrying later may succeed
    pub fn is_retry_later(&self) -> bool {
        self.kind() == IdentityErrorKind::ServiceUnavailable
    }
}
