//! Error taxonomy for the registry store
//!
//! Every failure surfaces as one of four kinds. Callers that need a stable
//! wire shape use [`ErrorInfo`], the (kind, message, field) triple.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for regsrv
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors raised by repositories and services
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed or out-of-range input, attributable to one field
    #[error("Validation failed: {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Referenced entity (or one of its ancestors) does not exist
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// A uniqueness constraint would be violated
    #[error("Conflict on {field}: {message}")]
    Conflict { field: &'static str, message: String },

    /// Unexpected failure from the backing store
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error kind, stable across message wording changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

/// Serializable (kind, message, field) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl RegistryError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn conflict(field: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Field the error is attributed to, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } | Self::Conflict { field, .. } => Some(field),
            Self::NotFound { .. } | Self::Internal(_) => None,
        }
    }

    /// HTTP status a front end should answer with
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }

    pub fn to_info(&self) -> ErrorInfo {
        ErrorInfo {
            kind: self.kind(),
            message: self.to_string(),
            field: self.field().map(str::to_string),
        }
    }

    /// Re-attribute a foreign-key failure to the parent the caller was writing under
    pub(crate) fn missing_parent(self, resource: &'static str, id: &str) -> Self {
        match self {
            Self::NotFound { resource: "parent", .. } => Self::not_found(resource, id),
            other => other,
        }
    }
}

impl From<sqlx::Error> for RegistryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let message = db_err.message();
            if db_err.is_unique_violation() {
                return conflict_from_constraint(message);
            }
            if db_err.is_foreign_key_violation() {
                return Self::not_found("parent", "");
            }
            if db_err.is_check_violation() {
                return validation_from_check(message);
            }
        }
        Self::Internal(err.to_string())
    }
}

/// Map `UNIQUE constraint failed: slaves.connection_id, slaves.slave_address`
/// to the column that actually collided (the last one listed)
fn conflict_from_constraint(message: &str) -> RegistryError {
    let column = message
        .rsplit(", ")
        .next()
        .and_then(|col| col.rsplit('.').next())
        .unwrap_or_default()
        .trim();

    let field = match column {
        "name" => "name",
        "port" => "port",
        "slave_address" => "slave_address",
        "start_address" => "start_address",
        "id" => "id",
        _ => "unknown",
    };

    let message = match field {
        "name" => "name is already in use".to_string(),
        "port" => "port is already in use by another connection".to_string(),
        "slave_address" => "slave address is already in use on this connection".to_string(),
        "start_address" => "start address is already defined for this slave".to_string(),
        _ => message.to_string(),
    };

    RegistryError::Conflict { field, message }
}

/// Map `CHECK constraint failed: port_range` (named constraints from the schema)
fn validation_from_check(message: &str) -> RegistryError {
    let constraint = message.rsplit(": ").next().unwrap_or_default().trim();
    match constraint {
        "port_range" => RegistryError::validation("port", "port must be between 1 and 65535"),
        "slave_address_range" => {
            RegistryError::validation("slave_address", "slave address must be between 1 and 247")
        },
        "start_address_range" => {
            RegistryError::validation("start_address", "start address is out of range")
        },
        _ => RegistryError::validation("unknown", message.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_conflict_column_disambiguation() {
        let err = conflict_from_constraint("UNIQUE constraint failed: connections.name");
        assert_eq!(err.field(), Some("name"));

        let err = conflict_from_constraint("UNIQUE constraint failed: connections.port");
        assert_eq!(err.field(), Some("port"));

        let err = conflict_from_constraint(
            "UNIQUE constraint failed: slaves.connection_id, slaves.slave_address",
        );
        assert_eq!(err.field(), Some("slave_address"));

        let err = conflict_from_constraint(
            "UNIQUE constraint failed: registers.slave_id, registers.start_address",
        );
        assert_eq!(err.field(), Some("start_address"));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_check_constraint_mapping() {
        let err = validation_from_check("CHECK constraint failed: port_range");
        assert_eq!(err.field(), Some("port"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RegistryError::validation("name", "blank").status_code(), 400);
        assert_eq!(RegistryError::not_found("slave", "x").status_code(), 404);
        assert_eq!(RegistryError::conflict("port", "taken").status_code(), 409);
        assert_eq!(RegistryError::Internal("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_error_info_triple() {
        let info = RegistryError::validation("hex_payload", "not hex").to_info();
        assert_eq!(info.kind, ErrorKind::Validation);
        assert_eq!(info.field.as_deref(), Some("hex_payload"));
        assert!(info.message.contains("not hex"));

        let json = serde_json::to_value(RegistryError::not_found("slave", "s1").to_info()).unwrap();
        assert_eq!(json["kind"], "not_found");
        assert!(json.get("field").is_none());
    }

    #[test]
    fn test_missing_parent_reattribution() {
        let err = RegistryError::not_found("parent", "").missing_parent("connection", "c1");
        match err {
            RegistryError::NotFound { resource, id } => {
                assert_eq!(resource, "connection");
                assert_eq!(id, "c1");
            },
            other => panic!("unexpected {other:?}"),
        }

        let untouched = RegistryError::conflict("name", "dup").missing_parent("connection", "c1");
        assert_eq!(untouched.kind(), ErrorKind::Conflict);
    }
}
