use std::fmt::{self, Display};

use potion::{Error, HtmlError};

pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        log::error!("query failed: {value}");
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(String::from("Unknown error")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

/// 404 for a row the caller referenced by id.
pub fn not_found(info: &str) -> Error {
    Error {
        code: 404,
        info: Some(info.to_string()),
        redirect: None,
    }
}

/// A payload field that failed validation. `field` names the offending
/// key of the request body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: this field may not be blank")]
    Blank { field: &'static str },
    #[error("{field}: ensure this field has no more than {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field}: value {value} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i32,
        max: i32,
    },
    #[error("{field}: at least one entry is required")]
    Empty { field: &'static str },
    #[error("{field}: unknown id {id}")]
    UnknownId { field: &'static str, id: i32 },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Blank { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Empty { field }
            | ValidationError::UnknownId { field, .. } => field,
        }
    }
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        HtmlError::InvalidRequest.new(&value.to_string())
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_the_field() {
        let err = ValidationError::OutOfRange {
            field: "cooking_time",
            value: 0,
            min: 1,
            max: 1440,
        };
        assert_eq!(err.field(), "cooking_time");
        assert_eq!(
            err.to_string(),
            "cooking_time: value 0 must be between 1 and 1440"
        );
    }

    #[test]
    fn type_error_display_is_parenthesized() {
        assert_eq!(TypeError::new("Invalid variant").to_string(), "(Invalid variant)");
    }
}
