use thiserror::Error;

use crate::table::TableError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Parse,
    Write,
    InvalidEdit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}")]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Prefixes the message with what was being attempted.
    pub fn context(mut self, context: impl std::fmt::Display) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }
}

impl From<TableError> for CoreError {
    fn from(err: TableError) -> Self {
        let code = match &err {
            TableError::Read { .. } | TableError::Xml(_) | TableError::MissingContainer(_) => {
                CoreErrorCode::Parse
            }
            TableError::Write { .. } | TableError::Render(_) => CoreErrorCode::Write,
            TableError::EmptySchema
            | TableError::RowOutOfRange { .. }
            | TableError::UnknownColumn(_)
            | TableError::ReadOnlyColumn(_)
            | TableError::InvalidValue { .. } => CoreErrorCode::InvalidEdit,
        };
        Self::new(code, err.to_string())
    }
}
