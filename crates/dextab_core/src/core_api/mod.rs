mod engine;
mod error;
mod types;

pub use crate::schema::{ColumnSpec, ID_COLUMN, Row, Schema, new_entry_id};
pub use crate::table::{Rows, ValueCount};
pub use crate::xml::WriteOptions;
pub use engine::{Engine, Session};
pub use error::{CoreError, CoreErrorCode};
pub use types::TableSummary;
