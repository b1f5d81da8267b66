use serde::{Deserialize, Serialize};

use crate::schema::ColumnSpec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSummary {
    pub root_tag: String,
    pub container_tag: String,
    pub entry_tag: Option<String>,
    pub columns: Vec<ColumnSpec>,
    pub entry_count: usize,
    pub source_path: Option<String>,
    pub dirty: bool,
}
