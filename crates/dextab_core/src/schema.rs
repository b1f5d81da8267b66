use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::xml::Element;

/// Column whose values are generated rather than typed in.
pub const ID_COLUMN: &str = "id";

/// One display-ready entry: a cell per schema column, in schema order.
pub type Row = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    pub name: String,
    pub editable: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let editable = name != ID_COLUMN;
        Self { name, editable }
    }
}

/// Ordered columns of a table, taken from the child tags of its first entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    entry_tag: Option<String>,
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn infer(container: &Element) -> Self {
        let Some(first) = container.children.first() else {
            return Self::default();
        };

        Self {
            entry_tag: Some(first.name.clone()),
            columns: first
                .children
                .iter()
                .map(|child| ColumnSpec::new(child.name.as_str()))
                .collect(),
        }
    }

    pub fn entry_tag(&self) -> Option<&str> {
        self.entry_tag.as_deref()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_id_column(&self) -> bool {
        self.column(ID_COLUMN).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Fresh value for the `id` column of a new entry.
pub fn new_entry_id() -> String {
    Uuid::new_v4().to_string()
}
