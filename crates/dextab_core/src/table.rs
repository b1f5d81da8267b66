//! The tabular view over a `root > container > entry > field` XML document.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{Row, Schema};
use crate::xml::{self, Element, WriteOptions, XmlError};

#[derive(Error, Debug)]
pub enum TableError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed XML: {0}")]
    Xml(#[from] XmlError),

    #[error("root element <{0}> has no container element")]
    MissingContainer(String),

    #[error("table has no entries, so there is no entry tag to copy")]
    EmptySchema,

    #[error("row {index} is out of range (table has {len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{0}' is read-only")]
    ReadOnlyColumn(String),

    #[error("value for column '{column}' cannot be stored in XML: {source}")]
    InvalidValue { column: String, source: XmlError },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot render document: {0}")]
    Render(XmlError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDocument {
    root: Element,
    schema: Schema,
}

/// Lazy projection of every entry into a [`Row`].
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    entries: std::slice::Iter<'a, Element>,
    schema: &'a Schema,
}

impl Iterator for Rows<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.entries
            .next()
            .map(|entry| project_entry(entry, self.schema))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for Rows<'_> {}

impl TableDocument {
    pub fn from_tree(root: Element) -> Result<Self, TableError> {
        let Some(container) = root.children.first() else {
            return Err(TableError::MissingContainer(root.name));
        };
        let schema = Schema::infer(container);
        debug!(
            "event=schema_inferred container={} entry_tag={} columns={}",
            container.name,
            schema.entry_tag().unwrap_or("-"),
            schema.names().collect::<Vec<_>>().join(",")
        );
        Ok(Self { root, schema })
    }

    pub fn parse_str(xml: &str) -> Result<Self, TableError> {
        Self::from_tree(xml::parse_str(xml)?)
    }

    pub fn read_from<R: BufRead>(input: R) -> Result<Self, TableError> {
        Self::from_tree(xml::read_tree(input)?)
    }

    pub fn open(path: &Path) -> Result<Self, TableError> {
        let file = File::open(path).map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::read_from(BufReader::new(file))?;
        info!(
            "event=table_open path={} entries={} columns={}",
            path.display(),
            document.entry_count(),
            document.schema.len()
        );
        if document.entry_count() == 0 {
            warn!("event=table_empty path={}", path.display());
        }
        Ok(document)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn container(&self) -> &Element {
        &self.root.children[0]
    }

    fn container_mut(&mut self) -> &mut Element {
        &mut self.root.children[0]
    }

    pub fn entry_count(&self) -> usize {
        self.container().children.len()
    }

    pub fn rows(&self) -> Rows<'_> {
        Rows {
            entries: self.container().children.iter(),
            schema: &self.schema,
        }
    }

    pub fn row(&self, index: usize) -> Option<Row> {
        self.container()
            .children
            .get(index)
            .map(|entry| project_entry(entry, &self.schema))
    }

    /// Appends a new entry whose children follow schema order.
    ///
    /// Schema columns missing from `values` get an empty child; keys that are
    /// not schema columns are ignored.
    pub fn add_entry(&mut self, values: &HashMap<String, String>) -> Result<Row, TableError> {
        let Some(entry_tag) = self.schema.entry_tag() else {
            return Err(TableError::EmptySchema);
        };

        for (key, value) in values {
            if self.schema.column(key).is_none() {
                warn!("event=entry_value_ignored column={key}");
            } else {
                check_value(key, value)?;
            }
        }

        let mut entry = Element::new(entry_tag);
        for name in self.schema.names() {
            let value = values.get(name).cloned().unwrap_or_default();
            entry.push_child(Element::with_text(name, value));
        }

        let row = project_entry(&entry, &self.schema);
        self.container_mut().push_child(entry);
        info!("event=entry_added rows={}", self.entry_count());
        Ok(row)
    }

    /// Replaces one cell of an existing entry.
    pub fn set_cell(&mut self, index: usize, column: &str, value: &str) -> Result<Row, TableError> {
        let Some(spec) = self.schema.column(column) else {
            return Err(TableError::UnknownColumn(column.to_string()));
        };
        if !spec.editable {
            return Err(TableError::ReadOnlyColumn(column.to_string()));
        }
        let len = self.entry_count();
        if index >= len {
            return Err(TableError::RowOutOfRange { index, len });
        }
        check_value(column, value)?;

        let schema = self.schema.clone();
        let entry = &mut self.container_mut().children[index];
        match entry.child_mut(column) {
            Some(child) => child.text = value.to_string(),
            None => {
                let at = insertion_point(entry, &schema, column);
                entry
                    .children
                    .insert(at, Element::with_text(column, value));
            }
        }

        info!("event=cell_edited row={index} column={column}");
        Ok(project_entry(entry, &schema))
    }

    /// Counts distinct values of `column`, in first-seen order.
    pub fn value_counts(&self, column: &str) -> Result<Vec<ValueCount>, TableError> {
        let Some(position) = self.schema.position(column) else {
            return Err(TableError::UnknownColumn(column.to_string()));
        };

        let mut counts: Vec<ValueCount> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        for mut row in self.rows() {
            let value = std::mem::take(&mut row[position]);
            match seen.get(&value) {
                Some(&slot) => counts[slot].count += 1,
                None => {
                    seen.insert(value.clone(), counts.len());
                    counts.push(ValueCount { value, count: 1 });
                }
            }
        }
        Ok(counts)
    }

    pub fn write_to<W: Write>(&self, out: W, options: &WriteOptions) -> Result<(), XmlError> {
        xml::write_tree(&self.root, out, options)
    }

    pub fn to_xml_string(&self, options: &WriteOptions) -> Result<String, TableError> {
        xml::to_string(&self.root, options).map_err(TableError::Render)
    }

    /// Renders the whole document first, then overwrites `path` in one write.
    pub fn save(&self, path: &Path, options: &WriteOptions) -> Result<(), TableError> {
        let text = self.to_xml_string(options)?;
        fs::write(path, text).map_err(|source| TableError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "event=table_saved path={} entries={}",
            path.display(),
            self.entry_count()
        );
        Ok(())
    }
}

fn check_value(column: &str, value: &str) -> Result<(), TableError> {
    xml::check_text(value).map_err(|source| TableError::InvalidValue {
        column: column.to_string(),
        source,
    })
}

fn project_entry(entry: &Element, schema: &Schema) -> Row {
    schema
        .names()
        .map(|name| {
            entry
                .child(name)
                .map(|child| child.text.clone())
                .unwrap_or_default()
        })
        .collect()
}

// Index before the first existing child that belongs to a later schema column.
fn insertion_point(entry: &Element, schema: &Schema, column: &str) -> usize {
    let Some(target) = schema.position(column) else {
        return entry.children.len();
    };
    entry
        .children
        .iter()
        .position(|child| schema.position(&child.name).is_some_and(|p| p > target))
        .unwrap_or(entry.children.len())
}
