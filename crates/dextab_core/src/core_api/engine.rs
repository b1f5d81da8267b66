use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use log::info;

use crate::schema::{ColumnSpec, Row, Schema};
use crate::table::{Rows, TableDocument, ValueCount};
use crate::xml::WriteOptions;

use super::error::{CoreError, CoreErrorCode};
use super::types::TableSummary;

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine {
    write_options: WriteOptions,
}

/// An opened table plus where it came from and whether it has unsaved edits.
#[derive(Debug)]
pub struct Session {
    document: TableDocument,
    source_path: Option<PathBuf>,
    write_options: WriteOptions,
    dirty: bool,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_write_options(write_options: WriteOptions) -> Self {
        Self { write_options }
    }

    pub fn write_options(&self) -> WriteOptions {
        self.write_options
    }

    pub fn open_path<P: AsRef<Path>>(&self, path: P) -> Result<Session, CoreError> {
        let path = path.as_ref();
        let document = TableDocument::open(path).map_err(|e| {
            CoreError::from(e).context(format!("failed to load {}", path.display()))
        })?;
        Ok(self.session(document, Some(path.to_path_buf())))
    }

    pub fn open_str(&self, xml: &str) -> Result<Session, CoreError> {
        let document = TableDocument::parse_str(xml)
            .map_err(|e| CoreError::from(e).context("failed to parse input"))?;
        Ok(self.session(document, None))
    }

    pub fn open_reader<R: BufRead>(&self, input: R) -> Result<Session, CoreError> {
        let document = TableDocument::read_from(input)
            .map_err(|e| CoreError::from(e).context("failed to parse input"))?;
        Ok(self.session(document, None))
    }

    fn session(&self, document: TableDocument, source_path: Option<PathBuf>) -> Session {
        Session {
            document,
            source_path,
            write_options: self.write_options,
            dirty: false,
        }
    }
}

impl Session {
    pub fn document(&self) -> &TableDocument {
        &self.document
    }

    pub fn schema(&self) -> &Schema {
        self.document.schema()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        self.document.schema().columns()
    }

    /// False when the container was empty at load time and no schema exists.
    pub fn has_entries(&self) -> bool {
        self.document.entry_count() > 0
    }

    pub fn entry_count(&self) -> usize {
        self.document.entry_count()
    }

    pub fn rows(&self) -> Rows<'_> {
        self.document.rows()
    }

    pub fn row(&self, index: usize) -> Option<Row> {
        self.document.row(index)
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn summary(&self) -> TableSummary {
        let root = self.document.root();
        let schema = self.document.schema();
        TableSummary {
            root_tag: root.name.clone(),
            container_tag: self.document.container().name.clone(),
            entry_tag: schema.entry_tag().map(str::to_string),
            columns: schema.columns().to_vec(),
            entry_count: self.document.entry_count(),
            source_path: self
                .source_path
                .as_ref()
                .map(|p| p.display().to_string()),
            dirty: self.dirty,
        }
    }

    pub fn add_entry(&mut self, values: &HashMap<String, String>) -> Result<Row, CoreError> {
        let row = self
            .document
            .add_entry(values)
            .map_err(|e| CoreError::from(e).context("failed to add entry"))?;
        self.dirty = true;
        Ok(row)
    }

    pub fn set_cell(&mut self, row: usize, column: &str, value: &str) -> Result<Row, CoreError> {
        let row = self
            .document
            .set_cell(row, column, value)
            .map_err(|e| CoreError::from(e).context("failed to edit cell"))?;
        self.dirty = true;
        Ok(row)
    }

    pub fn value_counts(&self, column: &str) -> Result<Vec<ValueCount>, CoreError> {
        self.document
            .value_counts(column)
            .map_err(|e| CoreError::from(e).context("failed to count values"))
    }

    pub fn to_xml_string(&self) -> Result<String, CoreError> {
        self.document
            .to_xml_string(&self.write_options)
            .map_err(|e| CoreError::from(e).context("failed to render document"))
    }

    /// Writes back to the path the session was opened from.
    pub fn save(&mut self) -> Result<(), CoreError> {
        let Some(path) = self.source_path.clone() else {
            return Err(CoreError::new(
                CoreErrorCode::Write,
                "session was not opened from a file; use save_to",
            ));
        };
        self.write(&path)
    }

    /// Writes to `path` and makes it the session's source path.
    pub fn save_to<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CoreError> {
        let path = path.as_ref();
        self.write(path)?;
        self.source_path = Some(path.to_path_buf());
        Ok(())
    }

    fn write(&mut self, path: &Path) -> Result<(), CoreError> {
        self.document
            .save(path, &self.write_options)
            .map_err(|e| {
                CoreError::from(e).context(format!("failed to save {}", path.display()))
            })?;
        if self.dirty {
            info!("event=session_clean path={}", path.display());
        }
        self.dirty = false;
        Ok(())
    }
}
