use std::fmt::Write as _;

use dextab_core::core_api::{Row, Schema, Session, ValueCount};
use serde_json::{Map as JsonMap, Value as JsonValue};

pub const DEFAULT_MAX_CELL_WIDTH: usize = 40;
pub const DEFAULT_CHART_WIDTH: usize = 50;
const COLUMN_GAP: &str = "  ";
const BAR_CHAR: char = '#';
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRenderOptions {
    /// Cells longer than this are cut and suffixed with `...`. Zero disables it.
    pub max_cell_width: usize,
    pub row_numbers: bool,
}

impl Default for TextRenderOptions {
    fn default() -> Self {
        Self {
            max_cell_width: DEFAULT_MAX_CELL_WIDTH,
            row_numbers: true,
        }
    }
}

/// Resolves requested column names to schema positions, keeping request order.
/// An empty request selects every column.
pub fn column_indices(schema: &Schema, requested: &[String]) -> Result<Vec<usize>, String> {
    if requested.is_empty() {
        return Ok((0..schema.len()).collect());
    }
    requested
        .iter()
        .map(|name| {
            schema.position(name).ok_or_else(|| {
                format!(
                    "unknown column '{name}', expected one of: {}",
                    schema.names().collect::<Vec<_>>().join(", ")
                )
            })
        })
        .collect()
}

pub fn render_table_text(session: &Session, columns: &[usize], options: &TextRenderOptions) -> String {
    if !session.has_entries() {
        return "No data entries found.\n".to_string();
    }

    let schema = session.schema();
    let mut header: Vec<String> = Vec::with_capacity(columns.len() + 1);
    if options.row_numbers {
        header.push("#".to_string());
    }
    for &index in columns {
        header.push(schema.columns()[index].name.clone());
    }

    let body: Vec<Vec<String>> = session
        .rows()
        .enumerate()
        .map(|(number, row)| {
            let mut cells = Vec::with_capacity(header.len());
            if options.row_numbers {
                cells.push(number.to_string());
            }
            cells.extend(
                columns
                    .iter()
                    .map(|&index| clip(&row[index], options.max_cell_width)),
            );
            cells
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    push_line(&mut out, &rule, &widths);
    for cells in &body {
        push_line(&mut out, cells, &widths);
    }
    out
}

pub fn render_rows_json(session: &Session, columns: &[usize]) -> JsonValue {
    let schema = session.schema();
    JsonValue::Array(
        session
            .rows()
            .map(|row| row_to_json(schema, &row, columns))
            .collect(),
    )
}

pub fn render_schema_text(session: &Session) -> String {
    let summary = session.summary();
    let mut out = String::new();

    writeln!(out, "root:      {}", summary.root_tag).expect("writing to String cannot fail");
    writeln!(out, "container: {}", summary.container_tag).expect("writing to String cannot fail");
    writeln!(
        out,
        "entry:     {}",
        summary.entry_tag.as_deref().unwrap_or("(none)")
    )
    .expect("writing to String cannot fail");
    writeln!(out, "entries:   {}", summary.entry_count).expect("writing to String cannot fail");
    if summary.columns.is_empty() {
        writeln!(out, "columns:   (none; no data entries found)")
            .expect("writing to String cannot fail");
        return out;
    }
    writeln!(out, "columns:").expect("writing to String cannot fail");
    for column in &summary.columns {
        let mode = if column.editable { "editable" } else { "read-only" };
        writeln!(out, "  {:<24}{mode}", column.name).expect("writing to String cannot fail");
    }
    out
}

pub fn render_summary_json(session: &Session) -> JsonValue {
    let summary = session.summary();
    let mut out = JsonMap::new();

    out.insert("root".to_string(), JsonValue::String(summary.root_tag));
    out.insert(
        "container".to_string(),
        JsonValue::String(summary.container_tag),
    );
    out.insert(
        "entry".to_string(),
        match summary.entry_tag {
            Some(tag) => JsonValue::String(tag),
            None => JsonValue::Null,
        },
    );
    out.insert(
        "entry_count".to_string(),
        JsonValue::from(summary.entry_count),
    );
    out.insert(
        "columns".to_string(),
        JsonValue::Array(
            summary
                .columns
                .iter()
                .map(|c| {
                    let mut m = JsonMap::new();
                    m.insert("name".to_string(), JsonValue::String(c.name.clone()));
                    m.insert("editable".to_string(), JsonValue::Bool(c.editable));
                    JsonValue::Object(m)
                })
                .collect(),
        ),
    );
    out.insert(
        "source".to_string(),
        match summary.source_path {
            Some(path) => JsonValue::String(path),
            None => JsonValue::Null,
        },
    );
    out.insert("dirty".to_string(), JsonValue::Bool(summary.dirty));

    JsonValue::Object(out)
}

/// Horizontal bar chart of a column's value distribution.
///
/// The longest bar is `width` characters; every non-zero count gets at least one.
pub fn render_value_chart(column: &str, counts: &[ValueCount], width: usize) -> String {
    let mut out = String::new();
    writeln!(out, "{column}").expect("writing to String cannot fail");
    if counts.is_empty() {
        writeln!(out, "  (no values)").expect("writing to String cannot fail");
        return out;
    }

    let labels: Vec<&str> = counts
        .iter()
        .map(|c| if c.value.is_empty() { "(empty)" } else { c.value.as_str() })
        .collect();
    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let max_count = counts.iter().map(|c| c.count).max().unwrap_or(0);
    let count_width = max_count.to_string().len();

    for (label, entry) in labels.iter().zip(counts) {
        let bar_len = bar_length(entry.count, max_count, width.max(1));
        let bar: String = std::iter::repeat_n(BAR_CHAR, bar_len).collect();
        writeln!(
            out,
            "  {label:<label_width$} | {count:>count_width$} {bar}",
            count = entry.count
        )
        .expect("writing to String cannot fail");
    }
    out
}

pub fn render_value_counts_json(column: &str, counts: &[ValueCount]) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("column".to_string(), JsonValue::String(column.to_string()));
    out.insert(
        "counts".to_string(),
        JsonValue::Array(
            counts
                .iter()
                .map(|c| {
                    let mut m = JsonMap::new();
                    m.insert("value".to_string(), JsonValue::String(c.value.clone()));
                    m.insert("count".to_string(), JsonValue::from(c.count));
                    JsonValue::Object(m)
                })
                .collect(),
        ),
    );
    JsonValue::Object(out)
}

pub fn row_to_json(schema: &Schema, row: &Row, columns: &[usize]) -> JsonValue {
    let mut m = JsonMap::new();
    for &index in columns {
        m.insert(
            schema.columns()[index].name.clone(),
            JsonValue::String(row[index].clone()),
        );
    }
    JsonValue::Object(m)
}

fn bar_length(count: usize, max_count: usize, width: usize) -> usize {
    if count == 0 || max_count == 0 {
        return 0;
    }
    (count * width / max_count).max(1)
}

fn clip(cell: &str, max_width: usize) -> String {
    let flat = cell.replace(['\n', '\r', '\t'], " ");
    if max_width == 0 || flat.chars().count() <= max_width {
        return flat;
    }
    if max_width <= ELLIPSIS.len() {
        return flat.chars().take(max_width).collect();
    }
    let keep = max_width - ELLIPSIS.len();
    let mut out: String = flat.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (i, (cell, &width)) in cells.iter().zip(widths).enumerate() {
        if i > 0 {
            line.push_str(COLUMN_GAP);
        }
        write!(line, "{cell:<width$}").expect("writing to String cannot fail");
    }
    out.push_str(line.trim_end());
    out.push('\n');
}
