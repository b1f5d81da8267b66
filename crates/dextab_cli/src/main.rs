use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};
use dextab_core::core_api::{Engine, ID_COLUMN, Row, Session, WriteOptions, new_entry_id};
use dextab_core::xml::DEFAULT_INDENT_WIDTH;
use dextab_render::{
    DEFAULT_CHART_WIDTH, DEFAULT_MAX_CELL_WIDTH, TextRenderOptions, column_indices,
    render_rows_json, render_schema_text, render_summary_json, render_table_text,
    render_value_chart, render_value_counts_json, row_to_json,
};
use flexi_logger::{Logger, LoggerHandle};
use log::info;
use serde_json::Value as JsonValue;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every entry as a table row.
    Show {
        #[arg(value_name = "FILE.xml")]
        path: PathBuf,
        #[arg(long, value_delimiter = ',', value_name = "COLUMN,...")]
        columns: Vec<String>,
        #[arg(long = "max-width", default_value_t = DEFAULT_MAX_CELL_WIDTH)]
        max_width: usize,
        #[arg(long = "no-row-numbers")]
        no_row_numbers: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print the inferred columns and document summary.
    Schema {
        #[arg(value_name = "FILE.xml")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Append a new entry and save.
    Add {
        #[arg(value_name = "FILE.xml")]
        path: PathBuf,
        #[arg(
            long = "value",
            value_name = "COLUMN=VALUE",
            value_parser = parse_assignment,
            allow_hyphen_values = true
        )]
        values: Vec<(String, String)>,
        /// Leave the id column empty instead of generating a UUID.
        #[arg(long = "no-auto-id")]
        no_auto_id: bool,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Replace one cell of an existing entry and save.
    Set {
        #[arg(value_name = "FILE.xml")]
        path: PathBuf,
        #[arg(long)]
        row: usize,
        #[arg(long)]
        column: String,
        #[arg(long, allow_hyphen_values = true)]
        value: String,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Show how often each value of a column occurs.
    Chart {
        #[arg(value_name = "FILE.xml")]
        path: PathBuf,
        #[arg(long)]
        column: String,
        #[arg(long, default_value_t = DEFAULT_CHART_WIDTH)]
        width: usize,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct SaveArgs {
    /// Write here instead of overwriting the input file.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_INDENT_WIDTH)]
    indent: usize,
    /// Print the affected row as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let _logger = init_logging(cli.verbose);

    match cli.command {
        Command::Show {
            path,
            columns,
            max_width,
            no_row_numbers,
            json,
        } => {
            let session = open_session(&path, WriteOptions::default());
            let indices = column_indices(session.schema(), &columns).unwrap_or_else(|e| {
                eprintln!("Error selecting columns: {e}");
                process::exit(1);
            });
            if json {
                print_json(&render_rows_json(&session, &indices));
                return;
            }
            let options = TextRenderOptions {
                max_cell_width: max_width,
                row_numbers: !no_row_numbers,
            };
            print!("{}", render_table_text(&session, &indices, &options));
        }
        Command::Schema { path, json } => {
            let session = open_session(&path, WriteOptions::default());
            if json {
                print_json(&render_summary_json(&session));
            } else {
                print!("{}", render_schema_text(&session));
            }
        }
        Command::Add {
            path,
            values,
            no_auto_id,
            save,
        } => {
            let mut session = open_session(&path, write_options(&save));
            let mut values: HashMap<String, String> = values.into_iter().collect();
            if session.schema().has_id_column() && !no_auto_id && !values.contains_key(ID_COLUMN) {
                values.insert(ID_COLUMN.to_string(), new_entry_id());
            }

            let row = session.add_entry(&values).unwrap_or_else(|e| {
                eprintln!("Error adding entry to {}: {e}", path.display());
                process::exit(1);
            });
            let out_path = save_session(&mut session, &save);
            let index = session.entry_count() - 1;
            report_row(&session, &save, &row, || {
                format!("Added row {index} to {}", out_path.display())
            });
        }
        Command::Set {
            path,
            row,
            column,
            value,
            save,
        } => {
            let mut session = open_session(&path, write_options(&save));
            let updated = session.set_cell(row, &column, &value).unwrap_or_else(|e| {
                eprintln!("Error editing {}: {e}", path.display());
                process::exit(1);
            });
            let out_path = save_session(&mut session, &save);
            report_row(&session, &save, &updated, || {
                format!("Updated row {row} column {column} in {}", out_path.display())
            });
        }
        Command::Chart {
            path,
            column,
            width,
            json,
        } => {
            let session = open_session(&path, WriteOptions::default());
            let counts = session.value_counts(&column).unwrap_or_else(|e| {
                eprintln!("Error counting values: {e}");
                process::exit(1);
            });
            if json {
                print_json(&render_value_counts_json(&column, &counts));
            } else {
                print!("{}", render_value_chart(&column, &counts, width));
            }
        }
    }
}

fn init_logging(verbose: u8) -> Option<LoggerHandle> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    match Logger::try_with_env_or_str(level).and_then(|logger| logger.log_to_stderr().start()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e}");
            None
        }
    }
}

fn open_session(path: &Path, options: WriteOptions) -> Session {
    let session = Engine::with_write_options(options)
        .open_path(path)
        .unwrap_or_else(|e| {
            eprintln!("Error opening XML file: {}", path.display());
            eprintln!("  {e}");
            process::exit(1);
        });
    if !session.has_entries() {
        eprintln!("No data entries found in {}.", path.display());
    }
    session
}

fn write_options(save: &SaveArgs) -> WriteOptions {
    WriteOptions {
        indent_width: save.indent,
    }
}

fn save_session(session: &mut Session, save: &SaveArgs) -> PathBuf {
    let result = match &save.output {
        Some(out) => session.save_to(out),
        None => session.save(),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error saving: {e}");
        process::exit(1);
    });

    let out_path = session
        .source_path()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    info!("event=cli_saved path={}", out_path.display());
    out_path
}

fn report_row(session: &Session, save: &SaveArgs, row: &Row, message: impl FnOnce() -> String) {
    if save.json {
        let all = column_indices(session.schema(), &[]).unwrap_or_default();
        print_json(&row_to_json(session.schema(), row, &all));
    } else {
        println!("{}", message());
    }
}

fn print_json(value: &JsonValue) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error rendering JSON output: {e}");
        process::exit(1);
    });
    println!("{rendered}");
}

fn parse_assignment(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((column, cell)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), cell.to_string()))
        }
        _ => Err(format!(
            "invalid value '{value}', expected COLUMN=VALUE (for example name=Squirtle)"
        )),
    }
}
