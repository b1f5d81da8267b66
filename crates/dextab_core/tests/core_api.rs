use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use dextab_core::core_api::{CoreErrorCode, Engine, ID_COLUMN, ValueCount};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture_path(name: &str) -> PathBuf {
    workspace_root().join("tests/fixtures").join(name)
}

fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn engine_loads_starter_schema_and_rows() {
    let session = Engine::new()
        .open_path(fixture_path("starters.xml"))
        .expect("failed to open starters fixture");

    let names: Vec<&str> = session.schema().names().collect();
    assert_eq!(names, vec!["name", "type"]);
    assert_eq!(session.schema().entry_tag(), Some("pokemon"));

    let rows: Vec<Vec<String>> = session.rows().collect();
    assert_eq!(
        rows,
        vec![
            vec!["Bulbasaur".to_string(), "Grass".to_string()],
            vec!["Charmander".to_string(), "Fire".to_string()],
        ]
    );
    assert!(session.has_entries());
    assert!(!session.is_dirty());
}

#[test]
fn every_row_matches_schema_length() {
    let session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");

    assert_eq!(session.entry_count(), 5);
    assert_eq!(session.rows().len(), 5);
    for row in session.rows() {
        assert_eq!(row.len(), session.schema().len());
    }
}

#[test]
fn projection_reads_missing_middle_child_as_empty() {
    let session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");

    let levitate = session.row(2).expect("third row should exist");
    assert_eq!(
        levitate,
        vec![
            "c41e7f02-3b6d-4a8c-9e15-6f2d8a0b4c93",
            "26",
            "Levitate",
            "",
            "Gen III"
        ]
    );

    let stench = session.row(4).expect("fifth row should exist");
    assert_eq!(stench[0], "");
    assert_eq!(stench[3], "");
}

#[test]
fn projection_ignores_children_outside_schema() {
    let session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");

    let row = session.row(3).expect("fourth row should exist");
    assert_eq!(row.len(), 5);
    assert!(!row.iter().any(|cell| cell == "Zygarde only"));
}

#[test]
fn rows_are_idempotent_without_mutation() {
    let session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");

    let first: Vec<_> = session.rows().collect();
    let second: Vec<_> = session.rows().collect();
    assert_eq!(first, second);
}

#[test]
fn columns_mark_id_read_only() {
    let session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");

    let columns = session.columns();
    assert_eq!(columns[0].name, ID_COLUMN);
    assert!(!columns[0].editable);
    assert!(columns[1..].iter().all(|c| c.editable));
}

#[test]
fn empty_container_yields_no_schema_and_no_rows() {
    let session = Engine::new()
        .open_path(fixture_path("empty.xml"))
        .expect("empty container should load");

    assert!(session.schema().is_empty());
    assert_eq!(session.rows().count(), 0);
    assert!(!session.has_entries());
    assert_eq!(session.summary().container_tag, "pokedex");
}

#[test]
fn missing_file_is_a_parse_error() {
    let err = Engine::new()
        .open_path(fixture_path("does_not_exist.xml"))
        .expect_err("missing file should fail");
    assert_eq!(err.code, CoreErrorCode::Parse);
    assert!(err.message.contains("does_not_exist.xml"));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let err = Engine::new()
        .open_path(fixture_path("malformed.xml"))
        .expect_err("malformed file should fail");
    assert_eq!(err.code, CoreErrorCode::Parse);
}

#[test]
fn root_without_container_is_a_parse_error() {
    let err = Engine::new()
        .open_path(fixture_path("no_container.xml"))
        .expect_err("root without container should fail");
    assert_eq!(err.code, CoreErrorCode::Parse);
    assert!(err.message.contains("container"));
}

#[test]
fn add_entry_appends_row_and_keeps_existing_rows() {
    let mut session = Engine::new()
        .open_path(fixture_path("starters.xml"))
        .expect("failed to open starters fixture");
    let before: Vec<_> = session.rows().collect();

    let row = session
        .add_entry(&values(&[("name", "Squirtle"), ("type", "Water")]))
        .expect("add should succeed");
    assert_eq!(row, vec!["Squirtle", "Water"]);

    let after: Vec<_> = session.rows().collect();
    assert_eq!(after.len(), 3);
    assert_eq!(&after[..2], &before[..]);
    assert_eq!(after[2], vec!["Squirtle", "Water"]);
    assert!(session.is_dirty());
}

#[test]
fn add_entry_follows_schema_order_and_fills_missing_columns() {
    let mut session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");

    let row = session
        .add_entry(&values(&[
            ("origin", "Gen IX"),
            ("name", "Toxic Chain"),
            ("id", "f00dfeed-0000-4000-8000-000000000001"),
            ("color", "purple"),
        ]))
        .expect("add should succeed");
    assert_eq!(
        row,
        vec![
            "f00dfeed-0000-4000-8000-000000000001",
            "",
            "Toxic Chain",
            "",
            "Gen IX"
        ]
    );

    let container = session.document().container();
    let added = container.children.last().expect("entry should be appended");
    assert_eq!(added.name, "ability");
    let tags: Vec<&str> = added.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(tags, vec!["id", "num", "name", "effect", "origin"]);
}

#[test]
fn add_entry_on_empty_table_is_rejected() {
    let mut session = Engine::new()
        .open_path(fixture_path("empty.xml"))
        .expect("empty container should load");

    let err = session
        .add_entry(&values(&[("name", "Mew")]))
        .expect_err("no entry tag to copy");
    assert_eq!(err.code, CoreErrorCode::InvalidEdit);
    assert_eq!(session.entry_count(), 0);
    assert!(!session.is_dirty());
}

#[test]
fn set_cell_updates_projection() {
    let mut session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");

    let row = session
        .set_cell(1, "origin", "Gen VIII")
        .expect("edit should succeed");
    assert_eq!(row[4], "Gen VIII");
    assert_eq!(session.row(1).expect("row should exist")[4], "Gen VIII");
    assert!(session.is_dirty());
}

#[test]
fn set_cell_inserts_missing_child_in_schema_position() {
    let mut session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");

    session
        .set_cell(2, "effect", "Immune to Ground-type moves.")
        .expect("edit should succeed");

    let entry = &session.document().container().children[2];
    let tags: Vec<&str> = entry.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(tags, vec!["id", "num", "name", "effect", "origin"]);
}

#[test]
fn set_cell_rejects_id_unknown_column_and_bad_row() {
    let mut session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");

    let err = session
        .set_cell(0, "id", "new")
        .expect_err("id is read-only");
    assert_eq!(err.code, CoreErrorCode::InvalidEdit);
    assert!(err.message.contains("read-only"));

    let err = session
        .set_cell(0, "generation", "3")
        .expect_err("column is not in schema");
    assert_eq!(err.code, CoreErrorCode::InvalidEdit);

    let err = session
        .set_cell(99, "name", "Nope")
        .expect_err("row is out of range");
    assert_eq!(err.code, CoreErrorCode::InvalidEdit);

    assert!(!session.is_dirty());
}

#[test]
fn value_counts_keep_first_seen_order() {
    let session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");

    let counts = session.value_counts("origin").expect("origin is a column");
    assert_eq!(
        counts,
        vec![
            ValueCount {
                value: "Gen III".to_string(),
                count: 4
            },
            ValueCount {
                value: "Gen VII".to_string(),
                count: 1
            },
        ]
    );

    let err = session
        .value_counts("colour")
        .expect_err("unknown column");
    assert_eq!(err.code, CoreErrorCode::InvalidEdit);
}

#[test]
fn save_clears_dirty_flag_and_tracks_new_path() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let out = dir.path().join("starters.xml");

    let mut session = Engine::new()
        .open_path(fixture_path("starters.xml"))
        .expect("failed to open starters fixture");
    session
        .add_entry(&values(&[("name", "Squirtle"), ("type", "Water")]))
        .expect("add should succeed");

    session.save_to(&out).expect("save should succeed");
    assert!(!session.is_dirty());
    assert_eq!(session.source_path(), Some(out.as_path()));

    session
        .set_cell(0, "type", "Grass/Poison")
        .expect("edit should succeed");
    session.save().expect("save back should succeed");

    let reloaded = Engine::new().open_path(&out).expect("saved file should load");
    assert_eq!(reloaded.row(0).expect("row should exist")[1], "Grass/Poison");
    assert_eq!(reloaded.entry_count(), 3);
}

#[test]
fn failed_save_is_a_write_error_and_keeps_state() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let out = dir.path().join("missing_dir").join("out.xml");

    let mut session = Engine::new()
        .open_path(fixture_path("starters.xml"))
        .expect("failed to open starters fixture");
    session
        .add_entry(&values(&[("name", "Squirtle"), ("type", "Water")]))
        .expect("add should succeed");
    let before: Vec<_> = session.rows().collect();

    let err = session.save_to(&out).expect_err("missing directory should fail");
    assert_eq!(err.code, CoreErrorCode::Write);
    assert!(session.is_dirty());
    assert_eq!(session.rows().collect::<Vec<_>>(), before);
    assert_eq!(session.source_path(), Some(fixture_path("starters.xml").as_path()));
    assert!(!out.exists());
}

#[test]
fn save_without_source_path_needs_explicit_target() {
    let mut session = Engine::new()
        .open_str("<data><pokedex><pokemon><name>Eevee</name></pokemon></pokedex></data>")
        .expect("inline document should parse");

    let err = session.save().expect_err("no source path");
    assert_eq!(err.code, CoreErrorCode::Write);
}

#[test]
fn summary_serializes_with_serde() {
    let mut session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");
    session
        .set_cell(0, "notes", "")
        .expect_err("notes is not a schema column");
    session
        .set_cell(0, "num", "065")
        .expect("edit should succeed");

    let summary = session.summary();
    assert_eq!(summary.root_tag, "ultimatepokedex");
    assert_eq!(summary.entry_tag.as_deref(), Some("ability"));
    assert_eq!(summary.entry_count, 5);
    assert!(summary.dirty);

    let json = serde_json::to_value(&summary).expect("summary should serialize");
    assert_eq!(json["container_tag"], "abilities");
    assert_eq!(json["columns"][0]["name"], "id");
    assert_eq!(json["columns"][0]["editable"], false);
}

#[test]
fn saved_file_round_trips_unchanged_fixture() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let out = dir.path().join("abilities.xml");

    let mut session = Engine::new()
        .open_path(fixture_path("abilities.xml"))
        .expect("failed to open abilities fixture");
    session.save_to(&out).expect("save should succeed");

    let text = fs::read_to_string(&out).expect("saved file should be readable");
    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
    assert!(text.contains("\n      <notes>Zygarde only</notes>\n"));
    assert!(text.contains("\n      <id/>\n"));
}

#[test]
fn invalid_character_references_are_parse_errors() {
    let err = Engine::new()
        .open_str("<d><c><e><a>x&#xD800;y</a><b>&#0;</b></e></c></d>")
        .expect_err("surrogate and NUL references should fail");
    assert_eq!(err.code, CoreErrorCode::Parse);
    assert!(err.message.contains("D800"));
}

#[test]
fn control_characters_are_invalid_edits() {
    let mut session = Engine::new()
        .open_str("<d><c><e><a>x</a><b>y</b></e></c></d>")
        .expect("inline document should parse");

    let err = session
        .add_entry(&values(&[("a", "\u{1}ctrl")]))
        .expect_err("U+0001 cannot be stored");
    assert_eq!(err.code, CoreErrorCode::InvalidEdit);
    assert_eq!(session.entry_count(), 1);

    let err = session
        .set_cell(0, "b", "\u{0}")
        .expect_err("NUL cannot be stored");
    assert_eq!(err.code, CoreErrorCode::InvalidEdit);
    assert!(!session.is_dirty());

    let text = session.to_xml_string().expect("document should render");
    assert!(!text.contains('\u{0}'));
    assert!(!text.contains('\u{1}'));
}

#[cfg(unix)]
#[test]
fn save_into_read_only_directory_is_a_write_error() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("temp dir should be created");
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).expect("directory should be created");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555))
        .expect("permissions should be set");

    // Root ignores directory permissions.
    if fs::write(locked.join("access.tmp"), b"").is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))
            .expect("permissions should be restored");
        return;
    }

    let out = locked.join("starters.xml");
    let mut session = Engine::new()
        .open_path(fixture_path("starters.xml"))
        .expect("failed to open starters fixture");
    session
        .set_cell(0, "name", "Ivysaur")
        .expect("edit should succeed");

    let err = session.save_to(&out).expect_err("read-only directory should fail");
    assert_eq!(err.code, CoreErrorCode::Write);
    assert!(session.is_dirty());
    assert!(!out.exists());

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))
        .expect("permissions should be restored");
}
