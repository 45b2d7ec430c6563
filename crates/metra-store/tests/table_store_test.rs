use metra_store::{Direction, Row, RowPredicate, TableStore};
use tempfile::TempDir;

fn store(dir: &TempDir, table: &str) -> TableStore {
    TableStore::open(dir.path().join("test.db"), table).unwrap()
}

#[test]
fn create_or_widen_is_idempotent_and_additive() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");

    store.create_or_widen(&["alpha", "beta"]);
    assert_eq!(store.schema(), vec!["id", "alpha", "beta"]);

    // widening with an overlapping key set only adds the new column
    store.create_or_widen(&["beta", "gamma"]);
    assert_eq!(store.schema(), vec!["id", "alpha", "beta", "gamma"]);

    store.create_or_widen(&["alpha", "beta", "gamma"]);
    assert_eq!(store.schema(), vec!["id", "alpha", "beta", "gamma"]);
}

#[test]
fn existing_rows_read_empty_in_new_columns() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");

    store.create_or_widen(&["alpha"]);
    store.insert(&Row::new().with("alpha", "1"));
    store.create_or_widen(&["beta"]);

    let rows = store.select("", "id", Direction::Asc);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("alpha"), Some("1"));
    assert_eq!(rows[0].get("beta"), Some(""));
}

#[test]
fn ids_are_monotonic_and_never_reused() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.create_or_widen(&["alpha"]);

    for value in ["a", "b", "c"] {
        store.insert(&Row::new().with("alpha", value));
    }
    assert_eq!(store.last_id(), 3);

    assert_eq!(store.delete("id", "3"), 1);
    store.insert(&Row::new().with("alpha", "d"));
    assert_eq!(store.last_id(), 4);
}

#[test]
fn insert_trims_values_and_rejects_empty_rows() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.create_or_widen(&["alpha"]);

    store.insert(&Row::new().with("alpha", "  padded  "));
    let rows = store.select("", "id", Direction::Asc);
    assert_eq!(rows[0].get("alpha"), Some("padded"));

    // an empty row is dropped, not half-written
    store.insert(&Row::new());
    assert_eq!(store.select("", "id", Direction::Asc).len(), 1);
}

#[test]
fn delete_guards_empty_and_zero_values() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.create_or_widen(&["alpha"]);
    store.insert(&Row::new().with("alpha", "x"));
    store.insert(&Row::new().with("alpha", "y"));

    assert_eq!(store.delete("alpha", ""), 0);
    assert_eq!(store.delete("alpha", "0"), 0);
    assert_eq!(store.select("", "id", Direction::Asc).len(), 2);

    assert_eq!(store.delete("alpha", "x"), 1);
    assert_eq!(store.select("", "id", Direction::Asc).len(), 1);
}

#[test]
fn update_by_id_and_by_filter() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.create_or_widen(&["alpha", "beta"]);
    store.insert(&Row::new().with("alpha", "x").with("beta", "1"));
    store.insert(&Row::new().with("alpha", "x").with("beta", "2"));
    store.insert(&Row::new().with("alpha", "y").with("beta", "3"));

    assert_eq!(
        store.update(&Row::new().with("beta", "9"), RowPredicate::Id(1)),
        1
    );
    assert_eq!(
        store.update(
            &Row::new().with("beta", "0"),
            RowPredicate::Filter("alpha = 'x'".to_string())
        ),
        2
    );

    let rows = store.select("alpha = 'x'", "id", Direction::Asc);
    assert!(rows.iter().all(|r| r.get("beta") == Some("0")));
    let rows = store.select("alpha = 'y'", "id", Direction::Asc);
    assert_eq!(rows[0].get("beta"), Some("3"));
}

#[test]
fn select_orders_filters_and_limits() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.create_or_widen(&["name"]);
    for name in ["charlie", "alpha", "bravo"] {
        store.insert(&Row::new().with("name", name));
    }

    let rows = store.select("", "name", Direction::Asc);
    let names: Vec<_> = rows.iter().map(|r| r.get("name").unwrap()).collect();
    assert_eq!(names, vec!["alpha", "bravo", "charlie"]);

    let rows = store.select("", "name", Direction::Desc);
    assert_eq!(rows[0].get("name"), Some("charlie"));

    let rows = store.select_all("name != 'bravo'", "name", Direction::Asc, 1);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some("alpha"));

    // limit 0 falls back to the 10000 default, high enough for all rows
    let rows = store.select_all("", "name", Direction::Asc, 0);
    assert_eq!(rows.len(), 3);
}

#[test]
fn select_columns_probes_schema() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.create_or_widen(&["alpha", "beta"]);

    // works on an empty table
    assert_eq!(store.select_columns(), vec!["id", "alpha", "beta"]);

    // a missing table yields an empty list, not a panic
    let missing = TableStore::open(dir.path().join("test.db"), "nothing").unwrap();
    assert!(missing.select_columns().is_empty());
}

#[test]
fn cursor_iterates_all_matching_rows_once() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.create_or_widen(&["bucket", "seq"]);
    for i in 0..600 {
        store.insert(
            &Row::new()
                .with("bucket", if i % 2 == 0 { "even" } else { "odd" })
                .with("seq", format!("{i:04}")),
        );
    }

    let mut cursor = store.select_cursor("bucket = 'even'", "seq", Direction::Asc);
    let mut previous = String::new();
    let mut count = 0;
    for row in &mut cursor {
        let seq = row.get("seq").unwrap().to_string();
        assert!(seq > previous);
        previous = seq;
        count += 1;
    }
    assert_eq!(count, 300);

    // single-pass: a drained cursor stays drained
    assert!(cursor.next().is_none());
}

#[test]
fn cursor_descending() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.create_or_widen(&["seq"]);
    for i in 0..10 {
        store.insert(&Row::new().with("seq", format!("{i:02}")));
    }

    let seqs: Vec<_> = store
        .select_cursor("", "seq", Direction::Desc)
        .map(|r| r.get("seq").unwrap().to_string())
        .collect();
    assert_eq!(seqs.first().map(String::as_str), Some("09"));
    assert_eq!(seqs.last().map(String::as_str), Some("00"));
    assert_eq!(seqs.len(), 10);
}

#[test]
fn distinct_count_groups_markers_per_session() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.create_or_widen(&["ftable", "fkey"]);
    for (ftable, fkey) in [("s1", "k1"), ("s1", "k1"), ("s1", "k2"), ("s2", "k3")] {
        store.insert(&Row::new().with("ftable", ftable).with("fkey", fkey));
    }

    assert_eq!(store.distinct_count("s1"), 2);
    assert_eq!(store.distinct_count("s2"), 1);
    assert_eq!(store.distinct_count("missing"), 0);
}

#[test]
fn has_rows_and_drop_table() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.create_or_widen(&["alpha"]);
    assert!(!store.has_rows());

    store.insert(&Row::new().with("alpha", "x"));
    assert!(store.has_rows());

    store.drop_table();
    assert!(store.schema().is_empty());
    assert!(!store.has_rows());
}

#[test]
fn attach_copy_detach_moves_rows_between_files() {
    let dir = TempDir::new().unwrap();
    let other = TableStore::open(dir.path().join("other.db"), "report").unwrap();
    other.create_or_widen(&["alpha"]);
    other.insert(&Row::new().with("alpha", "one"));
    other.insert(&Row::new().with("alpha", "two"));

    let store = store(&dir, "report");
    store.create_or_widen(&["alpha"]);

    store.attach(&dir.path().join("other.db"), "src");
    assert_eq!(store.copy("report", "report"), 2);
    store.detach();

    let rows = store.select("", "id", Direction::Asc);
    let values: Vec<_> = rows.iter().map(|r| r.get("alpha").unwrap()).collect();
    assert_eq!(values, vec!["one", "two"]);
}

#[test]
fn detach_without_attach_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.detach();
    store.create_or_widen(&["alpha"]);
    store.insert(&Row::new().with("alpha", "x"));
    assert_eq!(store.last_id(), 1);
}

#[test]
fn copy_within_the_same_database_without_attach() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, "report");
    store.create_or_widen(&["alpha"]);
    store.insert(&Row::new().with("alpha", "x"));

    let archive = TableStore::open(dir.path().join("test.db"), "archive").unwrap();
    archive.create_or_widen(&["alpha"]);

    assert_eq!(store.copy("report", "archive"), 1);
    assert_eq!(archive.select("", "id", Direction::Asc).len(), 1);
}

#[test]
fn invalid_identifiers_are_rejected_without_touching_the_engine() {
    let dir = TempDir::new().unwrap();
    assert!(TableStore::open(dir.path().join("test.db"), "bad name").is_err());
    assert!(TableStore::open(dir.path().join("test.db"), "1table").is_err());

    let store = store(&dir, "report");
    store.create_or_widen(&["ok", "drop table x"]);
    // the whole widening is refused, not partially applied
    assert!(store.schema().is_empty());
}
