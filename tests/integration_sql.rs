//! # End-to-End SQL Tests
//!
//! Behavior-level tests through the public `Database` API, organized by
//! feature area: DDL, INSERT, SELECT, UPDATE/DELETE, transactions,
//! persistence, and result export. Expected values are computed by hand,
//! not derived from running the code.

use inkdb::{Database, DbError, ExecuteResult, FieldBuffer, Param, ParseError, Stream, Value};

fn db() -> Database {
    Database::open(":memory:").unwrap()
}

fn field_i64(doc: &FieldBuffer<'static>, name: &str) -> i64 {
    match doc.get(name) {
        Some(Value::Int64(v)) => *v,
        other => panic!("field {} SHOULD be an int64, got {:?}", name, other),
    }
}

mod ddl_tests {
    use super::*;

    #[test]
    fn create_table_reports_created() {
        let db = db();
        let result = db.execute("CREATE TABLE foo", &[]).unwrap();
        assert_eq!(result, ExecuteResult::CreateTable { created: true });
    }

    #[test]
    fn create_table_twice_fails_with_table_already_exists() {
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        let err = db.execute("CREATE TABLE foo", &[]).unwrap_err();
        assert!(
            DbError::TableAlreadyExists.is(&err),
            "duplicate CREATE TABLE SHOULD fail typed, got {err:#}"
        );
    }

    #[test]
    fn create_table_if_not_exists_is_idempotent() {
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        let result = db.execute("CREATE TABLE IF NOT EXISTS foo", &[]).unwrap();
        assert_eq!(result, ExecuteResult::CreateTable { created: false });
    }

    #[test]
    fn drop_table_removes_table_and_its_data() {
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        db.execute("INSERT INTO foo (a) VALUES (1)", &[]).unwrap();

        assert_eq!(
            db.execute("DROP TABLE foo", &[]).unwrap(),
            ExecuteResult::DropTable { dropped: true }
        );

        let err = db.query("SELECT a FROM foo", &[]).unwrap_err();
        assert!(DbError::TableNotFound.is(&err));

        // The name is free again.
        db.execute("CREATE TABLE foo", &[]).unwrap();
        assert!(db.query("SELECT a FROM foo", &[]).unwrap().is_empty());
    }

    #[test]
    fn drop_table_if_exists_swallows_missing_tables() {
        let db = db();
        assert_eq!(
            db.execute("DROP TABLE IF EXISTS ghost", &[]).unwrap(),
            ExecuteResult::DropTable { dropped: false }
        );
        assert!(DbError::TableNotFound.is(&db.execute("DROP TABLE ghost", &[]).unwrap_err()));
    }

    #[test]
    fn create_and_drop_index() {
        let db = db();
        db.execute("CREATE TABLE users", &[]).unwrap();
        assert_eq!(
            db.execute("CREATE INDEX idx_age ON users (age)", &[]).unwrap(),
            ExecuteResult::CreateIndex { created: true }
        );

        let err = db
            .execute("CREATE INDEX idx_age ON users (age)", &[])
            .unwrap_err();
        assert!(DbError::IndexAlreadyExists.is(&err));

        assert_eq!(
            db.execute("DROP INDEX idx_age", &[]).unwrap(),
            ExecuteResult::DropIndex { dropped: true }
        );
        assert_eq!(
            db.execute("DROP INDEX IF EXISTS idx_age", &[]).unwrap(),
            ExecuteResult::DropIndex { dropped: false }
        );
    }

    #[test]
    fn create_index_on_a_missing_table_fails() {
        let db = db();
        let err = db
            .execute("CREATE INDEX idx ON ghost (age)", &[])
            .unwrap_err();
        assert!(DbError::TableNotFound.is(&err));
    }

    #[test]
    fn malformed_sql_surfaces_a_structured_parse_error() {
        let db = db();
        let err = db.execute("SELEKT * FROM foo", &[]).unwrap_err();
        let parse_err = err
            .downcast_ref::<ParseError>()
            .expect("syntax failures SHOULD carry a ParseError");
        assert!(parse_err.expected.iter().any(|e| e == "SELECT"));
        assert!(parse_err.got.contains("SELEKT"));
    }
}

mod insert_tests {
    use super::*;

    #[test]
    fn insert_values_reports_count_and_last_key() {
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        match db
            .execute("INSERT INTO foo (a, b) VALUES (1, 'x'), (2, 'y')", &[])
            .unwrap()
        {
            ExecuteResult::Insert {
                inserted,
                last_key,
            } => {
                assert_eq!(inserted, 2);
                assert!(last_key.is_some());
            }
            other => panic!("expected Insert result, got {:?}", other),
        }
    }

    #[test]
    fn insert_documents_with_nested_values() {
        let db = db();
        db.execute("CREATE TABLE users", &[]).unwrap();
        db.execute(
            "INSERT INTO users DOCUMENTS {name: 'ana', address: {city: 'Lyon'}, tags: ['a', 'b']}",
            &[],
        )
        .unwrap();

        let rows = db
            .query("SELECT name FROM users WHERE address.city = 'Lyon'", &[])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::from("ana")));

        let rows = db
            .query("SELECT name FROM users WHERE tags.1 = 'b'", &[])
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn duplicate_primary_keys_are_rejected() {
        // Scenario S2.
        let db = db();
        db.execute("CREATE TABLE users (id TEXT PRIMARY KEY)", &[])
            .unwrap();
        db.execute("INSERT INTO users (id, n) VALUES ('x', 1)", &[])
            .unwrap();

        let err = db
            .execute("INSERT INTO users (id, n) VALUES ('x', 1)", &[])
            .unwrap_err();
        assert!(
            DbError::DuplicateDocument.is(&err),
            "second insert of the same key SHOULD fail with DuplicateDocument"
        );

        let rows = db.query("SELECT COUNT() FROM users", &[]).unwrap();
        assert_eq!(field_i64(&rows[0], "COUNT()"), 1);
    }

    #[test]
    fn missing_primary_key_field_is_a_validation_error() {
        let db = db();
        db.execute("CREATE TABLE users (id TEXT PRIMARY KEY)", &[])
            .unwrap();
        assert!(db
            .execute("INSERT INTO users (n) VALUES (1)", &[])
            .is_err());
    }

    #[test]
    fn primary_key_values_are_converted_to_the_declared_type() {
        let db = db();
        db.execute("CREATE TABLE counters (id INT PRIMARY KEY)", &[])
            .unwrap();
        // Text converts to the declared integer type.
        db.execute("INSERT INTO counters (id) VALUES ('42')", &[])
            .unwrap();
        let err = db
            .execute("INSERT INTO counters (id) VALUES (42)", &[])
            .unwrap_err();
        assert!(DbError::DuplicateDocument.is(&err));
    }

    #[test]
    fn insert_resolves_placeholders() {
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        db.execute(
            "INSERT INTO foo (a, b) VALUES (?, $name)",
            &[Param::positional(7i64), Param::named("name", "bound")],
        )
        .unwrap();

        let rows = db.query("SELECT a, b FROM foo", &[]).unwrap();
        assert_eq!(field_i64(&rows[0], "a"), 7);
        assert_eq!(rows[0].get("b"), Some(&Value::from("bound")));
    }
}

mod select_tests {
    use super::*;

    #[test]
    fn where_filters_rows() {
        // Scenario S1.
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        db.execute("INSERT INTO foo (a) VALUES (1), (2)", &[])
            .unwrap();

        let result = db.execute("SELECT a FROM foo WHERE a > 1", &[]).unwrap();
        let rows = result.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(field_i64(&rows[0], "a"), 2);

        // Mutations report no rows.
        assert!(db
            .execute("INSERT INTO foo (a) VALUES (3)", &[])
            .unwrap()
            .rows()
            .is_empty());
    }

    #[test]
    fn star_returns_whole_documents_in_insertion_order() {
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        db.execute("INSERT INTO foo (a, b) VALUES (1, 'x')", &[])
            .unwrap();

        let rows = db.query("SELECT * FROM foo", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        let names: Vec<_> = rows[0].iter().map(|f| f.name.as_ref().to_owned()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn order_by_sorts_by_the_projected_value() {
        // Scenario S3, with an index present on the sorted field.
        let db = db();
        db.execute("CREATE TABLE users", &[]).unwrap();
        db.execute("CREATE INDEX idx_age ON users (age)", &[])
            .unwrap();
        db.execute("INSERT INTO users (age) VALUES (30), (10), (20)", &[])
            .unwrap();

        let rows = db
            .query("SELECT age FROM users ORDER BY age", &[])
            .unwrap();
        let ages: Vec<_> = rows.iter().map(|r| field_i64(r, "age")).collect();
        assert_eq!(ages, [10, 20, 30]);

        let rows = db
            .query("SELECT age FROM users ORDER BY age DESC", &[])
            .unwrap();
        let ages: Vec<_> = rows.iter().map(|r| field_i64(r, "age")).collect();
        assert_eq!(ages, [30, 20, 10]);
    }

    #[test]
    fn order_by_sorts_missing_fields_first() {
        let db = db();
        db.execute("CREATE TABLE t", &[]).unwrap();
        db.execute("INSERT INTO t DOCUMENTS {a: 2}, {b: 1}, {a: 1}", &[])
            .unwrap();
        let rows = db.query("SELECT * FROM t ORDER BY a", &[]).unwrap();
        assert_eq!(rows[0].get("b"), Some(&Value::Int64(1)));
        assert_eq!(rows[1].get("a"), Some(&Value::Int64(1)));
        assert_eq!(rows[2].get("a"), Some(&Value::Int64(2)));
    }

    #[test]
    fn limit_and_offset_select_a_window() {
        let db = db();
        db.execute("CREATE TABLE t", &[]).unwrap();
        db.execute("INSERT INTO t (i) VALUES (0), (1), (2), (3), (4)", &[])
            .unwrap();

        let rows = db
            .query("SELECT i FROM t LIMIT 2 OFFSET 1", &[])
            .unwrap();
        let values: Vec<_> = rows.iter().map(|r| field_i64(r, "i")).collect();
        assert_eq!(values, [1, 2]);
    }

    #[test]
    fn unique_index_enforces_and_serves_equality_lookups() {
        // Scenario S4.
        let db = db();
        db.execute("CREATE TABLE users", &[]).unwrap();
        db.execute("CREATE UNIQUE INDEX idx_email ON users (email)", &[])
            .unwrap();

        db.execute("INSERT INTO users (email) VALUES ('a')", &[])
            .unwrap();
        let err = db
            .execute("INSERT INTO users (email) VALUES ('a')", &[])
            .unwrap_err();
        assert!(
            DbError::DuplicateDocument.is(&err),
            "duplicate unique-indexed value SHOULD fail"
        );

        let rows = db
            .query("SELECT email FROM users WHERE email = 'a'", &[])
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn index_backed_equality_matches_a_full_scan() {
        let db = db();
        db.execute("CREATE TABLE users", &[]).unwrap();
        db.execute("CREATE INDEX idx_age ON users (age)", &[])
            .unwrap();
        db.execute(
            "INSERT INTO users (age, name) VALUES (20, 'a'), (30, 'b'), (20, 'c')",
            &[],
        )
        .unwrap();

        let mut via_index = db
            .query("SELECT name FROM users WHERE age = 20", &[])
            .unwrap()
            .iter()
            .map(|r| r.get("name").cloned().unwrap())
            .collect::<Vec<_>>();
        via_index.sort_by_key(|v| v.to_string());
        assert_eq!(via_index, [Value::from("a"), Value::from("c")]);
    }

    #[test]
    fn unique_primary_key_lookup_uses_conversion_semantics() {
        let db = db();
        db.execute("CREATE TABLE users (id TEXT PRIMARY KEY)", &[])
            .unwrap();
        db.execute("INSERT INTO users (id, age) VALUES ('x', 30)", &[])
            .unwrap();

        let rows = db
            .query(
                "SELECT age FROM users WHERE id = ?",
                &[Param::positional("x")],
            )
            .unwrap();
        assert_eq!(field_i64(&rows[0], "age"), 30);
    }

    #[test]
    fn like_and_between_and_in() {
        let db = db();
        db.execute("CREATE TABLE users", &[]).unwrap();
        db.execute(
            "INSERT INTO users (name, age) VALUES ('John', 30), ('Jane', 20), ('Bob', 40)",
            &[],
        )
        .unwrap();

        let rows = db
            .query("SELECT name FROM users WHERE name LIKE 'J%'", &[])
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = db
            .query("SELECT name FROM users WHERE age BETWEEN 25 AND 45", &[])
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = db
            .query("SELECT name FROM users WHERE age IN (20, 40)", &[])
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn missing_fields_evaluate_to_null_not_errors() {
        let db = db();
        db.execute("CREATE TABLE t", &[]).unwrap();
        db.execute("INSERT INTO t (a) VALUES (1)", &[]).unwrap();

        assert!(db
            .query("SELECT a FROM t WHERE ghost = 1", &[])
            .unwrap()
            .is_empty());
        assert!(db
            .query("SELECT a FROM t WHERE ghost > 1", &[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn backticked_field_names_round_trip() {
        let db = db();
        db.execute("CREATE TABLE t", &[]).unwrap();
        db.execute("INSERT INTO t DOCUMENTS {`field name`: 1}", &[])
            .unwrap();
        let rows = db
            .query("SELECT `field name` FROM t WHERE `field name` = 1", &[])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("field name"), Some(&Value::Int64(1)));
    }
}

mod update_delete_tests {
    use super::*;

    #[test]
    fn update_applies_assignments_against_the_old_document() {
        // Scenario S6.
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        db.execute("INSERT INTO foo (a) VALUES (1), (2), (3)", &[])
            .unwrap();

        let result = db
            .execute("UPDATE foo SET a = a + 1 WHERE a < 3", &[])
            .unwrap();
        assert_eq!(result, ExecuteResult::Update { updated: 2 });

        let mut values: Vec<_> = db
            .query("SELECT a FROM foo", &[])
            .unwrap()
            .iter()
            .map(|r| field_i64(r, "a"))
            .collect();
        values.sort_unstable();
        assert_eq!(values, [2, 3, 3]);
    }

    #[test]
    fn update_without_where_touches_every_row() {
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        db.execute("INSERT INTO foo (a) VALUES (1), (2)", &[])
            .unwrap();
        let result = db.execute("UPDATE foo SET b = 'x'", &[]).unwrap();
        assert_eq!(result, ExecuteResult::Update { updated: 2 });
        let rows = db.query("SELECT b FROM foo", &[]).unwrap();
        assert!(rows.iter().all(|r| r.get("b") == Some(&Value::from("x"))));
    }

    #[test]
    fn update_maintains_indexes() {
        let db = db();
        db.execute("CREATE TABLE users", &[]).unwrap();
        db.execute("CREATE INDEX idx_age ON users (age)", &[])
            .unwrap();
        db.execute("INSERT INTO users (age) VALUES (10), (20)", &[])
            .unwrap();

        db.execute("UPDATE users SET age = 99 WHERE age = 10", &[])
            .unwrap();

        // The old indexed value no longer matches anything.
        assert!(db
            .query("SELECT age FROM users WHERE age = 10", &[])
            .unwrap()
            .is_empty());
        assert_eq!(
            db.query("SELECT age FROM users WHERE age = 99", &[])
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn delete_with_where_removes_matching_rows() {
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        db.execute("INSERT INTO foo (a) VALUES (1), (2), (3)", &[])
            .unwrap();

        let result = db.execute("DELETE FROM foo WHERE a >= 2", &[]).unwrap();
        assert_eq!(result, ExecuteResult::Delete { deleted: 2 });

        let rows = db.query("SELECT a FROM foo", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(field_i64(&rows[0], "a"), 1);
    }
}

mod transaction_tests {
    use super::*;

    #[test]
    fn rolled_back_writes_are_invisible() {
        // Scenario S5.
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();

        let tx = db.begin(true).unwrap();
        tx.execute("INSERT INTO foo (a) VALUES (1)", &[]).unwrap();
        tx.rollback().unwrap();

        let tx = db.begin(false).unwrap();
        assert!(tx.query("SELECT a FROM foo", &[]).unwrap().is_empty());
    }

    #[test]
    fn readers_keep_their_snapshot_while_a_writer_commits() {
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();
        db.execute("INSERT INTO foo (a) VALUES (1)", &[]).unwrap();

        let reader = db.begin(false).unwrap();
        assert_eq!(reader.query("SELECT a FROM foo", &[]).unwrap().len(), 1);

        db.execute("INSERT INTO foo (a) VALUES (2)", &[]).unwrap();

        // The reader still sees its snapshot; a fresh read sees both rows.
        assert_eq!(reader.query("SELECT a FROM foo", &[]).unwrap().len(), 1);
        assert_eq!(db.query("SELECT a FROM foo", &[]).unwrap().len(), 2);
    }

    #[test]
    fn auto_key_sequence_rolls_back_with_the_transaction() {
        let db = db();
        db.execute("CREATE TABLE foo", &[]).unwrap();

        let tx = db.begin(true).unwrap();
        tx.execute("INSERT INTO foo (a) VALUES (1)", &[]).unwrap();
        tx.rollback().unwrap();

        // The next insert reuses the rolled-back sequence number, so keys
        // stay dense.
        match db.execute("INSERT INTO foo (a) VALUES (1)", &[]).unwrap() {
            ExecuteResult::Insert { last_key, .. } => {
                let mut expected = Vec::new();
                inkdb::encoding::key::encode_i64(1, &mut expected);
                assert_eq!(last_key.unwrap(), expected);
            }
            other => panic!("expected Insert result, got {:?}", other),
        }
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn documents_survive_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.ink");
        let path = path.to_str().unwrap();

        {
            let db = Database::open(path).unwrap();
            db.execute("CREATE TABLE users (id TEXT PRIMARY KEY)", &[])
                .unwrap();
            db.execute("INSERT INTO users (id, age) VALUES ('x', 30)", &[])
                .unwrap();
        }

        let db = Database::open(path).unwrap();
        let rows = db.query("SELECT age FROM users WHERE id = 'x'", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(field_i64(&rows[0], "age"), 30);

        // Constraints survive too.
        let err = db
            .execute("INSERT INTO users (id) VALUES ('x')", &[])
            .unwrap_err();
        assert!(DbError::DuplicateDocument.is(&err));
    }
}

mod export_tests {
    use super::*;

    #[test]
    fn query_results_export_to_csv_and_ndjson() {
        let db = db();
        db.execute("CREATE TABLE users", &[]).unwrap();
        db.execute(
            "INSERT INTO users (name, age) VALUES ('ana', 34), ('bob', 42)",
            &[],
        )
        .unwrap();

        let rows = db.query("SELECT name, age FROM users", &[]).unwrap();

        let mut csv = Vec::new();
        inkdb::to_csv(&mut csv, &Stream::from_documents(rows.clone())).unwrap();
        assert_eq!(String::from_utf8(csv).unwrap(), "ana,34\nbob,42\n");

        let mut ndjson = Vec::new();
        inkdb::to_ndjson(&mut ndjson, &Stream::from_documents(rows)).unwrap();
        assert_eq!(
            String::from_utf8(ndjson).unwrap(),
            "{\"name\":\"ana\",\"age\":34}\n{\"name\":\"bob\",\"age\":42}\n"
        );
    }

    #[test]
    fn json_documents_round_trip_through_insert() {
        let db = db();
        db.execute("CREATE TABLE t", &[]).unwrap();

        let doc = inkdb::from_json(r#"{"a": 1, "nested": {"b": [1, 2]}}"#).unwrap();
        let tx = db.begin(true).unwrap();
        tx.table("t").unwrap().insert(&doc).unwrap();
        tx.commit().unwrap();

        let rows = db.query("SELECT a FROM t WHERE nested.b.1 = 2", &[]).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
