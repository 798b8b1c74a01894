mod support;

use counter_core::{CounterLoad, CounterRecord};
use counter_db::{Db, counter_key};
use rusqlite::Connection;
use support::{at, setup_db};

#[test]
fn missing_record_loads_uninitialized() {
    let test_db = setup_db();
    let load = test_db
        .db
        .load_counter("3 Opus", at(10, 14, 23))
        .expect("load");
    assert_eq!(load, CounterLoad::default());
}

#[test]
fn first_save_opens_window_from_now() {
    let test_db = setup_db();
    let db = &test_db.db;
    let record = db.save_counter("3 Opus", 72, at(10, 14, 23)).expect("save");
    assert_eq!(record.reset_at, at(10, 19, 0));

    let load = db.load_counter("3 Opus", at(10, 14, 30)).expect("load");
    assert_eq!(
        load,
        CounterLoad {
            total: 72,
            initialized: true
        }
    );
}

#[test]
fn save_within_window_keeps_reset() {
    let test_db = setup_db();
    let db = &test_db.db;
    db.save_counter("3 Opus", 72, at(10, 14, 23)).expect("save");
    let record = db.save_counter("3 Opus", 102, at(10, 16, 50)).expect("save");
    assert_eq!(record.reset_at, at(10, 19, 0));
    assert_eq!(record.total, 102);
}

#[test]
fn expired_record_loads_as_zero_and_save_rolls_window() {
    let test_db = setup_db();
    let db = &test_db.db;
    db.save_counter("3 Opus", 102, at(10, 14, 23)).expect("save");

    let load = db.load_counter("3 Opus", at(10, 19, 0)).expect("load");
    assert_eq!(load, CounterLoad::default());

    let record = db.save_counter("3 Opus", 50, at(10, 19, 5)).expect("save");
    assert_eq!(record.reset_at, at(11, 0, 0));
    let stored = db.counter_record("3 Opus").expect("record");
    assert_eq!(
        stored,
        Some(CounterRecord {
            total: 50,
            reset_at: at(11, 0, 0)
        })
    );
}

#[test]
fn models_are_tracked_separately() {
    let test_db = setup_db();
    let db = &test_db.db;
    db.save_counter("3 Opus", 10, at(10, 14, 0)).expect("save");
    db.save_counter("3 Haiku", 20, at(10, 15, 0)).expect("save");
    assert_eq!(
        db.load_counter("3 Opus", at(10, 15, 0)).expect("load").total,
        10
    );
    let haiku = db.counter_record("3 Haiku").expect("record").expect("some");
    assert_eq!(haiku.reset_at, at(10, 20, 0));
}

#[test]
fn records_persist_across_connections() {
    let test_db = setup_db();
    test_db
        .db
        .save_counter("3.5 Sonnet (New)", 5, at(10, 9, 0))
        .expect("save");

    let reopened = Db::open(&test_db.path).expect("reopen");
    assert_eq!(
        reopened
            .load_counter("3.5 Sonnet (New)", at(10, 9, 30))
            .expect("load")
            .total,
        5
    );

    let conn = Connection::open(&test_db.path).expect("open conn");
    let raw: String = conn
        .query_row(
            "SELECT value FROM kv_entry WHERE key = ?1",
            [counter_key("chatTokenCounter_v1", "3.5 Sonnet (New)")],
            |row| row.get(0),
        )
        .expect("raw value");
    assert!(raw.contains(r#""total":5"#));
}

#[test]
fn prefixes_isolate_stores() {
    let test_db = setup_db();
    test_db
        .db
        .save_counter("3 Opus", 7, at(10, 9, 0))
        .expect("save");
    let other = Db::open_with_prefix(&test_db.path, "other").expect("open");
    assert_eq!(other.counter_record("3 Opus").expect("record"), None);
}
