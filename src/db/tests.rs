#![allow(clippy::unwrap_used)]

use super::*;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const USER: &str = "asha@example.com";

fn make_doc(kind: EntryType, amount: Decimal, category: &str, date: &str) -> EntryDocument {
    EntryDocument {
        kind,
        amount,
        category: category.into(),
        remarks: String::new(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
    }
}

fn setup_test_data(db: &mut Database) -> Vec<String> {
    let docs = vec![
        make_doc(EntryType::Expense, dec!(300), "Food", "2024-01-10"),
        make_doc(EntryType::Income, dec!(1000), "Salary", "2024-01-01"),
        make_doc(EntryType::Expense, dec!(200), "Food", "2024-02-03"),
    ];
    docs.iter()
        .map(|d| db.insert_entry(USER, d).unwrap())
        .collect()
}

fn raw_insert(db: &Database, collection: &str, doc_id: &str, body: &str) {
    db.conn
        .execute(
            "INSERT INTO documents (collection, doc_id, body, updated_at) VALUES (?1, ?2, ?3, '')",
            params![collection, doc_id, body],
        )
        .unwrap();
}

// ── Schema ────────────────────────────────────────────────────

#[test]
fn test_schema_version_set() {
    let db = Database::open_in_memory().unwrap();
    let version: i32 = db
        .conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, schema::CURRENT_VERSION);
}

#[test]
fn test_double_migrate_idempotent() {
    let mut db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    let rows: i64 = db
        .conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn test_newer_schema_is_refused() {
    let mut db = Database::open_in_memory().unwrap();
    db.conn
        .execute(
            "UPDATE schema_version SET version = ?1",
            params![schema::CURRENT_VERSION + 1],
        )
        .unwrap();
    let err = db.migrate().unwrap_err();
    assert!(err.to_string().contains("newer than this build supports"));
}

#[test]
fn test_missing_version_row_is_restored() {
    let mut db = Database::open_in_memory().unwrap();
    db.conn.execute("DELETE FROM schema_version", []).unwrap();
    db.migrate().unwrap();
    let version: i32 = db
        .conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, schema::CURRENT_VERSION);
}

#[test]
fn test_open_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("budgetwiz.db");
    {
        let mut db = Database::open(&path).unwrap();
        setup_test_data(&mut db);
    }
    let db = Database::open(&path).unwrap();
    assert_eq!(db.get_entries(USER).unwrap().len(), 3);
}

// ── Entry CRUD ────────────────────────────────────────────────

#[test]
fn test_insert_and_snapshot() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    assert_eq!(ids.len(), 3);

    let entries = db.get_entries(USER).unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| ids.contains(&e.id)));
}

#[test]
fn test_snapshot_ordered_by_date() {
    let mut db = Database::open_in_memory().unwrap();
    setup_test_data(&mut db);
    let dates: Vec<String> = db
        .get_entries(USER)
        .unwrap()
        .iter()
        .map(|e| e.date.to_string())
        .collect();
    assert_eq!(dates, vec!["2024-01-01", "2024-01-10", "2024-02-03"]);
}

#[test]
fn test_same_date_keeps_insertion_order() {
    let mut db = Database::open_in_memory().unwrap();
    let first = db
        .insert_entry(USER, &make_doc(EntryType::Expense, dec!(1), "B", "2024-03-01"))
        .unwrap();
    let second = db
        .insert_entry(USER, &make_doc(EntryType::Expense, dec!(1), "A", "2024-03-01"))
        .unwrap();
    let entries = db.get_entries(USER).unwrap();
    assert_eq!(entries[0].id, first);
    assert_eq!(entries[1].id, second);
}

#[test]
fn test_ids_are_unique() {
    let mut db = Database::open_in_memory().unwrap();
    let doc = make_doc(EntryType::Expense, dec!(5), "Food", "2024-01-01");
    let a = db.insert_entry(USER, &doc).unwrap();
    let b = db.insert_entry(USER, &doc).unwrap();
    assert_ne!(a, b);
    assert_eq!(db.get_entries(USER).unwrap().len(), 2);
}

#[test]
fn test_get_entry() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let entry = db.get_entry(USER, &ids[1]).unwrap().unwrap();
    assert_eq!(entry.category, "Salary");
    assert_eq!(entry.amount, dec!(1000));
    assert!(db.get_entry(USER, "missing").unwrap().is_none());
}

#[test]
fn test_replace_entry() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let replacement = make_doc(EntryType::Expense, dec!(350.75), "Dining", "2024-01-11");
    db.replace_entry(USER, &ids[0], &replacement).unwrap();

    let entry = db.get_entry(USER, &ids[0]).unwrap().unwrap();
    assert_eq!(entry.amount, dec!(350.75));
    assert_eq!(entry.category, "Dining");
    assert_eq!(db.get_entries(USER).unwrap().len(), 3);
}

#[test]
fn test_replace_missing_entry_fails() {
    let mut db = Database::open_in_memory().unwrap();
    let doc = make_doc(EntryType::Expense, dec!(1), "Food", "2024-01-01");
    assert!(db.replace_entry(USER, "nope", &doc).is_err());
    assert!(db.get_entries(USER).unwrap().is_empty());
}

#[test]
fn test_replace_reserved_document_fails() {
    let mut db = Database::open_in_memory().unwrap();
    db.ensure_category_lists(USER).unwrap();
    let doc = make_doc(EntryType::Expense, dec!(1), "Food", "2024-01-01");
    assert!(db.replace_entry(USER, "IncomeCategoryList", &doc).is_err());
}

#[test]
fn test_delete_entry() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    assert!(db.delete_entry(USER, &ids[0]).unwrap());
    assert_eq!(db.get_entries(USER).unwrap().len(), 2);
    assert!(!db.delete_entry(USER, &ids[0]).unwrap());
}

#[test]
fn test_delete_reserved_document_refused() {
    let mut db = Database::open_in_memory().unwrap();
    db.ensure_category_lists(USER).unwrap();
    assert!(db.delete_entry(USER, "ExpenseCategoryList").is_err());
    assert!(db.get_document::<CategoryListDocument>(USER, "ExpenseCategoryList").unwrap().is_some());
}

#[test]
fn test_collections_are_isolated() {
    let mut db = Database::open_in_memory().unwrap();
    setup_test_data(&mut db);
    assert!(db.get_entries("other@example.com").unwrap().is_empty());
}

#[test]
fn test_snapshot_excludes_reserved_documents() {
    let mut db = Database::open_in_memory().unwrap();
    setup_test_data(&mut db);
    db.ensure_category_lists(USER).unwrap();
    db.record_login(USER, 1).unwrap();
    assert_eq!(db.get_entries(USER).unwrap().len(), 3);
}

#[test]
fn test_snapshot_skips_unreadable_documents() {
    let mut db = Database::open_in_memory().unwrap();
    setup_test_data(&mut db);
    raw_insert(
        &db,
        USER,
        "bad-date",
        r#"{"type":"Expense","amount":5,"category":"Food","date":"not a date"}"#,
    );
    raw_insert(&db, USER, "not-json", "{{{");
    assert_eq!(db.get_entries(USER).unwrap().len(), 3);
}

#[test]
fn test_snapshot_skips_out_of_range_amounts() {
    let mut db = Database::open_in_memory().unwrap();
    setup_test_data(&mut db);
    raw_insert(
        &db,
        USER,
        "huge",
        r#"{"type":"Expense","amount":"50000000000000000000000000000","category":"Food","date":"2024-01-05"}"#,
    );
    raw_insert(
        &db,
        USER,
        "huge-negative",
        r#"{"type":"Income","amount":"-50000000000000000000000000000","category":"Salary","date":"2024-01-06"}"#,
    );
    let entries = db.get_entries(USER).unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.id != "huge" && e.id != "huge-negative"));
    assert!(db.get_entry(USER, "huge").unwrap().is_none());
}

#[test]
fn test_out_of_range_entry_can_be_replaced() {
    let mut db = Database::open_in_memory().unwrap();
    raw_insert(
        &db,
        USER,
        "huge",
        r#"{"type":"Expense","amount":"50000000000000000000000000000","category":"Food","date":"2024-01-05"}"#,
    );
    db.replace_entry(USER, "huge", &make_doc(EntryType::Expense, dec!(50), "Food", "2024-01-05"))
        .unwrap();
    assert_eq!(db.get_entry(USER, "huge").unwrap().unwrap().amount, dec!(50));
}

#[test]
fn test_snapshot_reads_numeric_amounts() {
    let db = Database::open_in_memory().unwrap();
    raw_insert(
        &db,
        USER,
        "legacy",
        r#"{"type":"Income","amount":1234.5,"category":"Salary","remarks":"bonus","date":"2024-04-01"}"#,
    );
    let entries = db.get_entries(USER).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount, dec!(1234.5));
    assert_eq!(entries[0].remarks, "bonus");
}

#[test]
fn test_decimal_precision_preserved() {
    let mut db = Database::open_in_memory().unwrap();
    let id = db
        .insert_entry(USER, &make_doc(EntryType::Expense, dec!(0.10), "Fees", "2024-01-01"))
        .unwrap();
    db.insert_entry(USER, &make_doc(EntryType::Expense, dec!(0.20), "Fees", "2024-01-01"))
        .unwrap();
    let total: Decimal = db.get_entries(USER).unwrap().iter().map(|e| e.amount).sum();
    assert_eq!(total, dec!(0.30));
    assert_eq!(db.get_entry(USER, &id).unwrap().unwrap().amount, dec!(0.10));
}

// ── Subscriptions ─────────────────────────────────────────────

#[test]
fn test_subscription_delivers_initial_snapshot() {
    let mut db = Database::open_in_memory().unwrap();
    setup_test_data(&mut db);
    let sub = db.subscribe_entries(USER).unwrap();
    assert_eq!(sub.latest().unwrap().len(), 3);
    assert!(sub.latest().is_none());
}

#[test]
fn test_subscription_receives_full_snapshot_on_each_change() {
    let mut db = Database::open_in_memory().unwrap();
    let sub = db.subscribe_entries(USER).unwrap();
    assert!(sub.latest().unwrap().is_empty());

    let id = db
        .insert_entry(USER, &make_doc(EntryType::Expense, dec!(10), "Food", "2024-01-01"))
        .unwrap();
    assert_eq!(sub.latest().unwrap().len(), 1);

    let doc = make_doc(EntryType::Expense, dec!(25), "Food", "2024-01-01");
    db.replace_entry(USER, &id, &doc).unwrap();
    let snapshot = sub.latest().unwrap();
    assert_eq!(snapshot[0].amount, dec!(25));

    db.delete_entry(USER, &id).unwrap();
    assert!(sub.latest().unwrap().is_empty());
}

#[test]
fn test_subscription_latest_skips_stale_snapshots() {
    let mut db = Database::open_in_memory().unwrap();
    let sub = db.subscribe_entries(USER).unwrap();
    setup_test_data(&mut db);
    assert_eq!(sub.latest().unwrap().len(), 3);
}

#[test]
fn test_subscription_scoped_to_user() {
    let mut db = Database::open_in_memory().unwrap();
    let sub = db.subscribe_entries(USER).unwrap();
    sub.latest();
    db.insert_entry(
        "other@example.com",
        &make_doc(EntryType::Income, dec!(1), "Gifts", "2024-01-01"),
    )
    .unwrap();
    assert!(sub.latest().is_none());
}

#[test]
fn test_dropped_subscription_is_pruned() {
    let mut db = Database::open_in_memory().unwrap();
    let sub = db.subscribe_entries(USER).unwrap();
    drop(sub);
    setup_test_data(&mut db);
    assert!(!db.watchers.is_watched(USER));
}

#[test]
fn test_failed_delete_does_not_notify() {
    let mut db = Database::open_in_memory().unwrap();
    let sub = db.subscribe_entries(USER).unwrap();
    sub.latest();
    db.delete_entry(USER, "missing").unwrap();
    assert!(sub.latest().is_none());
}

// ── Categories ────────────────────────────────────────────────

#[test]
fn test_category_defaults_when_absent() {
    let db = Database::open_in_memory().unwrap();
    let list = db.get_category_list(USER, EntryType::Expense).unwrap();
    assert_eq!(list, CategoryList::defaults(EntryType::Expense));
    // Reading defaults does not create the user.
    assert!(!db.user_exists(USER).unwrap());
}

#[test]
fn test_ensure_category_lists_persists_seed() {
    let db = Database::open_in_memory().unwrap();
    db.ensure_category_lists(USER).unwrap();
    for kind in EntryType::all() {
        let stored: Option<CategoryListDocument> = db
            .get_document(USER, CategoryList::document_id(*kind))
            .unwrap();
        assert!(stored.is_some());
    }
}

#[test]
fn test_ensure_category_lists_keeps_existing() {
    let db = Database::open_in_memory().unwrap();
    db.add_category(USER, EntryType::Income, "Dividends").unwrap();
    db.ensure_category_lists(USER).unwrap();
    let list = db.get_category_list(USER, EntryType::Income).unwrap();
    assert!(list.contains("Dividends"));
}

#[test]
fn test_add_category() {
    let db = Database::open_in_memory().unwrap();
    let added = db.add_category(USER, EntryType::Expense, " Pets ").unwrap();
    assert_eq!(added, "Pets");
    let list = db.get_category_list(USER, EntryType::Expense).unwrap();
    assert_eq!(list.categories.last().unwrap(), "Pets");
    // Income list is independent
    let income = db.get_category_list(USER, EntryType::Income).unwrap();
    assert!(!income.contains("Pets"));
}

#[test]
fn test_add_duplicate_category_fails() {
    let db = Database::open_in_memory().unwrap();
    let err = db.add_category(USER, EntryType::Expense, "Food").unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn test_same_name_allowed_in_both_lists() {
    let db = Database::open_in_memory().unwrap();
    db.add_category(USER, EntryType::Income, "Side Gig").unwrap();
    db.add_category(USER, EntryType::Expense, "Side Gig").unwrap();
}

#[test]
fn test_remove_category() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.remove_category(USER, EntryType::Expense, "Food").unwrap());
    assert!(!db
        .get_category_list(USER, EntryType::Expense)
        .unwrap()
        .contains("Food"));
    assert!(!db.remove_category(USER, EntryType::Expense, "Food").unwrap());
}

#[test]
fn test_remove_category_keeps_referencing_entries() {
    let mut db = Database::open_in_memory().unwrap();
    setup_test_data(&mut db);
    db.remove_category(USER, EntryType::Expense, "Food").unwrap();
    let entries = db.get_entries(USER).unwrap();
    assert_eq!(entries.iter().filter(|e| e.category == "Food").count(), 2);
}

#[test]
fn test_category_writes_do_not_notify() {
    let mut db = Database::open_in_memory().unwrap();
    let sub = db.subscribe_entries(USER).unwrap();
    sub.latest();
    db.add_category(USER, EntryType::Expense, "Pets").unwrap();
    assert!(sub.latest().is_none());
}

// ── Profile & users ───────────────────────────────────────────

#[test]
fn test_user_exists_after_login() {
    let db = Database::open_in_memory().unwrap();
    assert!(!db.user_exists(USER).unwrap());
    db.record_login(USER, 1_000).unwrap();
    assert!(db.user_exists(USER).unwrap());
}

#[test]
fn test_record_login_keeps_creation_date() {
    let db = Database::open_in_memory().unwrap();
    db.record_login(USER, 1_000).unwrap();
    let second = db.record_login(USER, 2_000).unwrap();
    assert_eq!(second.creation_date, 1_000);
    assert_eq!(second.updated_at, 2_000);
    let stored = db.get_profile(USER).unwrap().unwrap();
    assert_eq!(stored, second);
}

#[test]
fn test_update_profile_name_merges() {
    let db = Database::open_in_memory().unwrap();
    db.record_login(USER, 1_000).unwrap();
    db.update_profile_name(USER, "  Asha  ", 5_000).unwrap();
    let profile = db.get_profile(USER).unwrap().unwrap();
    assert_eq!(profile.name, "Asha");
    assert_eq!(profile.creation_date, 1_000);
    assert_eq!(profile.updated_at, 5_000);
}

#[test]
fn test_merge_preserves_unknown_fields() {
    let db = Database::open_in_memory().unwrap();
    raw_insert(
        &db,
        USER,
        PROFILE_DOCUMENT_ID,
        r#"{"mail":"asha@example.com","photo":"data:image/png;base64,AAAA"}"#,
    );
    db.update_profile_name(USER, "Asha", 9).unwrap();
    let raw: serde_json::Value = db.get_document(USER, PROFILE_DOCUMENT_ID).unwrap().unwrap();
    assert_eq!(raw["photo"], "data:image/png;base64,AAAA");
    assert_eq!(raw["name"], "Asha");
}
