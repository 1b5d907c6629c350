use peerlink_storage::{CascadeJournal, Database, Device, DeviceStore, DeviceType};
use pretty_assertions::assert_eq;

fn test_device(id: &str, last_used: i64) -> Device {
    Device {
        nickname: format!("{id}'s phone"),
        brand: "Acme".into(),
        model: "A-100".into(),
        version_name: "2.4.1".into(),
        version_number: 241,
        last_usage_time: last_used,
        is_trusted: true,
        ..Device::new(id)
    }
}

fn store() -> (Database, DeviceStore) {
    let db = Database::open_in_memory().unwrap();
    let store = DeviceStore::new(db.clone());
    (db, store)
}

// ── Basic CRUD ───────────────────────────────────────────────────

#[test]
fn upsert_and_get() {
    let (_db, store) = store();
    let device = test_device("dev-1", 1000);

    store.upsert(&device).unwrap();

    assert_eq!(store.get("dev-1").unwrap(), device);
}

#[test]
fn get_missing_is_not_found() {
    let (_db, store) = store();
    let err = store.get("nope").unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_retryable());
    assert!(store.find("nope").unwrap().is_none());
}

#[test]
fn upsert_overwrites_mutable_fields() {
    let (_db, store) = store();
    let mut device = test_device("dev-1", 1000);
    store.upsert(&device).unwrap();

    device.nickname = "renamed".into();
    device.version_number = 300;
    device.is_trusted = false;
    device.is_restricted = true;
    device.device_type = DeviceType::Web;
    device.last_usage_time = 2000;
    store.upsert(&device).unwrap();

    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.get("dev-1").unwrap(), device);
}

#[test]
fn list_orders_by_last_usage() {
    let (_db, store) = store();
    store.upsert(&test_device("old", 10)).unwrap();
    store.upsert(&test_device("new", 30)).unwrap();
    store.upsert(&test_device("mid", 20)).unwrap();

    let ids: Vec<String> = store.list().unwrap().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
}

#[test]
fn touch_updates_last_usage() {
    let (_db, store) = store();
    store.upsert(&test_device("dev-1", 10)).unwrap();

    assert!(store.touch("dev-1", 99).unwrap());
    assert_eq!(store.get("dev-1").unwrap().last_usage_time, 99);
    assert!(!store.touch("unknown", 99).unwrap());
}

#[test]
fn remove_is_idempotent() {
    let (_db, store) = store();
    store.upsert(&test_device("dev-1", 10)).unwrap();

    assert!(store.remove("dev-1").unwrap());
    assert!(!store.remove("dev-1").unwrap());
    assert!(store.find("dev-1").unwrap().is_none());
}

#[test]
fn remove_and_journal_records_id() {
    let (db, store) = store();
    let journal = CascadeJournal::new(db);
    store.upsert(&test_device("dev-1", 10)).unwrap();

    assert!(store.remove_and_journal("dev-1", 500).unwrap());
    assert!(!store.remove_and_journal("ghost", 600).unwrap());

    assert!(store.find("dev-1").unwrap().is_none());
    assert_eq!(journal.pending().unwrap(), vec!["dev-1", "ghost"]);

    journal.clear("dev-1").unwrap();
    journal.clear("dev-1").unwrap();
    assert_eq!(journal.pending().unwrap(), vec!["ghost"]);
}

// ── Lenient decode ───────────────────────────────────────────────

#[test]
fn unrecognised_type_decodes_as_normal() {
    let (db, store) = store();
    db.with_connection(|conn| {
        conn.execute(
            "INSERT INTO devices (id, nickname, device_type) VALUES ('legacy', 'old box', 'TABLET')",
            [],
        )
    })
    .unwrap();

    let device = store.get("legacy").unwrap();
    assert_eq!(device.device_type, DeviceType::Normal);
    assert_eq!(device.nickname, "old box");
    assert_eq!(device.brand, "");
}

#[test]
fn missing_type_decodes_as_normal() {
    let (db, store) = store();
    db.with_connection(|conn| conn.execute("INSERT INTO devices (id) VALUES ('bare')", []))
        .unwrap();

    let device = store.get("bare").unwrap();
    assert_eq!(device.device_type, DeviceType::Normal);
    assert!(!device.is_trusted);
}

#[test]
fn web_type_round_trips() {
    let (_db, store) = store();
    let device = Device {
        device_type: DeviceType::Web,
        ..test_device("browser", 1)
    };
    store.upsert(&device).unwrap();
    assert_eq!(store.get("browser").unwrap().device_type, DeviceType::Web);
}

// ── Persistence ──────────────────────────────────────────────────

#[test]
fn survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.duckdb");

    {
        let db = Database::open(&path, "64MB", 1).unwrap();
        DeviceStore::new(db).upsert(&test_device("dev-1", 42)).unwrap();
    }

    let db = Database::open(&path, "64MB", 1).unwrap();
    let device = DeviceStore::new(db).get("dev-1").unwrap();
    assert_eq!(device.last_usage_time, 42);
}
