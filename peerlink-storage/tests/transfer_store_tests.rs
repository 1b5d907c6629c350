use peerlink_storage::{Assignee, Database, TransferGroup, TransferStore};
use pretty_assertions::assert_eq;

fn store_with_group(group_id: i64, devices: &[&str]) -> TransferStore {
    let store = TransferStore::new(Database::open_in_memory().unwrap());
    store.save_group(&TransferGroup::new(group_id, 1000)).unwrap();
    for device in devices {
        store.add_assignee(&Assignee::new(group_id, *device, Some("wlan0"))).unwrap();
    }
    store
}

#[test]
fn assignees_by_device_and_group() {
    let store = store_with_group(1, &["a", "b"]);
    store.save_group(&TransferGroup::new(2, 2000)).unwrap();
    store.add_assignee(&Assignee::new(2, "a", None)).unwrap();

    let for_a = store.assignees_for_device("a").unwrap();
    assert_eq!(for_a.iter().map(|a| a.group_id).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(for_a[1].connection_adapter, None);

    assert_eq!(store.assignees_for_group(1).unwrap().len(), 2);
    assert_eq!(store.count_assignees(2).unwrap(), 1);
}

#[test]
fn orphan_delete_refuses_claimed_group() {
    let store = store_with_group(1, &["a"]);

    assert!(!store.remove_group_if_orphaned(1).unwrap());
    assert!(store.get_group(1).unwrap().is_some());

    assert!(store.remove_assignee(&Assignee::new(1, "a", None)).unwrap());
    assert!(store.remove_group_if_orphaned(1).unwrap());
    assert!(store.get_group(1).unwrap().is_none());

    // Already gone: no-op, not an error.
    assert!(!store.remove_group_if_orphaned(1).unwrap());
}

#[test]
fn remove_assignee_twice_is_noop() {
    let store = store_with_group(1, &["a"]);
    let assignee = Assignee::new(1, "a", Some("wlan0"));
    assert!(store.remove_assignee(&assignee).unwrap());
    assert!(!store.remove_assignee(&assignee).unwrap());
}
