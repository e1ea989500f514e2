//! Completeness tests: insert/remove must not lose data.

use crate::ChampMap;

// ---------------------------------------------------------------------------
// insert must return the old value when updating
// ---------------------------------------------------------------------------

#[test]
fn insert_new_returns_none() {
    let mut map = ChampMap::new().linear();
    let old = map.insert("key", 42);
    assert_eq!(old, None, "inserting new key should return None");
}

#[test]
fn insert_update_returns_old_value() {
    let mut map = ChampMap::new().linear();
    map.insert("key", 1);
    let old = map.insert("key", 2);
    assert_eq!(old, Some(1), "updating should return the previous value");
}

#[test]
fn insert_update_chain() {
    let mut map = ChampMap::new().linear();
    assert_eq!(map.insert("k", 10), None);
    assert_eq!(map.insert("k", 20), Some(10));
    assert_eq!(map.insert("k", 30), Some(20));
    assert_eq!(map.get(&"k"), Some(&30));
}

// ---------------------------------------------------------------------------
// remove must return the removed value
// ---------------------------------------------------------------------------

#[test]
fn remove_existing_returns_value() {
    let mut map = ChampMap::new().linear();
    map.insert("a", 100);
    let removed = map.remove(&"a");
    assert_eq!(removed, Some(100), "remove should return the removed value");
}

#[test]
fn remove_missing_returns_none() {
    let mut map = ChampMap::new().linear();
    map.insert("a", 1);
    let removed = map.remove(&"z");
    assert_eq!(removed, None, "removing missing key should return None");
}

#[test]
fn remove_returns_correct_value_among_many() {
    let mut map = ChampMap::new().linear();
    for i in 0..100 {
        map.insert(i, i * 10);
    }
    assert_eq!(map.remove(&50), Some(500));
    assert_eq!(map.remove(&50), None);
    assert_eq!(map.len(), 99);
}

// ---------------------------------------------------------------------------
// same guarantees hold on the persistent façade
// ---------------------------------------------------------------------------

#[test]
fn persistent_insert_with_merge_combines_values() {
    let base = ChampMap::new().insert("k", 10);
    let merged = base.insert_with("k", 5, |old, new| old + new);
    assert_eq!(merged.get(&"k"), Some(&15));
    // `base` is untouched — no aliasing.
    assert_eq!(base.get(&"k"), Some(&10));
}

#[test]
fn persistent_remove_on_absent_key_is_noop() {
    let map = ChampMap::new().insert("a", 1);
    let same = map.remove(&"z");
    assert_eq!(same.len(), 1);
    assert_eq!(same, map);
}
