use crate::ChampMapSync;

#[test]
fn sync_empty() {
    let map: ChampMapSync<i32, i32> = ChampMapSync::new();
    assert!(map.is_empty());
    assert_eq!(map.adhash(), 0);
}

#[test]
fn sync_insert_and_get() {
    let mut map = ChampMapSync::new().linear();
    map.insert("key", 42);
    assert_eq!(map.get(&"key"), Some(&42));
    assert_eq!(map.len(), 1);
}

#[test]
fn sync_remove() {
    let mut map = ChampMapSync::new().linear();
    map.insert(1, 10);
    map.insert(2, 20);
    assert_eq!(map.remove(&1), Some(10));
    assert_eq!(map.get(&1), None);
    assert_eq!(map.len(), 1);
}

#[test]
fn sync_canonical_order() {
    let mut m1 = ChampMapSync::new().linear();
    m1.insert(1, 10);
    m1.insert(2, 20);
    m1.insert(3, 30);

    let mut m2 = ChampMapSync::new().linear();
    m2.insert(3, 30);
    m2.insert(1, 10);
    m2.insert(2, 20);

    assert_eq!(m1.adhash(), m2.adhash());
}

#[test]
fn sync_fork_then_mutate_does_not_affect_fork() {
    let mut map = ChampMapSync::new().linear();
    map.insert(1, 10);
    let forked = map.forked();

    map.insert(2, 20);

    assert_eq!(forked.len(), 1);
    assert_eq!(forked.get(&2), None);
    assert_eq!(map.len(), 2);
}

#[test]
fn sync_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<ChampMapSync<String, i32>>();
}

#[test]
fn sync_is_sync() {
    fn assert_sync<T: Sync>() {}
    assert_sync::<ChampMapSync<String, i32>>();
}

#[test]
fn sync_can_cross_thread_boundary() {
    let map = ChampMapSync::new().insert(1, "one").insert(2, "two");
    let handle = std::thread::spawn(move || map.get(&1).copied());
    assert_eq!(handle.join().unwrap(), Some("one"));
}

#[test]
fn sync_stress_100() {
    let mut map = ChampMapSync::new().linear();
    for i in 0_u64..100 {
        map.insert(i, i * 5);
    }
    assert_eq!(map.len(), 100);
    for i in 0_u64..100 {
        assert_eq!(map.get(&i), Some(&(i * 5)));
    }
}
