// Persistence round-trips through RON.
//
// Maps persist as an ordered sequence of key/value pairs; loading re-hashes
// every key, so the loaded map answers lookups by structure again.
use canonmap::{KVPair, Map, MutableMap};
use chrono::{DateTime, Utc};

#[test]
fn string_keys_round_trip_in_order() {
    let map = Map::of([("b", 2), ("a", 1), ("c", 3)].map(|(k, v)| (k.to_string(), v))).unwrap();
    let text = ron::to_string(&map).unwrap();
    let loaded: Map<String, i32> = ron::from_str(&text).unwrap();

    assert_eq!(loaded, map);
    let keys: Vec<_> = loaded.keys().cloned().collect();
    assert_eq!(keys, ["b", "a", "c"]);
    assert_eq!(loaded.get("a").unwrap(), Some(&1));
}

// Test: the persisted form is the pair sequence, not a native map.
#[test]
fn persisted_form_is_a_pair_sequence() {
    let map = MutableMap::of([(1, "x")]).unwrap();
    let text = ron::to_string(&map).unwrap();
    let pairs: Vec<KVPair<i32, String>> = ron::from_str(&text).unwrap();
    assert_eq!(pairs, [KVPair::new(1, "x".to_string())]);
}

#[test]
fn composite_keys_round_trip() {
    let map = MutableMap::of([(vec![1, 2], "a"), (vec![], "empty"), (vec![2, 1], "b")])
        .unwrap()
        .map(|v| v.to_string());
    let text = ron::to_string(&map).unwrap();
    let loaded: MutableMap<Vec<i32>, String> = ron::from_str(&text).unwrap();

    assert_eq!(loaded, map);
    assert_eq!(loaded.at(&[2, 1]).unwrap(), "b");
    assert_eq!(loaded.at(&Vec::<i32>::new()).unwrap(), "empty");
}

#[test]
fn date_time_keys_round_trip() {
    let t1: DateTime<Utc> = "2020-04-06T01:02:03.671881Z".parse().unwrap();
    let t2: DateTime<Utc> = "2021-01-01T00:00:00Z".parse().unwrap();
    let map = Map::of([(t2, "later"), (t1, "earlier")]).unwrap();

    let text = ron::to_string(&map).unwrap();
    let loaded: Map<DateTime<Utc>, String> = ron::from_str(&text).unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.first().map(|kv| kv.key), Some(t2));
    // A fresh instance with the same instant finds the binding.
    let same_instant: DateTime<Utc> = "2020-04-06T01:02:03.671881Z".parse().unwrap();
    assert_eq!(loaded.at(&same_instant).unwrap(), "earlier");
}

// Test: duplicate keys in the persisted form collapse the same way puts do.
#[test]
fn duplicate_persisted_keys_keep_first_slot_last_value() {
    let text = "[(key: 1, value: \"a\"), (key: 2, value: \"b\"), (key: 1, value: \"c\")]";
    let loaded: Map<i32, String> = ron::from_str(text).unwrap();
    assert_eq!(
        loaded.to_vec(),
        [(1, "c".to_string()), (2, "b".to_string())]
    );
}
