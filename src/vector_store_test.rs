use super::*;

fn test_loc(name: &str) -> std::ffi::OsString {
    let mut dir = std::env::temp_dir();
    dir.push(format!("vekton-vecstore-test-{}-{}", name, rand::random::<u64>()));
    dir.into_os_string()
}

#[test]
fn test_append_get_and_flush() {
    let loc = test_loc("append");
    let mut store = VectorStore::open(loc.clone(), 3, 1024, 16).unwrap();

    let s0 = store.append(vec![1.0, 0.0, 0.0]).unwrap();
    let s1 = store.append(vec![0.0, 1.0, 0.0]).unwrap();
    assert_eq!((s0, s1), (0, 1));
    assert!(!store.is_persisted());

    store.flush().unwrap();
    assert!(store.is_persisted());
    assert_eq!(store.get(0).unwrap(), vec![1.0, 0.0, 0.0]);
    assert_eq!(store.get(1).unwrap(), vec![0.0, 1.0, 0.0]);

    std::fs::remove_file(loc).ok();
}

#[test]
fn test_append_rejects_wrong_dimension() {
    let loc = test_loc("dim");
    let mut store = VectorStore::open(loc.clone(), 3, 1024, 16).unwrap();
    let err = store.append(vec![1.0, 2.0]).unwrap_err();
    assert!(matches!(err, Error::VectorSizeMismatch(_, _)));
    std::fs::remove_file(loc).ok();
}

#[test]
fn test_append_expect_enforces_slot() {
    let loc = test_loc("expect");
    let mut store = VectorStore::open(loc.clone(), 2, 1024, 16).unwrap();
    store.append_expect(vec![1.0, 1.0], 0).unwrap();
    let err = store.append_expect(vec![2.0, 2.0], 5).unwrap_err();
    assert!(matches!(err, Error::IndexIntegrity(_, _)));
    std::fs::remove_file(loc).ok();
}

#[test]
fn test_get_out_of_range() {
    let loc = test_loc("oob");
    let mut store = VectorStore::open(loc.clone(), 2, 1024, 16).unwrap();
    let err = store.get(0).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange(_, _)));
    std::fs::remove_file(loc).ok();
}

#[test]
fn test_replace_buffered_and_persisted() {
    let loc = test_loc("replace");
    let mut store = VectorStore::open(loc.clone(), 2, 1024, 16).unwrap();
    store.append(vec![1.0, 1.0]).unwrap();
    store.flush().unwrap();
    store.append(vec![2.0, 2.0]).unwrap(); // buffered

    store.replace(0, vec![9.0, 9.0]).unwrap();
    store.replace(1, vec![8.0, 8.0]).unwrap();

    assert_eq!(store.get(0).unwrap(), vec![9.0, 9.0]);
    assert_eq!(store.get(1).unwrap(), vec![8.0, 8.0]);
    assert!(store.is_persisted()); // replace on a buffered slot forces a flush

    std::fs::remove_file(loc).ok();
}

#[test]
fn test_delete_renumbers_survivors() {
    let loc = test_loc("delete");
    let mut store = VectorStore::open(loc.clone(), 1, 1024, 16).unwrap();
    store.append(vec![1.0]).unwrap();
    store.append(vec![2.0]).unwrap();
    store.append(vec![3.0]).unwrap();
    store.flush().unwrap();

    let mapping = store.delete(&[1].into_iter().collect()).unwrap();
    assert_eq!(mapping, vec![Some(0), None, Some(1)]);
    assert_eq!(store.count(), 2);
    assert_eq!(store.get(0).unwrap(), vec![1.0]);
    assert_eq!(store.get(1).unwrap(), vec![3.0]);

    std::fs::remove_file(loc).ok();
}

#[test]
fn test_cache_window_populated_on_miss_and_used_on_hit() {
    let loc = test_loc("cache");
    let mut store = VectorStore::open(loc.clone(), 1, 1024, 2).unwrap();
    for v in 0..10 {
        store.append(vec![v as f32]).unwrap();
    }
    store.flush().unwrap();

    assert_eq!(store.get(4).unwrap(), vec![4.0]);
    assert_eq!(store.cache.as_ref().unwrap().1.len(), 2);
    assert_eq!(store.get(5).unwrap(), vec![5.0]); // served from cache, no reread

    std::fs::remove_file(loc).ok();
}

#[test]
fn test_reopen_preserves_data() {
    let loc = test_loc("reopen");
    {
        let mut store = VectorStore::open(loc.clone(), 2, 1024, 16).unwrap();
        store.append(vec![1.0, 2.0]).unwrap();
        store.flush().unwrap();
    }
    let mut store = VectorStore::open(loc.clone(), 2, 1024, 16).unwrap();
    assert_eq!(store.count(), 1);
    assert_eq!(store.get(0).unwrap(), vec![1.0, 2.0]);

    std::fs::remove_file(loc).ok();
}

#[test]
fn test_search_empty_store_returns_empty() {
    let loc = test_loc("search-empty");
    let mut store = VectorStore::open(loc.clone(), 3, 1024, 16).unwrap();
    let got = store.search(&[1.0, 0.0, 0.0], Metric::Cosine, SortOrder::Descending, 0).unwrap();
    assert!(got.is_empty());
    std::fs::remove_file(loc).ok();
}

#[test]
fn test_search_ranks_by_cosine_descending_with_slot_tiebreak() {
    let loc = test_loc("search");
    let mut store = VectorStore::open(loc.clone(), 2, 1024, 16).unwrap();
    store.append(vec![1.0, 0.0]).unwrap(); // slot 0, identical to query
    store.append(vec![0.0, 1.0]).unwrap(); // slot 1, orthogonal
    store.append(vec![2.0, 0.0]).unwrap(); // slot 2, same direction, also cosine 1.0
    store.flush().unwrap();

    let got = store.search(&[1.0, 0.0], Metric::Cosine, SortOrder::Descending, 0).unwrap();
    assert_eq!(got[0].0, 0); // tie between slot 0 and 2 broken by slot ascending
    assert_eq!(got[1].0, 2);
    assert_eq!(got[2].0, 1);
    assert!((got[0].1 - 1.0).abs() < 1e-6);
    assert!((got[2].1 - 0.0).abs() < 1e-6);

    std::fs::remove_file(loc).ok();
}

#[test]
fn test_search_zero_norm_vector_scores_zero() {
    let loc = test_loc("search-zero");
    let mut store = VectorStore::open(loc.clone(), 2, 1024, 16).unwrap();
    store.append(vec![0.0, 0.0]).unwrap();
    store.flush().unwrap();

    let got = store.search(&[1.0, 0.0], Metric::Cosine, SortOrder::Descending, 0).unwrap();
    assert_eq!(got, vec![(0, 0.0)]);

    std::fs::remove_file(loc).ok();
}

#[test]
fn test_search_respects_limit() {
    let loc = test_loc("search-limit");
    let mut store = VectorStore::open(loc.clone(), 1, 1024, 16).unwrap();
    for v in 0..5 {
        store.append(vec![v as f32 + 1.0]).unwrap();
    }
    store.flush().unwrap();

    let got = store.search(&[1.0], Metric::Cosine, SortOrder::Descending, 2).unwrap();
    assert_eq!(got.len(), 2);

    std::fs::remove_file(loc).ok();
}

#[test]
fn test_iter_covers_persisted_and_buffered_in_order() {
    let loc = test_loc("iter");
    let mut store = VectorStore::open(loc.clone(), 1, 1024, 16).unwrap();
    store.append(vec![1.0]).unwrap();
    store.flush().unwrap();
    store.append(vec![2.0]).unwrap(); // stays buffered

    let got: Vec<(usize, Vec<f32>)> =
        store.iter().collect::<Result<Vec<_>>>().unwrap();
    assert_eq!(got, vec![(0, vec![1.0]), (1, vec![2.0])]);

    std::fs::remove_file(loc).ok();
}
