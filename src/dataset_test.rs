use super::*;

fn test_root(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("vekton-dataset-test-{}-{}", name, rand::random::<u64>()));
    dir
}

fn small_config() -> DatasetConfig {
    DatasetConfig {
        vector_dim: 3,
        max_index_append_buffer: 2,
        max_vector_buffer: 16,
        max_vector_append_buffer: 2,
        max_data_append_buffer: 2,
        max_meta_append_buffer: 2,
    }
}

#[test]
fn test_open_missing_dataset_errors() {
    let root = test_root("missing");
    let err = Dataset::open(&root, "ds").unwrap_err();
    assert!(matches!(err, Error::DatasetNotFound(_, _)));
}

#[test]
fn test_create_then_open_with_same_config_succeeds() {
    let root = test_root("create-open");
    Dataset::create(&root, "ds", small_config()).unwrap();
    let ds = Dataset::open(&root, "ds").unwrap();
    assert_eq!(ds.config().vector_dim, 3);

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_create_twice_with_different_config_errors() {
    let root = test_root("conflict");
    Dataset::create(&root, "ds", small_config()).unwrap();
    let mut other = small_config();
    other.vector_dim = 8;
    let err = Dataset::create(&root, "ds", other).unwrap_err();
    assert!(matches!(err, Error::DatasetExistsDifferentConfig(_, _)));

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_append_read_roundtrip_all_selector() {
    let root = test_root("roundtrip");
    let mut ds = Dataset::create(&root, "ds", small_config()).unwrap();

    let group_id = ds.groups.create().unwrap();
    let id = ds
        .append(Item {
            data: b"hello".to_vec(),
            meta: b"m".to_vec(),
            data_desc: Descriptor::Text,
            meta_desc: Descriptor::Text,
            vector: Some(vec![1.0, 0.0, 0.0]),
            tags: vec!["Go".to_string()],
            group: Some((group_id, 0)),
        })
        .unwrap();
    assert_eq!(id, 0);

    let rec = ds.read(id, selector::ALL).unwrap();
    assert_eq!(rec.id, 0);
    assert_eq!(rec.data, b"hello");
    assert_eq!(rec.meta, b"m");
    assert_eq!(rec.vector, Some(vec![1.0, 0.0, 0.0]));
    assert_eq!(rec.tags, vec!["go".to_string()]);
    assert_eq!(rec.group, Some(group_id));

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_read_visible_before_flush() {
    let root = test_root("visible-unflushed");
    let mut ds = Dataset::create(&root, "ds", small_config()).unwrap();
    let id = ds
        .append(Item { data: b"x".to_vec(), vector: Some(vec![0.0, 0.0, 1.0]), ..Default::default() })
        .unwrap();
    assert!(!ds.is_persisted());
    let rec = ds.read(id, selector::ALL).unwrap();
    assert_eq!(rec.data, b"x");

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_append_rejects_vector_dimension_mismatch() {
    let root = test_root("dim-mismatch");
    let mut ds = Dataset::create(&root, "ds", small_config()).unwrap();
    let err = ds
        .append(Item { vector: Some(vec![1.0, 2.0]), ..Default::default() })
        .unwrap_err();
    assert!(matches!(err, Error::VectorSizeMismatch(_, _)));

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_flush_and_reopen_preserves_state() {
    let root = test_root("reopen");
    {
        let mut ds = Dataset::create(&root, "ds", small_config()).unwrap();
        ds.append(Item { data: b"a".to_vec(), vector: Some(vec![1.0, 0.0, 0.0]), ..Default::default() })
            .unwrap();
        ds.flush().unwrap();
    }

    let mut ds = Dataset::open(&root, "ds").unwrap();
    assert_eq!(ds.count(), 1);
    let rec = ds.read(0, selector::ALL).unwrap();
    assert_eq!(rec.data, b"a");

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_search_ranks_by_similarity() {
    let root = test_root("search");
    let mut ds = Dataset::create(&root, "ds", small_config()).unwrap();
    ds.append(Item { data: b"a".to_vec(), vector: Some(vec![1.0, 0.0, 0.0]), ..Default::default() })
        .unwrap();
    ds.append(Item { data: b"b".to_vec(), vector: Some(vec![0.0, 1.0, 0.0]), ..Default::default() })
        .unwrap();
    ds.flush().unwrap();

    let hits = ds
        .search(&[1.0, 0.0, 0.0], Metric::Cosine, SortOrder::Descending, 0, selector::DATA)
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].1.data, b"a");

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_search_on_empty_dataset_returns_empty() {
    let root = test_root("search-empty");
    let mut ds = Dataset::create(&root, "ds", small_config()).unwrap();
    let hits = ds
        .search(&[1.0, 0.0, 0.0], Metric::Cosine, SortOrder::Descending, 0, selector::ALL)
        .unwrap();
    assert!(hits.is_empty());

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_delete_then_compact_renumbers_and_preserves_tags_and_groups() {
    let root = test_root("compact");
    let mut ds = Dataset::create(&root, "ds", small_config()).unwrap();

    let group_id = ds.groups.create().unwrap();
    ds.append(Item {
        data: b"keep-0".to_vec(),
        vector: Some(vec![1.0, 0.0, 0.0]),
        tags: vec!["a".to_string()],
        group: Some((group_id, 0)),
        ..Default::default()
    })
    .unwrap();
    ds.append(Item {
        data: b"drop-1".to_vec(),
        vector: Some(vec![0.0, 1.0, 0.0]),
        tags: vec!["b".to_string()],
        ..Default::default()
    })
    .unwrap();
    ds.append(Item {
        data: b"keep-2".to_vec(),
        vector: Some(vec![0.0, 0.0, 1.0]),
        tags: vec!["a".to_string()],
        group: Some((group_id, 1)),
        ..Default::default()
    })
    .unwrap();
    ds.flush().unwrap();

    ds.delete(1).unwrap();
    ds.compact().unwrap();

    assert_eq!(ds.count(), 2);
    assert_eq!(ds.read(0, selector::DATA).unwrap().data, b"keep-0");
    assert_eq!(ds.read(1, selector::DATA).unwrap().data, b"keep-2");

    assert_eq!(ds.tags.get_ids("a").unwrap(), vec![0, 1]);
    assert_eq!(ds.tags.get_ids("b").unwrap(), Vec::<i64>::new());

    assert_eq!(ds.groups.get_members(group_id).unwrap(), vec![0, 1]);

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_compact_of_empty_survivor_set_zeroes_everything() {
    let root = test_root("compact-empty");
    let mut ds = Dataset::create(&root, "ds", small_config()).unwrap();
    ds.append(Item { data: b"gone".to_vec(), vector: Some(vec![1.0, 0.0, 0.0]), ..Default::default() })
        .unwrap();
    ds.flush().unwrap();
    ds.delete(0).unwrap();
    ds.compact().unwrap();

    assert_eq!(ds.count(), 0);

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_destroy_removes_directory_and_config() {
    let root = test_root("destroy");
    let ds = Dataset::create(&root, "ds", small_config()).unwrap();
    let dir = dataset_dir(&root, "ds");
    let cfg = config_path(&root, "ds");
    assert!(dir.exists());
    assert!(cfg.exists());

    ds.destroy().unwrap();
    assert!(!dir.exists());
    assert!(!cfg.exists());

    std::fs::remove_dir_all(&root).ok();
}
