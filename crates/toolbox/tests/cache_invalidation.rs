#![forbid(unsafe_code)]

use std::path::PathBuf;
use tt_core::entity::{EntityKind, EntityRef};
use tt_core::model::Parent;
use tt_storage::{CreateCategoryRequest, SqliteStore, StoreError, UpdateCategoryRequest};
use tt_toolbox::Catalog;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("tt_toolbox_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn open_catalog(test_name: &str) -> Catalog {
    Catalog::with_store(SqliteStore::open(temp_dir(test_name)).expect("open store"))
}

fn entity(kind: &str, id: i64) -> EntityRef {
    EntityRef::new(EntityKind::try_new(kind).expect("entity kind"), id)
}

#[test]
fn repeated_reads_reuse_one_snapshot() {
    let catalog = open_catalog("repeated_reads_reuse_one_snapshot");

    let colors = catalog
        .category_create(CreateCategoryRequest::new("Colors", "alice").with_alias("colors"))
        .expect("create");

    assert_eq!(catalog.cache().rebuild_count(), 0);
    for _ in 0..5 {
        catalog.category_by_id(colors.id).expect("read");
        catalog.category_by_alias("colors").expect("read");
        catalog.child_ids(&Parent::Root).expect("read");
    }
    assert_eq!(catalog.cache().rebuild_count(), 1);
}

#[test]
fn category_writes_refresh_the_next_read() {
    let catalog = open_catalog("category_writes_refresh_the_next_read");

    let colors = catalog
        .category_create(CreateCategoryRequest::new("Colors", "alice").with_alias("colors"))
        .expect("create");
    assert!(catalog.category_by_alias("colors").expect("read").is_some());
    assert_eq!(catalog.cache().rebuild_count(), 1);

    // Update shows up on the next read.
    catalog
        .category_update(
            colors.id,
            UpdateCategoryRequest {
                title: Some("Palette".to_string()),
                ..UpdateCategoryRequest::default()
            },
        )
        .expect("update");
    let refreshed = catalog
        .category_by_id(colors.id)
        .expect("read")
        .expect("still present");
    assert_eq!(refreshed.title, "Palette");
    assert_eq!(catalog.cache().rebuild_count(), 2);

    // So does a delete.
    catalog.category_delete(colors.id).expect("delete");
    assert!(catalog.category_by_id(colors.id).expect("read").is_none());
    assert_eq!(catalog.cache().rebuild_count(), 3);
}

#[test]
fn rejected_writes_keep_the_snapshot() {
    let catalog = open_catalog("rejected_writes_keep_the_snapshot");

    let locked = catalog
        .category_create(
            CreateCategoryRequest::new("Locked", "alice")
                .with_alias("locked")
                .locked(),
        )
        .expect("create locked");
    catalog
        .category_create(CreateCategoryRequest::new("Other", "alice").with_alias("other"))
        .expect("create other");

    catalog.category_by_id(locked.id).expect("warm the cache");
    assert_eq!(catalog.cache().rebuild_count(), 1);

    let err = catalog
        .category_delete(locked.id)
        .expect_err("locked delete must fail");
    assert!(matches!(err, StoreError::LockedCategoryDelete { .. }));

    let err = catalog
        .category_create(CreateCategoryRequest::new("Dup", "alice").with_alias("other"))
        .expect_err("duplicate alias must fail");
    assert!(matches!(err, StoreError::AliasTaken));

    // Both rejections left the held snapshot alone.
    assert!(catalog.category_by_id(locked.id).expect("read").is_some());
    assert_eq!(catalog.cache().rebuild_count(), 1);
}

#[test]
fn tie_writes_never_touch_the_cache() {
    let catalog = open_catalog("tie_writes_never_touch_the_cache");

    let colors = catalog
        .category_create(CreateCategoryRequest::new("Colors", "alice"))
        .expect("create");
    catalog.category_by_id(colors.id).expect("warm the cache");
    assert_eq!(catalog.cache().rebuild_count(), 1);

    let article = entity("article", 1);
    catalog.tag(&article, colors.id, "alice").expect("tag");
    catalog.untag(&article, colors.id).expect("untag");

    catalog.category_by_id(colors.id).expect("read");
    assert_eq!(catalog.cache().rebuild_count(), 1);
}

#[test]
fn explicit_invalidate_forces_a_rebuild() {
    let catalog = open_catalog("explicit_invalidate_forces_a_rebuild");

    catalog
        .category_create(CreateCategoryRequest::new("Colors", "alice"))
        .expect("create");
    catalog.child_ids(&Parent::Root).expect("warm the cache");
    assert_eq!(catalog.cache().rebuild_count(), 1);

    catalog.cache().invalidate();
    catalog.child_ids(&Parent::Root).expect("read");
    assert_eq!(catalog.cache().rebuild_count(), 2);
}
