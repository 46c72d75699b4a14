use std::collections::BTreeMap;

use docsynth_core::{EntityBatch, EntityRecord};
use docsynth_generate::{BackgroundMode, BackgroundPool, GenerationError, assign};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn batch(len: usize) -> EntityBatch {
    EntityBatch::from_records(
        (0..len)
            .map(|i| {
                let fields = BTreeMap::from([("customer".to_string(), format!("Customer {i}"))]);
                EntityRecord::new(fields, "invoice", "en")
            })
            .collect(),
    )
}

fn refs(batch: &EntityBatch) -> Vec<Option<String>> {
    batch
        .iter()
        .map(|record| record.background_ref.clone())
        .collect()
}

fn pool(names: &[&str]) -> BackgroundPool {
    BackgroundPool::from_refs(names.iter().map(|name| name.to_string()).collect())
}

#[test]
fn single_background_pool_makes_modes_equivalent() {
    let pool = pool(&["paper.png"]);

    let shared = assign(
        batch(6),
        &pool,
        BackgroundMode::Shared,
        true,
        &mut ChaCha8Rng::seed_from_u64(1),
    )
    .expect("shared");
    let per_document = assign(
        batch(6),
        &pool,
        BackgroundMode::PerDocument,
        true,
        &mut ChaCha8Rng::seed_from_u64(99),
    )
    .expect("per document");

    assert_eq!(refs(&shared), refs(&per_document));
    assert!(refs(&shared).iter().all(|r| r.as_deref() == Some("paper.png")));
}

#[test]
fn shared_mode_uses_one_background() {
    let pool = pool(&["a.png", "b.png", "c.png", "d.png"]);
    let assigned = assign(
        batch(20),
        &pool,
        BackgroundMode::Shared,
        false,
        &mut ChaCha8Rng::seed_from_u64(7),
    )
    .expect("shared");

    let first = assigned.records()[0].background_ref.clone();
    assert!(first.is_some());
    assert!(assigned.iter().all(|record| record.background_ref == first));
}

#[test]
fn per_document_selection_is_reproducible_with_a_seed() {
    let pool = pool(&["a.png", "b.png", "c.png"]);
    let run = |seed| {
        assign(
            batch(30),
            &pool,
            BackgroundMode::PerDocument,
            false,
            &mut ChaCha8Rng::seed_from_u64(seed),
        )
        .expect("per document")
    };

    let first = run(42);
    assert_eq!(refs(&first), refs(&run(42)));
    for reference in refs(&first) {
        let reference = reference.expect("assigned");
        assert!(pool.refs().contains(&reference));
    }
}

#[test]
fn empty_pool_fails_when_required() {
    let err = assign(
        batch(3),
        &BackgroundPool::default(),
        BackgroundMode::PerDocument,
        true,
        &mut ChaCha8Rng::seed_from_u64(0),
    )
    .expect_err("required backgrounds");
    assert!(matches!(err, GenerationError::NoBackgroundsAvailable));
}

#[test]
fn empty_pool_is_skipped_when_optional() {
    let assigned = assign(
        batch(3),
        &BackgroundPool::default(),
        BackgroundMode::PerDocument,
        false,
        &mut ChaCha8Rng::seed_from_u64(0),
    )
    .expect("optional backgrounds");
    assert!(refs(&assigned).iter().all(Option::is_none));
}

#[test]
fn scan_snapshots_raster_files_sorted_by_name() {
    let dir = std::env::temp_dir().join(format!("docsynth_backgrounds_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(dir.join("nested")).expect("create temp dir");
    for name in ["b_paper.png", "a_linen.JPG", "c_card.webp", "notes.txt"] {
        std::fs::write(dir.join(name), b"x").expect("write file");
    }

    let pool = BackgroundPool::scan(&dir).expect("scan");
    let names: Vec<String> = pool
        .refs()
        .iter()
        .map(|path| {
            std::path::Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();
    assert_eq!(names, vec!["a_linen.JPG", "b_paper.png", "c_card.webp"]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn scan_of_missing_directory_is_empty() {
    let dir = std::env::temp_dir().join(format!("docsynth_missing_{}", uuid::Uuid::new_v4()));
    let pool = BackgroundPool::scan(&dir).expect("scan");
    assert!(pool.is_empty());
}

#[test]
fn mode_serializes_as_snake_case() {
    assert_eq!(
        serde_json::to_string(&BackgroundMode::PerDocument).expect("serialize"),
        "\"per_document\""
    );
}
