//! Retrieval correctness: ranking, self-match, determinism, batch reports.

use super::fixtures::{synthetic_vectors, write_corrupt, write_image, write_palette, PALETTE};
use crate::distance::DistanceMetric;
use crate::extractor::CeddExtractor;
use crate::progress::ProgressReporter;
use crate::search::Searcher;
use crate::store::{MemoryStore, Store};
use crate::types::{Descriptor, ImageDocument};
use ris_core::{AppConfig, AppError, DuplicatePolicy};
use std::sync::Arc;
use tempfile::TempDir;

fn workspace_config(workspace: &std::path::Path) -> AppConfig {
    AppConfig {
        workspace: workspace.to_path_buf(),
        workers: 3,
        ..AppConfig::default()
    }
}

fn synthetic_store(count: usize, dims: usize) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new(DuplicatePolicy::Reject));
    for (i, values) in synthetic_vectors(count, dims, 42).into_iter().enumerate() {
        store
            .append(ImageDocument::new(format!("/synthetic/{:03}.png", i), Descriptor::new(values)))
            .unwrap();
    }
    store
}

#[test]
fn test_top_k_matches_brute_force() {
    let dims = 16;
    let store = synthetic_store(60, dims);
    let probe = Descriptor::new(synthetic_vectors(1, dims, 7).remove(0));

    for metric in [
        DistanceMetric::Tanimoto,
        DistanceMetric::Euclidean,
        DistanceMetric::ChiSquare,
    ] {
        let searcher = Searcher::new(store.clone(), Arc::new(CeddExtractor::new()), metric);

        let mut reference: Vec<(f32, String)> = store
            .open_for_query()
            .unwrap()
            .scan()
            .map(|d| {
                (
                    metric.distance(probe.as_slice(), d.descriptor.as_slice()),
                    d.identifier.clone(),
                )
            })
            .collect();
        reference.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        for k in [1, 5, 60, 100] {
            let hits = searcher.search(&probe, k).unwrap();
            assert_eq!(hits.len(), k.min(60), "metric {} k {}", metric.name(), k);

            let got: Vec<(f32, String)> = hits.iter().map(|h| (h.score, h.identifier.clone())).collect();
            assert_eq!(got, reference[..k.min(60)].to_vec(), "metric {} k {}", metric.name(), k);
        }
    }
}

#[test]
fn test_search_is_deterministic() {
    let store = synthetic_store(40, 8);
    let searcher = Searcher::new(store, Arc::new(CeddExtractor::new()), DistanceMetric::Tanimoto);
    let probe = Descriptor::new(synthetic_vectors(1, 8, 99).remove(0));

    let first = searcher.search(&probe, 10).unwrap();
    let second = searcher.search(&probe, 10).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_search_rejects_zero_k() {
    let store = synthetic_store(3, 4);
    let searcher = Searcher::new(store, Arc::new(CeddExtractor::new()), DistanceMetric::Tanimoto);

    let err = searcher.search(&Descriptor::new(vec![0.0; 4]), 0).unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_self_match_is_top_hit_with_zero_score() {
    let temp = TempDir::new().unwrap();
    let images = temp.path().join("images");
    std::fs::create_dir(&images).unwrap();
    let files = write_palette(&images, 8);

    let config = workspace_config(temp.path());
    let summary = crate::add_directory(&config, &images, false, &ProgressReporter::noop())
        .await
        .unwrap();
    assert_eq!(summary.count, 8);

    let report = crate::search(&config, &images, 3).await.unwrap();
    assert_eq!(report.probes.len(), 8);

    for (probe, file) in report.probes.iter().zip(&files) {
        assert_eq!(&probe.probe, file);
        assert!(probe.error.is_none());
        assert_eq!(probe.hits.len(), 3);

        let top = &probe.hits[0];
        assert_eq!(top.rank, 1);
        assert_eq!(top.score, 0.0);
        assert_eq!(top.identifier, file.canonicalize().unwrap().to_string_lossy());
        assert!(probe.hits.windows(2).all(|w| w[0].score <= w[1].score));
    }
}

#[tokio::test]
async fn test_single_file_search_after_reopen() {
    let temp = TempDir::new().unwrap();
    let images = temp.path().join("images");
    std::fs::create_dir(&images).unwrap();
    write_palette(&images, 4);

    let config = workspace_config(temp.path());
    crate::add_directory(&config, &images, false, &ProgressReporter::noop())
        .await
        .unwrap();

    // Fresh store handle, as a later process would open it
    let probe = images.join("img_02.png");
    let report = crate::search(&config, &probe, 2).await.unwrap();

    assert_eq!(report.probes.len(), 1);
    let hits = &report.probes[0].hits;
    assert_eq!(hits.len(), 2);
    assert!(hits[0].identifier.ends_with("img_02.png"));
}

#[tokio::test]
async fn test_batch_search_without_images_is_empty() {
    let temp = TempDir::new().unwrap();
    let images = temp.path().join("images");
    std::fs::create_dir(&images).unwrap();
    write_palette(&images, 2);

    let config = workspace_config(temp.path());
    crate::add_directory(&config, &images, false, &ProgressReporter::noop())
        .await
        .unwrap();

    let empty = temp.path().join("documents");
    std::fs::create_dir(&empty).unwrap();
    std::fs::write(empty.join("readme.txt"), b"no pictures here").unwrap();

    let report = crate::search(&config, &empty, 3).await.unwrap();
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_corrupt_probe_is_reported_not_fatal() {
    let temp = TempDir::new().unwrap();
    let images = temp.path().join("images");
    std::fs::create_dir(&images).unwrap();
    write_palette(&images, 4);

    let config = workspace_config(temp.path());
    crate::add_directory(&config, &images, false, &ProgressReporter::noop())
        .await
        .unwrap();

    let probes = temp.path().join("probes");
    std::fs::create_dir(&probes).unwrap();
    write_corrupt(&probes, "a_broken.jpg");
    write_image(&probes, "b_red.png", PALETTE[3]);

    let report = crate::search(&config, &probes, 1).await.unwrap();
    assert_eq!(report.probes.len(), 2);

    assert!(report.probes[0].error.is_some());
    assert!(report.probes[0].hits.is_empty());

    assert!(report.probes[1].error.is_none());
    assert!(report.probes[1].hits[0].identifier.ends_with("img_03.png"));
    assert_eq!(report.probes[1].hits[0].score, 0.0);
}

#[tokio::test]
async fn test_search_without_index_is_storage_unavailable() {
    let temp = TempDir::new().unwrap();
    let probe = write_image(temp.path(), "probe.png", PALETTE[0]);

    let err = crate::search(&workspace_config(temp.path()), &probe, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StorageUnavailable(_)));
}

#[tokio::test]
async fn test_clean_then_stats() {
    let temp = TempDir::new().unwrap();
    let images = temp.path().join("images");
    std::fs::create_dir(&images).unwrap();
    write_palette(&images, 3);

    let config = workspace_config(temp.path());
    crate::add_directory(&config, &images, false, &ProgressReporter::noop())
        .await
        .unwrap();

    let stats = crate::stats(&config).unwrap();
    assert_eq!(stats.documents, 3);
    assert_eq!(stats.extractor.as_deref(), Some("cedd-v1:144"));

    crate::clean(&config).unwrap();
    assert_eq!(crate::stats(&config).unwrap().documents, 0);
}
