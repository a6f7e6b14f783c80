use std::sync::Arc;

use dataset_catalog_service::catalog::{PanelName, DATASETS_PER_PAGE};
use dataset_catalog_service::dataset_manager::DatasetManager;
use dataset_catalog_service::error::{
    ServiceError, DUPLICATE_DATASET_MESSAGE, DUPLICATE_FILE_MESSAGE,
};
use dataset_catalog_service::storage::BlobStorage;
use dataset_catalog_service::store::CatalogStore;
use dataset_catalog_service::test_utils::{seed_account, MemoryStore};

async fn test_manager() -> (DatasetManager, Arc<dyn CatalogStore>, tempfile::TempDir) {
    let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let storage = BlobStorage::new(dir.path())
        .await
        .expect("Failed to create blob storage");
    (DatasetManager::new(store.clone(), storage), store, dir)
}

#[tokio::test]
async fn test_duplicate_dataset_name_is_rejected_with_form_error() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "bbengfort").await;

    // Given: A dataset named "energy" already owned by this account
    manager
        .create_dataset(owner.id, "energy", "Energy readings")
        .await
        .expect("First creation should succeed");

    // When: The same owner creates a dataset with the same name
    let result = manager.create_dataset(owner.id, "energy", "Again").await;

    // Then: The duplicate is rejected with the user-facing message and
    // no second row is persisted
    match result {
        Err(err @ ServiceError::DuplicateDatasetName) => {
            assert_eq!(err.to_string(), DUPLICATE_DATASET_MESSAGE);
        }
        other => panic!("Expected duplicate error, got {:?}", other.map(|d| d.name)),
    }

    let page = manager.list_page(1).await.unwrap();
    assert_eq!(page.num_datasets, 1);
}

#[tokio::test]
async fn test_same_name_is_allowed_across_owners() {
    let (manager, _store, _dir) = test_manager().await;
    let alice = seed_account(manager.store(), "alice").await;
    let bob = seed_account(manager.store(), "bob").await;

    manager
        .create_dataset(alice.id, "energy", "")
        .await
        .expect("alice/energy should succeed");
    manager
        .create_dataset(bob.id, "energy", "")
        .await
        .expect("bob/energy should succeed");

    let page = manager.list_page(1).await.unwrap();
    assert_eq!(page.num_datasets, 2);
}

#[tokio::test]
async fn test_blank_dataset_name_fails_validation() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "bbengfort").await;

    let result = manager.create_dataset(owner.id, "   ", "blank").await;
    assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
}

#[tokio::test]
async fn test_duplicate_file_upload_is_rejected() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "bbengfort").await;
    manager
        .create_dataset(owner.id, "energy", "")
        .await
        .unwrap();

    let content = b"timestamp,kwh\n2016-02-12,4.2\n";

    // When: The same bytes are uploaded twice
    let (dataset, first) = manager
        .upload_file("bbengfort", "energy", "readings.csv", content)
        .await
        .expect("First upload should succeed");

    let second = manager
        .upload_file("bbengfort", "energy", "readings-again.csv", content)
        .await;

    // Then: The second upload fails with the duplicate-file message and
    // no second row is persisted
    match second {
        Err(err @ ServiceError::DuplicateFile) => {
            assert_eq!(err.to_string(), DUPLICATE_FILE_MESSAGE);
        }
        other => panic!("Expected duplicate error, got {:?}", other.is_ok()),
    }

    let files = manager.store().list_data_files(dataset.id).await.unwrap();
    assert_eq!(files.len(), 1);

    // And: The original blob is still readable after the rejection
    let stored = tokio::fs::read(&first.storage_path).await.unwrap();
    assert_eq!(stored, content);
}

#[tokio::test]
async fn test_distinct_content_uploads_both_persist() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "bbengfort").await;
    let dataset = manager
        .create_dataset(owner.id, "energy", "")
        .await
        .unwrap();

    manager
        .upload_file("bbengfort", "energy", "a.csv", b"a,b\n1,2\n")
        .await
        .unwrap();
    manager
        .upload_file("bbengfort", "energy", "b.csv", b"a,b\n3,4\n")
        .await
        .unwrap();

    let files = manager.store().list_data_files(dataset.id).await.unwrap();
    assert_eq!(files.len(), 2);
}

#[tokio::test]
async fn test_upload_to_unknown_dataset_is_not_found() {
    let (manager, _store, _dir) = test_manager().await;
    seed_account(manager.store(), "bbengfort").await;

    let result = manager
        .upload_file("bbengfort", "missing", "a.csv", b"a")
        .await;
    assert!(matches!(result, Err(ServiceError::DatasetNotFound { .. })));
}

#[tokio::test]
async fn test_empty_list_omits_latest_dataset() {
    let (manager, _store, _dir) = test_manager().await;

    let page = manager.list_page(1).await.unwrap();
    assert_eq!(page.num_datasets, 0);
    assert!(page.latest_dataset.is_none());
    assert!(page.datasets.is_empty());

    // The rendered context has no latest_dataset key at all.
    let value = serde_json::to_value(&page).unwrap();
    assert!(value.get("latest_dataset").is_none());
    assert_eq!(value["num_datasets"], 0);
}

#[tokio::test]
async fn test_list_reports_count_and_latest_creation_time() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "bbengfort").await;

    manager.create_dataset(owner.id, "first", "").await.unwrap();
    manager.create_dataset(owner.id, "second", "").await.unwrap();
    let newest = manager.create_dataset(owner.id, "third", "").await.unwrap();

    let page = manager.list_page(1).await.unwrap();
    assert_eq!(page.num_datasets, 3);
    assert_eq!(page.latest_dataset, Some(newest.created_at));
    // Newest first.
    assert_eq!(page.datasets[0].name, "third");
}

#[tokio::test]
async fn test_list_pages_at_twenty_five() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "bbengfort").await;

    for i in 0..30 {
        manager
            .create_dataset(owner.id, &format!("dataset-{:02}", i), "")
            .await
            .unwrap();
    }

    let first = manager.list_page(1).await.unwrap();
    assert_eq!(first.datasets.len(), DATASETS_PER_PAGE as usize);
    assert_eq!(first.num_datasets, 30);

    let second = manager.list_page(2).await.unwrap();
    assert_eq!(second.datasets.len(), 5);

    // Out-of-range pages are empty, not an error.
    let third = manager.list_page(3).await.unwrap();
    assert!(third.datasets.is_empty());
}

#[tokio::test]
async fn test_all_four_panels_resolve_the_same_dataset() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "bbengfort").await;
    manager
        .create_dataset(owner.id, "energy", "")
        .await
        .unwrap();
    manager
        .upload_file("bbengfort", "energy", "readings.csv", b"a,b\n")
        .await
        .unwrap();

    for panel_name in [
        PanelName::Files,
        PanelName::Schema,
        PanelName::Explore,
        PanelName::Settings,
    ] {
        let panel = manager
            .dataset_panel("bbengfort", "energy", panel_name)
            .await
            .expect("Panel lookup should succeed");
        assert_eq!(panel.panel_name, panel_name);
        assert_eq!(panel.dataset.name, "energy");
        assert_eq!(panel.files.len(), 1);
    }
}

#[tokio::test]
async fn test_all_four_panels_404_for_unknown_dataset() {
    let (manager, _store, _dir) = test_manager().await;
    seed_account(manager.store(), "bbengfort").await;

    for panel_name in [
        PanelName::Files,
        PanelName::Schema,
        PanelName::Explore,
        PanelName::Settings,
    ] {
        let result = manager
            .dataset_panel("bbengfort", "missing", panel_name)
            .await;
        match result {
            Err(err @ ServiceError::DatasetNotFound { .. }) => {
                assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
            }
            _ => panic!("Expected not-found for panel {}", panel_name),
        }
    }
}

#[tokio::test]
async fn test_dataset_rest_crud_round_trip() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "bbengfort").await;

    let created = manager
        .create_dataset(owner.id, "energy", "Energy readings")
        .await
        .unwrap();

    let fetched = manager.get_dataset(created.id).await.unwrap();
    assert_eq!(fetched, created);

    let updated = manager
        .update_dataset(created.id, "energy-v2", "Updated")
        .await
        .unwrap();
    assert_eq!(updated.name, "energy-v2");
    assert_eq!(updated.description, "Updated");

    manager.delete_dataset(created.id).await.unwrap();
    assert!(matches!(
        manager.get_dataset(created.id).await,
        Err(ServiceError::DatasetNotFound { .. })
    ));

    // Deleting again is a not-found, not a silent success.
    assert!(matches!(
        manager.delete_dataset(created.id).await,
        Err(ServiceError::DatasetNotFound { .. })
    ));
}

#[tokio::test]
async fn test_starring_and_listing_stars_for_a_user() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "owner").await;
    let watcher = seed_account(manager.store(), "watcher").await;

    let dataset = manager.create_dataset(owner.id, "energy", "").await.unwrap();
    let other = manager.create_dataset(owner.id, "census", "").await.unwrap();

    manager.star_dataset(watcher.id, dataset.id).await.unwrap();
    manager.star_dataset(owner.id, other.id).await.unwrap();

    // Only the watcher's own stars come back, exactly one, on the
    // starred dataset.
    let stars = manager.list_stars(watcher.id).await.unwrap();
    assert_eq!(stars.len(), 1);
    assert_eq!(stars[0].dataset_id, dataset.id);
    assert_eq!(stars[0].user_id, watcher.id);
}

#[tokio::test]
async fn test_star_on_unknown_dataset_maps_to_not_found() {
    let (manager, _store, _dir) = test_manager().await;
    let watcher = seed_account(manager.store(), "watcher").await;

    // Validation failure on star creation answers 404, not 400.
    let result = manager.star_dataset(watcher.id, 9999).await;
    match result {
        Err(err @ ServiceError::DatasetNotFound { .. }) => {
            assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
        }
        _ => panic!("Expected not-found on invalid star"),
    }
}

#[tokio::test]
async fn test_double_star_follows_the_not_found_mapping() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "owner").await;
    let dataset = manager.create_dataset(owner.id, "energy", "").await.unwrap();

    manager.star_dataset(owner.id, dataset.id).await.unwrap();
    let again = manager.star_dataset(owner.id, dataset.id).await;
    assert!(matches!(again, Err(ServiceError::DatasetNotFound { .. })));

    let stars = manager.list_stars(owner.id).await.unwrap();
    assert_eq!(stars.len(), 1);
}

#[tokio::test]
async fn test_unstar_removes_the_star() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "owner").await;
    let dataset = manager.create_dataset(owner.id, "energy", "").await.unwrap();

    manager.star_dataset(owner.id, dataset.id).await.unwrap();
    manager.unstar_dataset(owner.id, dataset.id).await.unwrap();

    let stars = manager.list_stars(owner.id).await.unwrap();
    assert!(stars.is_empty());
}

#[tokio::test]
async fn test_unstar_without_a_star_is_not_found() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "owner").await;
    let dataset = manager.create_dataset(owner.id, "energy", "").await.unwrap();

    let result = manager.unstar_dataset(owner.id, dataset.id).await;
    match result {
        Err(err @ ServiceError::StarNotFound { .. }) => {
            assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
        }
        _ => panic!("Expected not-found when no star exists"),
    }
}

#[tokio::test]
async fn test_deleting_a_dataset_cascades_files_and_stars() {
    let (manager, _store, _dir) = test_manager().await;
    let owner = seed_account(manager.store(), "owner").await;
    let dataset = manager.create_dataset(owner.id, "energy", "").await.unwrap();

    manager
        .upload_file("owner", "energy", "a.csv", b"a,b\n")
        .await
        .unwrap();
    manager.star_dataset(owner.id, dataset.id).await.unwrap();

    manager.delete_dataset(dataset.id).await.unwrap();

    let files = manager.store().list_data_files(dataset.id).await.unwrap();
    assert!(files.is_empty());
    let stars = manager.list_stars(owner.id).await.unwrap();
    assert!(stars.is_empty());
}
