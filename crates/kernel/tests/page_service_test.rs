#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for mutate-then-deploy.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use lamprey_kernel::{DeployError, PageService, PublishError, StoreError};
use lamprey_test_utils::{Scratch, test_page};

use common::{FailingDeployer, RecordingDeployer, SlowDeployer, folder_deployer, open_store};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn create_publishes_both_artifacts() {
    let scratch = Scratch::new().unwrap();
    let service = PageService::new(
        open_store(&scratch).await,
        Arc::new(folder_deployer(&scratch)),
        TIMEOUT,
    );
    let fixture = test_page("Home").with_json(serde_json::json!({"nav": true}));

    let page = service
        .create_and_deploy(&fixture.title, &fixture.content, fixture.data())
        .await
        .unwrap();

    assert_eq!(page.title, "Home");
    let html = std::fs::read_to_string(scratch.deploy_dir().join("Home.html")).unwrap();
    assert!(html.contains("<p>Home</p>"));
    let json = std::fs::read(scratch.deploy_dir().join("Home.json")).unwrap();
    assert_eq!(Some(json), fixture.data);
}

#[tokio::test]
async fn article_update_records_revision_and_publishes() {
    let scratch = Scratch::new().unwrap();
    let store = open_store(&scratch).await;
    let service = PageService::new(store.clone(), Arc::new(folder_deployer(&scratch)), TIMEOUT);
    let id = store.create_page("Home", "Hello", None).await.unwrap();

    let page = service
        .update_article_and_deploy("Home", "Hello, world")
        .await
        .unwrap();

    assert_eq!(page.id, id);
    assert_eq!(page.content, "Hello, world");
    let revisions = store.list_revisions(id).await.unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].previous_content, "Hello");

    let html = std::fs::read_to_string(scratch.deploy_dir().join("Home.html")).unwrap();
    assert!(html.contains("Hello, world"));
    // Only the article was touched.
    assert!(!scratch.deploy_dir().join("Home.json").exists());
}

#[tokio::test]
async fn data_update_keeps_content_and_publishes_data() {
    let scratch = Scratch::new().unwrap();
    let store = open_store(&scratch).await;
    let deployer = Arc::new(RecordingDeployer::default());
    let service = PageService::new(store.clone(), deployer.clone(), TIMEOUT);
    let id = store.create_page("Home", "Hello", None).await.unwrap();

    let page = service
        .update_data_and_deploy(&id.to_string(), Some(br#"{"a":1}"#))
        .await
        .unwrap();

    assert_eq!(page.content, "Hello");
    assert_eq!(page.data.as_deref(), Some(br#"{"a":1}"#.as_slice()));
    assert_eq!(deployer.data.snapshot(), [id]);
    assert!(deployer.articles.snapshot().is_empty());

    // The previous body is still captured even though it did not change.
    let revisions = store.list_revisions(id).await.unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].previous_content, "Hello");
}

#[tokio::test]
async fn deploy_failure_keeps_the_committed_update() {
    let scratch = Scratch::new().unwrap();
    let store = open_store(&scratch).await;
    let deployer = Arc::new(FailingDeployer::default());
    let service = PageService::new(store.clone(), deployer.clone(), TIMEOUT);
    let id = store.create_page("Home", "v1", None).await.unwrap();

    let err = service
        .update_article_and_deploy("Home", "v2")
        .await
        .unwrap_err();

    match err {
        PublishError::Deploy { page, source } => {
            assert_eq!(page.id, id);
            assert_eq!(page.content, "v2");
            assert!(matches!(source, DeployError::TargetWrite { .. }));
        }
        other => panic!("expected deploy error, got {other:?}"),
    }
    assert_eq!(deployer.calls.load(Ordering::SeqCst), 1);

    let stored = store.get_page_by_id(id).await.unwrap();
    assert_eq!(stored.content, "v2");
    assert_eq!(store.list_revisions(id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn slow_deployment_times_out_after_commit() {
    let scratch = Scratch::new().unwrap();
    let store = open_store(&scratch).await;
    let deployer = Arc::new(SlowDeployer {
        delay: Duration::from_secs(10),
    });
    let limit = Duration::from_millis(50);
    let service = PageService::new(store.clone(), deployer, limit);
    let id = store.create_page("Home", "v1", None).await.unwrap();

    let err = service
        .update_article_and_deploy("Home", "v2")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PublishError::Deploy {
            source: DeployError::TimedOut(d),
            ..
        } if d == limit
    ));
    assert_eq!(store.get_page_by_id(id).await.unwrap().content, "v2");
}

#[tokio::test]
async fn store_failure_skips_deployment() {
    let scratch = Scratch::new().unwrap();
    let deployer = Arc::new(FailingDeployer::default());
    let service = PageService::new(open_store(&scratch).await, deployer.clone(), TIMEOUT);

    let err = service
        .update_article_and_deploy("Nowhere", "x")
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Store(StoreError::NotFound)));
    assert_eq!(deployer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn duplicate_create_is_a_store_conflict() {
    let scratch = Scratch::new().unwrap();
    let deployer = Arc::new(RecordingDeployer::default());
    let service = PageService::new(open_store(&scratch).await, deployer.clone(), TIMEOUT);

    let first = service.create_and_deploy("Home", "a", None).await.unwrap();
    let err = service
        .create_and_deploy("Home", "b", None)
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Store(StoreError::Conflict(_))));
    assert_eq!(deployer.articles.snapshot(), [first.id]);
}

#[tokio::test]
async fn redeploy_retries_a_failed_publish() {
    let scratch = Scratch::new().unwrap();
    let store = open_store(&scratch).await;
    let failing = PageService::new(store.clone(), Arc::new(FailingDeployer::default()), TIMEOUT);
    let id = store.create_page("Home", "v1", None).await.unwrap();

    assert!(failing.update_article_and_deploy("Home", "v2").await.is_err());

    let working = PageService::new(store.clone(), Arc::new(folder_deployer(&scratch)), TIMEOUT);
    let page = working.redeploy(&id.to_string()).await.unwrap();

    assert_eq!(page.content, "v2");
    let html = std::fs::read_to_string(scratch.deploy_dir().join("Home.html")).unwrap();
    assert!(html.contains("v2"));
    assert!(scratch.deploy_dir().join("Home.json").exists());
    // Redeploying does not create revisions.
    assert_eq!(store.list_revisions(id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_hides_page_but_leaves_artifacts() {
    let scratch = Scratch::new().unwrap();
    let store = open_store(&scratch).await;
    let service = PageService::new(store.clone(), Arc::new(folder_deployer(&scratch)), TIMEOUT);
    let page = service.create_and_deploy("Home", "v1", None).await.unwrap();

    let deleted = service.delete("Home").await.unwrap();
    assert_eq!(deleted.id, page.id);

    assert!(matches!(
        store.get_page_by_id(page.id).await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        service.delete("Home").await,
        Err(PublishError::Store(StoreError::NotFound))
    ));
    assert!(scratch.deploy_dir().join("Home.html").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_article_and_data_edits_are_both_kept() {
    const ROUNDS: usize = 50;

    let scratch = Scratch::new().unwrap();
    let store = open_store(&scratch).await;
    let deployer = Arc::new(RecordingDeployer::default());
    let service = PageService::new(store.clone(), deployer.clone(), TIMEOUT);

    for round in 0..ROUNDS {
        let id = store
            .create_page(&format!("Page {round}"), "old", None)
            .await
            .unwrap();
        let key = id.to_string();

        let article = tokio::spawn({
            let service = service.clone();
            let key = key.clone();
            async move { service.update_article_and_deploy(&key, "new").await }
        });
        let data = tokio::spawn({
            let service = service.clone();
            async move { service.update_data_and_deploy(&key, Some(br#"{"k":1}"#)).await }
        });
        article.await.unwrap().unwrap();
        data.await.unwrap().unwrap();

        let page = store.get_page_by_id(id).await.unwrap();
        assert_eq!(page.content, "new", "article edit lost in round {round}");
        assert_eq!(
            page.data.as_deref(),
            Some(br#"{"k":1}"#.as_slice()),
            "data edit lost in round {round}"
        );
        assert_eq!(store.list_revisions(id).await.unwrap().len(), 2);
    }

    assert_eq!(deployer.articles.snapshot().len(), ROUNDS);
    assert_eq!(deployer.data.snapshot().len(), ROUNDS);
}
