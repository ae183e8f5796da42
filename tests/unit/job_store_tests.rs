/*!
 * Job store behaviour through the public API
 */

use std::time::Duration;
use tempfile::TempDir;

use kwtrans::errors::JobError;
use kwtrans::{JobStatus, JobStore, NewItem};

#[tokio::test]
async fn test_fileStore_shouldSurviveReopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("jobs.db");

    let job_id = {
        let store = JobStore::open(Some(&path)).unwrap();
        let job = store
            .submit_job("French", vec![NewItem::new("shoes").category("footwear")], 50)
            .await
            .unwrap();
        job.id
    };

    let store = JobStore::open(Some(&path)).unwrap();
    let job = store.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.sealed);

    let items = store.list_items(&job_id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].category.as_deref(), Some("footwear"));
}

#[tokio::test]
async fn test_renewClaim_byOtherWorker_shouldFail() {
    let store = JobStore::new_in_memory().unwrap();
    let job = store.submit_job("French", vec![NewItem::new("shoes")], 50).await.unwrap();
    let stale = Duration::from_secs(900);

    assert!(store.claim_job(&job.id, "worker-a", stale).await.unwrap());
    assert!(store.renew_claim(&job.id, "worker-a").await.unwrap());
    assert!(!store.renew_claim(&job.id, "worker-b").await.unwrap());

    store.set_job_status(&job.id, JobStatus::Completed, Some("file://x")).await.unwrap();
    assert!(!store.renew_claim(&job.id, "worker-a").await.unwrap());
}

#[tokio::test]
async fn test_claimableJobs_shouldBeOldestFirst() {
    let store = JobStore::new_in_memory().unwrap();
    let first = store.submit_job("French", vec![NewItem::new("a")], 50).await.unwrap();
    let second = store.submit_job("German", vec![NewItem::new("b")], 50).await.unwrap();
    store.create_job("Dutch").await.unwrap();

    let claimable = store.claimable_jobs(Duration::from_secs(900)).await.unwrap();
    let ids: Vec<&str> = claimable.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
}

#[tokio::test]
async fn test_sealJob_shouldCloseJobForNewItems() {
    let store = JobStore::new_in_memory().unwrap();
    let job = store.create_job("French").await.unwrap();
    store.add_items(&job.id, vec![NewItem::new("shoes")], 50).await.unwrap();

    assert!(store.seal_job(&job.id).await.unwrap());
    let err = store
        .add_items(&job.id, vec![NewItem::new("socks")], 50)
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<JobError>(), Some(JobError::Closed(_))));
    assert_eq!(store.list_items(&job.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleteJob_thenAddItems_shouldReportNotFound() {
    let store = JobStore::new_in_memory().unwrap();
    let job = store.create_job("French").await.unwrap();
    store.add_items(&job.id, vec![NewItem::new("shoes")], 50).await.unwrap();

    assert!(store.delete_job(&job.id).await.unwrap());
    assert!(!store.delete_job(&job.id).await.unwrap());
    assert!(store.get_job(&job.id).await.unwrap().is_none());
    assert!(store.list_items(&job.id).await.unwrap().is_empty());

    let err = store.add_items(&job.id, vec![NewItem::new("socks")], 50).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<JobError>(), Some(JobError::NotFound(_))));
}

#[tokio::test]
async fn test_completedJob_shouldKeepArtifactAndCompletionTime() {
    let store = JobStore::new_in_memory().unwrap();
    let job = store.submit_job("French", vec![NewItem::new("shoes")], 50).await.unwrap();
    store.claim_job(&job.id, "w", Duration::from_secs(900)).await.unwrap();

    assert!(store
        .set_job_status(&job.id, JobStatus::Completed, Some("exports/a.csv"))
        .await
        .unwrap());
    let done = store.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(done.download_url.as_deref(), Some("exports/a.csv"));
    assert!(done.completed_at.is_some());

    // A later terminal move must not touch the artifact
    assert!(!store.set_job_status(&job.id, JobStatus::Failed, None).await.unwrap());
    let after = store.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(after, done);
}

#[tokio::test]
async fn test_stats_display_shouldSummarizeCounts() {
    let store = JobStore::new_in_memory().unwrap();
    let job = store
        .submit_job("French", vec![NewItem::new("a"), NewItem::new("b")], 50)
        .await
        .unwrap();
    let items = store.list_items(&job.id).await.unwrap();
    store.update_item_translation(&items[0].id, "a", "a", true).await.unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.queued_jobs, 1);
    assert_eq!(stats.total_items, 2);
    assert_eq!(stats.translated_items, 1);
    assert_eq!(stats.fallback_items, 1);
    assert_eq!(
        stats.to_string(),
        "Jobs: 1 queued, 0 in progress, 0 completed, 0 failed | Items: 1/2 translated (1 fallback)"
    );
}

#[tokio::test]
async fn test_addItems_blankKeyword_shouldRejectWholeBatch() {
    let store = JobStore::new_in_memory().unwrap();
    let job = store.create_job("French").await.unwrap();
    let blank = NewItem::new("   ");
    let blank_id = blank.id.clone();

    let err = store
        .add_items(&job.id, vec![NewItem::new("shoes"), blank], 1)
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<JobError>(), Some(JobError::BlankKeyword(id)) if *id == blank_id));
    assert!(store.list_items(&job.id).await.unwrap().is_empty());

    let err = store
        .submit_job("French", vec![NewItem::new(""), NewItem::new("socks")], 50)
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<JobError>(), Some(JobError::BlankKeyword(_))));
    assert_eq!(store.list_jobs(None).await.unwrap().len(), 1);
}
