//! Integration tests for the staging-and-normalization pipeline.
//!
//! Each test wires a `Pipeline` over in-memory store backends and
//! exercises the real stage/drain contract end to end.

use std::sync::Arc;

use mailsink::config::PipelineConfig;
use mailsink::dataset::{CandidateDataset, CandidateRecord};
use mailsink::pipeline::{Pipeline, Sinker};
use mailsink::store::{LibSqlStagingStore, LibSqlWarehouse, StagingStore, Warehouse};

/// A minimal single-part message in the candidate dataset's shape.
fn raw_message(id: u32, from: &str, to: &str) -> String {
    format!(
        "Message-ID: <{id}@test>\r\n\
Date: Mon, 14 May 2001 16:39:00 -0700\r\n\
From: {from}\r\n\
To: {to}\r\n\
Subject: note {id}\r\n\
Mime-Version: 1.0\r\n\
Content-Type: text/plain; charset=us-ascii\r\n\
Content-Transfer-Encoding: 7bit\r\n\
\r\n\
body {id}"
    )
}

fn record(file: &str, message: String) -> CandidateRecord {
    CandidateRecord {
        file: file.to_string(),
        message,
    }
}

struct Harness {
    pipeline: Pipeline,
    staging: Arc<dyn StagingStore>,
    warehouse: Arc<dyn Warehouse>,
}

async fn harness(records: Vec<CandidateRecord>) -> Harness {
    let staging: Arc<dyn StagingStore> = Arc::new(LibSqlStagingStore::new_memory().await.unwrap());
    let warehouse: Arc<dyn Warehouse> = Arc::new(LibSqlWarehouse::new_memory().await.unwrap());

    let config = PipelineConfig {
        sample_size: records.len(),
        sample_seed: Some(7),
        ..PipelineConfig::default()
    };
    let dataset = CandidateDataset::from_records(records);
    let pipeline = Pipeline::new(
        config,
        dataset,
        Arc::clone(&staging),
        Arc::clone(&warehouse),
    );
    pipeline.bootstrap_schema().await.unwrap();

    Harness {
        pipeline,
        staging,
        warehouse,
    }
}

#[tokio::test]
async fn staging_same_file_twice_keeps_one_pending_record() {
    let h = harness(vec![record(
        "maildir/1",
        raw_message(1, "a@x.com", "b@y.com"),
    )])
    .await;

    let sample = h.pipeline.sample().unwrap();
    let first = h.pipeline.stage(&sample).await.unwrap();
    assert_eq!(first.staged, 1);

    let second = h.pipeline.stage(&sample).await.unwrap();
    assert_eq!(second.staged, 0);
    assert_eq!(second.duplicates, 1);

    assert_eq!(h.staging.fetch_unprocessed().await.unwrap().len(), 1);
}

#[tokio::test]
async fn drain_twice_produces_no_duplicate_emails() {
    let h = harness(vec![
        record("maildir/1", raw_message(1, "a@x.com", "b@y.com")),
        record("maildir/2", raw_message(2, "c@z.com", "d@w.com")),
    ])
    .await;

    let sample = h.pipeline.sample().unwrap();
    h.pipeline.stage(&sample).await.unwrap();

    let first = h.pipeline.drain_and_sink().await.unwrap();
    assert_eq!(first.sunk, 2);
    assert_eq!(h.warehouse.count_emails().await.unwrap(), 2);

    let second = h.pipeline.drain_and_sink().await.unwrap();
    assert_eq!(second.sunk, 0);
    assert_eq!(h.warehouse.count_emails().await.unwrap(), 2);
}

#[tokio::test]
async fn run_tick_stages_and_sinks_everything() {
    let h = harness(vec![
        record("maildir/1", raw_message(1, "a@x.com", "b@y.com")),
        record("maildir/2", raw_message(2, "a@x.com", "b@y.com")),
        record("maildir/3", raw_message(3, "c@z.com", "d@w.com")),
    ])
    .await;

    let report = h.pipeline.run_tick().await.unwrap();
    assert_eq!(report.stage.staged, 3);
    assert_eq!(report.drain.sunk, 3);
    assert_eq!(h.warehouse.count_emails().await.unwrap(), 3);

    // A second tick re-samples the same three files: all duplicates,
    // nothing new to sink.
    let report = h.pipeline.run_tick().await.unwrap();
    assert_eq!(report.stage.staged, 0);
    assert_eq!(report.stage.duplicates, 3);
    assert_eq!(report.drain.sunk, 0);
    assert_eq!(h.warehouse.count_emails().await.unwrap(), 3);
}

#[tokio::test]
async fn sender_user_is_unique_across_emails() {
    let h = harness(vec![
        record("maildir/1", raw_message(1, "a@x.com", "b@y.com")),
        record("maildir/2", raw_message(2, "a@x.com", "c@z.com")),
    ])
    .await;

    let sample = h.pipeline.sample().unwrap();
    h.pipeline.stage(&sample).await.unwrap();
    h.pipeline.drain_and_sink().await.unwrap();

    let sender = h.warehouse.find_user("a@x.com").await.unwrap().unwrap();
    assert_eq!(sender.name.as_deref(), Some("a"));

    // Both recipients exist as their own users, linked with type "to";
    // the sender's row carries no recipient links.
    let b = h.warehouse.find_user("b@y.com").await.unwrap().unwrap();
    let c = h.warehouse.find_user("c@z.com").await.unwrap().unwrap();

    let mut linked_users = Vec::new();
    for email_id in 1..=2i64 {
        for link in h.warehouse.recipients_for(email_id).await.unwrap() {
            assert_eq!(link.recipient_type, "to");
            linked_users.push(link.user_id);
        }
    }
    linked_users.sort_unstable();
    let mut expected = vec![b.id, c.id];
    expected.sort_unstable();
    assert_eq!(linked_users, expected);
    assert!(!linked_users.contains(&sender.id));
}

#[tokio::test]
async fn cc_and_bcc_recipients_are_tagged() {
    let raw = "Message-ID: <9@test>\r\n\
From: a@x.com\r\n\
To: b@y.com\r\n\
Cc: c@z.com, b@y.com\r\n\
Bcc: d@w.com\r\n\
Subject: tagged\r\n\
\r\n\
body"
        .to_string();
    let h = harness(vec![record("maildir/9", raw)]).await;

    let sample = h.pipeline.sample().unwrap();
    h.pipeline.stage(&sample).await.unwrap();
    let report = h.pipeline.drain_and_sink().await.unwrap();
    assert_eq!(report.sunk, 1);

    let links = h.warehouse.recipients_for(1).await.unwrap();
    let mut kinds: Vec<&str> = links.iter().map(|l| l.recipient_type.as_str()).collect();
    kinds.sort_unstable();
    assert_eq!(kinds, vec!["bcc", "cc", "cc", "to"]);

    // b@y.com appears both as To and Cc but has a single users row.
    let b = h.warehouse.find_user("b@y.com").await.unwrap().unwrap();
    let b_links = links.iter().filter(|l| l.user_id == b.id).count();
    assert_eq!(b_links, 2);
}

#[tokio::test]
async fn concurrent_drains_never_sink_the_same_record_twice() {
    let records: Vec<CandidateRecord> = (0..8u32)
        .map(|i| {
            record(
                &format!("maildir/{i}"),
                raw_message(i, &format!("u{i}@x.com"), "to@y.com"),
            )
        })
        .collect();
    let h = harness(records).await;

    let sample = h.pipeline.sample().unwrap();
    h.pipeline.stage(&sample).await.unwrap();

    let first = Sinker::new(Arc::clone(&h.staging), Arc::clone(&h.warehouse));
    let second = Sinker::new(Arc::clone(&h.staging), Arc::clone(&h.warehouse));

    let (a, b) = tokio::join!(first.drain(), second.drain());
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.sunk + b.sunk, 8);
    assert_eq!(h.warehouse.count_emails().await.unwrap(), 8);
    assert!(h.staging.fetch_unprocessed().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_message_is_left_pending_without_failing() {
    let h = harness(vec![
        record("maildir/empty", String::new()),
        record("maildir/ok", raw_message(1, "a@x.com", "b@y.com")),
    ])
    .await;

    let sample = h.pipeline.sample().unwrap();
    h.pipeline.stage(&sample).await.unwrap();

    let report = h.pipeline.drain_and_sink().await.unwrap();
    assert_eq!(report.sunk, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);

    // The empty record stays pending for a future run.
    let pending = h.staging.fetch_unprocessed().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].file, "maildir/empty");
}

#[tokio::test]
async fn missing_sender_is_isolated_and_released() {
    let orphan = "Subject: no sender\r\n\r\nbody".to_string();
    let h = harness(vec![
        record("maildir/orphan", orphan),
        record("maildir/ok", raw_message(1, "a@x.com", "b@y.com")),
    ])
    .await;

    let sample = h.pipeline.sample().unwrap();
    h.pipeline.stage(&sample).await.unwrap();

    let report = h.pipeline.drain_and_sink().await.unwrap();
    assert_eq!(report.sunk, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(h.warehouse.count_emails().await.unwrap(), 1);

    // The failed record's claim was released; it stays pending for
    // operator inspection and is retried next run.
    let pending = h.staging.fetch_unprocessed().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].file, "maildir/orphan");
}
