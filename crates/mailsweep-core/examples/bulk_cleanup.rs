//! Bulk-cleanup walkthrough against an in-memory session.
//!
//! Searches a fake mailbox for stale read messages, flags them deleted
//! in batches, and prints the report — including how the engine rides
//! through a flaky batch.
//!
//! Run with: `cargo run --example bulk_cleanup`

use async_trait::async_trait;

use mailsweep_core::{
    BreakerConfig, BulkConfig, BulkOrchestrator, Criteria, ErrorKind, FetchPart, Flag, FlagOp,
    Flags, MailSession, Mailbox, MessageRecord, RetryPolicy, SearchDate, SessionError, SweepEngine,
    Uid, UidSet,
};

/// An in-memory mailbox with one intermittently failing UID range.
struct DemoSession {
    uids: Vec<u32>,
    hiccups_left: u32,
}

#[async_trait]
impl MailSession for DemoSession {
    async fn select(&mut self, mailbox: &Mailbox) -> Result<(), SessionError> {
        println!("* SELECT {mailbox}");
        Ok(())
    }

    async fn search(&mut self, query: &str) -> Result<Vec<Uid>, SessionError> {
        println!("* SEARCH {query}");
        Ok(self.uids.iter().copied().filter_map(Uid::new).collect())
    }

    async fn fetch(
        &mut self,
        batch: &UidSet,
        _parts: &[FetchPart],
    ) -> Result<Vec<MessageRecord>, SessionError> {
        Ok(batch
            .iter()
            .map(|uid| MessageRecord {
                uid: Some(uid),
                flags: Flags::new(),
                ..MessageRecord::default()
            })
            .collect())
    }

    async fn store(
        &mut self,
        batch: &UidSet,
        _op: FlagOp,
        flags: &[Flag],
    ) -> Result<(), SessionError> {
        // The middle of the mailbox is flaky for a couple of attempts.
        if self.hiccups_left > 0 && Uid::new(500).is_some_and(|u| batch.contains(u)) {
            self.hiccups_left -= 1;
            return Err(SessionError::new(ErrorKind::Temporary, "server hiccup"));
        }
        let rendered: Vec<String> = flags.iter().map(ToString::to_string).collect();
        println!("* STORE {batch} +FLAGS ({})", rendered.join(" "));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let session = DemoSession {
        uids: (1..=1_000).collect(),
        hiccups_left: 2,
    };
    let orchestrator = BulkOrchestrator::new(
        BulkConfig::new().batch_size(200),
        RetryPolicy::interactive(),
        BreakerConfig::default(),
    );
    let mut engine = SweepEngine::new(session, orchestrator);

    engine.select(Mailbox::inbox()).await?;

    let stale = engine
        .search(&Criteria::seen().and(Criteria::before(SearchDate::new(2024, 1, 1)?)))
        .await?;
    println!("matched {} messages in {} ranges", stale.len(), stale.ranges().len());

    let report = engine
        .store_batched(&stale, FlagOp::Set, &[Flag::Deleted])
        .await?;
    println!(
        "done: {} messages flagged, {} batches failed, {} skipped",
        report.succeeded_messages, report.failed_batches, report.skipped_batches
    );

    let checkpoint = report.checkpoint(&stale)?;
    println!("checkpoint: {}", checkpoint.to_json()?);
    Ok(())
}
