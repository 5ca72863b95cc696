//! High-level engine over a session.
//!
//! [`SweepEngine`] is the one place the compiled query, the ingested
//! UID set, and the orchestrator meet the external session: select a
//! mailbox, search it, then fetch or store in resilient batches. The
//! engine tracks the selected mailbox so every UID set it hands out is
//! scoped correctly, and refuses to run a set against the wrong
//! mailbox.

use tracing::debug;

use mailsweep_imap::{Criteria, CriteriaCompiler, Flag, Mailbox, UidSet};

use crate::error::{Error, Result};
use crate::orchestrator::{BulkOrchestrator, OperationReport};
use crate::session::{FetchPart, FlagOp, MailSession, MessageRecord};
use crate::time::{Clock, SystemClock};

/// High-level facade: select → search → batched fetch/store.
pub struct SweepEngine<S: MailSession, C: Clock = SystemClock> {
    session: S,
    orchestrator: BulkOrchestrator<C>,
    compiler: CriteriaCompiler,
    selected: Option<Mailbox>,
}

impl<S: MailSession, C: Clock> SweepEngine<S, C> {
    /// Creates an engine around a session and an orchestrator.
    #[must_use]
    pub fn new(session: S, orchestrator: BulkOrchestrator<C>) -> Self {
        Self {
            session,
            orchestrator,
            compiler: CriteriaCompiler::new(),
            selected: None,
        }
    }

    /// Replaces the criteria compiler (e.g. to lower the depth limit).
    #[must_use]
    pub fn compiler(mut self, compiler: CriteriaCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// The currently selected mailbox, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<&Mailbox> {
        self.selected.as_ref()
    }

    /// Consumes the engine, returning the underlying session.
    pub fn into_session(self) -> S {
        self.session
    }

    /// Selects a mailbox, re-scoping all subsequent UID sets.
    ///
    /// # Errors
    ///
    /// Propagates the session failure; the previous selection is
    /// considered lost either way.
    pub async fn select(&mut self, mailbox: Mailbox) -> Result<()> {
        // Selection state changes server-side even on failure paths, so
        // drop our notion of it before the call.
        self.selected = None;
        self.session.select(&mailbox).await?;
        debug!(mailbox = %mailbox, "mailbox selected");
        self.selected = Some(mailbox);
        Ok(())
    }

    /// Compiles the criteria, runs the search, and ingests the result
    /// into a [`UidSet`] scoped to the selected mailbox.
    ///
    /// # Errors
    ///
    /// Compilation errors surface immediately (caller bug); session
    /// failures propagate classified.
    pub async fn search(&mut self, criteria: &Criteria) -> Result<UidSet> {
        let mailbox = self.selected.clone().ok_or(Error::NoMailboxSelected)?;
        let query = self.compiler.compile(criteria)?;
        debug!(mailbox = %mailbox, query, "executing search");
        let uids = self.session.search(&query).await?;
        Ok(UidSet::from_uids(mailbox, uids))
    }

    /// Applies a flag mutation to every message in `uids`, in batches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextMismatch`] if the set is scoped to a
    /// mailbox other than the selected one. Batch-level failures are in
    /// the report, not in `Err`.
    pub async fn store_batched(
        &mut self,
        uids: &UidSet,
        op: FlagOp,
        flags: &[Flag],
    ) -> Result<OperationReport> {
        self.check_context(uids)?;
        let Self {
            session,
            orchestrator,
            ..
        } = self;
        orchestrator
            .execute(uids, "store", async |batch: &UidSet| {
                session.store(batch, op, flags).await.map(|()| batch.len())
            })
            .await
    }

    /// Fetches the given parts for every message in `uids`, in batches.
    ///
    /// Records from successful batches are returned alongside the
    /// report; failed batches simply contribute no records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextMismatch`] if the set is scoped to a
    /// mailbox other than the selected one.
    pub async fn fetch_batched(
        &mut self,
        uids: &UidSet,
        parts: &[FetchPart],
    ) -> Result<(Vec<MessageRecord>, OperationReport)> {
        self.check_context(uids)?;
        let mut records = Vec::new();
        let Self {
            session,
            orchestrator,
            ..
        } = self;
        let report = orchestrator
            .execute(uids, "fetch", async |batch: &UidSet| {
                let fetched = session.fetch(batch, parts).await?;
                #[allow(clippy::cast_possible_truncation)]
                let count = fetched.len() as u64;
                records.extend(fetched);
                Ok(count)
            })
            .await?;
        Ok((records, report))
    }

    /// The full pipeline: search the selected mailbox, then fetch the
    /// matches in resilient batches.
    ///
    /// # Errors
    ///
    /// See [`SweepEngine::search`] and [`SweepEngine::fetch_batched`].
    pub async fn search_and_fetch(
        &mut self,
        criteria: &Criteria,
        parts: &[FetchPart],
    ) -> Result<(Vec<MessageRecord>, OperationReport)> {
        let uids = self.search(criteria).await?;
        self.fetch_batched(&uids, parts).await
    }

    fn check_context(&self, uids: &UidSet) -> Result<()> {
        match &self.selected {
            None => Err(Error::NoMailboxSelected),
            Some(selected) if selected == uids.mailbox() => Ok(()),
            Some(selected) => Err(Error::ContextMismatch {
                set: uids.mailbox().as_str().to_string(),
                selected: selected.as_str().to_string(),
            }),
        }
    }
}
