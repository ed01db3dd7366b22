//! L4 — per-statement receive state machine (spec.md §4.2).

pub mod column;
pub mod row;

use crate::error::{Error, Result as CrateResult};
use crate::proto::codec::Envelope;
use crate::result::column::ColumnMetadata;
use crate::result::row::Row;
use crate::session::notice::{self, NoticeEffect, Warning};
use crate::wire::frame::FrameTransport;
use std::cell::{Cell, RefCell};
use std::io::{Read, Write};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// spec.md §4.2 "States".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    AwaitMetadataInitial,
    AwaitMetadata,
    AwaitRows,
    /// A `fetch-done-more-resultsets` arrived: the current set is fully
    /// drained and another follows, but its column metadata hasn't been
    /// read yet. Distinct from `AwaitMetadata` so `next()` has somewhere
    /// to stop at the boundary instead of silently flowing into the next
    /// set's rows; `next_result_set` is what crosses it.
    AwaitNextMetadata,
    AwaitExecOkInitial,
    AwaitExecOk,
    Error,
    Done,
}

/// Whether a freshly-submitted statement starts out row-returning or not
/// (spec.md §4.2 "Initial state").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialShape {
    MayReturnRows,
    ExecOnly,
}

impl InitialShape {
    fn initial_state(self) -> State {
        match self {
            InitialShape::MayReturnRows => State::AwaitMetadataInitial,
            InitialShape::ExecOnly => State::AwaitExecOkInitial,
        }
    }
}

/// A per-statement result stream (spec.md §3 "Result"). Generic over the
/// transport stream type, mirroring [`FrameTransport`].
pub struct ResultStream<S> {
    transport: Rc<RefCell<FrameTransport<S>>>,
    trace: bool,
    account_expired: Rc<Cell<bool>>,

    state: State,
    columns: Arc<Vec<ColumnMetadata>>,
    rows: Vec<Row>,
    cursor: usize,

    last_insert_id: i64,
    affected_items: i64,
    info: Option<String>,
    warnings: Vec<Warning>,
    server_error: Option<Error>,

    started_at: Instant,
    execution_time: Option<Duration>,
}

impl<S: Read + Write> ResultStream<S> {
    pub fn new(
        transport: Rc<RefCell<FrameTransport<S>>>,
        shape: InitialShape,
        trace: bool,
        account_expired: Rc<Cell<bool>>,
    ) -> Self {
        Self {
            transport,
            trace,
            account_expired,
            state: shape.initial_state(),
            columns: Arc::new(Vec::new()),
            rows: Vec::new(),
            cursor: 0,
            last_insert_id: -1,
            affected_items: -1,
            info: None,
            warnings: Vec::new(),
            server_error: None,
            started_at: Instant::now(),
            execution_time: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn column_metadata(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn affected_items(&self) -> i64 {
        self.affected_items
    }

    pub fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    pub fn execution_time(&self) -> Option<Duration> {
        self.execution_time
    }

    /// Whether this statement ever produced column metadata, i.e. was a
    /// row-returning statement rather than a pure DML/DDL execution.
    pub fn has_data(&self) -> bool {
        matches!(
            self.state,
            State::AwaitMetadata | State::AwaitRows | State::AwaitNextMetadata
        ) || !self.columns.is_empty()
    }

    /// The error that moved this result into the `error` state, if any.
    pub fn server_error(&self) -> Option<&Error> {
        self.server_error.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, State::Done | State::Error)
    }

    /// Drives the state machine forward until a row is produced, a
    /// terminal state is reached, or a result-set boundary is reached
    /// (spec.md §4.2 "Streaming"). Stops at `await-next-metadata` rather
    /// than crossing transparently into the next set's rows — crossing
    /// that boundary is `next_result_set`'s job.
    pub fn next(&mut self) -> CrateResult<Option<Row>> {
        loop {
            if self.cursor < self.rows.len() {
                let row = self.rows[self.cursor].clone();
                self.cursor += 1;
                return Ok(Some(row));
            }
            if self.is_terminal() || self.state == State::AwaitNextMetadata {
                return Ok(None);
            }
            self.pump()?;
        }
    }

    /// Drains all remaining rows of the current result set into the
    /// buffer (or every remaining result set if `all_result_sets`),
    /// leaving the state machine at `done` or `await-metadata` for a
    /// partially-drained multi-resultset pre-fetch (spec.md §4.2
    /// "Pre-fetch").
    pub fn buffer(&mut self, all_result_sets: bool) -> CrateResult<()> {
        loop {
            while self.next()?.is_some() {}
            if !all_result_sets || !self.next_result_set()? {
                return Ok(());
            }
        }
    }

    /// Resets iteration to the start of the already-materialized buffer
    /// (spec.md §6 `Result.rewind()`). Does not re-fetch from the wire.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Drains whatever the caller hasn't yet consumed from the current
    /// set, then — if a `fetch-done-more-resultsets` was seen — resets
    /// the column/row buffers and reads the next set's metadata (spec.md
    /// §4.2 "Multi-result-set traversal"). Returns `false` without
    /// resetting anything if there is no further set.
    pub fn next_result_set(&mut self) -> CrateResult<bool> {
        while self.next()?.is_some() {}
        if self.state != State::AwaitNextMetadata {
            return Ok(false);
        }
        self.columns = Arc::new(Vec::new());
        self.rows.clear();
        self.cursor = 0;
        while !self.is_terminal() && self.state == State::AwaitNextMetadata {
            self.pump()?;
        }
        Ok(self.state == State::AwaitMetadata)
    }

    fn pump(&mut self) -> CrateResult<()> {
        let envelope = self.read_non_notice_envelope()?;
        self.apply(envelope)
    }

    /// Reads frames, applying notice side effects transparently, until a
    /// non-notice frame arrives (spec.md §5 "Ordering").
    fn read_non_notice_envelope(&mut self) -> CrateResult<Envelope> {
        loop {
            let (kind, payload) = self.transport.borrow_mut().read_frame()?;
            let envelope = crate::proto::codec::decode_frame(kind, &payload, self.trace)?;
            if let Envelope::Notice(frame) = envelope {
                self.dispatch_notice(frame)?;
                continue;
            }
            return Ok(envelope);
        }
    }

    fn dispatch_notice(&mut self, frame: crate::proto::messages::Frame) -> CrateResult<()> {
        match notice::interpret(frame)? {
            NoticeEffect::Warning(w) => self.warnings.push(w),
            NoticeEffect::AccountExpired => self.account_expired.set(true),
            NoticeEffect::SessionVariableChanged { .. } | NoticeEffect::Unhandled(_) => {
                // No builtin action; a host binding may install its own
                // handler ahead of the session (spec.md §4.2).
            }
        }
        Ok(())
    }

    fn apply(&mut self, envelope: Envelope) -> CrateResult<()> {
        use State::*;
        match (self.state, envelope) {
            (AwaitMetadataInitial | AwaitMetadata | AwaitNextMetadata, Envelope::ColumnMetaData(col)) => {
                let mut cols = (*self.columns).clone();
                cols.push(col.try_into()?);
                self.columns = Arc::new(cols);
                self.state = AwaitMetadata;
                Ok(())
            }
            (AwaitMetadata, Envelope::Row(row)) => {
                self.state = AwaitRows;
                self.push_row(row);
                Ok(())
            }
            (AwaitMetadata, Envelope::FetchDone(_)) => {
                self.state = AwaitExecOk;
                Ok(())
            }
            (AwaitRows, Envelope::Row(row)) => {
                self.push_row(row);
                Ok(())
            }
            (AwaitRows, Envelope::FetchDone(_)) => {
                self.state = AwaitExecOk;
                Ok(())
            }
            (AwaitRows, Envelope::FetchDoneMoreResultsets(_)) => {
                // Column/row reset is deferred to `next_result_set` so the
                // just-finished set's rows stay readable at the boundary
                // instead of being discarded before the caller sees them.
                self.state = AwaitNextMetadata;
                Ok(())
            }
            (AwaitMetadataInitial | AwaitExecOkInitial | AwaitExecOk, Envelope::StmtExecuteOk(ok)) => {
                self.last_insert_id = ok.last_insert_id.map(|v| v as i64).unwrap_or(-1);
                self.affected_items = ok.rows_affected.map(|v| v as i64).unwrap_or(-1);
                self.finish();
                Ok(())
            }
            (_, Envelope::Error(e)) => {
                let err = Error::from_server_error(e.code, e.sql_state.clone(), e.msg.clone());
                self.server_error = Some(Error::from_server_error(e.code, e.sql_state, e.msg));
                self.state = Error;
                Err(err)
            }
            (state, other) => Err(Error::ProtocolViolation {
                kind: format!("{:?}", other.kind()),
                state: format!("{state:?}"),
            }),
        }
    }

    fn push_row(&mut self, row: crate::proto::messages::Row) {
        self.rows.push(Row::new(self.columns.clone(), row.field));
    }

    fn finish(&mut self) {
        self.state = State::Done;
        self.execution_time = Some(self.started_at.elapsed());
    }
}

/// Shared handle to a [`ResultStream`] (spec.md §3 "Result" ownership note:
/// the session keeps a *weak*, non-owning reference to the previously
/// issued Result). Cloning a handle shares the same underlying stream.
pub struct ResultHandle<S> {
    inner: Rc<RefCell<ResultStream<S>>>,
}

impl<S> Clone for ResultHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Read + Write> ResultHandle<S> {
    pub(crate) fn new(stream: ResultStream<S>) -> (Self, std::rc::Weak<RefCell<ResultStream<S>>>) {
        let inner = Rc::new(RefCell::new(stream));
        let weak = Rc::downgrade(&inner);
        (Self { inner }, weak)
    }

    pub fn next(&self) -> CrateResult<Option<Row>> {
        self.inner.borrow_mut().next()
    }

    pub fn buffer(&self, all_result_sets: bool) -> CrateResult<()> {
        self.inner.borrow_mut().buffer(all_result_sets)
    }

    pub fn next_result_set(&self) -> CrateResult<bool> {
        self.inner.borrow_mut().next_result_set()
    }

    pub fn rewind(&self) {
        self.inner.borrow_mut().rewind();
    }

    pub fn fetch_one(&self) -> CrateResult<Option<Row>> {
        self.next()
    }

    pub fn fetch_all(&self) -> CrateResult<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next()? {
            rows.push(row);
        }
        Ok(rows)
    }

    pub fn column_metadata(&self) -> Arc<Vec<ColumnMetadata>> {
        self.inner.borrow().columns.clone()
    }

    pub fn affected_items(&self) -> i64 {
        self.inner.borrow().affected_items()
    }

    pub fn last_insert_id(&self) -> i64 {
        self.inner.borrow().last_insert_id()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.inner.borrow().warnings().to_vec()
    }

    pub fn execution_time(&self) -> Option<Duration> {
        self.inner.borrow().execution_time()
    }

    pub fn has_data(&self) -> bool {
        self.inner.borrow().has_data()
    }

    pub fn is_live(&self) -> bool {
        !self.inner.borrow().is_terminal()
    }

    pub fn server_error(&self) -> Option<Error> {
        self.inner.borrow().server_error().cloned()
    }
}
