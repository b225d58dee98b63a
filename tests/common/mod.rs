//! Shared test executor: a scripted `SqlExecutor` that records every
//! statement and parameter list, and replays queued replies in order.

#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use vgraph::{Error, Result, SqlExecutor, SqlRow, Value};

/// One scripted reply.
pub enum Reply {
    Rows(Vec<SqlRow>),
    Count(u64),
    Fail(Error),
}

/// Scripted executor. Every `query`/`execute` pops the next reply; an
/// empty script answers with no rows / zero affected. Batches are recorded
/// whole, mirroring their all-or-nothing contract.
#[derive(Default)]
pub struct FakeExecutor {
    script: Mutex<VecDeque<Reply>>,
    statements: Mutex<Vec<(String, Vec<Value>)>>,
    batches: Mutex<Vec<Vec<(String, Vec<Value>)>>>,
    delay_ms: Mutex<Option<u64>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&self, rows: Vec<SqlRow>) {
        self.script.lock().push_back(Reply::Rows(rows));
    }

    pub fn push_count(&self, count: u64) {
        self.script.lock().push_back(Reply::Count(count));
    }

    pub fn push_fail(&self, error: Error) {
        self.script.lock().push_back(Reply::Fail(error));
    }

    /// Make every call sleep first, for deadline tests.
    pub fn set_delay_ms(&self, ms: u64) {
        *self.delay_ms.lock() = Some(ms);
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.lock().clone()
    }

    pub fn batches(&self) -> Vec<Vec<(String, Vec<Value>)>> {
        self.batches.lock().clone()
    }

    async fn maybe_delay(&self) {
        let delay = *self.delay_ms.lock();
        if let Some(ms) = delay {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }
    }

    fn pop(&self) -> Option<Reply> {
        self.script.lock().pop_front()
    }
}

#[async_trait]
impl SqlExecutor for FakeExecutor {
    async fn query(&self, statement: &str, params: &[Value]) -> Result<Vec<SqlRow>> {
        self.maybe_delay().await;
        self.statements.lock().push((statement.to_string(), params.to_vec()));
        match self.pop() {
            None | Some(Reply::Count(_)) => Ok(Vec::new()),
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail(e)) => Err(e),
        }
    }

    async fn execute(&self, statement: &str, params: &[Value]) -> Result<u64> {
        self.maybe_delay().await;
        self.statements.lock().push((statement.to_string(), params.to_vec()));
        match self.pop() {
            None | Some(Reply::Rows(_)) => Ok(0),
            Some(Reply::Count(n)) => Ok(n),
            Some(Reply::Fail(e)) => Err(e),
        }
    }

    async fn execute_batch(&self, statements: &[(String, Vec<Value>)]) -> Result<()> {
        self.maybe_delay().await;
        self.batches.lock().push(statements.to_vec());
        match self.pop() {
            None | Some(Reply::Rows(_)) | Some(Reply::Count(_)) => Ok(()),
            Some(Reply::Fail(e)) => Err(e),
        }
    }
}

/// Row helper: build a `SqlRow` from convertible values.
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        vec![$(vgraph::Value::from($value)),*]
    };
}
