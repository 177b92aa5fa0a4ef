//! Simulated network: submitter, verifier and read accessor in one.

use crate::script::ScriptCursor;
use crate::{SimStorage, StatusScript};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tableflow_core::{
    NetworkSubmitter, OperationStatus, ReadAccessor, ReadError, SubmissionReceipt, SubmitError,
    Verifier, VerifierError,
};
use tableflow_types::{
    ColumnSpec, ContextId, Identity, OperationHandle, OperationKind, Param, ResourceId, Row,
    Statement,
};
use tracing::debug;

type SchemaNormalizer = Arc<dyn Fn(Vec<ColumnSpec>) -> Vec<ColumnSpec> + Send + Sync>;

/// In-memory network for a single context.
///
/// Cheap to clone; clones share state, so a test can keep one clone for
/// assertions while the code under test owns another.
#[derive(Clone)]
pub struct SimulatedNetwork {
    context: ContextId,
    state: Arc<Mutex<NetworkState>>,
}

struct NetworkState {
    storage: SimStorage,
    operations: HashMap<OperationHandle, ScriptCursor>,
    default_script: StatusScript,
    next_scripts: VecDeque<StatusScript>,
    next_submit_failure: Option<SubmitError>,
    status_latency: Option<Duration>,
    schema_normalizer: Option<SchemaNormalizer>,
    block_height: u64,
    nonce: u64,
    submissions: usize,
    read_queries: usize,
}

impl SimulatedNetwork {
    /// An empty network for `context`.
    pub fn new(context: ContextId) -> Self {
        Self {
            context,
            state: Arc::new(Mutex::new(NetworkState {
                storage: SimStorage::new(context),
                operations: HashMap::new(),
                default_script: StatusScript::default(),
                next_scripts: VecDeque::new(),
                next_submit_failure: None,
                status_latency: None,
                schema_normalizer: None,
                block_height: 0,
                nonce: 0,
                submissions: 0,
                read_queries: 0,
            })),
        }
    }

    /// The network's context.
    pub fn context(&self) -> ContextId {
        self.context
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Scripting
    // ═══════════════════════════════════════════════════════════════════════

    /// Script used for submissions without a queued script.
    pub fn set_default_script(&self, script: StatusScript) {
        self.state.lock().default_script = script;
    }

    /// Script for the next submission only. Queued scripts are used in order.
    pub fn push_script(&self, script: StatusScript) {
        self.state.lock().next_scripts.push_back(script);
    }

    /// Make the next submission fail as declined by the signer.
    pub fn decline_next_submission(&self, reason: impl Into<String>) {
        self.state.lock().next_submit_failure = Some(SubmitError::RejectedBySigner(reason.into()));
    }

    /// Make the next submission fail in transit.
    pub fn fail_next_submission(&self, reason: impl Into<String>) {
        self.state.lock().next_submit_failure = Some(SubmitError::Transport(reason.into()));
    }

    /// Delay every status answer by `latency`.
    pub fn set_status_latency(&self, latency: Duration) {
        self.state.lock().status_latency = Some(latency);
    }

    /// Rewrite declared schemas at create time, the way a real network may
    /// normalize types or drop unsupported columns.
    pub fn set_schema_normalizer(
        &self,
        normalizer: impl Fn(Vec<ColumnSpec>) -> Vec<ColumnSpec> + Send + Sync + 'static,
    ) {
        self.state.lock().schema_normalizer = Some(Arc::new(normalizer));
    }

    /// Register an operation with no effect, for polling tests.
    pub fn register_operation(&self, script: StatusScript) -> OperationHandle {
        let mut state = self.state.lock();
        let (handle, block) = state.next_handle(self.context, b"registered");
        state
            .operations
            .insert(handle.clone(), ScriptCursor::new(script, block));
        handle
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Direct state access
    // ═══════════════════════════════════════════════════════════════════════

    /// Create a table immediately, bypassing submission. Returns its name.
    pub fn create_table_now(&self, prefix: &str, schema: Vec<ColumnSpec>) -> String {
        self.state
            .lock()
            .storage
            .create_table(prefix, schema)
            .name
            .clone()
    }

    /// Insert a row immediately, bypassing submission. Returns its id.
    pub fn insert_row_now(&self, table: &str, name: &str) -> Result<i64, String> {
        let mut state = self.state.lock();
        let (handle, block) = state.next_handle(self.context, name.as_bytes());
        state
            .storage
            .insert_row(table, name, block, handle.as_str())
    }

    /// Rows currently stored in `table`.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .storage
            .table(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Number of tables.
    pub fn table_count(&self) -> usize {
        self.state.lock().storage.len()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Counters
    // ═══════════════════════════════════════════════════════════════════════

    /// Accepted submissions.
    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    /// Status queries answered for `handle`, including failed ones.
    pub fn status_queries(&self, handle: &OperationHandle) -> usize {
        self.state
            .lock()
            .operations
            .get(handle)
            .map(ScriptCursor::queries)
            .unwrap_or(0)
    }

    /// Read queries served.
    pub fn read_queries(&self) -> usize {
        self.state.lock().read_queries
    }
}

impl NetworkState {
    fn next_handle(&mut self, context: ContextId, salt: &[u8]) -> (OperationHandle, u64) {
        self.nonce += 1;
        self.block_height += 1;
        let handle = OperationHandle::from_parts(&[
            b"tableflow-sim",
            &context.get().to_le_bytes(),
            &self.nonce.to_le_bytes(),
            salt,
        ]);
        (handle, self.block_height)
    }

    fn apply_create(
        &mut self,
        context: ContextId,
        sql: &str,
        script: &mut StatusScript,
    ) -> Result<String, SubmitError> {
        let (prefix, columns) = parse_create(sql)
            .ok_or_else(|| SubmitError::Transport(format!("malformed create: {sql}")))?;

        if script.succeeds() {
            let schema = match &self.schema_normalizer {
                Some(normalize) => normalize(columns),
                None => columns,
            };
            let id = self.storage.create_table(&prefix, schema).id;
            script.resource_id.get_or_insert(id);
        }

        Ok(format!("{prefix}_{context}"))
    }

    fn apply_write(
        &mut self,
        sql: &str,
        params: &[Param],
        handle: &OperationHandle,
        block: u64,
        script: &mut StatusScript,
    ) -> Result<String, SubmitError> {
        let table = write_target(sql)
            .ok_or_else(|| SubmitError::Transport(format!("malformed write: {sql}")))?;

        let is_insert = sql
            .trim_start()
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("insert"));

        if script.succeeds() {
            let result = if is_insert {
                let name = inserted_name(sql, params);
                self.storage
                    .insert_row(&table, &name, block, handle.as_str())
                    .map(|_| ())
            } else if self.storage.contains(&table) {
                Ok(())
            } else {
                Err(format!("no such table: {table}"))
            };

            if let Err(error) = result {
                script.outcome = Some(Err(error));
            }
        }

        Ok(table)
    }
}

#[async_trait]
impl NetworkSubmitter for SimulatedNetwork {
    async fn submit(
        &self,
        identity: &Identity,
        context: ContextId,
        statement: &Statement,
        params: &[Param],
    ) -> Result<SubmissionReceipt, SubmitError> {
        let mut state = self.state.lock();

        if let Some(err) = state.next_submit_failure.take() {
            return Err(err);
        }
        if context != self.context {
            return Err(SubmitError::Transport(format!(
                "submitted to context {context} but network is {}",
                self.context
            )));
        }

        let (handle, block) = state.next_handle(context, statement.sql().as_bytes());
        let mut script = state
            .next_scripts
            .pop_front()
            .unwrap_or_else(|| state.default_script.clone());

        let provisional_name = match statement.kind() {
            OperationKind::Create => state.apply_create(context, statement.sql(), &mut script)?,
            OperationKind::Write => {
                state.apply_write(statement.sql(), params, &handle, block, &mut script)?
            }
        };

        debug!(
            handle = %handle,
            signer = %identity,
            block,
            kind = %statement.kind(),
            "Simulated submission accepted"
        );

        state
            .operations
            .insert(handle.clone(), ScriptCursor::new(script, block));
        state.submissions += 1;

        Ok(SubmissionReceipt {
            handle,
            provisional_name,
        })
    }
}

#[async_trait]
impl Verifier for SimulatedNetwork {
    async fn status(
        &self,
        context: ContextId,
        handle: &OperationHandle,
    ) -> Result<OperationStatus, VerifierError> {
        let latency = self.state.lock().status_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        if context != self.context {
            return Ok(OperationStatus::unseen());
        }
        match state.operations.get_mut(handle) {
            Some(cursor) => cursor.next(),
            None => Ok(OperationStatus::unseen()),
        }
    }

    async fn resource_schema(
        &self,
        context: ContextId,
        resource: ResourceId,
    ) -> Result<Vec<ColumnSpec>, VerifierError> {
        let state = self.state.lock();
        if context != self.context {
            return Err(VerifierError::NotFound(format!(
                "table {resource} on context {context}"
            )));
        }
        state
            .storage
            .table_by_id(resource)
            .map(|t| t.schema.clone())
            .ok_or_else(|| VerifierError::NotFound(format!("table {resource} on context {context}")))
    }
}

#[async_trait]
impl ReadAccessor for SimulatedNetwork {
    async fn query(
        &self,
        context: ContextId,
        resource_name: &str,
        select: &str,
    ) -> Result<Vec<Row>, ReadError> {
        let mut state = self.state.lock();
        state.read_queries += 1;

        let table = state
            .storage
            .table(resource_name)
            .filter(|_| context == self.context)
            .ok_or_else(|| ReadError::Transport(format!("no such table: {resource_name}")))?;

        let mut rows = table.rows.clone();
        if let Some(limit) = select_limit(select) {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}

/// `CREATE TABLE name (col type constraints, ...)` → (name, columns).
fn parse_create(sql: &str) -> Option<(String, Vec<ColumnSpec>)> {
    let open = sql.find('(')?;
    let close = sql.rfind(')')?;
    if close <= open {
        return None;
    }

    let head: Vec<&str> = sql[..open].split_whitespace().collect();
    if head.len() < 3 {
        return None;
    }
    let prefix = head[head.len() - 1].trim_matches(|c| c == '"' || c == '`');

    let columns = sql[open + 1..close]
        .split(',')
        .filter_map(parse_column)
        .collect();
    Some((prefix.to_string(), columns))
}

fn parse_column(def: &str) -> Option<ColumnSpec> {
    let mut parts = def.split_whitespace();
    let column = ColumnSpec::new(parts.next()?, parts.next()?);
    let rest: Vec<&str> = parts.collect();
    Some(if rest.is_empty() {
        column
    } else {
        column.with_constraints(rest.join(" "))
    })
}

/// Table named after `INTO`, `UPDATE` or `FROM`.
fn write_target(sql: &str) -> Option<String> {
    let tokens: Vec<&str> = sql.split_whitespace().collect();
    let at = tokens.iter().position(|t| {
        t.eq_ignore_ascii_case("into") || t.eq_ignore_ascii_case("update") || t.eq_ignore_ascii_case("from")
    })?;
    tokens
        .get(at + 1)
        .map(|t| t.split('(').next().unwrap_or(t).trim_matches('"').to_string())
        .filter(|t| !t.is_empty())
}

/// The demo `name` column: first bound text parameter, else the first
/// literal in `VALUES (...)`.
fn inserted_name(sql: &str, params: &[Param]) -> String {
    if let Some(Param::Text(name)) = params.first() {
        return name.clone();
    }

    let lower = sql.to_ascii_lowercase();
    lower
        .find("values")
        .and_then(|at| sql[at..].find('(').map(|open| at + open + 1))
        .and_then(|start| sql[start..].split(',').next())
        .map(|first| first.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .unwrap_or_default()
}

/// Trailing `LIMIT n`, if any.
fn select_limit(select: &str) -> Option<usize> {
    let tokens: Vec<&str> = select.split_whitespace().collect();
    let at = tokens
        .iter()
        .rposition(|t| t.eq_ignore_ascii_case("limit"))?;
    tokens.get(at + 1)?.parse().ok()
}
