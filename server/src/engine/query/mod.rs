/*
 * Created on Wed Mar 13 2024
 *
 * This file is a part of Strata
 * Strata is a free and open-source columnar analytical storage engine
 * written by Sayan Nandan ("the Author") with the vision to provide
 * fast, durable analytics over compressed column data without
 * compromising on operational simplicity.
 *
 * Copyright (c) 2024, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! Query lifecycle tracking. A [`Query`] is an immutable prefix (id,
//! definition, kind, submission time) plus a lock-guarded suffix that only
//! moves forward: `Submitted -> Running -> (Completed | Failed)`. The store is
//! the id-addressed registry the scheduler works against.

use {
    crate::engine::{
        data::{uuid::Uuid, ColumnData},
        error::ProblemReport,
    },
    chrono::{DateTime, Utc},
    parking_lot::RwLock,
    serde::Serialize,
    std::{collections::HashMap, sync::Arc},
    tokio::sync::Notify,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryKind {
    Select,
    Load,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryStatus {
    #[default]
    Submitted,
    Running,
    Completed,
    Failed,
}

impl QueryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// What the caller asked for. The variant decides the query kind: a
/// deletion is a DELETE, a named source without a destination is a SELECT,
/// everything else is a LOAD.
pub enum QueryDefinition {
    Select {
        table_name: String,
    },
    Load {
        destination_table_name: String,
        source_filepath: String,
        /// maps CSV column `i` to the named table column; empty means
        /// positional
        destination_columns: Vec<String>,
        csv_has_header: bool,
    },
    Delete {
        table_name: String,
    },
}

impl QueryDefinition {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Select { .. } => QueryKind::Select,
            Self::Load { .. } => QueryKind::Load,
            Self::Delete { .. } => QueryKind::Delete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A SELECT's full result: every column of the table, reassembled in column
/// order. All columns have exactly `row_count` values.
pub struct QueryResult {
    pub row_count: i32,
    pub columns: Vec<ColumnData>,
}

#[derive(Debug, Default)]
/// The mutable suffix of a query record
struct QueryVitals {
    status: QueryStatus,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<ProblemReport>,
    result: Option<QueryResult>,
    is_result_available: bool,
}

#[derive(Debug)]
/// One submitted query. The id, definition, kind and submission time never
/// change; everything else lives behind the record's own lock. `done` fires
/// once, when the record reaches a terminal state.
pub struct Query {
    id: Uuid,
    definition: QueryDefinition,
    kind: QueryKind,
    submitted_at: DateTime<Utc>,
    vitals: RwLock<QueryVitals>,
    done: Notify,
}

impl Query {
    fn new(definition: QueryDefinition) -> Self {
        let kind = definition.kind();
        Self {
            id: Uuid::new(),
            definition,
            kind,
            submitted_at: Utc::now(),
            vitals: RwLock::new(QueryVitals::default()),
            done: Notify::new(),
        }
    }
    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn definition(&self) -> &QueryDefinition {
        &self.definition
    }
    pub fn kind(&self) -> QueryKind {
        self.kind
    }
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

// thread-safe getters
impl Query {
    pub fn status(&self) -> QueryStatus {
        self.vitals.read().status
    }
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.vitals.read().started_at
    }
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.vitals.read().finished_at
    }
    pub fn is_result_available(&self) -> bool {
        self.vitals.read().is_result_available
    }
    pub fn error(&self) -> Option<ProblemReport> {
        self.vitals.read().error.clone()
    }
    pub fn result(&self) -> Option<QueryResult> {
        self.vitals.read().result.clone()
    }
}

// state transitions (strictly monotonic)
impl Query {
    /// `Submitted -> Running`
    pub fn set_running(&self, at: DateTime<Utc>) {
        let mut vitals = self.vitals.write();
        debug_assert_eq!(vitals.status, QueryStatus::Submitted, "illegal transition");
        vitals.status = QueryStatus::Running;
        vitals.started_at = Some(at);
    }
    /// `Running -> Completed`. The result is available iff this is a SELECT.
    pub fn set_completed(&self, at: DateTime<Utc>, result: Option<QueryResult>) {
        let mut vitals = self.vitals.write();
        debug_assert_eq!(vitals.status, QueryStatus::Running, "illegal transition");
        vitals.status = QueryStatus::Completed;
        vitals.finished_at = Some(at);
        vitals.is_result_available = self.kind == QueryKind::Select;
        vitals.result = result;
    }
    /// `Running -> Failed`
    pub fn set_failed(&self, at: DateTime<Utc>, error: ProblemReport) {
        let mut vitals = self.vitals.write();
        debug_assert_eq!(vitals.status, QueryStatus::Running, "illegal transition");
        vitals.status = QueryStatus::Failed;
        vitals.finished_at = Some(at);
        vitals.error = Some(error);
    }
    /// Drop a fetched result. Idempotent; only ever invoked explicitly.
    pub fn clear_result(&self) {
        let mut vitals = self.vitals.write();
        vitals.is_result_available = false;
        vitals.result = None;
    }
    /// Fire the one-shot done signal. Called by the worker after the
    /// terminal transition.
    pub(crate) fn signal_done(&self) {
        self.done.notify_waiters();
    }
    /// Block until the query reaches a terminal state
    pub async fn wait_complete(&self) {
        let notified = self.done.notified();
        tokio::pin!(notified);
        loop {
            notified.as_mut().enable();
            if self.status().is_terminal() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.done.notified());
        }
    }
}

#[derive(Debug, Clone, Serialize)]
/// The lightweight listing view of a query
pub struct QuerySummary {
    pub query_id: Uuid,
    pub status: QueryStatus,
}

#[derive(Debug, Default)]
/// The in-memory registry of all submitted queries
pub struct QueryStore {
    queries: RwLock<HashMap<Uuid, Arc<Query>>>,
}

impl QueryStore {
    pub fn new() -> Self {
        Self::default()
    }
    /// Register a new query and return its record
    pub fn add(&self, definition: QueryDefinition) -> Arc<Query> {
        let query = Arc::new(Query::new(definition));
        self.queries.write().insert(query.id(), query.clone());
        query
    }
    pub fn get(&self, id: &Uuid) -> Option<Arc<Query>> {
        self.queries.read().get(id).cloned()
    }
    /// Shallow summaries of every known query, oldest first
    pub fn list(&self) -> Vec<QuerySummary> {
        let queries = self.queries.read();
        let mut entries: Vec<(&Arc<Query>, DateTime<Utc>)> =
            queries.values().map(|q| (q, q.submitted_at())).collect();
        entries.sort_by_key(|(_, at)| *at);
        entries
            .into_iter()
            .map(|(q, _)| QuerySummary {
                query_id: q.id(),
                status: q.status(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{QueryDefinition, QueryKind, QueryResult, QueryStatus, QueryStore},
        crate::engine::{data::ColumnData, error::ProblemReport, error::Error},
        chrono::Utc,
        std::{sync::Arc, time::Duration},
    };

    fn select_def() -> QueryDefinition {
        QueryDefinition::Select {
            table_name: "t".to_owned(),
        }
    }

    #[test]
    fn kind_selection() {
        assert_eq!(select_def().kind(), QueryKind::Select);
        assert_eq!(
            QueryDefinition::Delete {
                table_name: "t".to_owned()
            }
            .kind(),
            QueryKind::Delete
        );
        assert_eq!(
            QueryDefinition::Load {
                destination_table_name: "t".to_owned(),
                source_filepath: "rows.csv".to_owned(),
                destination_columns: vec![],
                csv_has_header: true,
            }
            .kind(),
            QueryKind::Load
        );
    }

    #[test]
    fn lifecycle_select() {
        let store = QueryStore::new();
        let query = store.add(select_def());
        assert_eq!(query.status(), QueryStatus::Submitted);
        assert!(store.get(&query.id()).is_some());
        query.set_running(Utc::now());
        assert_eq!(query.status(), QueryStatus::Running);
        assert!(query.started_at().is_some());
        assert!(query.finished_at().is_none());
        let result = QueryResult {
            row_count: 1,
            columns: vec![ColumnData::Int(vec![42])],
        };
        query.set_completed(Utc::now(), Some(result.clone()));
        assert_eq!(query.status(), QueryStatus::Completed);
        assert!(query.is_result_available());
        assert_eq!(query.result(), Some(result));
        // clearing is explicit and idempotent
        query.clear_result();
        query.clear_result();
        assert!(!query.is_result_available());
        assert!(query.result().is_none());
    }

    #[test]
    fn lifecycle_failed_load() {
        let store = QueryStore::new();
        let query = store.add(QueryDefinition::Load {
            destination_table_name: "t".to_owned(),
            source_filepath: "rows.csv".to_owned(),
            destination_columns: vec![],
            csv_has_header: false,
        });
        query.set_running(Utc::now());
        query.set_failed(
            Utc::now(),
            ProblemReport::from_error(&Error::NotFound("t".to_owned())),
        );
        assert_eq!(query.status(), QueryStatus::Failed);
        assert!(!query.is_result_available());
        assert_eq!(query.error().unwrap().problems[0].error, "not found: t");
    }

    #[test]
    fn completed_load_has_no_result() {
        let store = QueryStore::new();
        let query = store.add(QueryDefinition::Load {
            destination_table_name: "t".to_owned(),
            source_filepath: "rows.csv".to_owned(),
            destination_columns: vec![],
            csv_has_header: false,
        });
        query.set_running(Utc::now());
        query.set_completed(Utc::now(), None);
        assert!(!query.is_result_available());
        assert!(query.result().is_none());
    }

    #[test]
    fn listing_is_submission_ordered() {
        let store = QueryStore::new();
        let a = store.add(select_def());
        std::thread::sleep(Duration::from_millis(2));
        let b = store.add(select_def());
        let ids: Vec<_> = store.list().into_iter().map(|s| s.query_id).collect();
        assert_eq!(ids, vec![a.id(), b.id()]);
    }

    #[tokio::test]
    async fn wait_complete_wakes_on_terminal() {
        let store = QueryStore::new();
        let query = store.add(select_def());
        let waiter = {
            let query = Arc::clone(&query);
            tokio::spawn(async move {
                query.wait_complete().await;
                query.status()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        query.set_running(Utc::now());
        query.set_completed(Utc::now(), None);
        query.signal_done();
        let status = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status, QueryStatus::Completed);
    }

    #[tokio::test]
    async fn wait_complete_returns_immediately_when_already_done() {
        let store = QueryStore::new();
        let query = store.add(select_def());
        query.set_running(Utc::now());
        query.set_completed(Utc::now(), None);
        query.signal_done();
        tokio::time::timeout(Duration::from_secs(1), query.wait_complete())
            .await
            .unwrap();
    }
}
