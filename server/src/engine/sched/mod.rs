/*
 * Created on Mon Mar 18 2024
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

//! The query scheduler: a fixed pool of workers consuming query ids from a
//! bounded FIFO queue. Queries start in submission order; they may complete
//! in any order depending on kind and per-table lock contention. Stopping
//! closes the queue: workers drain whatever is already enqueued, finish
//! their in-flight query and exit; later submissions are silently dropped.

mod exec;
mod ingest;

use {
    crate::engine::{
        config::Configuration, core::Metastore, data::uuid::Uuid, query::QueryStore,
    },
    parking_lot::{Mutex, RwLock},
    std::sync::Arc,
    tokio::{
        sync::mpsc::{self, Receiver, Sender},
        task::JoinHandle,
    },
};

/// Everything a worker needs to run a query
struct ExecContext {
    metastore: Arc<Metastore>,
    queries: Arc<QueryStore>,
    batch_size: usize,
}

/// The query execution service
pub struct QueryScheduler {
    ctx: Arc<ExecContext>,
    num_workers: usize,
    queue_capacity: usize,
    queue: RwLock<Option<Sender<Uuid>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl QueryScheduler {
    pub fn new(
        metastore: Arc<Metastore>,
        queries: Arc<QueryStore>,
        config: &Configuration,
    ) -> Self {
        Self {
            ctx: Arc::new(ExecContext {
                metastore,
                queries,
                batch_size: config.batch_size,
            }),
            num_workers: config.num_workers,
            queue_capacity: config.queue_capacity,
            queue: RwLock::new(None),
            handles: Mutex::new(Vec::new()),
        }
    }
    /// Spawn the worker pool and open the work queue
    pub fn start(&self) {
        let mut queue = self.queue.write();
        debug_assert!(queue.is_none(), "scheduler started twice");
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        // the receiver is shared: whichever worker grabs it next pops the
        // queue head, which preserves FIFO start order
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut handles = self.handles.lock();
        for worker_id in 0..self.num_workers {
            let ctx = self.ctx.clone();
            let rx = rx.clone();
            handles.push(tokio::spawn(Self::worker(worker_id, ctx, rx)));
        }
        *queue = Some(tx);
    }
    /// Enqueue a query for execution. While the scheduler runs this blocks
    /// only when the queue is full; after [`Self::stop`] the submission is
    /// dropped with a warning.
    pub async fn submit(&self, query_id: Uuid) {
        let tx = self.queue.read().clone();
        let Some(tx) = tx else {
            warn!("scheduler is offline, dropping query {query_id}");
            return;
        };
        if tx.send(query_id).await.is_err() {
            warn!("scheduler is offline, dropping query {query_id}");
        }
    }
    /// Close the queue and join every worker. Already-enqueued queries are
    /// drained first; nothing in flight is aborted.
    pub async fn stop(&self) {
        drop(self.queue.write().take());
        let handles: Vec<JoinHandle<()>> = {
            let mut handles = self.handles.lock();
            handles.drain(..).collect()
        };
        for handle in handles {
            if handle.await.is_err() {
                error!("a query worker panicked during shutdown");
            }
        }
    }
    async fn worker(
        worker_id: usize,
        ctx: Arc<ExecContext>,
        rx: Arc<tokio::sync::Mutex<Receiver<Uuid>>>,
    ) {
        trace!("worker {worker_id} up");
        loop {
            // hold the receiver only while popping so the other workers can
            // dequeue while this one executes
            let popped = { rx.lock().await.recv().await };
            match popped {
                Some(query_id) => exec::execute_query(worker_id, &ctx, query_id),
                None => break, // queue closed and drained
            }
        }
        trace!("worker {worker_id} down");
    }
}
