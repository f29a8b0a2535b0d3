/*
 * Created on Mon Feb 12 2024
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

//! # Strata
//!
//! The `stratad` crate is Strata's database server. It persists tables as
//! compressed, column-oriented batch files and executes submitted queries
//! (LOAD, SELECT and DELETE) on an asynchronous worker pool. See the modules
//! under [`engine`] for their respective documentation.

#[macro_use]
extern crate log;

mod engine;

use {
    crate::engine::{
        config::{self, Configuration},
        core::Metastore,
        query::QueryStore,
        sched::QueryScheduler,
        RuntimeResult,
    },
    std::{env, process, sync::Arc},
    tokio::signal,
};

#[cfg(all(not(target_env = "msvc"), not(miri)))]
use jemallocator::Jemalloc;

#[cfg(all(not(target_env = "msvc"), not(miri)))]
#[global_allocator]
/// Jemallocator - this is the default memory allocator for platforms other than msvc
static GLOBAL: Jemalloc = Jemalloc;

const EXIT_ERROR: i32 = 0x01;

fn main() {
    env_logger::Builder::new()
        .parse_filters(&env::var("STRATA_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();
    let config = match config::assemble() {
        Ok(config) => config,
        Err(e) => {
            error!("failed to assemble configuration: {e}");
            process::exit(EXIT_ERROR);
        }
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("server")
        .enable_all()
        .build()
        .unwrap();
    let result = runtime.block_on(run(config));
    // make sure all workers have terminated before the runtime goes away
    drop(runtime);
    if let Err(e) = result {
        error!("server terminated with error: {e}");
        process::exit(EXIT_ERROR);
    }
    info!("Goodbye :)");
}

/// Boot the catalog and the scheduler, then wait for a termination signal.
/// Shutdown drains queued queries before the catalog is saved back to disk.
async fn run(config: Configuration) -> RuntimeResult<()> {
    let metastore = Arc::new(Metastore::open(&config)?);
    info!("{}", metastore.describe());
    let queries = Arc::new(QueryStore::new());
    let scheduler = QueryScheduler::new(metastore.clone(), queries, &config);
    scheduler.start();
    info!(
        "Started {} query workers (queue capacity: {})",
        config.num_workers, config.queue_capacity
    );
    signal::ctrl_c().await?;
    info!("Received termination signal. Waiting for enqueued queries to finish");
    scheduler.stop().await;
    metastore.save()?;
    info!("Saved catalog. Stopped accepting queries");
    Ok(())
}
