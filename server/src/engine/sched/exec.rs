/*
 * Created on Thu Mar 21 2024
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

use {
    super::{ingest, ExecContext},
    crate::engine::{
        core::table::{Table, TableRuntime},
        data::{uuid::Uuid, ColumnData},
        error::{Error, ProblemReport, RuntimeResult},
        query::{Query, QueryDefinition, QueryResult},
        storage::ColumnFile,
    },
    chrono::Utc,
};

/// Run one dequeued query end to end: transition it to `Running`, dispatch
/// by kind under the right table lock, record the terminal state, fire the
/// done signal
pub(super) fn execute_query(worker_id: usize, ctx: &ExecContext, query_id: Uuid) {
    let Some(query) = ctx.queries.get(&query_id) else {
        warn!("worker {worker_id}: query {query_id} is not in the store");
        return;
    };
    query.set_running(Utc::now());
    let outcome = dispatch(ctx, &query);
    match outcome {
        Ok(result) => {
            trace!("worker {worker_id}: query {query_id} completed");
            query.set_completed(Utc::now(), result);
        }
        Err(e) => {
            error!("worker {worker_id}: query {query_id} failed: {e}");
            query.set_failed(Utc::now(), ProblemReport::from_error(&e));
        }
    }
    query.signal_done();
}

fn dispatch(ctx: &ExecContext, query: &Query) -> RuntimeResult<Option<QueryResult>> {
    match query.definition() {
        QueryDefinition::Select { table_name } => select(ctx, table_name).map(Some),
        QueryDefinition::Load {
            destination_table_name,
            source_filepath,
            destination_columns,
            csv_has_header,
        } => load(
            ctx,
            destination_table_name,
            source_filepath,
            destination_columns,
            *csv_has_header,
        )
        .map(|_| None),
        QueryDefinition::Delete { table_name } => delete(ctx, table_name).map(|_| None),
    }
}

/// SELECT: read every batch of every column under the table's read lock
fn select(ctx: &ExecContext, table_name: &str) -> RuntimeResult<QueryResult> {
    let table = ctx.metastore.get_by_name(table_name)?;
    let runtime = table.runtime().read();
    read_table(&table, &runtime)
}

/// Concatenate all batches of all columns, in column order. Columns that
/// were never written read back empty; all columns must agree on the row
/// count.
fn read_table(table: &Table, runtime: &TableRuntime) -> RuntimeResult<QueryResult> {
    let mut columns = Vec::with_capacity(table.columns().len());
    for column in table.columns() {
        let data = match runtime.data_files().get(column.name()) {
            Some(data_file) => ColumnFile::open(data_file.path())?.read_all()?,
            None => ColumnData::new_empty(column.column_type()),
        };
        columns.push(data);
    }
    let row_count = columns.first().map(ColumnData::len).unwrap_or(0);
    if columns.iter().any(|c| c.len() != row_count) {
        return Err(Error::CorruptCodec("table columns disagree on row count"));
    }
    Ok(QueryResult {
        row_count: row_count as i32,
        columns,
    })
}

/// LOAD: append the CSV's rows under the table's write lock
fn load(
    ctx: &ExecContext,
    destination_table_name: &str,
    source_filepath: &str,
    destination_columns: &[String],
    csv_has_header: bool,
) -> RuntimeResult<()> {
    let table = ctx.metastore.get_by_name(destination_table_name)?;
    let mut runtime = table.runtime().write();
    let rows = ingest::load_csv(
        &table,
        &mut runtime,
        source_filepath,
        destination_columns,
        csv_has_header,
        ctx.batch_size,
    )?;
    info!("loaded {rows} rows into table `{}`", table.name());
    Ok(())
}

/// DELETE: the definition may carry a table name or a raw table id
fn delete(ctx: &ExecContext, table_name: &str) -> RuntimeResult<()> {
    let table = match ctx.metastore.get_by_name(table_name) {
        Ok(table) => table,
        Err(Error::NotFound(_)) => match Uuid::parse(table_name) {
            Some(id) => ctx.metastore.get_by_id(id)?,
            None => return Err(Error::NotFound(table_name.to_owned())),
        },
        Err(e) => return Err(e),
    };
    ctx.metastore.drop_table(table.name())
}
