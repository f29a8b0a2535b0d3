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

//! The batch assembler. Rows come in from a CSV file, get transposed into
//! column-major buffers in fixed-size batches, and go out through the column
//! file codec. A LOAD is strictly append: re-running the same CSV duplicates
//! its rows. Partial writes from a failed LOAD are not rolled back.

use {
    crate::engine::{
        core::table::{Table, TableRuntime},
        data::ColumnData,
        error::{Error, ParseFailure, RuntimeResult},
        storage::{BatchRef, ColumnFile},
    },
    csv::StringRecord,
    std::{fs::File, io},
};

/// Load a CSV file into `table`. The caller holds the table's write lock
/// (`runtime`) for the whole call. Returns the number of rows appended.
pub(super) fn load_csv(
    table: &Table,
    runtime: &mut TableRuntime,
    source_filepath: &str,
    destination_columns: &[String],
    csv_has_header: bool,
    batch_size: usize,
) -> RuntimeResult<usize> {
    let file = File::open(source_filepath)?;
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(file);
    let mut records = reader.records();
    if csv_has_header {
        // the header's names are not used for mapping; it is simply skipped
        if let Some(header) = records.next() {
            header.map_err(csv_to_error)?;
        }
    }
    let mut rows = Vec::new();
    for record in records {
        rows.push(record.map_err(csv_to_error)?);
    }
    if rows.is_empty() {
        return Ok(0);
    }
    let mapping = column_mapping(table, destination_columns, rows[0].len())?;
    let mut loaded = 0usize;
    for chunk in rows.chunks(batch_size) {
        let columns = transpose(table, &mapping, chunk, loaded)?;
        write_batch(table, runtime, &columns)?;
        loaded += chunk.len();
    }
    Ok(loaded)
}

/// Compute the mapping from CSV column index to table column index. With no destination
/// columns the mapping is positional and the widths must match exactly.
/// Otherwise `destination_columns[i]` names the target of CSV column `i`;
/// every table column must be hit exactly once, and names that match no
/// table column leave their CSV column unmapped (those cells are skipped).
fn column_mapping(
    table: &Table,
    destination_columns: &[String],
    csv_width: usize,
) -> RuntimeResult<Vec<Option<usize>>> {
    let table_width = table.columns().len();
    if destination_columns.is_empty() {
        if csv_width != table_width {
            return Err(Error::SchemaMismatch(format!(
                "CSV has {csv_width} columns but table `{}` has {table_width}",
                table.name()
            )));
        }
        return Ok((0..table_width).map(Some).collect());
    }
    if destination_columns.len() != csv_width {
        return Err(Error::SchemaMismatch(format!(
            "CSV has {csv_width} columns but destinationColumns names {}",
            destination_columns.len()
        )));
    }
    let mut mapping = vec![None; csv_width];
    let mut covered = vec![false; table_width];
    for (csv_idx, name) in destination_columns.iter().enumerate() {
        if let Some(col_idx) = table.column_index_of(name) {
            if covered[col_idx] {
                return Err(Error::SchemaMismatch(format!(
                    "destination column `{name}` is mapped more than once"
                )));
            }
            covered[col_idx] = true;
            mapping[csv_idx] = Some(col_idx);
        }
    }
    if !covered.iter().all(|&hit| hit) {
        return Err(Error::SchemaMismatch(
            "the provided destination columns do not cover all table columns".to_owned(),
        ));
    }
    Ok(mapping)
}

/// Transpose a chunk of rows into per-column buffers, parsing each cell by
/// its column's declared type. `row_offset` is the number of data rows
/// already consumed, for error reporting.
fn transpose(
    table: &Table,
    mapping: &[Option<usize>],
    rows: &[StringRecord],
    row_offset: usize,
) -> RuntimeResult<Vec<ColumnData>> {
    let mut columns: Vec<ColumnData> = table
        .columns()
        .iter()
        .map(|c| ColumnData::new_empty(c.column_type()))
        .collect();
    for (i, record) in rows.iter().enumerate() {
        for (csv_idx, cell) in record.iter().enumerate() {
            let Some(&Some(col_idx)) = mapping.get(csv_idx) else {
                continue;
            };
            match &mut columns[col_idx] {
                ColumnData::Int(values) => {
                    let parsed = cell.parse::<i64>().map_err(|e| ParseFailure {
                        row: row_offset + i + 1,
                        column: table.columns()[col_idx].name().to_owned(),
                        cell: cell.to_owned(),
                        reason: e.to_string(),
                    })?;
                    values.push(parsed);
                }
                ColumnData::Str(values) => values.push(cell.to_owned()),
            }
        }
    }
    Ok(columns)
}

/// Append one column-file batch per column and register the data files on
/// first write
fn write_batch(
    table: &Table,
    runtime: &mut TableRuntime,
    columns: &[ColumnData],
) -> RuntimeResult<()> {
    for (column, data) in table.columns().iter().zip(columns) {
        let mut file = ColumnFile::open_or_create(column.path(), column.column_type())?;
        let batch = match data {
            ColumnData::Int(values) => BatchRef::Int(values),
            ColumnData::Str(values) => BatchRef::Str(values),
        };
        file.append_batch(batch)?;
        runtime.register_data_file(column.name(), column.path().to_owned());
    }
    Ok(())
}

/// CSV-level failures (ragged rows, broken quoting, invalid utf-8) surface
/// as I/O errors wrapping the reader's message
fn csv_to_error(e: csv::Error) -> Error {
    match e.into_kind() {
        csv::ErrorKind::Io(e) => Error::Io(e),
        other => Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{other:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{column_mapping, load_csv},
        crate::engine::{
            core::{table::ColumnDef, Metastore},
            config::Configuration,
            data::{ColumnData, ColumnType},
            error::Error,
            storage::ColumnFile,
        },
        std::fs,
    };

    fn fixture(dir: &tempfile::TempDir) -> Metastore {
        let ms = Metastore::open(&Configuration {
            data_dir: dir.path().join("data"),
            metastore_path: dir.path().join("metastore.json"),
            ..Default::default()
        })
        .unwrap();
        ms.create_table(
            "t",
            vec![
                ColumnDef::new("a", ColumnType::Int),
                ColumnDef::new("b", ColumnType::Str),
            ],
        )
        .unwrap();
        ms
    }

    #[test]
    fn positional_mapping_requires_matching_width() {
        let dir = tempfile::tempdir().unwrap();
        let ms = fixture(&dir);
        let table = ms.get_by_name("t").unwrap();
        assert_eq!(
            column_mapping(&table, &[], 2).unwrap(),
            vec![Some(0), Some(1)]
        );
        assert!(matches!(
            column_mapping(&table, &[], 3).unwrap_err(),
            Error::SchemaMismatch(_)
        ));
    }

    #[test]
    fn named_mapping_permutes_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let ms = fixture(&dir);
        let table = ms.get_by_name("t").unwrap();
        let named = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            column_mapping(&table, &named(&["b", "a"]), 2).unwrap(),
            vec![Some(1), Some(0)]
        );
        // a duplicate target breaks exactly-once coverage
        assert!(matches!(
            column_mapping(&table, &named(&["a", "a"]), 2).unwrap_err(),
            Error::SchemaMismatch(_)
        ));
        // a missing target breaks coverage
        assert!(matches!(
            column_mapping(&table, &named(&["a", "nope"]), 2).unwrap_err(),
            Error::SchemaMismatch(_)
        ));
        // width mismatch against the destination list
        assert!(matches!(
            column_mapping(&table, &named(&["b", "a"]), 3).unwrap_err(),
            Error::SchemaMismatch(_)
        ));
    }

    #[test]
    fn load_appends_batches_per_column() {
        let dir = tempfile::tempdir().unwrap();
        let ms = fixture(&dir);
        let table = ms.get_by_name("t").unwrap();
        let csv = dir.path().join("rows.csv");
        fs::write(&csv, "a,b\n1,foo\n2,bar\n3,baz\n").unwrap();
        {
            let mut runtime = table.runtime().write();
            let loaded = load_csv(
                &table,
                &mut runtime,
                csv.to_str().unwrap(),
                &[],
                true,
                2, // force two batches
            )
            .unwrap();
            assert_eq!(loaded, 3);
            assert_eq!(runtime.data_files().len(), 2);
        }
        let mut ints = ColumnFile::open(table.columns()[0].path()).unwrap();
        assert_eq!(ints.num_batches(), 2);
        assert_eq!(ints.read_all().unwrap(), ColumnData::Int(vec![1, 2, 3]));
        let mut strings = ColumnFile::open(table.columns()[1].path()).unwrap();
        assert_eq!(
            strings.read_all().unwrap(),
            ColumnData::Str(vec!["foo".to_owned(), "bar".to_owned(), "baz".to_owned()])
        );
    }

    #[test]
    fn empty_csv_loads_zero_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ms = fixture(&dir);
        let table = ms.get_by_name("t").unwrap();
        let csv = dir.path().join("empty.csv");
        fs::write(&csv, "a,b\n").unwrap();
        let mut runtime = table.runtime().write();
        let loaded =
            load_csv(&table, &mut runtime, csv.to_str().unwrap(), &[], true, 8192).unwrap();
        assert_eq!(loaded, 0);
        assert!(runtime.data_files().is_empty());
    }

    #[test]
    fn bad_cell_reports_row_and_column() {
        let dir = tempfile::tempdir().unwrap();
        let ms = fixture(&dir);
        let table = ms.get_by_name("t").unwrap();
        let csv = dir.path().join("bad.csv");
        fs::write(&csv, "1,foo\ntwo,bar\n").unwrap();
        let mut runtime = table.runtime().write();
        let err = load_csv(&table, &mut runtime, csv.to_str().unwrap(), &[], false, 8192)
            .unwrap_err();
        let Error::ParseFailure(pf) = err else {
            panic!("expected a parse failure, got {err:?}");
        };
        assert_eq!(pf.row, 2);
        assert_eq!(pf.column, "a");
        assert_eq!(pf.cell, "two");
    }

    #[test]
    fn missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let ms = fixture(&dir);
        let table = ms.get_by_name("t").unwrap();
        let mut runtime = table.runtime().write();
        assert!(matches!(
            load_csv(&table, &mut runtime, "no-such.csv", &[], false, 8192).unwrap_err(),
            Error::Io(_)
        ));
    }
}
