/*
 * Created on Sat Mar 02 2024
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
    crate::engine::data::{uuid::Uuid, ColumnType},
    chrono::{DateTime, Utc},
    parking_lot::RwLock,
    std::{
        collections::HashMap,
        path::{Path, PathBuf},
    },
};

#[derive(Debug, Clone, PartialEq)]
/// A column definition as submitted to `create table`
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// One column of a table: its name, declared type and the path of its
/// (lazily created) column file
pub struct Column {
    name: Box<str>,
    path: PathBuf,
    ty: ColumnType,
}

impl Column {
    pub fn new(name: &str, path: PathBuf, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            path,
            ty,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn column_type(&self) -> ColumnType {
        self.ty
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A column file that has received at least one batch
pub struct DataFile {
    path: PathBuf,
    created_at: DateTime<Utc>,
}

impl DataFile {
    pub fn new(path: PathBuf, created_at: DateTime<Utc>) -> Self {
        Self { path, created_at }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug)]
/// The mutable side of a table, guarded by the table's RW lock. The lock
/// arbitrates more than these fields: a LOAD holds it in write mode for the
/// whole file append, a SELECT holds it in read mode for the whole scan.
pub struct TableRuntime {
    data_files: HashMap<Box<str>, DataFile>,
    last_modified: DateTime<Utc>,
}

impl TableRuntime {
    fn new(at: DateTime<Utc>) -> Self {
        Self {
            data_files: HashMap::new(),
            last_modified: at,
        }
    }
    pub(super) fn restore(data_files: HashMap<Box<str>, DataFile>, last_modified: DateTime<Utc>) -> Self {
        Self {
            data_files,
            last_modified,
        }
    }
    pub fn data_files(&self) -> &HashMap<Box<str>, DataFile> {
        &self.data_files
    }
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }
    /// Record that `column`'s file exists on disk (first append), and stamp
    /// the modification time
    pub fn register_data_file(&mut self, column: &str, path: PathBuf) {
        let now = Utc::now();
        self.data_files
            .entry(column.into())
            .or_insert_with(|| DataFile::new(path, now));
        self.last_modified = now;
    }
}

#[derive(Debug)]
/// A table: immutable identity and schema, plus the lock-guarded runtime
/// state. Column order defines the column index; `column_index[c.name] == i`
/// iff `columns[i] == c`.
pub struct Table {
    id: Uuid,
    name: Box<str>,
    columns: Vec<Column>,
    column_index: HashMap<Box<str>, usize>,
    created_at: DateTime<Utc>,
    runtime: RwLock<TableRuntime>,
}

impl Table {
    pub fn new(name: &str, columns: Vec<Column>) -> Self {
        let now = Utc::now();
        Self::restore(Uuid::new(), name, columns, now, TableRuntime::new(now))
    }
    pub(super) fn restore(
        id: Uuid,
        name: &str,
        columns: Vec<Column>,
        created_at: DateTime<Utc>,
        runtime: TableRuntime,
    ) -> Self {
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self {
            id,
            name: name.into(),
            columns,
            column_index,
            created_at,
            runtime: RwLock::new(runtime),
        }
    }
    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
    pub fn column_index_of(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    /// The table's reader/writer lock
    pub fn runtime(&self) -> &RwLock<TableRuntime> {
        &self.runtime
    }
}
