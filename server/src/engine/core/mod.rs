/*
 * Created on Tue Mar 05 2024
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

mod persist;
pub mod table;

use {
    self::table::{Column, ColumnDef, Table},
    crate::engine::{
        config::Configuration,
        data::uuid::Uuid,
        error::{Error, RuntimeResult},
    },
    parking_lot::RwLock,
    std::{
        collections::HashMap,
        fmt::Write,
        fs,
        path::{Path, PathBuf},
        sync::Arc,
    },
};

/// Characters that may never appear in a table name (the name doubles as the
/// table's directory name)
const ILLEGAL_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Debug)]
/// The process-wide registry of tables. The catalog lock is only ever held
/// for short critical sections and always before a table's own lock when
/// both are needed; it is never held across a running query body.
pub struct Metastore {
    tables: RwLock<HashMap<Box<str>, Arc<Table>>>,
    metastore_path: PathBuf,
    data_dir: PathBuf,
}

impl Metastore {
    /// Open the catalog: make sure the data directory exists and load the
    /// persisted JSON document (a missing document is a fresh catalog)
    pub fn open(config: &Configuration) -> RuntimeResult<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let slf = Self::new(config.metastore_path.clone(), config.data_dir.clone());
        slf.load()?;
        Ok(slf)
    }
    fn new(metastore_path: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            metastore_path,
            data_dir,
        }
    }
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
    pub(super) fn metastore_path(&self) -> &Path {
        &self.metastore_path
    }
    pub(super) fn tables(&self) -> &RwLock<HashMap<Box<str>, Arc<Table>>> {
        &self.tables
    }
    fn table_dir(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

// ddl
impl Metastore {
    /// Create a table: validate, create its directory, insert a fresh entry.
    /// Never overwrites an existing table.
    pub fn create_table(&self, name: &str, columns: Vec<ColumnDef>) -> RuntimeResult<Uuid> {
        validate_table_name(name)?;
        validate_columns(&columns)?;
        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(Error::AlreadyExists(name.to_owned()));
        }
        let dir = self.table_dir(name);
        fs::create_dir_all(&dir)?;
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(i, def)| {
                Column::new(&def.name, dir.join(format!("column_{i}.dat")), def.column_type)
            })
            .collect();
        let table = Arc::new(Table::new(name, columns));
        let id = table.id();
        tables.insert(name.into(), table);
        Ok(id)
    }
    /// Drop a table: take the catalog write lock, wait out in-flight readers
    /// and writers on the table's own lock, remove the entry, then unlink the
    /// column files and the directory. File removal is best-effort; a failure
    /// surfaces as an I/O error but the catalog removal is never rolled back.
    pub fn drop_table(&self, name: &str) -> RuntimeResult<()> {
        let mut tables = self.tables.write();
        let table = tables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;
        // catalog before table, always; the write guard waits out whatever
        // is still running against this table
        let runtime = table.runtime().write();
        tables.remove(name);
        drop(tables);
        for data_file in runtime.data_files().values() {
            fs::remove_file(data_file.path())?;
        }
        drop(runtime);
        let _ = fs::remove_dir(self.table_dir(name));
        Ok(())
    }
}

// lookups
impl Metastore {
    pub fn get_by_name(&self, name: &str) -> RuntimeResult<Arc<Table>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_owned()))
    }
    pub fn get_by_id(&self, id: Uuid) -> RuntimeResult<Arc<Table>> {
        self.tables
            .read()
            .values()
            .find(|t| t.id() == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
    /// A snapshot of all tables in lexicographic name order
    pub fn list_tables(&self) -> Vec<Arc<Table>> {
        let mut tables: Vec<Arc<Table>> = self.tables.read().values().cloned().collect();
        tables.sort_by(|a, b| a.name().cmp(b.name()));
        tables
    }
    /// A deterministic, human-readable dump of the catalog
    pub fn describe(&self) -> String {
        let tables = self.list_tables();
        let mut out = String::from("Catalog:\n");
        if tables.is_empty() {
            out.push_str("  (no tables)\n");
            return out;
        }
        for table in tables {
            let _ = writeln!(out, "Table: {}", table.name());
            let runtime = table.runtime().read();
            let _ = writeln!(
                out,
                "  Created: {}  LastModified: {}",
                table.created_at().to_rfc3339(),
                runtime.last_modified().to_rfc3339()
            );
            out.push_str("  Columns:\n");
            for (i, column) in table.columns().iter().enumerate() {
                let _ = writeln!(out, "    [{i}] {} (type={})", column.name(), column.column_type());
            }
            out.push_str("  DataFiles:\n");
            if runtime.data_files().is_empty() {
                out.push_str("    (no data files)\n");
            } else {
                let mut names: Vec<&str> =
                    runtime.data_files().keys().map(|k| k.as_ref()).collect();
                names.sort_unstable();
                for (i, column) in names.iter().enumerate() {
                    let df = &runtime.data_files()[*column];
                    let _ = writeln!(
                        out,
                        "    [{i}] {} (created={})",
                        df.path().display(),
                        df.created_at().to_rfc3339()
                    );
                }
            }
        }
        out
    }
}

fn validate_table_name(name: &str) -> RuntimeResult<()> {
    if name.is_empty() {
        return Err(Error::InvalidName("empty table name".to_owned()));
    }
    if name.contains(ILLEGAL_NAME_CHARS) {
        return Err(Error::InvalidName(format!(
            "`{name}` contains characters that are illegal in a table name"
        )));
    }
    Ok(())
}

fn validate_columns(columns: &[ColumnDef]) -> RuntimeResult<()> {
    if columns.is_empty() {
        return Err(Error::InvalidColumns(
            "a table needs at least one column".to_owned(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for column in columns {
        if column.name.is_empty() {
            return Err(Error::InvalidColumns("empty column name".to_owned()));
        }
        if !seen.insert(column.name.as_str()) {
            return Err(Error::InvalidColumns(format!(
                "duplicate column name: {}",
                column.name
            )));
        }
    }
    Ok(())
}
