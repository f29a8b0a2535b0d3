/*
 * Created on Sat Mar 09 2024
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

//! Catalog persistence: one JSON document mapping table names to their
//! schemas and data files. Saves go through a temp file and an atomic
//! rename so a crash mid-save never clobbers the previous document.

use {
    super::{
        table::{Column, DataFile, Table, TableRuntime},
        Metastore,
    },
    crate::engine::{
        data::{uuid::Uuid, ColumnType},
        error::{Error, RuntimeResult},
    },
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, fs, io, path::PathBuf, sync::Arc},
};

#[derive(Debug, Serialize, Deserialize)]
struct MetastoreRepr {
    tables: HashMap<String, TableRepr>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableRepr {
    id: Uuid,
    name: String,
    columns: Vec<ColumnRepr>,
    #[serde(rename = "columnsMapping")]
    columns_mapping: HashMap<String, usize>,
    data_files: HashMap<String, DataFileRepr>,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ColumnRepr {
    name: String,
    path: PathBuf,
    #[serde(rename = "type")]
    ty: ColumnType,
}

#[derive(Debug, Serialize, Deserialize)]
struct DataFileRepr {
    path: PathBuf,
    created_at: DateTime<Utc>,
}

impl Metastore {
    /// Load the persisted catalog into this (empty) metastore. A missing
    /// document means a fresh catalog; a malformed one is an error.
    pub fn load(&self) -> RuntimeResult<()> {
        let raw = match fs::read(self.metastore_path()) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let repr: MetastoreRepr = serde_json::from_slice(&raw)
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let mut tables = self.tables().write();
        tables.clear();
        for (name, table) in repr.tables {
            tables.insert(name.into_boxed_str(), Arc::new(restore_table(table)));
        }
        Ok(())
    }
    /// Save the catalog: serialize under the read lock, write a temp file,
    /// atomically rename it over the previous document
    pub fn save(&self) -> RuntimeResult<()> {
        let repr = MetastoreRepr {
            tables: self
                .tables()
                .read()
                .iter()
                .map(|(name, table)| (name.to_string(), snapshot_table(table)))
                .collect(),
        };
        let data = serde_json::to_vec_pretty(&repr)
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let mut tmp = self.metastore_path().as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, data)?;
        if let Err(e) = fs::rename(&tmp, self.metastore_path()) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

fn snapshot_table(table: &Table) -> TableRepr {
    let runtime = table.runtime().read();
    TableRepr {
        id: table.id(),
        name: table.name().to_owned(),
        columns: table
            .columns()
            .iter()
            .map(|c| ColumnRepr {
                name: c.name().to_owned(),
                path: c.path().to_owned(),
                ty: c.column_type(),
            })
            .collect(),
        columns_mapping: table
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name().to_owned(), i))
            .collect(),
        data_files: runtime
            .data_files()
            .iter()
            .map(|(column, df)| {
                (
                    column.to_string(),
                    DataFileRepr {
                        path: df.path().to_owned(),
                        created_at: df.created_at(),
                    },
                )
            })
            .collect(),
        created_at: table.created_at(),
        last_modified: runtime.last_modified(),
    }
}

fn restore_table(repr: TableRepr) -> Table {
    let columns = repr
        .columns
        .into_iter()
        .map(|c| Column::new(&c.name, c.path, c.ty))
        .collect();
    let data_files = repr
        .data_files
        .into_iter()
        .map(|(column, df)| {
            (
                column.into_boxed_str(),
                DataFile::new(df.path, df.created_at),
            )
        })
        .collect();
    Table::restore(
        repr.id,
        &repr.name,
        columns,
        repr.created_at,
        TableRuntime::restore(data_files, repr.last_modified),
    )
}

#[cfg(test)]
mod tests {
    use {
        super::super::{table::ColumnDef, Metastore},
        crate::engine::{config::Configuration, data::ColumnType, error::Error},
        std::fs,
    };

    fn config(dir: &tempfile::TempDir) -> Configuration {
        Configuration {
            data_dir: dir.path().join("data"),
            metastore_path: dir.path().join("metastore.json"),
            ..Default::default()
        }
    }

    #[test]
    fn save_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let id = {
            let ms = Metastore::open(&config).unwrap();
            let id = ms
                .create_table(
                    "events",
                    vec![
                        ColumnDef::new("ts", ColumnType::Int),
                        ColumnDef::new("kind", ColumnType::Str),
                    ],
                )
                .unwrap();
            ms.save().unwrap();
            id
        };
        let ms = Metastore::open(&config).unwrap();
        let table = ms.get_by_name("events").unwrap();
        assert_eq!(table.id(), id);
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.column_index_of("kind"), Some(1));
        assert_eq!(table.columns()[0].column_type(), ColumnType::Int);
    }

    #[test]
    fn document_shape_is_the_contract() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let ms = Metastore::open(&config).unwrap();
        ms.create_table("t", vec![ColumnDef::new("a", ColumnType::Int)])
            .unwrap();
        ms.save().unwrap();
        let raw = fs::read_to_string(&config.metastore_path).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let table = &doc["tables"]["t"];
        assert_eq!(table["name"], "t");
        assert_eq!(table["columns"][0]["type"], "int");
        assert_eq!(table["columnsMapping"]["a"], 0);
        assert!(table["data_files"].as_object().unwrap().is_empty());
        assert!(table["created_at"].is_string());
    }

    #[test]
    fn missing_document_is_a_fresh_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let ms = Metastore::open(&config(&dir)).unwrap();
        assert!(ms.list_tables().is_empty());
    }

    #[test]
    fn garbage_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(&config.metastore_path, b"{ not json").unwrap();
        assert!(matches!(
            Metastore::open(&config).unwrap_err(),
            Error::Io(_)
        ));
    }
}
