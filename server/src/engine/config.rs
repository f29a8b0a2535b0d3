/*
 * Created on Fri Mar 15 2024
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
    core::fmt,
    serde::Deserialize,
    std::{env, fs, path::PathBuf},
};

pub type ConfigResult<T> = Result<T, ConfigError>;

pub const DEFAULT_NUM_WORKERS: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
/// Rows per column-file batch. The default matches the corpus the format was
/// tuned on.
pub const DEFAULT_BATCH_SIZE: usize = 8192;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_METASTORE_PATH: &str = "metastore.json";

/// Path to an optional YAML configuration file
const ENV_CONFIG: &str = "STRATA_CONFIG";
const ENV_WORKERS: &str = "STRATA_WORKERS";
const ENV_QUEUE_CAPACITY: &str = "STRATA_QUEUE_CAPACITY";
const ENV_BATCH_SIZE: &str = "STRATA_BATCH_SIZE";
const ENV_DATA_DIR: &str = "STRATA_DATA_DIR";
const ENV_METASTORE: &str = "STRATA_METASTORE";

#[derive(Debug, PartialEq)]
/// The final configuration that can be used to start up all services
pub struct Configuration {
    pub num_workers: usize,
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub data_dir: PathBuf,
    pub metastore_path: PathBuf,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_NUM_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            metastore_path: PathBuf::from(DEFAULT_METASTORE_PATH),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    /// the config file could not be read
    FileRead(std::io::Error),
    /// the config file is not valid YAML (or has the wrong shape)
    FileParse(serde_yaml::Error),
    /// a setting has an illegal value
    BadValue(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileRead(e) => write!(f, "failed to read config file: {e}"),
            Self::FileParse(e) => write!(f, "failed to parse config file: {e}"),
            Self::BadValue(key, value) => write!(f, "illegal value {value:?} for `{key}`"),
        }
    }
}

impl std::error::Error for ConfigError {}

/*
    config file (YAML) decode targets
*/

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    system: Option<ConfigFileSystem>,
    paths: Option<ConfigFilePaths>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFileSystem {
    num_workers: Option<usize>,
    queue_capacity: Option<usize>,
    batch_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFilePaths {
    data_dir: Option<PathBuf>,
    metastore: Option<PathBuf>,
}

/// Assemble the configuration: defaults, overridden by the YAML file named
/// by `STRATA_CONFIG` (if set), overridden by the `STRATA_*` variables.
pub fn assemble() -> ConfigResult<Configuration> {
    let mut config = Configuration::default();
    if let Some(path) = env::var_os(ENV_CONFIG) {
        let raw = fs::read_to_string(&path).map_err(ConfigError::FileRead)?;
        apply_file(&mut config, &raw)?;
    }
    apply_env(&mut config)?;
    validate(&config)?;
    Ok(config)
}

fn apply_file(config: &mut Configuration, raw: &str) -> ConfigResult<()> {
    let file: ConfigFile = serde_yaml::from_str(raw).map_err(ConfigError::FileParse)?;
    if let Some(system) = file.system {
        if let Some(num_workers) = system.num_workers {
            config.num_workers = num_workers;
        }
        if let Some(queue_capacity) = system.queue_capacity {
            config.queue_capacity = queue_capacity;
        }
        if let Some(batch_size) = system.batch_size {
            config.batch_size = batch_size;
        }
    }
    if let Some(paths) = file.paths {
        if let Some(data_dir) = paths.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(metastore) = paths.metastore {
            config.metastore_path = metastore;
        }
    }
    Ok(())
}

fn apply_env(config: &mut Configuration) -> ConfigResult<()> {
    if let Some(v) = read_env_count(ENV_WORKERS)? {
        config.num_workers = v;
    }
    if let Some(v) = read_env_count(ENV_QUEUE_CAPACITY)? {
        config.queue_capacity = v;
    }
    if let Some(v) = read_env_count(ENV_BATCH_SIZE)? {
        config.batch_size = v;
    }
    if let Some(v) = env::var_os(ENV_DATA_DIR) {
        config.data_dir = PathBuf::from(v);
    }
    if let Some(v) = env::var_os(ENV_METASTORE) {
        config.metastore_path = PathBuf::from(v);
    }
    Ok(())
}

fn read_env_count(key: &'static str) -> ConfigResult<Option<usize>> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::BadValue(key, raw)),
        Err(_) => Ok(None),
    }
}

fn validate(config: &Configuration) -> ConfigResult<()> {
    if config.num_workers == 0 {
        return Err(ConfigError::BadValue("num_workers", "0".to_owned()));
    }
    if config.queue_capacity == 0 {
        return Err(ConfigError::BadValue("queue_capacity", "0".to_owned()));
    }
    if config.batch_size == 0 {
        return Err(ConfigError::BadValue("batch_size", "0".to_owned()));
    }
    Ok(())
}
