/*
 * Created on Fri Feb 16 2024
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

pub mod uuid;

use {
    core::fmt,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
/// The type of a column. The discriminants double as the on-disk type tags
/// in the column file header, so they must never be reordered.
pub enum ColumnType {
    /// a 64-bit signed integer
    #[serde(rename = "int")]
    Int = 0,
    /// UTF-8 text of any length
    #[serde(rename = "string")]
    Str = 1,
}

impl ColumnType {
    /// The on-disk type tag
    pub const fn disc(&self) -> u8 {
        *self as u8
    }
    pub const fn try_from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Int),
            1 => Some(Self::Str),
            _ => None,
        }
    }
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Str => "string",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
/// The values of one column. A column holds `i64`s or strings for its whole
/// length; the variant lives at the column level, never per cell.
pub enum ColumnData {
    Int(Vec<i64>),
    Str(Vec<String>),
}

impl ColumnData {
    pub fn new_empty(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Int => Self::Int(Vec::new()),
            ColumnType::Str => Self::Str(Vec::new()),
        }
    }
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Int(_) => ColumnType::Int,
            Self::Str(_) => ColumnType::Str,
        }
    }
    pub fn len(&self) -> usize {
        match self {
            Self::Int(values) => values.len(),
            Self::Str(values) => values.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Append another chunk of the same column (same variant, by contract)
    pub fn append(&mut self, other: Self) {
        match (self, other) {
            (Self::Int(into), Self::Int(from)) => into.extend(from),
            (Self::Str(into), Self::Str(from)) => into.extend(from),
            _ => unreachable!("column data variant mismatch"),
        }
    }
}
