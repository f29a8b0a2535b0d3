/*
 * Created on Tue Feb 13 2024
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

use {core::fmt, serde::Serialize, std::io};

pub type RuntimeResult<T> = Result<T, Error>;

#[derive(Debug)]
/// Any error the engine can produce while creating, loading, reading or
/// dropping tables. Everything a worker hits bubbles up as one of these and
/// is recorded against the failing query as a [`ProblemReport`].
pub enum Error {
    /// the named table (or query) does not exist
    NotFound(String),
    /// a table with this name already exists
    AlreadyExists(String),
    /// the table name is empty or carries illegal characters
    InvalidName(String),
    /// the column list failed validation
    InvalidColumns(String),
    /// the CSV shape does not line up with the table schema
    SchemaMismatch(String),
    /// a CSV cell failed to parse for its declared column type
    ParseFailure(ParseFailure),
    /// an underlying filesystem or I/O failure
    Io(io::Error),
    /// a malformed varint stream, truncated footer or impossible offsets
    CorruptCodec(&'static str),
    /// the query was submitted after the scheduler went offline
    QueueClosed,
}

#[derive(Debug)]
/// Full context for a cell that failed to parse during a LOAD. `row` is the
/// 1-based data row index (the header, if any, is not counted).
pub struct ParseFailure {
    pub row: usize,
    pub column: String,
    pub cell: String,
    pub reason: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::AlreadyExists(table) => write!(f, "table `{table}` already exists"),
            Self::InvalidName(why) => write!(f, "invalid table name: {why}"),
            Self::InvalidColumns(why) => write!(f, "invalid column definition: {why}"),
            Self::SchemaMismatch(why) => write!(f, "schema mismatch: {why}"),
            Self::ParseFailure(pf) => write!(
                f,
                "failed to parse {:?} (row {}, column `{}`): {}",
                pf.cell, pf.row, pf.column, pf.reason
            ),
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::CorruptCodec(what) => write!(f, "corrupted data: {what}"),
            Self::QueueClosed => write!(f, "the scheduler is offline"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ParseFailure> for Error {
    fn from(pf: ParseFailure) -> Self {
        Self::ParseFailure(pf)
    }
}

#[derive(Debug, Clone, Serialize)]
/// The structured failure record stored on a query that ends in `Failed`.
/// The shape (`problems: [{error}]`) is the wire contract with the request
/// surface.
pub struct ProblemReport {
    pub problems: Vec<Problem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    pub error: String,
}

impl ProblemReport {
    pub fn from_error(e: &Error) -> Self {
        Self {
            problems: vec![Problem {
                error: e.to_string(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ParseFailure, ProblemReport};

    #[test]
    fn problem_report_wraps_error_message() {
        let report = ProblemReport::from_error(&Error::AlreadyExists("metrics".to_owned()));
        assert_eq!(report.problems.len(), 1);
        assert_eq!(report.problems[0].error, "table `metrics` already exists");
    }

    #[test]
    fn parse_failure_display_carries_context() {
        let e = Error::ParseFailure(ParseFailure {
            row: 3,
            column: "age".to_owned(),
            cell: "abc".to_owned(),
            reason: "invalid digit found in string".to_owned(),
        });
        let msg = e.to_string();
        assert!(msg.contains("row 3"));
        assert!(msg.contains("`age`"));
        assert!(msg.contains("abc"));
    }
}
