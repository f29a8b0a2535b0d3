/*
 * Created on Mon Feb 19 2024
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

//! On-disk column storage. Each column of a table is one append-only file:
//! a fixed 13-byte header, a body of concatenated compressed batches, and a
//! footer of raw little-endian arrays describing the batches. The codecs in
//! [`codec`] produce the batch payloads; [`colfile`] owns the file layout.

pub mod codec;
pub mod colfile;
mod rw;

pub use colfile::{BatchRef, ColumnFile};
