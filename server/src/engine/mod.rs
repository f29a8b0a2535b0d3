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

//! The engine: everything between a submitted query definition and bytes on
//! disk. The modules here are layered bottom-up: [`storage`] owns the column
//! file format and its codecs, [`core`] owns the catalog, [`query`] tracks
//! query lifecycles and [`sched`] runs them.

// some items here form the surface consumed by the (external) request layer
#![allow(dead_code)]

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod query;
pub mod sched;
pub mod storage;

pub use error::RuntimeResult;
