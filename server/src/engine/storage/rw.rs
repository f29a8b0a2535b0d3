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

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

pub type IoResult<T> = Result<T, std::io::Error>;

#[derive(Debug)]
/// A file handle with the little-endian primitive reads and writes the
/// column file codec needs. Header and footer fields are fixed width, so
/// everything here works on exact block sizes.
pub struct FileIO {
    f: File,
}

impl FileIO {
    /// Create a new file; fails if `path` already exists
    pub fn create(path: &Path) -> IoResult<Self> {
        OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(path)
            .map(|f| Self { f })
    }
    /// Open an existing file for reading and writing
    pub fn open(path: &Path) -> IoResult<Self> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map(|f| Self { f })
    }
    pub fn file_length(&self) -> IoResult<u64> {
        self.f.metadata().map(|md| md.len())
    }
    pub fn seek_from_start(&mut self, by: u64) -> IoResult<()> {
        self.f.seek(SeekFrom::Start(by)).map(|_| ())
    }
    pub fn read_buffer(&mut self, buffer: &mut [u8]) -> IoResult<()> {
        self.f.read_exact(buffer)
    }
    pub fn read_block<const N: usize>(&mut self) -> IoResult<[u8; N]> {
        let mut block = [0u8; N];
        self.read_buffer(&mut block)?;
        Ok(block)
    }
    pub fn read_u8(&mut self) -> IoResult<u8> {
        self.read_block::<1>().map(|b| b[0])
    }
    pub fn read_i32_le(&mut self) -> IoResult<i32> {
        Ok(i32::from_le_bytes(self.read_block()?))
    }
    pub fn read_i64_le(&mut self) -> IoResult<i64> {
        Ok(i64::from_le_bytes(self.read_block()?))
    }
    pub fn write_all(&mut self, data: &[u8]) -> IoResult<()> {
        self.f.write_all(data)
    }
    pub fn write_u8(&mut self, v: u8) -> IoResult<()> {
        self.write_all(&[v])
    }
    pub fn write_i32_le(&mut self, v: i32) -> IoResult<()> {
        self.write_all(&v.to_le_bytes())
    }
    pub fn write_i64_le(&mut self, v: i64) -> IoResult<()> {
        self.write_all(&v.to_le_bytes())
    }
    pub fn fsync_all(&mut self) -> IoResult<()> {
        self.f.flush()?;
        self.f.sync_all()
    }
}
