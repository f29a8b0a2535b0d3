/*
 * Created on Mon Feb 26 2024
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

//! The column file: all batches of one column of one table, append-only.
//!
//! ```text
//! offset 0  : u8   column type        (0 = int, 1 = string)
//! offset 1  : i32  number of batches
//! offset 5  : i64  footer offset
//! offset 13 : body (concatenated compressed batches)
//! footer    : i64 × (n + 1) batch offsets
//!             i64 × n       batch deltas
//!             i64 × n       string payload sizes (zero for int columns)
//! ```
//!
//! Everything is little-endian. An append writes the new batch at the old
//! footer offset, then the footer past it, then the header in place; if the
//! process dies in between, the header still describes the old state and the
//! tail bytes are unreachable garbage (there is no crash-consistency
//! guarantee beyond that).

use {
    super::{codec, rw::FileIO},
    crate::engine::{
        data::{ColumnData, ColumnType},
        error::{Error, RuntimeResult},
    },
    std::{io, path::Path},
};

/// Fixed header size: type tag (u8) + batch count (i32) + footer offset (i64)
pub const HEADER_SIZE: i64 = 13;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ColumnFileHeader {
    column_type: ColumnType,
    num_batches: i32,
    footer_offset: i64,
}

#[derive(Debug, PartialEq)]
struct ColumnFooter {
    /// where each batch starts; one extra entry marking the end of the body
    batch_offsets: Vec<i64>,
    /// the delta (batch minimum) of each batch's integer payload
    batch_deltas: Vec<i64>,
    /// compressed string blob size per batch, always zero for int columns
    string_sizes: Vec<i64>,
}

/// One batch of values to append
#[derive(Debug, Clone, Copy)]
pub enum BatchRef<'a> {
    Int(&'a [i64]),
    Str(&'a [String]),
}

impl BatchRef<'_> {
    fn column_type(&self) -> ColumnType {
        match self {
            Self::Int(_) => ColumnType::Int,
            Self::Str(_) => ColumnType::Str,
        }
    }
}

#[derive(Debug)]
/// An open column file with its header and footer decoded and validated
pub struct ColumnFile {
    io: FileIO,
    header: ColumnFileHeader,
    footer: ColumnFooter,
}

impl ColumnFile {
    /// Open `path`, creating an empty column file of type `ty` if absent
    pub fn open_or_create(path: &Path, ty: ColumnType) -> RuntimeResult<Self> {
        if path.exists() {
            Self::open(path)
        } else {
            Self::create(path, ty)
        }
    }
    /// Create a fresh column file: a header announcing zero batches and a
    /// footer seeded with the body start
    pub fn create(path: &Path, ty: ColumnType) -> RuntimeResult<Self> {
        let io = FileIO::create(path)?;
        let mut slf = Self {
            io,
            header: ColumnFileHeader {
                column_type: ty,
                num_batches: 0,
                footer_offset: HEADER_SIZE,
            },
            footer: ColumnFooter {
                batch_offsets: vec![HEADER_SIZE],
                batch_deltas: Vec::new(),
                string_sizes: Vec::new(),
            },
        };
        slf.write_footer()?;
        slf.write_header()?;
        Ok(slf)
    }
    /// Open an existing column file, reading and validating header and footer
    pub fn open(path: &Path) -> RuntimeResult<Self> {
        let mut io = FileIO::open(path)?;
        let header = Self::read_header(&mut io)?;
        let footer = Self::read_footer(&mut io, &header)?;
        let slf = Self { io, header, footer };
        slf.validate()?;
        Ok(slf)
    }
    pub fn column_type(&self) -> ColumnType {
        self.header.column_type
    }
    pub fn num_batches(&self) -> usize {
        self.header.num_batches as usize
    }
}

// encode
impl ColumnFile {
    /// Append one batch: body first, then the footer at the new footer
    /// offset, then the header rewritten in place
    pub fn append_batch(&mut self, batch: BatchRef<'_>) -> RuntimeResult<()> {
        debug_assert_eq!(
            batch.column_type(),
            self.header.column_type,
            "batch type does not match the column"
        );
        let (payload, delta, string_payload) = match batch {
            BatchRef::Int(values) => {
                let (payload, min) = codec::compress_integers(values);
                (payload, min, None)
            }
            BatchRef::Str(strings) => {
                let enc = codec::compress_strings(strings)?;
                (enc.offsets, enc.delta, Some(enc.blob))
            }
        };
        let start = self.end_of_body();
        self.io.seek_from_start(start as u64)?;
        self.io.write_all(&payload)?;
        let mut end = start + payload.len() as i64;
        let mut string_size = 0i64;
        if let Some(blob) = &string_payload {
            self.io.write_all(blob)?;
            string_size = blob.len() as i64;
            end += string_size;
        }
        self.footer.batch_offsets.push(end);
        self.footer.batch_deltas.push(delta);
        self.footer.string_sizes.push(string_size);
        self.header.num_batches += 1;
        self.header.footer_offset = end;
        self.write_footer()?;
        self.write_header()?;
        self.io.fsync_all()?;
        Ok(())
    }
    fn end_of_body(&self) -> i64 {
        self.footer.batch_offsets[self.footer.batch_offsets.len() - 1]
    }
    fn write_header(&mut self) -> RuntimeResult<()> {
        self.io.seek_from_start(0)?;
        self.io.write_u8(self.header.column_type.disc())?;
        self.io.write_i32_le(self.header.num_batches)?;
        self.io.write_i64_le(self.header.footer_offset)?;
        Ok(())
    }
    fn write_footer(&mut self) -> RuntimeResult<()> {
        self.io.seek_from_start(self.header.footer_offset as u64)?;
        for &offset in &self.footer.batch_offsets {
            self.io.write_i64_le(offset)?;
        }
        for &delta in &self.footer.batch_deltas {
            self.io.write_i64_le(delta)?;
        }
        for &size in &self.footer.string_sizes {
            self.io.write_i64_le(size)?;
        }
        Ok(())
    }
}

// decode
impl ColumnFile {
    /// Read and decompress batch `index`. Never touches batches past `index`.
    pub fn read_batch(&mut self, index: usize) -> RuntimeResult<ColumnData> {
        if index >= self.num_batches() {
            return Err(Error::CorruptCodec("batch index out of range"));
        }
        let start = self.footer.batch_offsets[index];
        let end = self.footer.batch_offsets[index + 1];
        let string_size = self.footer.string_sizes[index];
        let int_size = end - start - string_size;
        self.io.seek_from_start(start as u64)?;
        let mut payload = vec![0u8; int_size as usize];
        self.io
            .read_buffer(&mut payload)
            .map_err(truncation_to_corrupt)?;
        let integers = codec::decompress_integers(&payload, self.footer.batch_deltas[index])?;
        match self.header.column_type {
            ColumnType::Int => Ok(ColumnData::Int(integers)),
            ColumnType::Str => {
                let mut blob_payload = vec![0u8; string_size as usize];
                self.io
                    .read_buffer(&mut blob_payload)
                    .map_err(truncation_to_corrupt)?;
                let blob = codec::lz4::decompress(&blob_payload)?;
                Ok(ColumnData::Str(codec::split_string_blob(&integers, &blob)?))
            }
        }
    }
    /// Read the whole column: every batch in file order, concatenated
    pub fn read_all(&mut self) -> RuntimeResult<ColumnData> {
        let mut column = ColumnData::new_empty(self.header.column_type);
        for index in 0..self.num_batches() {
            column.append(self.read_batch(index)?);
        }
        Ok(column)
    }
    fn read_header(io: &mut FileIO) -> RuntimeResult<ColumnFileHeader> {
        io.seek_from_start(0)?;
        let raw_type = io.read_u8().map_err(truncation_to_corrupt)?;
        let column_type = ColumnType::try_from_raw(raw_type)
            .ok_or(Error::CorruptCodec("unknown column type tag"))?;
        let num_batches = io.read_i32_le().map_err(truncation_to_corrupt)?;
        let footer_offset = io.read_i64_le().map_err(truncation_to_corrupt)?;
        if num_batches < 0 || footer_offset < HEADER_SIZE {
            return Err(Error::CorruptCodec("impossible column file header"));
        }
        Ok(ColumnFileHeader {
            column_type,
            num_batches,
            footer_offset,
        })
    }
    fn read_footer(io: &mut FileIO, header: &ColumnFileHeader) -> RuntimeResult<ColumnFooter> {
        io.seek_from_start(header.footer_offset as u64)?;
        let n = header.num_batches as usize;
        let mut read_array = |len: usize| -> RuntimeResult<Vec<i64>> {
            let mut array = Vec::with_capacity(len);
            for _ in 0..len {
                array.push(io.read_i64_le().map_err(truncation_to_corrupt)?);
            }
            Ok(array)
        };
        Ok(ColumnFooter {
            batch_offsets: read_array(n + 1)?,
            batch_deltas: read_array(n)?,
            string_sizes: read_array(n)?,
        })
    }
    /// The invariants every column file must satisfy on open
    fn validate(&self) -> RuntimeResult<()> {
        let footer = &self.footer;
        if footer.batch_offsets.first() != Some(&HEADER_SIZE) {
            return Err(Error::CorruptCodec("first batch offset must follow the header"));
        }
        if footer.batch_offsets.last() != Some(&self.header.footer_offset) {
            return Err(Error::CorruptCodec(
                "footer offset disagrees with the last batch offset",
            ));
        }
        if footer.batch_offsets.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(Error::CorruptCodec("batch offsets must be non-decreasing"));
        }
        if footer.string_sizes.iter().any(|&size| size < 0) {
            return Err(Error::CorruptCodec("negative string payload size"));
        }
        if self.header.column_type == ColumnType::Int
            && footer.string_sizes.iter().any(|&size| size != 0)
        {
            return Err(Error::CorruptCodec("int column carries string payloads"));
        }
        let oversized = (0..self.num_batches()).any(|i| {
            footer.string_sizes[i] > footer.batch_offsets[i + 1] - footer.batch_offsets[i]
        });
        if oversized {
            return Err(Error::CorruptCodec("string payload exceeds its batch"));
        }
        Ok(())
    }
}

/// A short read while decoding a column file means the file is truncated,
/// which is corruption, not an environment failure
fn truncation_to_corrupt(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::CorruptCodec("truncated column file")
    } else {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{BatchRef, ColumnFile, HEADER_SIZE},
        crate::engine::{
            data::{ColumnData, ColumnType},
            error::Error,
        },
        std::{fs, path::PathBuf},
    };

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn scratch(name: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        (dir, path)
    }

    #[test]
    fn fresh_file_is_empty_and_reopenable() {
        let (_dir, path) = scratch("empty.dat");
        {
            let file = ColumnFile::create(&path, ColumnType::Int).unwrap();
            assert_eq!(file.num_batches(), 0);
        }
        let mut file = ColumnFile::open(&path).unwrap();
        assert_eq!(file.num_batches(), 0);
        assert_eq!(file.column_type(), ColumnType::Int);
        assert_eq!(file.read_all().unwrap(), ColumnData::Int(vec![]));
    }

    #[test]
    fn two_batches_read_back_in_order() {
        let (_dir, path) = scratch("ints.dat");
        let mut file = ColumnFile::create(&path, ColumnType::Int).unwrap();
        file.append_batch(BatchRef::Int(&[1, 2, 3])).unwrap();
        file.append_batch(BatchRef::Int(&[4, 5, 6, 7])).unwrap();
        assert_eq!(file.num_batches(), 2);
        assert_eq!(file.read_batch(0).unwrap(), ColumnData::Int(vec![1, 2, 3]));
        assert_eq!(
            file.read_batch(1).unwrap(),
            ColumnData::Int(vec![4, 5, 6, 7])
        );
        assert_eq!(
            file.read_all().unwrap(),
            ColumnData::Int(vec![1, 2, 3, 4, 5, 6, 7])
        );
    }

    #[test]
    fn append_survives_reopen() {
        let (_dir, path) = scratch("reopen.dat");
        {
            let mut file = ColumnFile::create(&path, ColumnType::Int).unwrap();
            file.append_batch(BatchRef::Int(&[-5, 80, 13])).unwrap();
        }
        {
            let mut file = ColumnFile::open_or_create(&path, ColumnType::Int).unwrap();
            file.append_batch(BatchRef::Int(&[0])).unwrap();
        }
        let mut file = ColumnFile::open(&path).unwrap();
        assert_eq!(file.num_batches(), 2);
        assert_eq!(
            file.read_all().unwrap(),
            ColumnData::Int(vec![-5, 80, 13, 0])
        );
    }

    #[test]
    fn string_batches_round_trip() {
        let (_dir, path) = scratch("strings.dat");
        let first = strs(&["alpha", "", "gamma"]);
        let second = strs(&["delta", "epsilon"]);
        let mut file = ColumnFile::create(&path, ColumnType::Str).unwrap();
        file.append_batch(BatchRef::Str(&first)).unwrap();
        file.append_batch(BatchRef::Str(&second)).unwrap();
        assert_eq!(file.read_batch(0).unwrap(), ColumnData::Str(first.clone()));
        assert_eq!(file.read_batch(1).unwrap(), ColumnData::Str(second.clone()));
        let mut all = first;
        all.extend(second);
        assert_eq!(file.read_all().unwrap(), ColumnData::Str(all));
    }

    #[test]
    fn reading_batch_i_ignores_later_batches() {
        let (_dir, path) = scratch("tail.dat");
        {
            let mut file = ColumnFile::create(&path, ColumnType::Int).unwrap();
            file.append_batch(BatchRef::Int(&[9, 8, 7])).unwrap();
            file.append_batch(BatchRef::Int(&[1])).unwrap();
        }
        // clobber the last body byte (inside batch 1): batch 0 must still
        // decode, batch 1 must not
        let mut raw = fs::read(&path).unwrap();
        let footer_offset = i64::from_le_bytes(raw[5..13].try_into().unwrap()) as usize;
        raw[footer_offset - 1] = 0x80;
        fs::write(&path, raw).unwrap();
        let mut file = ColumnFile::open(&path).unwrap();
        assert_eq!(file.read_batch(0).unwrap(), ColumnData::Int(vec![9, 8, 7]));
        assert!(matches!(
            file.read_batch(1).unwrap_err(),
            Error::CorruptCodec(_)
        ));
    }

    #[test]
    fn bad_type_tag_is_corrupt() {
        let (_dir, path) = scratch("badtag.dat");
        {
            let mut file = ColumnFile::create(&path, ColumnType::Int).unwrap();
            file.append_batch(BatchRef::Int(&[1])).unwrap();
        }
        let mut raw = fs::read(&path).unwrap();
        raw[0] = 0xEE;
        fs::write(&path, raw).unwrap();
        assert!(matches!(
            ColumnFile::open(&path).unwrap_err(),
            Error::CorruptCodec("unknown column type tag")
        ));
    }

    #[test]
    fn truncated_footer_is_corrupt() {
        let (_dir, path) = scratch("trunc.dat");
        {
            let mut file = ColumnFile::create(&path, ColumnType::Int).unwrap();
            file.append_batch(BatchRef::Int(&[1, 2, 3])).unwrap();
        }
        let raw = fs::read(&path).unwrap();
        fs::write(&path, &raw[..raw.len() - 4]).unwrap();
        assert!(matches!(
            ColumnFile::open(&path).unwrap_err(),
            Error::CorruptCodec("truncated column file")
        ));
    }

    #[test]
    fn header_size_matches_the_layout() {
        let (_dir, path) = scratch("layout.dat");
        ColumnFile::create(&path, ColumnType::Str).unwrap();
        // header + the seeded one-entry offset array
        assert_eq!(fs::metadata(&path).unwrap().len(), HEADER_SIZE as u64 + 8);
    }
}
