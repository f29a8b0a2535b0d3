/*
 * Created on Sat Feb 24 2024
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

//! The batch codecs. Integers go through delta (subtract the batch minimum)
//! then base-128 varint. A string batch is a NUL-terminated concatenated
//! blob compressed as an LZ4 frame, addressed by `n + 1` offsets which go
//! through the integer pipeline at the head of the batch body.

pub mod delta;
pub mod lz4;
pub mod vle;

use crate::engine::error::{Error, RuntimeResult};

/// Compress a batch of integers. Returns the byte payload and the batch
/// minimum, which the column footer stores out-of-band.
pub fn compress_integers(integers: &[i64]) -> (Vec<u8>, i64) {
    let (diffs, min) = delta::encode(integers);
    (vle::encode(&diffs), min)
}

/// Inverse of [`compress_integers`]
pub fn decompress_integers(payload: &[u8], min: i64) -> RuntimeResult<Vec<i64>> {
    Ok(delta::decode(&vle::decode(payload)?, min))
}

/// A string batch ready for the column file: the offsets payload (through
/// the integer pipeline), the offsets' delta, and the compressed blob
pub struct EncodedStrings {
    pub offsets: Vec<u8>,
    pub delta: i64,
    pub blob: Vec<u8>,
}

/// Encode a batch of strings. The blob is every string followed by a NUL
/// terminator, in order; `offsets[0] = 0` and `offsets[i + 1]` is the end of
/// string `i` including its terminator, so an empty string contributes a
/// delta of exactly 1.
pub fn compress_strings(strings: &[String]) -> RuntimeResult<EncodedStrings> {
    let mut blob = Vec::with_capacity(strings.iter().map(|s| s.len() + 1).sum());
    let mut offsets = Vec::with_capacity(strings.len() + 1);
    offsets.push(0i64);
    for s in strings {
        blob.extend_from_slice(s.as_bytes());
        blob.push(0);
        offsets.push(blob.len() as i64);
    }
    let (payload, delta) = compress_integers(&offsets);
    Ok(EncodedStrings {
        offsets: payload,
        delta,
        blob: lz4::compress(&blob)?,
    })
}

/// Recover a string batch from its decoded offsets and decompressed blob
pub fn split_string_blob(offsets: &[i64], blob: &[u8]) -> RuntimeResult<Vec<String>> {
    let mut strings = Vec::with_capacity(offsets.len().saturating_sub(1));
    for pair in offsets.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if start < 0 || end <= start || end as usize > blob.len() {
            return Err(Error::CorruptCodec("impossible string offsets"));
        }
        // drop the NUL terminator
        let bytes = &blob[start as usize..end as usize - 1];
        let s = String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::CorruptCodec("string column holds invalid utf-8"))?;
        strings.push(s);
    }
    Ok(strings)
}

/// Inverse of [`compress_strings`]
pub fn decompress_strings(
    offsets_payload: &[u8],
    delta: i64,
    blob_payload: &[u8],
) -> RuntimeResult<Vec<String>> {
    let offsets = decompress_integers(offsets_payload, delta)?;
    let blob = lz4::decompress(blob_payload)?;
    split_string_blob(&offsets, &blob)
}
