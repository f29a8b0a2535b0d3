/*
 * Created on Thu Feb 22 2024
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
    crate::engine::error::{Error, RuntimeResult},
    lz4_flex::frame::{FrameDecoder, FrameEncoder},
    std::io::{self, Read, Write},
};

/// Compress a raw blob into a self-contained LZ4 frame
pub fn compress(data: &[u8]) -> RuntimeResult<Vec<u8>> {
    let mut encoder = FrameEncoder::new(Vec::with_capacity(data.len() / 2));
    encoder.write_all(data)?;
    encoder
        .finish()
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))
}

/// Decompress an LZ4 frame produced by [`compress`]
pub fn decompress(compressed: &[u8]) -> RuntimeResult<Vec<u8>> {
    let mut data = Vec::with_capacity(compressed.len() * 2);
    FrameDecoder::new(compressed)
        .read_to_end(&mut data)
        .map_err(|_| Error::CorruptCodec("malformed lz4 frame"))?;
    Ok(data)
}
