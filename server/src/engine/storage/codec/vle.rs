/*
 * Created on Wed Feb 21 2024
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

use crate::engine::error::{Error, RuntimeResult};

/// continuation bit: set on every non-terminal byte of a value
const CONTINUATION: u8 = 0x80;
const PAYLOAD: u8 = 0x7F;

/// Encode a sequence of non-negative values as little-endian base-128:
/// seven low bits per byte, least significant group first, continuation bit
/// on every byte but the last. Zero is a single `0x00` byte.
pub fn encode(integers: &[i64]) -> Vec<u8> {
    let mut stream = Vec::with_capacity(integers.len() * 2);
    for &value in integers {
        debug_assert!(value >= 0, "varint input must be non-negative");
        let mut n = value as u64;
        loop {
            let mut byte = (n & PAYLOAD as u64) as u8;
            n >>= 7;
            if n != 0 {
                byte |= CONTINUATION;
            }
            stream.push(byte);
            if n == 0 {
                break;
            }
        }
    }
    stream
}

/// Decode a base-128 stream produced by [`encode`]
pub fn decode(stream: &[u8]) -> RuntimeResult<Vec<i64>> {
    let mut integers = Vec::new();
    let mut current: u64 = 0;
    let mut shift: u32 = 0;
    for &byte in stream {
        if shift >= u64::BITS {
            return Err(Error::CorruptCodec("varint value exceeds 64 bits"));
        }
        current |= ((byte & PAYLOAD) as u64) << shift;
        shift += 7;
        if byte & CONTINUATION == 0 {
            integers.push(current as i64);
            current = 0;
            shift = 0;
        }
    }
    if shift != 0 {
        return Err(Error::CorruptCodec("varint stream ends mid-value"));
    }
    Ok(integers)
}

#[cfg(test)]
mod tests {
    use {
        super::{decode, encode},
        crate::engine::error::Error,
        rand::Rng,
    };

    #[test]
    fn known_values() {
        assert_eq!(encode(&[0]), vec![0x00]);
        assert_eq!(encode(&[1]), vec![0x01]);
        assert_eq!(encode(&[127]), vec![0x7F]);
        assert_eq!(encode(&[128]), vec![0x80, 0x01]);
        assert_eq!(encode(&[300]), vec![0xAC, 0x02]);
    }

    #[test]
    fn round_trip() {
        let original = vec![1, 200, 31212, 4, 5232323];
        assert_eq!(decode(&encode(&original)).unwrap(), original);
    }

    #[test]
    fn round_trip_empty_and_extremes() {
        assert!(decode(&encode(&[])).unwrap().is_empty());
        let extremes = vec![0, 0, i64::MAX, 1, i64::MAX - 1];
        assert_eq!(decode(&encode(&extremes)).unwrap(), extremes);
    }

    #[test]
    fn round_trip_random() {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let original: Vec<i64> = (0..rng.gen_range(0..512))
                .map(|_| rng.gen_range(0..=i64::MAX))
                .collect();
            assert_eq!(decode(&encode(&original)).unwrap(), original);
        }
    }

    #[test]
    fn truncated_stream_is_corrupt() {
        let mut stream = encode(&[5232323]);
        stream.pop();
        assert!(matches!(
            decode(&stream).unwrap_err(),
            Error::CorruptCodec(_)
        ));
    }

    #[test]
    fn overlong_value_is_corrupt() {
        // eleven continuation groups cannot fit in 64 bits
        let stream = [0xFF; 10]
            .iter()
            .chain([0x01].iter())
            .copied()
            .collect::<Vec<u8>>();
        assert!(matches!(
            decode(&stream).unwrap_err(),
            Error::CorruptCodec(_)
        ));
    }
}
