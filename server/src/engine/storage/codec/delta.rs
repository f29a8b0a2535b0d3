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

/// Delta-encode a sequence: subtract its minimum from every element,
/// returning the (non-negative) differences and the minimum. The minimum is
/// stored out-of-band in the column footer. An empty sequence has minimum 0.
pub fn encode(integers: &[i64]) -> (Vec<i64>, i64) {
    let Some(&min) = integers.iter().min() else {
        return (Vec::new(), 0);
    };
    (integers.iter().map(|v| v - min).collect(), min)
}

/// Add the minimum back
pub fn decode(encoded: &[i64], min: i64) -> Vec<i64> {
    encoded.iter().map(|v| v + min).collect()
}
