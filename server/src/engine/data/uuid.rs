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

use {
    core::fmt,
    serde::{Deserialize, Serialize},
    std::str::FromStr,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uuid {
    data: uuid::Uuid,
}

impl Uuid {
    pub fn new() -> Self {
        Self {
            data: uuid::Uuid::new_v4(),
        }
    }
    /// Parse a textual uuid; `None` if the input isn't one
    pub fn parse(source: &str) -> Option<Self> {
        uuid::Uuid::from_str(source).ok().map(|data| Self { data })
    }
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_bytes()
    }
}

impl Default for Uuid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.data.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::Uuid;

    #[test]
    fn display_parses_back() {
        let id = Uuid::new();
        assert_eq!(Uuid::parse(&id.to_string()), Some(id));
        assert_eq!(Uuid::parse("certainly-not-a-uuid"), None);
    }
}
