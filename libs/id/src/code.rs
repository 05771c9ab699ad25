//! Base-36 item codes.

use crate::CodeError;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const RADIX: i64 = 36;

/// A 4 character base-36 item code such as `00A7`.
///
/// The code is a fixed-width rendering of a counter value, most significant
/// digit first and zero padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemCode {
    value: u32,
    symbols: [u8; ItemCode::WIDTH],
}

impl ItemCode {
    /// Number of characters in every code.
    pub const WIDTH: usize = 4;

    /// Smallest encodable counter value.
    pub const MIN_VALUE: i64 = 0;

    /// Largest encodable counter value (`36^4 - 1`).
    pub const MAX_VALUE: i64 = RADIX * RADIX * RADIX * RADIX - 1;

    /// Encodes a counter value.
    ///
    /// Fails with [`CodeError::OutOfRange`] outside `0..=1_679_615`.
    pub fn encode(counter: i64) -> Result<Self, CodeError> {
        if !(Self::MIN_VALUE..=Self::MAX_VALUE).contains(&counter) {
            return Err(CodeError::OutOfRange {
                value: counter,
                min: Self::MIN_VALUE,
                max: Self::MAX_VALUE,
            });
        }

        let mut symbols = [b'0'; Self::WIDTH];
        let mut rest = counter;
        for slot in symbols.iter_mut().rev() {
            *slot = ALPHABET[(rest % RADIX) as usize];
            rest /= RADIX;
        }

        Ok(Self {
            value: counter as u32,
            symbols,
        })
    }

    /// Decodes a code back into its counter value.
    ///
    /// Only upper-case symbols are accepted.
    pub fn decode(s: &str) -> Result<Self, CodeError> {
        if s.is_empty() {
            return Err(CodeError::Empty);
        }

        let count = s.chars().count();
        if count != Self::WIDTH {
            return Err(CodeError::InvalidLength {
                expected: Self::WIDTH,
                actual: count,
            });
        }

        let mut value: i64 = 0;
        for (position, symbol) in s.chars().enumerate() {
            let digit = match symbol {
                '0'..='9' => symbol as i64 - '0' as i64,
                'A'..='Z' => symbol as i64 - 'A' as i64 + 10,
                _ => return Err(CodeError::InvalidSymbol { symbol, position }),
            };
            value = value * RADIX + digit;
        }

        Self::encode(value)
    }

    /// Returns the counter value this code represents.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value as i64
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Symbols are always drawn from the ASCII alphabet.
        std::str::from_utf8(&self.symbols).unwrap_or("")
    }
}

impl std::fmt::Display for ItemCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl TryFrom<i64> for ItemCode {
    type Error = CodeError;

    fn try_from(counter: i64) -> Result<Self, Self::Error> {
        Self::encode(counter)
    }
}

impl From<ItemCode> for i64 {
    fn from(code: ItemCode) -> Self {
        code.value()
    }
}

impl serde::Serialize for ItemCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for ItemCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}
