use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Currency amount held as whole cents.
///
/// On the wire it is a JSON decimal number (`11.99`). Amounts with more than
/// two fractional digits are rejected, so the cents always equal the value sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

/// f64 noise left after scaling a two-digit decimal, e.g. `0.29 * 100.0`.
const SUB_CENT_TOLERANCE: f64 = 1e-6;

impl Price {
    /// 0.01
    pub const MIN: Price = Price(1);
    /// 10000.00
    pub const MAX: Price = Price(1_000_000);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// 小数第2位までの金額のみ受け付ける。それより細かい値は `None`。
    pub fn from_decimal(amount: f64) -> Option<Self> {
        let scaled = amount * 100.0;
        let cents = scaled.round();
        if (scaled - cents).abs() > SUB_CENT_TOLERANCE {
            return None;
        }
        // `as` saturates, so absurd inputs land outside the valid range
        Some(Self(cents as i64))
    }

    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn in_range(&self) -> bool {
        (Self::MIN..=Self::MAX).contains(self)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<f64>::deserialize(deserializer)? {
            Some(amount) => Self::from_decimal(amount).ok_or_else(|| {
                de::Error::custom(format!(
                    "invalid price {amount}: at most two decimal places are allowed"
                ))
            }),
            None => Ok(Self::default()),
        }
    }
}
