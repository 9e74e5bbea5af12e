//! Wei amounts.
//!
//! Amounts are fixed-point integers (u128 raw wei) so fund math never touches
//! floating point. The smallest unit is 1 wei; 1 ether is 10^18 wei.

use crate::error::TypeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Number of wei in one ether.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// An amount of value held, staked, or paid out by the engine.
///
/// Serializes as a decimal string in human-readable formats (JSON numbers
/// lose precision past 2^53) and as a raw `u128` in binary ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wei(u128);

impl Wei {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Convert whole milli-ether (0.001 ETH) into wei.
    pub fn from_milli_ether(milli: u128) -> Self {
        Self(milli * (WEI_PER_ETHER / 1_000))
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `floor(self * numerator / denominator)` with a 256-bit intermediate.
    ///
    /// Returns `None` when `denominator` is zero or the quotient does not fit
    /// in 128 bits. Pro-rata shares (`numerator <= denominator`) always fit.
    pub fn mul_div_floor(self, numerator: Self, denominator: Self) -> Option<Self> {
        let (hi, lo) = mul_wide(self.0, numerator.0);
        div_wide(hi, lo, denominator.0).map(Self)
    }
}

/// Full 256-bit product of two u128 values as `(high, low)` halves.
fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a0, a1) = (a & MASK, a >> 64);
    let (b0, b1) = (b & MASK, b >> 64);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    let mid = (p00 >> 64) + (p01 & MASK) + (p10 & MASK);
    let lo = (p00 & MASK) | ((mid & MASK) << 64);
    let hi = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (hi, lo)
}

/// Divide the 256-bit value `(hi, lo)` by `d` using restoring long division.
fn div_wide(hi: u128, lo: u128, d: u128) -> Option<u128> {
    if d == 0 || hi >= d {
        return None;
    }
    let mut rem = hi;
    let mut quotient: u128 = 0;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    Some(quotient)
}

impl Add for Wei {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Wei {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Wei {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Wei {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Wei> for Wei {
    fn sum<I: Iterator<Item = &'a Wei>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(&self.0)
        } else {
            serializer.serialize_u128(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            u128::deserialize(deserializer).map(Self)
        }
    }
}

impl std::str::FromStr for Wei {
    type Err = TypeError;

    /// Parse a decimal wei string (as carried in JSON to avoid precision loss).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u128>()
            .map(Self)
            .map_err(|_| TypeError::InvalidAmount(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milli_ether_conversion() {
        assert_eq!(Wei::from_milli_ether(1).raw(), 1_000_000_000_000_000);
    }

    #[test]
    fn mul_div_small_values() {
        let pool = Wei::new(100);
        assert_eq!(pool.mul_div_floor(Wei::new(1), Wei::new(3)), Some(Wei::new(33)));
        assert_eq!(pool.mul_div_floor(Wei::new(3), Wei::new(3)), Some(Wei::new(100)));
        assert_eq!(pool.mul_div_floor(Wei::new(0), Wei::new(3)), Some(Wei::ZERO));
    }

    #[test]
    fn mul_div_survives_products_beyond_u128() {
        let big = Wei::new(10u128.pow(30));
        // 10^30 * 10^30 overflows u128, the quotient does not.
        assert_eq!(big.mul_div_floor(big, big), Some(big));

        let pool = Wei::new(u128::MAX);
        assert_eq!(
            pool.mul_div_floor(Wei::new(u128::MAX / 2), Wei::new(u128::MAX)),
            Some(Wei::new(u128::MAX / 2))
        );
    }

    #[test]
    fn mul_div_rejects_zero_denominator_and_oversized_quotient() {
        assert_eq!(Wei::new(5).mul_div_floor(Wei::new(5), Wei::ZERO), None);
        assert_eq!(Wei::new(u128::MAX).mul_div_floor(Wei::new(2), Wei::new(1)), None);
    }

    #[test]
    fn sums_and_parses() {
        let total: Wei = [Wei::new(1), Wei::new(2), Wei::new(3)].iter().sum();
        assert_eq!(total, Wei::new(6));
        assert_eq!("42".parse::<Wei>().unwrap(), Wei::new(42));
        assert!("-1".parse::<Wei>().is_err());
        assert!("0.5".parse::<Wei>().is_err());
    }

    #[test]
    fn json_carries_amounts_as_strings() {
        let big = Wei::new(u128::MAX);
        let json = serde_json::to_string(&big).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));
        assert_eq!(serde_json::from_str::<Wei>(&json).unwrap(), big);
        assert!(serde_json::from_str::<Wei>("12").is_err());

        let bytes = bincode::serialize(&big).unwrap();
        assert_eq!(bincode::deserialize::<Wei>(&bytes).unwrap(), big);
    }
}
