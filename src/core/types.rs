use std::fmt;
use std::ops::{Add, Sub};

/// Fixed-point price, scaled by 1e8. All hot-path arithmetic stays in raw
/// integer units; `f64` conversion exists for display and ingest edges only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Price(i64);

impl Price {
    pub const SCALE: i64 = 100_000_000;

    #[inline(always)]
    pub const fn from_raw(raw: i64) -> Self {
        Price(raw)
    }

    #[inline(always)]
    pub const fn new(integer: i64, fractional: i64) -> Self {
        Price(integer * Self::SCALE + fractional)
    }

    #[inline(always)]
    pub const fn zero() -> Self {
        Price(0)
    }

    #[inline]
    pub fn from_f64(value: f64) -> Self {
        Price((value * Self::SCALE as f64).round() as i64)
    }

    #[inline(always)]
    pub const fn raw(&self) -> i64 {
        self.0
    }

    #[inline]
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl Add for Price {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Price(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Price(self.0 - rhs.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer = self.0 / Self::SCALE;
        let fractional = (self.0 % Self::SCALE).abs();
        write!(f, "{}.{:08}", integer, fractional)
    }
}

/// Contract count. Unscaled, unlike `Price`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Quantity(i64);

impl Quantity {
    #[inline(always)]
    pub const fn from_raw(raw: i64) -> Self {
        Quantity(raw)
    }

    #[inline(always)]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline(always)]
    pub const fn raw(&self) -> i64 {
        self.0
    }

    #[inline(always)]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtraction clamped at zero; an execution must never drive a resting
    /// order negative.
    #[inline(always)]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        let diff = self.0 - rhs.0;
        Quantity(if diff > 0 { diff } else { 0 })
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Quantity(self.0 - rhs.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Nanosecond timestamp from the process clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    #[inline(always)]
    pub const fn from_nanos(nanos: u64) -> Self {
        Timestamp(nanos)
    }

    #[inline(always)]
    pub const fn nanos(&self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub const fn elapsed_since(&self, earlier: Timestamp) -> u64 {
        self.0 - earlier.0
    }
}

impl Sub for Timestamp {
    type Output = u64;

    #[inline(always)]
    fn sub(self, rhs: Self) -> u64 {
        self.0 - rhs.0
    }
}
