//! Stateless mappings from a numeric domain onto a visual range.

use anyhow::{anyhow, Result};
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: [f64; 2],
    range: [f64; 2],
    clamp: bool,
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self { domain, range, clamp: false }
    }

    /// Inputs outside the domain map to the nearest range end.
    pub fn clamped(mut self) -> Self {
        self.clamp = true;
        self
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    pub fn apply(&self, input: f64) -> f64 {
        let t = normalize(self.domain[0], self.domain[1], input, self.clamp);
        lerp(self.range[0], self.range[1], t)
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        linear_ticks(self.domain[0], self.domain[1], count)
    }
}

/// Base-10 logarithmic scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogScale {
    domain: [f64; 2],
    range: [f64; 2],
}

impl LogScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Result<Self> {
        if domain[0] <= 0.0 || domain[1] <= 0.0 {
            return Err(anyhow!("Log scale domain must be strictly positive: {:?}", domain));
        }
        Ok(Self { domain, range })
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    /// Non-positive input has no logarithm and lands on the start of the range.
    pub fn apply(&self, input: f64) -> f64 {
        if input.is_nan() || input <= 0.0 {
            return self.range[0];
        }
        let t = normalize(self.domain[0].log10(), self.domain[1].log10(), input.log10(), false);
        lerp(self.range[0], self.range[1], t)
    }

    /// Powers of ten inside the domain.
    pub fn ticks(&self) -> Vec<f64> {
        let lo = self.domain[0].min(self.domain[1]).log10().ceil() as i32;
        let hi = self.domain[0].max(self.domain[1]).log10().floor() as i32;
        (lo..=hi).map(|e| 10f64.powi(e)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(anyhow!("Invalid hex colour: {}", hex));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| anyhow!("Invalid hex colour {}: {}", hex, e))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Rec. 601 luma, 0..=255.
    pub fn luma(self) -> f64 {
        0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Two-stop RGB gradient over a numeric domain. Always clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    domain: [f64; 2],
    range: [Rgb; 2],
}

impl ColorScale {
    pub fn new(domain: [f64; 2], range: [Rgb; 2]) -> Self {
        Self { domain, range }
    }

    pub fn range(&self) -> [Rgb; 2] {
        self.range
    }

    pub fn apply(&self, input: f64) -> Rgb {
        let t = normalize(self.domain[0], self.domain[1], input, true);
        let [from, to] = self.range;
        let channel = |a: u8, b: u8| lerp(a as f64, b as f64, t).round().clamp(0.0, 255.0) as u8;
        Rgb::new(channel(from.r, to.r), channel(from.g, to.g), channel(from.b, to.b))
    }
}

/// Position of `x` within `[a, b]` as a fraction. A degenerate domain maps to the midpoint.
fn normalize(a: f64, b: f64, x: f64, clamp: bool) -> f64 {
    let span = b - a;
    if span == 0.0 {
        return 0.5;
    }
    let t = (x - a) / span;
    if clamp {
        t.clamp(0.0, 1.0)
    } else {
        t
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let raw = (stop - start).abs() / count.max(1) as f64;
    let mut step = 10f64.powf(raw.log10().floor());
    let error = raw / step;
    if error >= 50f64.sqrt() {
        step *= 10.0;
    } else if error >= 10f64.sqrt() {
        step *= 5.0;
    } else if error >= 2f64.sqrt() {
        step *= 2.0;
    }
    step
}

/// Round-number ticks (1, 2 or 5 times a power of ten) covering the domain.
fn linear_ticks(a: f64, b: f64, count: usize) -> Vec<f64> {
    let (lo, hi) = (a.min(b), a.max(b));
    if lo == hi || count == 0 {
        return vec![lo];
    }
    let step = tick_step(lo, hi, count);
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}
