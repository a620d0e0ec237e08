//! Target size parsing: `w2500`, `h900`, `r4` or a bare `2500`.

use crate::error::ResizeError;
use std::fmt;
use std::str::FromStr;

/// Fast model, good enough for most sources.
pub const DEFAULT_MODEL: &str = "realesr-animevideov3";
/// Detail model; only ships at 4x.
pub const DETAIL_MODEL: &str = "realesrgan-x4plus-anime";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Width,
    Height,
    /// Width when the source is landscape or square, height otherwise.
    Auto,
    /// Plain upscale by the magnitude, no dimension checks.
    Ratio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSpec {
    pub mode: ResizeMode,
    pub target: u32,
}

impl ResizeSpec {
    pub fn new(mode: ResizeMode, target: u32) -> Self {
        Self { mode, target }
    }

    /// Zero never triggers the downscale pass.
    pub fn disables_downscale(&self) -> bool {
        self.mode != ResizeMode::Ratio && self.target == 0
    }
}

impl Default for ResizeSpec {
    fn default() -> Self {
        Self::new(ResizeMode::Width, 2500)
    }
}

impl FromStr for ResizeSpec {
    type Err = ResizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ResizeError::InvalidSpec(s.to_string());

        let (mode, digits) = match s.chars().next() {
            Some('w') | Some('W') => (ResizeMode::Width, &s[1..]),
            Some('h') | Some('H') => (ResizeMode::Height, &s[1..]),
            Some('r') | Some('R') => (ResizeMode::Ratio, &s[1..]),
            Some(c) if c.is_ascii_digit() => (ResizeMode::Auto, s),
            _ => return Err(invalid()),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let target: u32 = digits.parse().map_err(|_| invalid())?;

        if mode == ResizeMode::Ratio && !(2..=4).contains(&target) {
            return Err(ResizeError::InvalidRatio(target));
        }
        Ok(Self::new(mode, target))
    }
}

impl fmt::Display for ResizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ResizeMode::Width => write!(f, "w{}", self.target),
            ResizeMode::Height => write!(f, "h{}", self.target),
            ResizeMode::Ratio => write!(f, "r{}", self.target),
            ResizeMode::Auto => write!(f, "{}", self.target),
        }
    }
}
