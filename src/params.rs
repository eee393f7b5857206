//! Parameter metadata for channel detection options
//!
//! This module provides metadata about the tunable options, enabling:
//! - Grid search over tolerance / margin / step
//! - Parameter documentation
//! - Building options from loose key/value input
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use chanfind::prelude::*;
//!
//! for param in DetectOptions::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut params = HashMap::new();
//! params.insert("tolerance_pct", 5.0);
//! let options = DetectOptions::with_params(&params).unwrap();
//! assert_eq!(options.time_margin, 6);
//! ```

use std::collections::HashMap;

use crate::{
  ChannelError, DetectOptions, Period, Result, Tolerance, DEFAULT_STEP, DEFAULT_TIME_MARGIN,
  DEFAULT_TOLERANCE_PCT,
};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Percentage, strictly positive
  Percent,
  /// Non-negative integer
  Count,
  /// Positive integer
  Period,
}

/// Metadata for a single option
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Option key (e.g., "tolerance_pct")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn percent(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Percent, default, range, description }
  }

  pub const fn count(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Count, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(ChannelError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Percent => {
        if value <= 0.0 {
          return Err(ChannelError::InvalidValue("Percent must be > 0"));
        }
        Ok(())
      },
      ParamType::Count => {
        if value < 0.0 || value.fract() != 0.0 {
          return Err(ChannelError::InvalidValue("Count must be a non-negative integer"));
        }
        Ok(())
      },
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(ChannelError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Types whose configuration can be discovered and built from key/value pairs
pub trait Parameterized: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a value from a HashMap
  ///
  /// Missing parameters use their default values. Supplied values must lie
  /// within their [`ParamMeta`] range.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

static DETECT_PARAMS: [ParamMeta; 3] = [
  ParamMeta::percent(
    "tolerance_pct",
    DEFAULT_TOLERANCE_PCT,
    (1.0, 10.0, 0.5),
    "Max relative deviation error of a matching channel touch, in percent",
  ),
  ParamMeta::count(
    "time_margin",
    DEFAULT_TIME_MARGIN as f64,
    (0.0, 12.0, 1.0),
    "Positions excluded around a candidate when searching its match",
  ),
  ParamMeta::period(
    "step",
    DEFAULT_STEP as f64,
    (10.0, 60.0, 10.0),
    "Window length increment of the trailing-window scan",
  ),
];

impl Parameterized for DetectOptions {
  fn param_meta() -> &'static [ParamMeta] {
    &DETECT_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    for meta in &DETECT_PARAMS {
      if let Some(&value) = params.get(meta.name) {
        meta.validate(value)?;
      }
    }

    let options = DetectOptions {
      tolerance: get_tolerance(params, "tolerance_pct", DEFAULT_TOLERANCE_PCT)?,
      time_margin: get_count(params, "time_margin", DEFAULT_TIME_MARGIN)?,
      step: get_period(params, "step", DEFAULT_STEP)?,
    };
    options.validate()?;
    Ok(options)
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Tolerance from params with default fallback
pub fn get_tolerance(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Tolerance> {
  let value = params.get(key).copied().unwrap_or(default);
  Tolerance::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 0.0 || value.fract() != 0.0 {
    return Err(ChannelError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Helper to get a non-negative count from params with default fallback
pub fn get_count(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<usize> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
    return Err(ChannelError::InvalidValue("Count must be a non-negative integer"));
  }
  Ok(value as usize)
}

// ============================================================
// TESTS
// ============================================================
