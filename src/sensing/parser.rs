//! Sensor line grammar.
//!
//! The preferred form is a tagged reading, `LUX:<digits>`. Sensors that print
//! free-form text are still accepted: the first run of decimal digits in the
//! line is taken as the lux value.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{EngineError, EngineResult};
use crate::models::LightSample;

/// Parse a line, stamping the sample with the current time.
pub fn parse(line: &str) -> EngineResult<LightSample> {
    parse_at(line, Utc::now())
}

/// Parse a line into a sample observed at `observed_at`.
pub fn parse_at(line: &str, observed_at: DateTime<Utc>) -> EngineResult<LightSample> {
    // Patterns
    lazy_static! {
        static ref TAGGED_RE: Regex = Regex::new(r"LUX:(?P<lux>[0-9]+)").unwrap();
        static ref DIGITS_RE: Regex = Regex::new(r"[0-9]+").unwrap();
    }

    let digits = match TAGGED_RE.captures(line) {
        Some(capture) => capture.name("lux").map(|m| m.as_str()),
        None => DIGITS_RE.find(line).map(|m| m.as_str()),
    };

    // Runs too long for a u32 are rejected rather than saturated
    let lux = digits
        .and_then(|raw| raw.parse::<u32>().ok())
        .ok_or_else(|| EngineError::malformed(line))?;

    Ok(LightSample::new(lux, observed_at))
}
