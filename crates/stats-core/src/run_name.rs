//! Run directory name grammar
//!
//! Run directories are named as underscore-joined segments, e.g.
//! `square_L12_b0.25_w1_ld025`. The third segment carries the inverse
//! temperature as a one-character label followed by a number.

use crate::error::{Error, Result};
use std::path::Path;

/// Position of the inverse-temperature segment
const BETA_SEGMENT: usize = 2;

/// A labeled numeric segment such as `L12` or `b0.25`
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameter {
    /// Alphabetic label
    pub label: String,
    /// Value text exactly as written
    pub raw: String,
    /// Parsed value
    pub value: f64,
}

/// A parsed run directory name
#[derive(Debug, Clone, PartialEq)]
pub struct RunName {
    /// The full base name
    pub name: String,
    /// Underscore-separated segments
    pub segments: Vec<String>,
    /// Inverse temperature text, echoed verbatim into output names
    pub beta: String,
    /// Parsed inverse temperature
    pub beta_value: f64,
}

impl RunName {
    /// Parse the base name of a run directory path
    ///
    /// Paths such as `.` or `runs/x/..` are resolved against the filesystem
    /// first, so the name is that of the directory they point at.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let invalid = |reason: String| Error::InvalidRunName {
            name: dir.display().to_string(),
            reason,
        };

        let resolved;
        let dir = if dir.file_name().is_some() {
            dir
        } else {
            resolved = dir
                .canonicalize()
                .map_err(|e| invalid(format!("cannot resolve path: {}", e)))?;
            resolved.as_path()
        };

        let name = dir
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| invalid("path has no UTF-8 base name".to_string()))?;
        Self::parse(name)
    }

    /// Parse a run name
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidRunName {
            name: name.to_string(),
            reason,
        };

        let segments: Vec<String> = name.split('_').map(str::to_string).collect();
        let token = segments.get(BETA_SEGMENT).ok_or_else(|| {
            invalid(format!(
                "expected at least {} '_'-separated segments, found {}",
                BETA_SEGMENT + 1,
                segments.len()
            ))
        })?;

        let mut chars = token.chars();
        let prefix = chars
            .next()
            .ok_or_else(|| invalid("inverse-temperature segment is empty".to_string()))?;
        if prefix.is_ascii_digit() || !prefix.is_ascii() {
            return Err(invalid(format!(
                "segment '{}' must start with a non-digit label character",
                token
            )));
        }

        let beta = chars.as_str().to_string();
        let beta_value = beta
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(format!("'{}' in segment '{}' is not a number", beta, token)))?;

        Ok(Self {
            name: name.to_string(),
            segments,
            beta,
            beta_value,
        })
    }

    /// All segments of the form `<letters><number>`
    pub fn parameters(&self) -> Vec<RunParameter> {
        self.segments
            .iter()
            .filter_map(|s| split_parameter(s))
            .collect()
    }

    /// Look up a labeled segment by its label
    pub fn parameter(&self, label: &str) -> Option<RunParameter> {
        self.parameters().into_iter().find(|p| p.label == label)
    }
}

fn split_parameter(segment: &str) -> Option<RunParameter> {
    let split = segment.find(|c: char| !c.is_ascii_alphabetic())?;
    let (label, raw) = segment.split_at(split);
    if label.is_empty() {
        return None;
    }
    let value = raw.parse::<f64>().ok()?;
    Some(RunParameter {
        label: label.to_string(),
        raw: raw.to_string(),
        value,
    })
}
