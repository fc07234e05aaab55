//! Coordinate types for the scanned universe.
//!
//! A sector is addressed by a `(galaxy, system)` pair. Galaxies are bounded by
//! the server configuration, systems by [`MAX_SYSTEM`].

use crate::error::CoreError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Highest system number within a galaxy.
pub const MAX_SYSTEM: u16 = 499;

/// Player id the server uses for the local player's own view marker.
///
/// Rows carrying it never describe a distinct account.
pub const NO_PLAYER_ID: i64 = 99_999;

/// Validated galaxy number (1-based).
///
/// Only [`Galaxy::new`] can build one since the bound depends on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Galaxy(u8);

impl Galaxy {
    /// Create a galaxy number, checking it against the server's upper bound.
    ///
    /// # Errors
    /// Returns `CoreError::Validation` if `value` is 0 or above `max`.
    pub fn new(value: u8, max: u8) -> Result<Self, CoreError> {
        if value == 0 || value > max {
            return Err(CoreError::Validation(format!(
                "invalid galaxy {value}: must be between 1 and {max}"
            )));
        }
        Ok(Self(value))
    }

    /// Every galaxy from 1 up to and including `max`.
    pub fn all(max: u8) -> impl Iterator<Item = Self> {
        (1..=max).map(Self)
    }

    /// Get the inner value.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Galaxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive, non-empty range of system numbers.
///
/// Parsed from a single value (`"7"`) or a contiguous range (`"3-9"`), and
/// serialized in the same form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SystemRange {
    start: u16,
    end: u16,
}

impl SystemRange {
    /// Create a range, validating `1 <= start <= end <= MAX_SYSTEM`.
    ///
    /// # Errors
    /// Returns `CoreError::Validation` for empty, reversed or out-of-bound ranges.
    pub fn new(start: u16, end: u16) -> Result<Self, CoreError> {
        if start == 0 || end > MAX_SYSTEM {
            return Err(CoreError::Validation(format!(
                "invalid systems {start}-{end}: must be within 1-{MAX_SYSTEM}"
            )));
        }
        if start > end {
            return Err(CoreError::Validation(format!(
                "invalid systems {start}-{end}: start is after end"
            )));
        }
        Ok(Self { start, end })
    }

    /// A range holding exactly one system.
    pub fn single(system: u16) -> Result<Self, CoreError> {
        Self::new(system, system)
    }

    /// The whole galaxy, `1-MAX_SYSTEM`.
    #[must_use]
    pub fn full() -> Self {
        Self {
            start: 1,
            end: MAX_SYSTEM,
        }
    }

    /// First system of the range.
    #[must_use]
    pub fn start(&self) -> u16 {
        self.start
    }

    /// Last system of the range (inclusive).
    #[must_use]
    pub fn end(&self) -> u16 {
        self.end
    }

    /// Number of systems covered.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    /// Always false; ranges are validated non-empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over every system in the range.
    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }
}

impl Default for SystemRange {
    fn default() -> Self {
        Self::full()
    }
}

impl FromStr for SystemRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static RANGE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = RANGE_REGEX
            .get_or_init(|| Regex::new(r"^\s*(\d+)\s*(?:-\s*(\d+)\s*)?$").expect("valid regex"));

        let captures = regex.captures(s).ok_or_else(|| {
            CoreError::Validation(format!(
                "invalid systems '{s}': expected a number or a range like 3-9"
            ))
        })?;

        let parse = |m: regex::Match<'_>| {
            m.as_str().parse::<u16>().map_err(|_| {
                CoreError::Validation(format!("invalid systems '{s}': value out of range"))
            })
        };

        let start = parse(captures.get(1).expect("group 1 always participates"))?;
        let end = match captures.get(2) {
            Some(m) => parse(m)?,
            None => start,
        };

        Self::new(start, end)
    }
}

impl TryFrom<String> for SystemRange {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SystemRange> for String {
    fn from(range: SystemRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for SystemRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// One sector of the universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    /// Galaxy number
    pub galaxy: u8,
    /// System number within the galaxy
    pub system: u16,
}

impl Coordinate {
    /// Create a coordinate from a validated galaxy and a system number.
    #[must_use]
    pub fn new(galaxy: Galaxy, system: u16) -> Self {
        Self {
            galaxy: galaxy.get(),
            system,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.galaxy, self.system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_system() {
        let range: SystemRange = "7".parse().expect("parse single system");
        assert_eq!(range.start(), 7);
        assert_eq!(range.end(), 7);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![7]);
        assert_eq!(range.to_string(), "7");
    }

    #[test]
    fn test_inclusive_range() {
        let range: SystemRange = "3-9".parse().expect("parse range");
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(range.len(), 7);
        assert_eq!(range.to_string(), "3-9");
    }

    #[test]
    fn test_invalid_ranges() {
        for token in ["9-3", "abc", "", "0", "3-", "-3", "1-500", "70000", "3-9-12"] {
            let result = token.parse::<SystemRange>();
            assert!(
                matches!(result, Err(CoreError::Validation(_))),
                "Should fail for: {token:?}"
            );
        }
    }

    #[test]
    fn test_deserialize_validates() {
        #[derive(Debug, Deserialize, Serialize)]
        struct Job {
            systems: SystemRange,
        }

        let job: Job = toml::from_str(r#"systems = "3-9""#).expect("valid range");
        assert_eq!(job.systems, SystemRange::new(3, 9).expect("valid range"));
        assert_eq!(
            toml::to_string(&job).expect("serialize").trim(),
            r#"systems = "3-9""#
        );

        for raw in [r#"systems = "9-3""#, r#"systems = "0""#, "systems = 7"] {
            assert!(toml::from_str::<Job>(raw).is_err(), "Should fail for: {raw}");
        }
    }

    #[test]
    fn test_full_range() {
        let range = SystemRange::full();
        assert_eq!(range.start(), 1);
        assert_eq!(range.end(), MAX_SYSTEM);
        assert_eq!(range.len(), 499);
        assert_eq!(SystemRange::default(), range);
    }

    #[test]
    fn test_galaxy_bounds() {
        assert!(Galaxy::new(1, 5).is_ok());
        assert!(Galaxy::new(5, 5).is_ok());
        assert!(Galaxy::new(0, 5).is_err());
        assert!(Galaxy::new(6, 5).is_err());
        assert_eq!(Galaxy::all(3).map(Galaxy::get).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_coordinate_display() {
        let galaxy = Galaxy::new(4, 5).expect("valid galaxy");
        assert_eq!(Coordinate::new(galaxy, 123).to_string(), "4:123");
    }
}
