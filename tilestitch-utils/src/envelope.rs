//! Planar geometry in world (CRS) units.
//!
//! This module provides the [`Coordinate`] and [`Envelope`] types used to
//! describe map views, source extents and the bounds of individual tiles.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A point in world units of some coordinate reference system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis aligned rectangle in world units.
///
/// Unlike a tile rectangle, the envelope is continuous: `min` and `max` are the
/// real corners of the area. An envelope with `max <= min` on either axis is
/// considered empty.
///
/// Serialized as a `[min_x, min_y, max_x, max_y]` array.
///
/// # Examples
///
/// ```
/// # use tilestitch_utils::Envelope;
/// let env = Envelope::new(0.0, 0.0, 2.0, 1.0);
/// assert_eq!(env.width(), 2.0);
/// assert!(!env.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    #[must_use]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn min(&self) -> Coordinate {
        Coordinate::new(self.min_x, self.min_y)
    }

    #[must_use]
    pub fn max(&self) -> Coordinate {
        Coordinate::new(self.max_x, self.max_y)
    }

    /// True when the envelope has no area, including NaN bounds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Inclusive point-in-rectangle test.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }
}

impl From<[f64; 4]> for Envelope {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Envelope> for [f64; 4] {
    fn from(v: Envelope) -> Self {
        [v.min_x, v.min_y, v.max_x, v.max_y]
    }
}

impl Display for Envelope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum EnvelopeParseError {
    #[error("Envelope must have exactly 4 comma separated values, but '{0}' has {1}")]
    WrongValueCount(String, usize),

    #[error("Unable to parse '{1}' as a number in envelope '{0}'")]
    InvalidNumber(String, String),

    #[error("Envelope '{0}' has its minimum corner above or right of its maximum corner")]
    Inverted(String),
}

impl FromStr for Envelope {
    type Err = EnvelopeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(EnvelopeParseError::WrongValueCount(
                s.to_string(),
                parts.len(),
            ));
        }
        let mut values = [0.0; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| EnvelopeParseError::InvalidNumber(s.to_string(), (*part).to_string()))?;
        }
        let env = Self::from(values);
        if env.min_x > env.max_x || env.min_y > env.max_y {
            return Err(EnvelopeParseError::Inverted(s.to_string()));
        }
        Ok(env)
    }
}
