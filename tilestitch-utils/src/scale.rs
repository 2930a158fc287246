//! Map scale to ground resolution conversions.

use serde::{Deserialize, Serialize};

/// Length of the equator in meters (WGS84 semi-major axis).
pub const EARTH_CIRCUMFERENCE: f64 = 40_075_016.685_578_5;

/// One inch expressed in meters.
pub const METERS_PER_INCH: f64 = 0.0254;

/// Unit in which a coordinate reference system expresses its axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Meter,
    Foot,
    Degree,
}

impl DistanceUnit {
    #[must_use]
    pub fn meters_per_unit(self) -> f64 {
        match self {
            Self::Meter => 1.0,
            Self::Foot => 0.3048,
            Self::Degree => EARTH_CIRCUMFERENCE / 360.0,
        }
    }

    #[must_use]
    pub fn inches_per_unit(self) -> f64 {
        self.meters_per_unit() / METERS_PER_INCH
    }
}

/// A map scale denominator, i.e. the `N` in `1:N`.
///
/// ```
/// # use tilestitch_utils::{DistanceUnit, Scale};
/// // 1:10000 printed at 254 DPI is 1 meter per pixel
/// let res = Scale::new(10_000.0).to_resolution(DistanceUnit::Meter, 254.0);
/// assert!((res - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scale(f64);

impl Scale {
    #[must_use]
    pub fn new(denominator: f64) -> Self {
        Self(denominator)
    }

    #[must_use]
    pub fn denominator(self) -> f64 {
        self.0
    }

    /// World units covered by one pixel at the given DPI.
    #[must_use]
    pub fn to_resolution(self, unit: DistanceUnit, dpi: f64) -> f64 {
        self.0 / (dpi * unit.inches_per_unit())
    }

    /// Inverse of [`Scale::to_resolution`].
    #[must_use]
    pub fn from_resolution(resolution: f64, unit: DistanceUnit, dpi: f64) -> Self {
        Self(resolution * dpi * unit.inches_per_unit())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(DistanceUnit::Meter, 1.0)]
    #[case(DistanceUnit::Foot, 0.3048)]
    #[case(DistanceUnit::Degree, 111_319.490_793_273_6)]
    fn test_meters_per_unit(#[case] unit: DistanceUnit, #[case] expected: f64) {
        assert_relative_eq!(unit.meters_per_unit(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_wmts_standard_pixel() {
        // WMTS defines a 0.28mm pixel, so a 1:1 scale is 0.28mm per pixel
        let dpi = 25.4 / 0.28;
        assert_relative_eq!(
            Scale::new(1.0).to_resolution(DistanceUnit::Meter, dpi),
            0.000_28,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            Scale::new(559_082_264.028_717_8).to_resolution(DistanceUnit::Meter, dpi),
            156_543.033_928_041,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_from_resolution_is_inverse() {
        let scale = Scale::new(25_000.0);
        let res = scale.to_resolution(DistanceUnit::Degree, 96.0);
        assert_relative_eq!(
            Scale::from_resolution(res, DistanceUnit::Degree, 96.0).denominator(),
            25_000.0,
            epsilon = 1e-6
        );
    }
}
