use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use tilestitch_utils::{Coordinate, DistanceUnit, Envelope, Scale};

/// A coordinate reference system identified by its code, e.g. `EPSG:3857`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(String);

impl Crs {
    /// Creates a CRS from its code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The CRS code as given.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Unit of the CRS axes.
    ///
    /// Only the common geographic codes are recognized as degrees, everything
    /// else is assumed to be a projected CRS in meters.
    #[must_use]
    pub fn unit(&self) -> DistanceUnit {
        match self.0.to_ascii_uppercase().as_str() {
            "EPSG:4326" | "EPSG:4258" | "EPSG:4269" | "CRS:84" | "OGC:CRS84" => {
                DistanceUnit::Degree
            }
            _ => DistanceUnit::Meter,
        }
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::new("EPSG:3857")
    }
}

impl Display for Crs {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The map area to render: what part of the world, in which CRS, onto how many
/// pixels at which DPI.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    /// Requested bounds in world units of [`crs`](Self::crs).
    pub envelope: Envelope,
    /// CRS of the envelope and of the produced mosaic.
    pub crs: Crs,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Rendering DPI.
    pub dpi: f64,
}

impl MapView {
    /// Creates a view from explicit bounds.
    #[must_use]
    pub fn new(envelope: Envelope, crs: Crs, width: u32, height: u32, dpi: f64) -> Self {
        Self {
            envelope,
            crs,
            width,
            height,
            dpi,
        }
    }

    /// Creates a view centered on `center` at the given map scale.
    ///
    /// The bounds are derived from the pixel area: at `scale` and `dpi`, one
    /// pixel covers [`Scale::to_resolution`] world units.
    #[must_use]
    pub fn from_center(
        center: Coordinate,
        scale: Scale,
        crs: Crs,
        width: u32,
        height: u32,
        dpi: f64,
    ) -> Self {
        let resolution = scale.to_resolution(crs.unit(), dpi);
        let half_width = f64::from(width) * resolution / 2.0;
        let half_height = f64::from(height) * resolution / 2.0;
        let envelope = Envelope::new(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        );
        Self::new(envelope, crs, width, height, dpi)
    }

    /// World units per output pixel along the x axis.
    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.envelope.width() / f64::from(self.width)
    }

    /// Map scale of the view at its DPI.
    #[must_use]
    pub fn scale(&self) -> Scale {
        Scale::from_resolution(self.resolution(), self.crs.unit(), self.dpi)
    }
}
