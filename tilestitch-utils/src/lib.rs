//! Small building blocks shared by the tilestitch crates: planar geometry,
//! map scale conversions and raster data-format sniffing.

mod envelope;
pub use envelope::{Coordinate, Envelope, EnvelopeParseError};

mod scale;
pub use scale::{DistanceUnit, EARTH_CIRCUMFERENCE, METERS_PER_INCH, Scale};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl DataFormat {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "image/jpeg" => Self::Jpeg,
            "png" | "image/png" => Self::Png,
            "gif" | "image/gif" => Self::Gif,
            "webp" | "image/webp" => Self::Webp,
            _ => None?,
        })
    }

    /// Sniffs the format from the leading magic bytes of an encoded image.
    #[must_use]
    pub fn detect(data: &[u8]) -> Option<Self> {
        Some(match data {
            v if v.starts_with(b"\x89\x50\x4E\x47\x0D\x0A\x1A\x0A") => Self::Png,
            v if v.starts_with(b"GIF87a") || v.starts_with(b"GIF89a") => Self::Gif,
            v if v.starts_with(b"\xFF\xD8\xFF") => Self::Jpeg,
            v if v.len() >= 12 && v.starts_with(b"RIFF") && &v[8..12] == b"WEBP" => Self::Webp,
            _ => None?,
        })
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        match *self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"\x89\x50\x4E\x47\x0D\x0A\x1A\x0A\0\0\0\x0DIHDR", Some(DataFormat::Png))]
    #[case(b"\xFF\xD8\xFF\xE0\0\x10JFIF", Some(DataFormat::Jpeg))]
    #[case(b"GIF89a\x01\0\x01\0", Some(DataFormat::Gif))]
    #[case(b"RIFF\x24\0\0\0WEBPVP8 ", Some(DataFormat::Webp))]
    #[case(b"<ServiceException>", None)]
    #[case(b"\x89", None)]
    #[case(b"", None)]
    fn test_data_format_detect(#[case] data: &[u8], #[case] expected: Option<DataFormat>) {
        assert_eq!(DataFormat::detect(data), expected);
    }

    #[rstest]
    #[case("PNG", Some(DataFormat::Png))]
    #[case("jpg", Some(DataFormat::Jpeg))]
    #[case("image/jpeg", Some(DataFormat::Jpeg))]
    #[case("image/webp", Some(DataFormat::Webp))]
    #[case("pbf", None)]
    fn test_data_format_parse(#[case] value: &str, #[case] expected: Option<DataFormat>) {
        assert_eq!(DataFormat::parse(value), expected);
    }

    #[test]
    fn test_content_type_round_trips_through_parse() {
        for format in [
            DataFormat::Png,
            DataFormat::Jpeg,
            DataFormat::Gif,
            DataFormat::Webp,
        ] {
            assert_eq!(DataFormat::parse(format.content_type()), Some(format));
        }
    }
}
