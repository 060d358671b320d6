//! Pollution source coordinates

use std::{fmt, num::ParseFloatError, str::FromStr};

use crate::dispersion::PLUME_OFFSET;

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error(r#"expected "<latitude>,<longitude>", found {0:?}"#)]
    Format(String),
    #[error("failed to parse the {0} {1:?}")]
    Coordinate(&'static str, String, #[source] ParseFloatError),
    #[error("the {0} must be a finite number, found {1:?}")]
    NonFinite(&'static str, String),
}
type Result<T> = std::result::Result<T, SourceError>;

/// Latitude and longitude of the pollution source [deg]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePoint {
    pub latitude: f64,
    pub longitude: f64,
}
impl SourcePoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
    /// Parses latitude and longitude given separately
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self> {
        let coordinate = |name: &'static str, value: &str| {
            let x = value
                .trim()
                .parse::<f64>()
                .map_err(|e| SourceError::Coordinate(name, value.to_string(), e))?;
            if x.is_finite() {
                Ok(x)
            } else {
                Err(SourceError::NonFinite(name, value.to_string()))
            }
        };
        Ok(Self::new(
            coordinate("latitude", latitude)?,
            coordinate("longitude", longitude)?,
        ))
    }
    /// Returns the (longitude,latitude) of the modeled concentration peak
    pub fn peak(&self) -> (f64, f64) {
        (
            self.longitude + PLUME_OFFSET.0,
            self.latitude + PLUME_OFFSET.1,
        )
    }
}
impl FromStr for SourcePoint {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<_> = s.split([',', ';']).collect();
        match parts.as_slice() {
            [latitude, longitude] => Self::parse(latitude, longitude),
            _ => Err(SourceError::Format(s.to_string())),
        }
    }
}
impl fmt::Display for SourcePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}°N, {:.6}°E", self.latitude, self.longitude)
    }
}
