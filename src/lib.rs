//! # plume-map
//!
//! Estimates the dispersion of an air pollutant around a source point from the mean
//! concentration and mean wind speed of measurement tables.
//!
//! ```no_run
//! use plume_map::{Dispersion, MeasurementsLoader, Pollutant, SourcePoint};
//!
//! # fn main() -> Result<(), plume_map::Error> {
//! let source: SourcePoint = "55.751244,37.618423".parse()?;
//! let means = MeasurementsLoader::default()
//!     .path("measurements.csv")
//!     .load()?
//!     .sample_means(Pollutant::No2)?;
//! let field = Dispersion::default().field(&source, &means);
//! println!("{}", field);
//! # Ok(())
//! # }
//! ```

pub mod dispersion;
mod error;
pub mod map;
pub mod measurements;
#[cfg(feature = "plot")]
pub mod plot;
pub mod source;

pub use dispersion::{compute_field, Dispersion, ScalarField};
pub use error::Error;
pub use map::MarkerMap;
pub use measurements::{Measurements, MeasurementsLoader, Pollutant, SampleMeans};
pub use source::SourcePoint;
