//! Pollution dispersion estimate
//!
//! The pollution level around the source is modeled as a 2D Gaussian centered on the
//! source displaced by the plume offset:
//!
//! ```text
//! c / (2π k² u) exp(-(dx² + dy²) / (2k²))
//! ```
//!
//! with `c` the mean concentration, `u` the mean wind speed and `k` the diffusion
//! coefficient. The field is sampled on a [GRID_SIZE]x[GRID_SIZE] grid spanning
//! ±[HALF_WINDOW] degrees around the source.

use itertools::{Itertools, MinMaxResult::MinMax};
use nalgebra::DMatrix;
use serde::Serialize;
use std::{
    f64::consts::PI,
    fmt,
    ops::{Add, AddAssign},
    path::Path,
};

use crate::{SampleMeans, SourcePoint};

/// Default diffusion coefficient
pub const DIFFUSION_COEFFICIENT: f64 = 1.86;
/// (longitude,latitude) displacement of the concentration peak from the source [deg]
pub const PLUME_OFFSET: (f64, f64) = (0.001213, 0.000918);
/// Number of samples along each axis
pub const GRID_SIZE: usize = 100;
/// Half width of the sampling window [deg]
pub const HALF_WINDOW: f64 = 0.01;

#[derive(thiserror::Error, Debug)]
pub enum DispersionError {
    #[error("cannot add fields sampled on different grids")]
    GridMismatch,
    #[error("failed to write the field to CSV")]
    Csv(#[from] csv::Error),
}
type Result<T> = std::result::Result<T, DispersionError>;

/// `n` evenly spaced samples over `[start, end]`, both ends included
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    let step = (end - start) / (n - 1) as f64;
    let mut samples: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
    if let Some(last) = samples.last_mut() {
        *last = end;
    }
    samples
}

/// Computes the dispersion field around the source
///
/// A zero wind speed is not rejected: the field is then infinite (or NaN for a zero
/// concentration) everywhere, see [ScalarField::is_finite].
pub fn compute_field(
    source_lat: f64,
    source_lon: f64,
    mean_concentration: f64,
    mean_wind_speed: f64,
    diffusion_coefficient: f64,
) -> ScalarField {
    let longitudes = linspace(source_lon - HALF_WINDOW, source_lon + HALF_WINDOW, GRID_SIZE);
    let latitudes = linspace(source_lat - HALF_WINDOW, source_lat + HALF_WINDOW, GRID_SIZE);
    let (peak_lon, peak_lat) = (source_lon + PLUME_OFFSET.0, source_lat + PLUME_OFFSET.1);
    let k2 = diffusion_coefficient * diffusion_coefficient;
    let scale = mean_concentration / (2. * PI * k2 * mean_wind_speed);
    let values = DMatrix::from_fn(GRID_SIZE, GRID_SIZE, |i, j| {
        let dx = longitudes[j] - peak_lon;
        let dy = latitudes[i] - peak_lat;
        scale * (-(dx * dx + dy * dy) / (2. * k2)).exp()
    });
    ScalarField {
        longitudes,
        latitudes,
        values,
    }
}

#[derive(Serialize)]
struct FieldRecord {
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Pollution level")]
    level: f64,
}

/// Pollution level sampled on a (longitude,latitude) grid
///
/// Rows are indexed by latitude and columns by longitude.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    longitudes: Vec<f64>,
    latitudes: Vec<f64>,
    values: DMatrix<f64>,
}
impl ScalarField {
    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }
    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }
    /// Returns the pollution level at latitude index `i` and longitude index `j`
    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }
    /// (latitude,longitude) indices of the grid cell nearest to (`lon`,`lat`)
    pub fn nearest(&self, lon: f64, lat: f64) -> (usize, usize) {
        let index = |axis: &[f64], x: f64| {
            let step = (axis[axis.len() - 1] - axis[0]) / (axis.len() - 1) as f64;
            ((x - axis[0]) / step).round().clamp(0., (axis.len() - 1) as f64) as usize
        };
        (index(&self.latitudes, lat), index(&self.longitudes, lon))
    }
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|x| x.is_finite())
    }
    /// Returns the (longitude,latitude) and the value of the field maximum
    pub fn peak(&self) -> Option<(f64, f64, f64)> {
        if !self.is_finite() {
            return None;
        }
        let k = self.values.iter().position_max_by(|a, b| a.total_cmp(b))?;
        // column-major storage
        let (i, j) = (k % self.values.nrows(), k / self.values.nrows());
        Some((self.longitudes[j], self.latitudes[i], self.values[(i, j)]))
    }
    pub fn minmax(&self) -> Option<(f64, f64)> {
        if !self.is_finite() {
            return None;
        }
        match self.values.iter().cloned().minmax() {
            MinMax(min, max) => Some((min, max)),
            _ => None,
        }
    }
    pub fn same_grid(&self, other: &Self) -> bool {
        self.longitudes == other.longitudes && self.latitudes == other.latitudes
    }
    /// Elementwise sum of two fields sampled on the same grid
    pub fn try_add(&self, other: &Self) -> Result<Self> {
        if !self.same_grid(other) {
            return Err(DispersionError::GridMismatch);
        }
        Ok(self + other)
    }
    /// Writes the field to a CSV file, one row per grid cell
    pub fn to_csv<P: AsRef<Path>>(&self, path: P, delimiter: u8) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(path)?;
        for (i, &latitude) in self.latitudes.iter().enumerate() {
            for (j, &longitude) in self.longitudes.iter().enumerate() {
                wtr.serialize(FieldRecord {
                    longitude,
                    latitude,
                    level: self.values[(i, j)],
                })?;
            }
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}
impl Add for &ScalarField {
    type Output = ScalarField;

    fn add(self, rhs: Self) -> Self::Output {
        ScalarField {
            longitudes: self.longitudes.clone(),
            latitudes: self.latitudes.clone(),
            values: &self.values + &rhs.values,
        }
    }
}
impl Add for ScalarField {
    type Output = ScalarField;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += &rhs;
        self
    }
}
impl AddAssign<&ScalarField> for ScalarField {
    fn add_assign(&mut self, rhs: &ScalarField) {
        self.values += &rhs.values;
    }
}
impl fmt::Display for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let range = |x: &[f64]| (x[0], x[x.len() - 1]);
        writeln!(
            f,
            "dispersion field [{}x{}]:",
            self.values.nrows(),
            self.values.ncols()
        )?;
        writeln!(f, " - longitude: {:.6?}deg", range(&self.longitudes))?;
        writeln!(f, " - latitude : {:.6?}deg", range(&self.latitudes))?;
        match (self.peak(), self.minmax()) {
            (Some((lon, lat, value)), Some((min, max))) => {
                writeln!(f, " - peak     : {:.6e} @ ({:.6},{:.6})", value, lon, lat)?;
                write!(f, " - minmax   : ({:.6e}, {:.6e})", min, max)
            }
            _ => write!(f, " - non-finite values (zero wind speed?)"),
        }
    }
}

/// Dispersion model
#[derive(Debug, Clone, Copy)]
pub struct Dispersion {
    diffusion_coefficient: f64,
}
impl Default for Dispersion {
    fn default() -> Self {
        Self {
            diffusion_coefficient: DIFFUSION_COEFFICIENT,
        }
    }
}
impl Dispersion {
    pub fn new(diffusion_coefficient: f64) -> Self {
        Self {
            diffusion_coefficient,
        }
    }
    pub fn diffusion_coefficient(&self) -> f64 {
        self.diffusion_coefficient
    }
    /// Dispersion field for one set of measurements
    pub fn field(&self, source: &SourcePoint, means: &SampleMeans) -> ScalarField {
        if means.wind_speed == 0. {
            log::warn!("zero mean wind speed, the dispersion field is not finite");
        }
        compute_field(
            source.latitude,
            source.longitude,
            means.concentration,
            means.wind_speed,
            self.diffusion_coefficient,
        )
    }
    /// Sum of the dispersion fields of several sets of measurements
    ///
    /// Returns `None` if `means` is empty.
    pub fn aggregate<'a, I>(&self, source: &SourcePoint, means: I) -> Option<ScalarField>
    where
        I: IntoIterator<Item = &'a SampleMeans>,
    {
        means
            .into_iter()
            .map(|means| self.field(source, means))
            .reduce(|sum, field| sum + field)
    }
}
