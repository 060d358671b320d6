use crate::{
    dispersion::DispersionError, map::MapError, measurements::MeasurementsError,
    source::SourceError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `source` module")]
    Source(#[from] SourceError),
    #[error("Error in the `measurements` module")]
    Measurements(#[from] MeasurementsError),
    #[error("Error in the `dispersion` module")]
    Dispersion(#[from] DispersionError),
    #[error("Error in the `map` module")]
    Map(#[from] MapError),
    #[cfg(feature = "plot")]
    #[error("Error in the `plot` module")]
    Plot(#[from] crate::plot::PlotError),
}
