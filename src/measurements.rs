//! Pollutant and wind speed measurements
//!
//! Loads the measurement tables (semicolon-delimited CSV files, optionally gzip or bzip2
//! compressed) and reduces them to the column means used by the dispersion model.

#[cfg(feature = "bzip2")]
use bzip2::bufread::BzDecoder;
use flate2::read::GzDecoder;
use itertools::{Itertools, MinMaxResult::MinMax};
use regex::Regex;
use std::{
    env,
    fs::File,
    io::{BufReader, Read},
    num::ParseFloatError,
    path::{Path, PathBuf},
    time::Instant,
};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Environment variable with the path to the default measurements file
pub const MEASUREMENTS_ENV: &str = "PLUME_MEASUREMENTS";
/// Measurements file used when neither a path nor [MEASUREMENTS_ENV] is given
pub const MEASUREMENTS_FILE: &str = "measurements.csv";
/// Default name of the wind speed column
pub const WIND_SPEED_COLUMN: &str = "wind_speed";

#[derive(thiserror::Error, Debug)]
pub enum MeasurementsError {
    #[error("failed to open the measurements file {0:?}")]
    Open(PathBuf, #[source] std::io::Error),
    #[error("failed to read the measurements")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize the CSV file")]
    Csv(#[from] csv::Error),
    #[error("missing decompression protocol for {0:?}")]
    Decompression(PathBuf),
    #[error("invalid column name {0:?}")]
    Header(String, #[source] regex::Error),
    #[error("no column matching {0:?} in [{1}]")]
    MissingColumn(String, String),
    #[error("column {column:?}, line {line}: {value:?} is not a number")]
    Value {
        column: String,
        line: u64,
        value: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("column {0:?} has no value")]
    NoData(String),
    #[error("no measurements file loaded")]
    NoFile,
}
type Result<T> = std::result::Result<T, MeasurementsError>;

/// Pollutant kinds
#[derive(EnumIter, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Pollutant {
    Nh3,
    Co,
    No2,
    Dust,
}
impl Pollutant {
    /// Capitalized name, e.g. "Nh3"
    pub fn title(&self) -> String {
        let name = self.to_string();
        let mut chars = name.chars();
        chars
            .next()
            .map(|c| c.to_uppercase().chain(chars).collect())
            .unwrap_or_default()
    }
}

/// Mean concentration and mean wind speed of a measurements file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleMeans {
    pub concentration: f64,
    pub wind_speed: f64,
}
impl SampleMeans {
    pub fn new(concentration: f64, wind_speed: f64) -> Self {
        Self {
            concentration,
            wind_speed,
        }
    }
}

/// Measurements table
///
/// The records are kept as read and a column is only parsed when it is requested,
/// so that unrelated columns (dates, station names, ...) never get in the way.
#[derive(Debug)]
pub struct Measurements {
    /// The file the measurements were loaded from
    pub filename: String,
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
    wind_speed_column: String,
}
impl Measurements {
    /// Reads measurements from any reader with the given field delimiter
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<_> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let records = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, csv::Error>>()?;
        Ok(Self {
            filename: String::new(),
            headers,
            records,
            wind_speed_column: WIND_SPEED_COLUMN.to_string(),
        })
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
    /// Returns the index of the first header matching `name`
    ///
    /// The match is case insensitive and tolerates a unit suffix: "NH3 (mg/m3)" matches
    /// "nh3" but "co2" does not match "co".
    pub fn find_column(&self, name: &str) -> Result<usize> {
        let re = Regex::new(&format!(r"(?i)^\s*{}(?:$|\W)", regex::escape(name.trim())))
            .map_err(|e| MeasurementsError::Header(name.to_string(), e))?;
        let mut matches = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| re.is_match(h))
            .map(|(i, _)| i);
        let idx = matches.next().ok_or_else(|| {
            MeasurementsError::MissingColumn(name.to_string(), self.headers.join(", "))
        })?;
        if matches.next().is_some() {
            log::warn!(
                "{}: several columns match {:?}, using {:?}",
                self.filename,
                name,
                self.headers[idx]
            );
        }
        Ok(idx)
    }
    /// Returns the values of a column, skipping empty cells
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.find_column(name)?;
        self.records
            .iter()
            .filter_map(|record| {
                record
                    .get(idx)
                    .filter(|value| !value.is_empty())
                    .map(|value| (record, value))
            })
            .map(|(record, value)| {
                value
                    .parse::<f64>()
                    .map_err(|source| MeasurementsError::Value {
                        column: self.headers[idx].clone(),
                        line: record.position().map_or(0, |p| p.line()),
                        value: value.to_string(),
                        source,
                    })
            })
            .collect()
    }
    /// Returns the mean of a column
    pub fn mean(&self, name: &str) -> Result<f64> {
        let values = self.column(name)?;
        if values.is_empty() {
            return Err(MeasurementsError::NoData(name.to_string()));
        }
        Ok(values.iter().sum::<f64>() / values.len() as f64)
    }
    /// Returns the mean wind speed
    pub fn wind_speed(&self) -> Result<f64> {
        self.mean(&self.wind_speed_column)
    }
    /// Returns the mean concentration of `pollutant` and the mean wind speed
    pub fn sample_means(&self, pollutant: Pollutant) -> Result<SampleMeans> {
        let means = SampleMeans::new(self.mean(&pollutant.to_string())?, self.wind_speed()?);
        log::debug!("{}: {} {:?}", self.filename, pollutant, means);
        Ok(means)
    }
    /// Returns the pollutants with a column in the table
    pub fn pollutants(&self) -> Vec<Pollutant> {
        Pollutant::iter()
            .filter(|p| self.find_column(&p.to_string()).is_ok())
            .collect()
    }
    pub fn summary(&self) {
        let stats = |x: &[f64]| {
            let n = x.len() as f64;
            let mean = x.iter().sum::<f64>() / n;
            let std = (x.iter().map(|x| x - mean).fold(0f64, |s, x| s + x * x) / n).sqrt();
            (mean, std)
        };
        let minmax = |x: &[f64]| match x.iter().cloned().minmax() {
            MinMax(min, max) => (min, max),
            _ => (x[0], x[0]),
        };

        println!("SUMMARY {}:", self.filename);
        println!(" - # of records: {}", self.len());
        println!(
            "    {:^16}: ({:^12}, {:^12})  ({:^12}, {:^12})",
            "COLUMN", "MEAN", "STD", "MIN", "MAX"
        );
        self.pollutants()
            .iter()
            .map(|p| p.to_string())
            .chain(std::iter::once(self.wind_speed_column.clone()))
            .for_each(|key| match self.column(&key) {
                Ok(value) if !value.is_empty() => {
                    println!(
                        "  - {:16}: {:>12.3?}  {:>12.3?}",
                        key,
                        stats(&value),
                        minmax(&value)
                    );
                }
                Ok(_) => println!("  - {:16}: no data", key),
                Err(err) => println!("  - {:16}: {}", key, err),
            });
    }
}

/// Measurements file loader
pub struct MeasurementsLoader {
    path: Option<PathBuf>,
    delimiter: u8,
    wind_speed_column: String,
}
impl Default for MeasurementsLoader {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: b';',
            wind_speed_column: WIND_SPEED_COLUMN.to_string(),
        }
    }
}
impl MeasurementsLoader {
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..self
        }
    }
    pub fn delimiter(self, delimiter: u8) -> Self {
        Self { delimiter, ..self }
    }
    pub fn wind_speed_column<S: Into<String>>(self, wind_speed_column: S) -> Self {
        Self {
            wind_speed_column: wind_speed_column.into(),
            ..self
        }
    }
    /// The file to load: the given path, else [MEASUREMENTS_ENV], else [MEASUREMENTS_FILE]
    pub fn data_path(&self) -> PathBuf {
        self.path
            .clone()
            .or_else(|| env::var(MEASUREMENTS_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(MEASUREMENTS_FILE))
    }
    pub fn load(self) -> Result<Measurements> {
        let path = self.data_path();
        let csv_file = File::open(&path).map_err(|e| MeasurementsError::Open(path.clone(), e))?;
        log::info!("Loading {:?}...", path);
        let now = Instant::now();
        let mut contents = String::new();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => GzDecoder::new(csv_file).read_to_string(&mut contents)?,
            #[cfg(feature = "bzip2")]
            Some("bz2") => BzDecoder::new(BufReader::new(csv_file)).read_to_string(&mut contents)?,
            #[cfg(not(feature = "bzip2"))]
            Some("bz2") => return Err(MeasurementsError::Decompression(path)),
            _ => BufReader::new(csv_file).read_to_string(&mut contents)?,
        };
        let mut measurements = Measurements::from_reader(contents.as_bytes(), self.delimiter)?;
        measurements.filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        measurements.wind_speed_column = self.wind_speed_column;
        log::info!(
            "... {} records loaded in {}ms",
            measurements.len(),
            now.elapsed().as_millis()
        );
        Ok(measurements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::{error::Error, fs, io::Write};

    const TABLE: &str = "date;NH3 (mg/m3);co;no2;co2;wind_speed
2024-05-01;0.2;1.5;;400;2.0
2024-05-02;0.4;2.5;0.03;410;4.0
2024-05-03;0.6;;0.05;420;6.0
";

    fn table() -> Measurements {
        Measurements::from_reader(TABLE.as_bytes(), b';').unwrap()
    }

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("plume-map_{}_{}", std::process::id(), name))
    }

    #[test]
    fn pollutant_names() {
        assert_eq!("NH3".parse::<Pollutant>().unwrap(), Pollutant::Nh3);
        assert_eq!("dust".parse::<Pollutant>().unwrap(), Pollutant::Dust);
        assert!("so2".parse::<Pollutant>().is_err());
        assert_eq!(Pollutant::No2.to_string(), "no2");
        assert_eq!(Pollutant::No2.title(), "No2");
        assert_eq!(Pollutant::iter().count(), 4);
    }

    #[test]
    fn header_matching() {
        let data = table();
        assert_eq!(data.len(), 3);
        assert_eq!(data.find_column("nh3").unwrap(), 1);
        assert_eq!(data.find_column("co").unwrap(), 2);
        assert_eq!(data.find_column("CO2").unwrap(), 4);
        assert!(matches!(
            data.find_column("dust"),
            Err(MeasurementsError::MissingColumn(..))
        ));
        assert_eq!(
            data.pollutants(),
            vec![Pollutant::Nh3, Pollutant::Co, Pollutant::No2]
        );
    }

    #[test]
    fn column_means() {
        let data = table();
        assert!((data.mean("nh3").unwrap() - 0.4).abs() < 1e-12);
        // empty cells are skipped
        assert_eq!(data.column("co").unwrap(), vec![1.5, 2.5]);
        assert!((data.mean("co").unwrap() - 2.).abs() < 1e-12);
        assert!((data.mean("no2").unwrap() - 0.04).abs() < 1e-12);
        let means = data.sample_means(Pollutant::Nh3).unwrap();
        assert!((means.concentration - 0.4).abs() < 1e-12);
        assert!((means.wind_speed - 4.).abs() < 1e-12);
    }

    #[test]
    fn missing_wind_speed() {
        let data = Measurements::from_reader("nh3;wind\n1;2\n".as_bytes(), b';').unwrap();
        assert!(matches!(
            data.sample_means(Pollutant::Nh3),
            Err(MeasurementsError::MissingColumn(..))
        ));
    }

    #[test]
    fn empty_column() {
        let data = Measurements::from_reader("dust;wind_speed\n;2\n;3\n".as_bytes(), b';').unwrap();
        assert!(matches!(
            data.mean("dust"),
            Err(MeasurementsError::NoData(_))
        ));
    }

    #[test]
    fn not_a_number() {
        let data =
            Measurements::from_reader("co;wind_speed\n1.0;2\nn/a;3\n".as_bytes(), b';').unwrap();
        match data.column("co") {
            Err(MeasurementsError::Value { column, line, value, .. }) => {
                assert_eq!(column, "co");
                assert_eq!(line, 3);
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn load_files() -> std::result::Result<(), Box<dyn Error>> {
        let plain = temp_path("plain.csv");
        fs::write(&plain, TABLE)?;
        let data = MeasurementsLoader::default().path(&plain).load()?;
        assert_eq!(data.filename, plain.file_name().unwrap().to_string_lossy());
        assert_eq!(data.len(), 3);

        let gz = temp_path("table.csv.gz");
        let mut encoder = GzEncoder::new(fs::File::create(&gz)?, Compression::default());
        encoder.write_all(TABLE.replace(';', ",").as_bytes())?;
        encoder.finish()?;
        let data = MeasurementsLoader::default()
            .path(&gz)
            .delimiter(b',')
            .load()?;
        assert!((data.wind_speed()? - 4.).abs() < 1e-12);

        fs::remove_file(plain)?;
        fs::remove_file(gz)?;
        Ok(())
    }

    #[test]
    fn custom_wind_column() -> std::result::Result<(), Box<dyn Error>> {
        let path = temp_path("wind.csv");
        fs::write(&path, "dust;Wind Speed (m/s)\n10;1\n20;3\n")?;
        let means = MeasurementsLoader::default()
            .path(&path)
            .wind_speed_column("wind speed")
            .load()?
            .sample_means(Pollutant::Dust)?;
        assert_eq!(means, SampleMeans::new(15., 2.));
        fs::remove_file(path)?;
        Ok(())
    }

    #[cfg(not(feature = "bzip2"))]
    #[test]
    fn bzip2_not_enabled() -> std::result::Result<(), Box<dyn Error>> {
        let path = temp_path("table.csv.bz2");
        fs::write(&path, TABLE)?;
        let result = MeasurementsLoader::default().path(&path).load();
        fs::remove_file(&path)?;
        assert!(matches!(result, Err(MeasurementsError::Decompression(p)) if p == path));
        Ok(())
    }

    #[cfg(feature = "bzip2")]
    #[test]
    fn load_bzip2() -> std::result::Result<(), Box<dyn Error>> {
        let path = temp_path("table.csv.bz2");
        let mut encoder =
            bzip2::write::BzEncoder::new(fs::File::create(&path)?, bzip2::Compression::default());
        encoder.write_all(TABLE.as_bytes())?;
        encoder.finish()?;
        let data = MeasurementsLoader::default().path(&path).load()?;
        assert_eq!(data.len(), 3);
        assert!((data.mean("nh3")? - 0.4).abs() < 1e-12);
        fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn missing_file() {
        let err = MeasurementsLoader::default()
            .path(temp_path("does-not-exist.csv"))
            .load()
            .unwrap_err();
        assert!(matches!(err, MeasurementsError::Open(..)));
    }
}
