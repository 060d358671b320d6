use anyhow::Context;
use glob::glob;
use plume_map::{
    measurements::MeasurementsError, Dispersion, MarkerMap, MeasurementsLoader, Pollutant,
    SourcePoint,
};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "plume-map",
    about = "Air pollution dispersion around a source point"
)]
struct Opt {
    /// Measurements CSV files or glob patterns [default: $PLUME_MEASUREMENTS or measurements.csv]
    files: Vec<String>,
    /// Source coordinates: "<latitude>,<longitude>" [deg]
    #[structopt(short, long)]
    source: SourcePoint,
    /// Pollutant: nh3, co, no2 or dust
    #[structopt(short, long, default_value = "nh3")]
    pollutant: Pollutant,
    /// CSV field delimiter
    #[structopt(short, long, default_value = ";")]
    delimiter: char,
    /// Wind speed column name
    #[structopt(long, default_value = "wind_speed")]
    wind_column: String,
    /// Diffusion coefficient
    #[structopt(short = "k", long, default_value = "1.86")]
    diffusion: f64,
    /// Save the 3D surface plot to a PNG file
    #[structopt(long)]
    png: Option<PathBuf>,
    /// Save the source map to an HTML file
    #[structopt(long)]
    map: Option<PathBuf>,
    /// Save the dispersion field to a CSV file
    #[structopt(long)]
    csv: Option<PathBuf>,
    /// Display the measurements summary
    #[structopt(long)]
    summary: bool,
}

/// Expands the glob patterns, patterns without a match are kept as plain paths
fn data_paths(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = vec![];
    for pattern in patterns {
        let matches = glob(pattern)
            .with_context(|| format!("invalid file pattern {:?}", pattern))?
            .collect::<Result<Vec<_>, _>>()?;
        if matches.is_empty() {
            paths.push(PathBuf::from(pattern));
        } else {
            paths.extend(matches);
        }
    }
    Ok(paths)
}

/// Logger reading its filter from `env`, warnings are shown when it is not set
fn logger(env: &str) -> env_logger::Builder {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(env, "warn"))
}

fn main() -> anyhow::Result<()> {
    logger(env_logger::DEFAULT_FILTER_ENV).init();
    let opt = Opt::from_args();

    let delimiter = u8::try_from(opt.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .context("the CSV delimiter must be an ASCII character")?;

    let loaders: Vec<_> = if opt.files.is_empty() {
        vec![MeasurementsLoader::default()]
    } else {
        data_paths(&opt.files)?
            .into_iter()
            .map(|path| MeasurementsLoader::default().path(path))
            .collect()
    };

    println!("Source: {}", opt.source);
    let means = loaders
        .into_iter()
        .map(|loader| {
            let measurements = loader
                .delimiter(delimiter)
                .wind_speed_column(opt.wind_column.as_str())
                .load()?;
            if opt.summary {
                measurements.summary();
            }
            let means = measurements
                .sample_means(opt.pollutant)
                .with_context(|| format!("failed to reduce {}", measurements.filename))?;
            println!(
                " - {}: mean {} = {:.6}, mean wind speed = {:.3}",
                measurements.filename, opt.pollutant, means.concentration, means.wind_speed
            );
            Ok(means)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let field = Dispersion::new(opt.diffusion)
        .aggregate(&opt.source, &means)
        .ok_or(MeasurementsError::NoFile)?;
    println!("{}", field);

    if let Some(path) = opt.csv {
        field.to_csv(&path, delimiter)?;
        println!("Field saved to {:?}", path);
    }
    if let Some(path) = opt.map {
        MarkerMap::new(opt.source)
            .title(format!("{} source", opt.pollutant.title()))
            .popup(format!("{} source: {}", opt.pollutant.title(), opt.source))
            .write(&path)?;
        println!("Map saved to {:?}", path);
    }
    #[cfg(feature = "plot")]
    if let Some(path) = opt.png {
        let title = format!("{} Distribution", opt.pollutant.title());
        plume_map::plot::render_surface(&field, &title, &path)?;
        println!("Surface plot saved to {:?}", path);
    }
    #[cfg(not(feature = "plot"))]
    if opt.png.is_some() {
        log::warn!("built without the `plot` feature, no surface plot saved");
    }

    Ok(())
}
