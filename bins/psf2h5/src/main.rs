use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use psfbin::memory::MemorySink;
use psfbin::sink::Values;

#[cfg(feature = "hdf5")]
mod h5;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let data = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read input file {:?}.", args.input))?;

    match args.out {
        Some(out) => convert(&data, &out),
        None => dump(&data, args.limit),
    }
}

/// Arguments to `psf2h5`.
#[derive(Parser)]
#[command(
    version,
    about,
    long_about = "Convert Cadence PSF binary simulation output to an HDF5 file \
                  with one dataset per signal and properties attached as attributes"
)]
struct Args {
    /// The input PSF binary file.
    input: PathBuf,

    /// The path where the output HDF5 file should be saved.
    ///
    /// If the file already exists, it will be overwritten.
    /// If unspecified, a summary of the decoded file is printed instead.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Maximum number of points to print per signal in summary mode.
    #[arg(long, default_value_t = 4)]
    limit: usize,
}

#[cfg(feature = "hdf5")]
fn convert(data: &[u8], out: &std::path::Path) -> anyhow::Result<()> {
    let mut sink = h5::Hdf5Sink::create(out)
        .with_context(|| format!("Failed to create output file {:?}.", out))?;
    let decoded = psfbin::parse(data, &mut sink).context("Failed to decode PSF file.")?;
    eprintln!(
        "wrote {} signal(s), {} point(s) each, to {:?}",
        decoded.sweeps.len() + decoded.traces.len(),
        decoded.num_points,
        out
    );
    Ok(())
}

#[cfg(not(feature = "hdf5"))]
fn convert(_data: &[u8], _out: &std::path::Path) -> anyhow::Result<()> {
    anyhow::bail!(
        "psf2h5 was built without HDF5 support; rebuild with `--features hdf5`, \
         or omit --out to print a summary"
    )
}

/// Decodes into memory and prints a human-readable summary.
fn dump(data: &[u8], limit: usize) -> anyhow::Result<()> {
    let mut sink = MemorySink::new();
    let decoded = psfbin::parse(data, &mut sink).context("Failed to decode PSF file.")?;

    println!("header:");
    for (name, value) in decoded.header.iter() {
        println!("  {name} = {value}");
    }
    println!("mode: {:?}", decoded.value_mode);

    for (name, dataset) in sink.datasets.iter() {
        println!(
            "{name}: {} point(s), {}",
            dataset.values.len(),
            preview(&dataset.values, limit)
        );
        for (pname, pvalue) in dataset.properties.iter() {
            println!("  {pname} = {pvalue}");
        }
    }
    Ok(())
}

/// The first `limit` points of a column, with an ellipsis if truncated.
fn preview(values: &Values, limit: usize) -> String {
    fn fmt<T: std::fmt::Debug>(v: &[T], limit: usize) -> String {
        let shown: Vec<String> = v.iter().take(limit).map(|x| format!("{x:?}")).collect();
        let ellipsis = if v.len() > limit { ", ..." } else { "" };
        format!("[{}{}]", shown.join(", "), ellipsis)
    }

    match values {
        Values::Int8(v) => fmt(v, limit),
        Values::Int32(v) => fmt(v, limit),
        Values::Real(v) => fmt(v, limit),
        Values::Complex(v) => fmt(v, limit),
        Values::Struct(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(name, column)| format!("{name}: {}", preview(column, limit)))
                .collect();
            format!("{{ {} }}", fields.join(", "))
        }
    }
}
