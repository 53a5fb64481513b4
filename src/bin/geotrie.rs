use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use geotrie::convert::{convert, ConvertError, ConvertOptions};
use geotrie::format::{detect_format, format_names, lookup_format, Format};
use geotrie::metadata::IpVersion;
use geotrie::source::{MmapSource, ReaderSource};
use geotrie::verify::VerificationProgress;
use std::fs;
use std::io::Write;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "geotrie")]
#[command(about = "Read, convert and verify trie-based GeoIP databases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a GeoIP database from one format to another
    Convert {
        /// Input database file
        #[arg(value_name = "DATABASE")]
        input: PathBuf,

        /// Output database file
        #[arg(value_name = "TARGET")]
        output: PathBuf,

        /// Input format (auto detects)
        #[arg(short = 'I', long, default_value = "auto")]
        in_format: String,

        /// Output format
        #[arg(short = 'O', long)]
        out_format: String,

        /// IP version (4|6)
        #[arg(short = 'i', long, default_value_t = 4)]
        ip_version: u8,

        /// Verify the conversion by checking all records
        #[arg(short = 'V', long)]
        verify: bool,

        /// Overwrite existing output files
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Print information about a GeoIP database file
    Info {
        /// Database file
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// Database format
        #[arg(short = 'f', long, default_value = "auto")]
        format: String,
    },

    /// Look up GeoIP information for an IP address
    Lookup {
        /// IP address to look up
        #[arg(value_name = "IP")]
        ip: String,

        /// Database file
        #[arg(short = 'd', long)]
        db: PathBuf,

        /// Database format
        #[arg(short = 'f', long, default_value = "auto")]
        format: String,

        /// Print the detected format and the matching network
        #[arg(short = 'v', long)]
        verbose: bool,
    },

    /// Print version and license information
    Version,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            in_format,
            out_format,
            ip_version,
            verify,
            force,
        } => cmd_convert(
            input, output, in_format, out_format, ip_version, verify, force,
        ),
        Commands::Info { database, format } => cmd_info(database, format),
        Commands::Lookup {
            ip,
            db,
            format,
            verbose,
        } => cmd_lookup(ip, db, format, verbose),
        Commands::Version => cmd_version(),
    }
}

/// Open the database file and resolve the requested format, auto-detecting
/// when asked to
fn open_source(path: &Path, format_name: &str) -> Result<(Arc<dyn ReaderSource>, Arc<dyn Format>)> {
    let source: Arc<dyn ReaderSource> = Arc::new(
        MmapSource::open(path)
            .with_context(|| format!("failed to open database: {}", path.display()))?,
    );

    let format = if format_name == "auto" {
        detect_format(&source).with_context(|| {
            format!(
                "could not detect database format (known formats: {})",
                format_names().join(", ")
            )
        })?
    } else {
        lookup_format(format_name)
            .with_context(|| format!("unknown format: {}", format_name))?
    };

    Ok((source, format))
}

#[allow(clippy::too_many_arguments)]
fn cmd_convert(
    input: PathBuf,
    output: PathBuf,
    in_format: String,
    out_format: String,
    ip_version: u8,
    verify: bool,
    force: bool,
) -> Result<()> {
    if let Ok(output_info) = fs::metadata(&output) {
        if output_info.is_dir() {
            bail!("target is a directory");
        }
        if !force {
            bail!("target file exists");
        }
    }

    let ip_version = match ip_version {
        4 => IpVersion::V4,
        6 => IpVersion::V6,
        _ => bail!("unsupported IP version: {}", ip_version),
    };

    let source: Arc<dyn ReaderSource> = Arc::new(
        MmapSource::open(&input)
            .with_context(|| format!("failed to open database: {}", input.display()))?,
    );

    let input_format = if in_format == "auto" {
        None
    } else {
        Some(in_format.as_str())
    };

    // progress reports arrive on a channel; a render thread turns them into
    // a single stderr status line
    let (progress_sender, progress_receiver) = mpsc::channel::<VerificationProgress>();
    let progress_thread = verify.then(|| {
        thread::spawn(move || {
            let mut rendered = false;
            for report in progress_receiver {
                if report.total_records == 0 {
                    continue;
                }
                eprint!(
                    "\rverifying: {}/{} records ({}%)",
                    report.checked_records,
                    report.total_records,
                    report.checked_records * 100 / report.total_records,
                );
                rendered = true;
            }
            if rendered {
                eprintln!();
            }
        })
    });

    println!("starting conversion of {}...", input.display());

    let mut buffer = Vec::new();
    let result = convert(
        source,
        &ConvertOptions {
            input_format,
            output_format: &out_format,
            ip_version,
            verify,
        },
        verify.then_some(&progress_sender),
        &mut buffer,
    );

    drop(progress_sender);
    if let Some(handle) = progress_thread {
        let _ = handle.join();
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(ConvertError::Verification(failure)) => {
            for (i, error) in failure.errors.iter().enumerate() {
                println!("error #{}: {}", i + 1, error);
            }
            bail!("verification failed with {} errors", failure.errors.len());
        }
        Err(ConvertError::Database(err)) => return Err(err.into()),
    };

    println!("detected input format: {}", summary.input_format);
    println!("tree generated after {:.2?}", summary.tree_elapsed);
    println!("converted {} records", summary.record_count);
    println!("conversion finished after {:.2?}", summary.convert_elapsed);

    println!("starting write of output file...");
    let write_start = Instant::now();
    let mut output_file = fs::File::create(&output)
        .with_context(|| format!("failed to create output file: {}", output.display()))?;
    output_file.write_all(&buffer)?;
    println!("write finished after {:.2?}", write_start.elapsed());

    println!("wrote {} bytes to {}", buffer.len(), output.display());
    Ok(())
}

fn cmd_info(database: PathBuf, format_name: String) -> Result<()> {
    let (source, format) = open_source(&database, &format_name)?;
    let (_, meta) = format
        .open_reader(source)
        .context("failed to read database")?;

    println!("format         : {}", format.name());
    println!("type           : {}", meta.database_type);
    println!("description    : {}", meta.description);
    println!(
        "format version : {}.{}",
        meta.major_format_version, meta.minor_format_version
    );
    println!("build time     : {}", meta.build_time);
    println!("IP version     : {}", meta.ip_version);

    Ok(())
}

fn cmd_lookup(ip: String, db: PathBuf, format_name: String, verbose: bool) -> Result<()> {
    let ip: IpAddr = ip.parse().map_err(|_| anyhow::anyhow!("invalid IP address"))?;

    let (source, format) = open_source(&db, &format_name)?;
    if verbose && format_name == "auto" {
        println!("detected format: {}", format.name());
    }

    let (reader, _) = format
        .open_reader(source)
        .context("failed to read database")?;

    let record = reader
        .lookup_ip(ip)
        .with_context(|| format!("lookup failed for {}", ip))?;

    if verbose {
        println!("country code : {}", record.country_code());
        println!("network      : {}", record.network());
    } else {
        println!("{}", record.country_code());
    }

    Ok(())
}

fn cmd_version() -> Result<()> {
    println!("geotrie v{}", geotrie::version_string());
    println!("License: MIT");
    Ok(())
}
