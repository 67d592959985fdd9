use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use clap::{Parser, Subcommand};
use gcif_entropy::{
    bitstreams::{BitReader, BitWriter},
    read_section, write_section, CodecConfig, CodecError,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Leading word of every packed file.
const MAGIC: u32 = 0x4743_4846;

#[derive(Parser, Debug)]
#[command(about = "Pack a file into a single Huffman-coded section, or unpack it")]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Java properties file with `tablebits` and `huffmanthreshold`
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    /// Print the effective configuration as JSON
    #[arg(long, default_value_t = false, global = true)]
    dump_config: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress `source` into `dest`
    Encode { source: PathBuf, dest: PathBuf },
    /// Restore `dest` from the packed `source`
    Decode { source: PathBuf, dest: PathBuf },
}

fn encode(source: &Path, dest: &Path, config: &CodecConfig) -> Result<(), CodecError> {
    let data = fs::read(source)?;

    let comp_time = Instant::now();

    let mut writer = BitWriter::new();
    writer.write_word(MAGIC);
    let summary = write_section(&data, config, &mut writer)?;

    let bytes = writer.into_bytes();
    let comp_time = comp_time.elapsed().as_nanos() as f64;

    fs::write(dest, &bytes)?;

    info!(
        symbols = summary.symbols,
        huffman = summary.is_huffman(),
        table_bits = summary.table_bits,
        data_bits = summary.data_bits,
        "packed {} bytes into {} in {}ns",
        data.len(),
        bytes.len(),
        comp_time
    );

    Ok(())
}

fn decode(source: &Path, dest: &Path, config: &CodecConfig) -> Result<(), CodecError> {
    let bytes = fs::read(source)?;

    let decomp_time = Instant::now();

    let mut reader = BitReader::from_bytes(&bytes);
    let magic = reader.read_word();
    if magic != MAGIC {
        return Err(CodecError::CorruptHeader(format!("bad magic word {magic:#010x}")));
    }

    let data = read_section(&mut reader, config)?;
    let decomp_time = decomp_time.elapsed().as_nanos() as f64;

    fs::write(dest, &data)?;

    info!("unpacked {} bytes into {} in {}ns", bytes.len(), data.len(), decomp_time);

    Ok(())
}

fn main() -> Result<(), CodecError> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(true).finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CodecError::Config(format!("Failed to set tracing subscriber: {e}")))?;

    let config = match args.config.as_ref() {
        Some(path) => CodecConfig::from_properties_file(path)?,
        None => CodecConfig::default(),
    };

    if args.dump_config {
        let json = serde_json::to_string_pretty(&config).map_err(|e| CodecError::Config(e.to_string()))?;
        println!("{json}");
    }

    match &args.command {
        Command::Encode { source, dest } => encode(source, dest, &config),
        Command::Decode { source, dest } => decode(source, dest, &config),
    }
}
