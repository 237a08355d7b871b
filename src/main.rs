//! # charconv CLI
//!
//! Command-line front end for converting text between charsets and guessing
//! the charset of unlabeled files.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use charconv::{
    Category, Charset, ChardetngDetector, CharsetRegistry, Detector, FileConverter, OpenMode, Pipeline,
};

/// charconv: streaming charset converter
#[derive(Parser)]
#[command(name = "charconv")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log resolution and conversion steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a file or stdin between charsets
    Convert(ConvertArgs),

    /// Guess the charset of a file or stdin
    Detect(DetectArgs),

    /// List the named charsets
    List(ListArgs),

    /// Describe one charset
    Info(InfoArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Source charset
    #[arg(short = 'f', long = "from")]
    from: String,

    /// Target charset
    #[arg(short = 't', long = "to")]
    to: String,

    /// Input file (stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// How to open the output file
    #[arg(long, value_enum, default_value_t = WriteMode::Truncate)]
    mode: WriteMode,

    /// Directory for the staging file
    #[arg(long, requires = "output")]
    temp_dir: Option<PathBuf>,

    /// Read chunk size (KB)
    #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u32).range(1..=65536))]
    buffer_size: u32,
}

#[derive(Args)]
struct DetectArgs {
    /// Input file (stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Maximum bytes to read for detection
    #[arg(long, default_value = "8192")]
    sample_size: usize,

    /// Top-level domain the content came from, e.g. jp
    #[arg(long)]
    tld: Option<String>,

    /// Never answer UTF-8 for non-ASCII input
    #[arg(long)]
    no_utf8: bool,
}

#[derive(Args)]
struct ListArgs {
    /// Filter by category (unicode, chinese, japanese, korean, mac, ibm, iso, cyrillic, windows)
    #[arg(short, long)]
    category: Option<String>,

    /// Show only ASCII-compatible charsets
    #[arg(long)]
    ascii_compatible: bool,

    /// Show only multibyte charsets
    #[arg(long)]
    multibyte: bool,

    /// Show charset details
    #[arg(long)]
    details: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Charset to describe
    charset: String,

    /// Show how a few sample characters encode
    #[arg(long)]
    samples: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WriteMode {
    /// Create or replace
    Truncate,
    /// Create or append
    Append,
    /// Fail if the file exists
    CreateNew,
}

impl From<WriteMode> for OpenMode {
    fn from(mode: WriteMode) -> Self {
        match mode {
            WriteMode::Truncate => OpenMode::CREATE_OR_TRUNCATE,
            WriteMode::Append => OpenMode::WRITE | OpenMode::APPEND | OpenMode::CREATE,
            WriteMode::CreateNew => OpenMode::WRITE | OpenMode::CREATE_NEW,
        }
    }
}

#[derive(Serialize)]
struct ConversionSummary<'a> {
    from: &'a str,
    to: &'a str,
    bytes_written: u64,
    processing_time_ms: u64,
}

#[derive(Serialize)]
struct CharsetInfo {
    name: &'static str,
    resolves_to: Option<String>,
    category: Category,
    ascii_compatible: bool,
    multibyte: bool,
    bom: Option<String>,
}

impl CharsetInfo {
    fn new(charset: Charset) -> Self {
        Self {
            name: charset.name(),
            resolves_to: CharsetRegistry::builtin()
                .resolve(charset.name())
                .ok()
                .map(|codec| codec.name().to_owned()),
            category: charset.category(),
            ascii_compatible: charset.is_ascii_compatible(),
            multibyte: charset.is_multibyte(),
            bom: charset.bom().map(|bom| format!("{bom:02X?}")),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Convert(ref args) => convert_command(args, &cli),
        Commands::Detect(ref args) => detect_command(args, &cli),
        Commands::List(ref args) => list_command(args, &cli),
        Commands::Info(ref args) => info_command(args, &cli),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_input(input: Option<&PathBuf>) -> Result<Box<dyn Read>> {
    Ok(match input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("Failed to open input file: {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    })
}

fn convert_command(args: &ConvertArgs, cli: &Cli) -> Result<()> {
    let start_time = Instant::now();
    let pipeline = Pipeline::default().with_buffer_size(args.buffer_size as usize * 1024);

    let bytes_written = match &args.output {
        Some(output) => {
            let mut converter = FileConverter::new(pipeline);
            if let Some(dir) = &args.temp_dir {
                converter = converter.with_temp_dir(dir);
            }
            let mode = OpenMode::from(args.mode);
            let result = match &args.input {
                Some(input) => converter.convert_file(input, output, mode, &args.from, &args.to),
                None => converter.convert_reader_to_file(io::stdin().lock(), output, mode, &args.from, &args.to),
            };
            result.with_context(|| format!("Failed to convert into {}", output.display()))?
        }
        None => {
            // Plan before opening so charset errors win over missing files
            let conversion = pipeline
                .plan(&args.from, &args.to)
                .with_context(|| format!("Cannot convert from {} to {}", args.from, args.to))?;
            let input = open_input(args.input.as_ref())?;
            let stdout = io::stdout().lock();
            conversion.run(input, stdout).context("Conversion failed")?
        }
    };

    let processing_time = start_time.elapsed();
    debug!(bytes_written, ?processing_time, "convert command finished");

    if let OutputFormat::Json = cli.format {
        let summary = ConversionSummary {
            from: &args.from,
            to: &args.to,
            bytes_written,
            processing_time_ms: processing_time.as_millis() as u64,
        };
        let json = serde_json::to_string_pretty(&summary)?;
        // Keep stdout clean when it carries the converted text
        if args.output.is_some() {
            println!("{json}");
        } else {
            eprintln!("{json}");
        }
    } else if args.output.is_some() {
        eprintln!("✓ Wrote {bytes_written} bytes");
    }

    Ok(())
}

fn detect_command(args: &DetectArgs, cli: &Cli) -> Result<()> {
    let mut detector = ChardetngDetector::new().allow_utf8(!args.no_utf8);
    if let Some(tld) = &args.tld {
        detector = detector.with_tld(tld);
    }

    let mut input = open_input(args.input.as_ref())?;
    let result = detector
        .detect_prefix(&mut input, args.sample_size)
        .context("Detection failed")?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            println!("Detected charset: {}", result.charset);
            println!("Confidence: {:?}", result.confidence);
            if let Some(language) = result.language {
                println!("Language: {language}");
            }
            if result.bom_detected {
                println!("BOM detected: Yes");
            }
        }
    }

    Ok(())
}

fn list_command(args: &ListArgs, cli: &Cli) -> Result<()> {
    let charsets: Vec<Charset> = Charset::ALL
        .iter()
        .copied()
        .filter(|charset| {
            args.category
                .as_deref()
                .is_none_or(|category| charset.category().name().eq_ignore_ascii_case(category))
        })
        .filter(|charset| !args.ascii_compatible || charset.is_ascii_compatible())
        .filter(|charset| !args.multibyte || charset.is_multibyte())
        .collect();

    match cli.format {
        OutputFormat::Json => {
            let infos: Vec<_> = charsets.into_iter().map(CharsetInfo::new).collect();
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
        OutputFormat::Text => {
            println!("Supported Charsets ({} total):", charsets.len());
            println!();

            for charset in charsets {
                println!("{:15} [{}]", charset.name(), charset.category().name());
                if args.details {
                    print_details(&CharsetInfo::new(charset), "                ");
                    println!();
                }
            }
        }
    }

    Ok(())
}

fn info_command(args: &InfoArgs, cli: &Cli) -> Result<()> {
    let charset: Charset = args
        .charset
        .parse()
        .with_context(|| format!("Unknown charset: {}", args.charset))?;
    let info = CharsetInfo::new(charset);

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        OutputFormat::Text => {
            println!("Charset Information: {}", info.name);
            println!("Category: {}", info.category.name());
            print_details(&info, "");
        }
    }

    if args.samples {
        println!("\nCharacter Samples:");
        print_character_samples(charset);
    }

    Ok(())
}

fn print_details(info: &CharsetInfo, indent: &str) {
    let yes_no = |flag| if flag { "Yes" } else { "No" };
    if let Some(codec) = &info.resolves_to {
        println!("{indent}Codec: {codec}");
    }
    println!("{indent}ASCII Compatible: {}", yes_no(info.ascii_compatible));
    println!("{indent}Multibyte: {}", yes_no(info.multibyte));
    println!("{indent}BOM: {}", info.bom.as_deref().unwrap_or("None"));
}

fn print_character_samples(charset: Charset) {
    if charset == Charset::UTF8 {
        println!("  (UTF-8 is the pivot representation)");
        return;
    }
    for sample in ["A", "a", "0", "é", "€", "你"] {
        match charconv::encode(sample, charset.name()) {
            Ok(bytes) => println!("  {sample} -> {bytes:02X?}"),
            Err(_) => println!("  {sample} -> (unmappable)"),
        }
    }
}
