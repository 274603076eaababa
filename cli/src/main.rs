use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use brine_tl::{describe_to_json, value_to_json, Value};
use brine_tl_compiler::{compile_sources, generate_rust, CompileError, Config, Source};

#[derive(Parser)]
#[command(name = "btl")]
#[command(about = "Compile TL schemas, generate Rust from them, or decode TL data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate Rust code from one or more `.tl` files
    GenRust {
        /// Generator configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Input `.tl` files, merged in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Configuration of the foreign schema named by the `conversion` block
        #[arg(long, requires = "foreign")]
        foreign_config: Option<PathBuf>,

        /// Input `.tl` files of the foreign schema
        #[arg(long, num_args = 1..)]
        foreign: Vec<PathBuf>,

        /// Output `.rs` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the identifier of every combinator
    Ids {
        #[arg(short, long)]
        config: PathBuf,

        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Dump the resolved schema as JSON
    Describe {
        #[arg(short, long)]
        config: PathBuf,

        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a boxed TL value to JSON (printed to stdout)
    Decode {
        #[arg(short, long)]
        config: PathBuf,

        /// Result type of the encoded value, e.g. `Bar`
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// File holding the encoded value
        #[arg(short, long)]
        data: PathBuf,

        /// Treat the data file as hex text instead of raw bytes
        #[arg(long)]
        hex: bool,

        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

/// Logs go to stderr so generated code can be piped from stdout.
/// `RUST_LOG` overrides the default filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,brine_tl_compiler=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_sources(paths: &[PathBuf]) -> Result<Vec<Source>, CompileError> {
    paths.iter().map(Source::load).collect()
}

fn write_output(output: Option<&Path>, text: &str) -> Result<(), CompileError> {
    match output {
        Some(path) => {
            fs::write(path, text)?;
            info!("wrote {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn parse_hex(text: &str) -> Result<Vec<u8>, CompileError> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(CompileError::Config("Hex data has an odd number of digits".to_string()));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16)
                .map_err(|_| CompileError::Config(format!("Invalid hex byte \"{}\"", byte)))
        })
        .collect()
}

fn main() -> Result<(), CompileError> {
    init_logging();
    let cli = Cli::parse();

    match &cli.command {
        Commands::GenRust { config, inputs, foreign_config, foreign, output } => {
            let config = Config::load(config)?;
            let sources = load_sources(inputs)?;
            let foreign_schema = match foreign_config {
                Some(foreign_config) => {
                    let foreign_config = Config::load(foreign_config)?;
                    Some(compile_sources(&foreign_config, &load_sources(foreign)?)?)
                }
                None => None,
            };
            let rust_code = generate_rust(&config, &sources, foreign_schema.as_ref())?;
            write_output(output.as_deref(), &rust_code)
        }

        Commands::Ids { config, inputs } => {
            let config = Config::load(config)?;
            let schema = compile_sources(&config, &load_sources(inputs)?)?;
            for combinator in schema.combinators.iter().chain(&schema.functions) {
                println!("#{:08x} {}", combinator.id, combinator.name);
            }
            Ok(())
        }

        Commands::Describe { config, inputs, output } => {
            let config = Config::load(config)?;
            let schema = compile_sources(&config, &load_sources(inputs)?)?;
            write_output(output.as_deref(), &describe_to_json(&schema)?)
        }

        Commands::Decode { config, type_name, data, hex, inputs } => {
            let config = Config::load(config)?;
            let schema = compile_sources(&config, &load_sources(inputs)?)?;
            let bytes = if *hex {
                parse_hex(&fs::read_to_string(data)?)?
            } else {
                fs::read(data)?
            };
            let value = Value::decode_type(&schema, type_name, &bytes)?;
            let json = serde_json::to_string_pretty(&value_to_json(&value))
                .map_err(|e| CompileError::Config(format!("Failed to render JSON: {}", e)))?;
            println!("{}", json);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_whitespace() {
        assert_eq!(parse_hex("b5 75 72 99\n").unwrap(), [0xb5, 0x75, 0x72, 0x99]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn cli_accepts_foreign_inputs() {
        let cli = Cli::try_parse_from([
            "btl", "gen-rust", "-c", "native.json", "native.tl",
            "--foreign-config", "api.json", "--foreign", "api.tl",
        ])
        .unwrap();
        match cli.command {
            Commands::GenRust { inputs, foreign, .. } => {
                assert_eq!(inputs, [PathBuf::from("native.tl")]);
                assert_eq!(foreign, [PathBuf::from("api.tl")]);
            }
            _ => panic!("expected gen-rust"),
        }
    }
}
