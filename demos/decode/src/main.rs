//! Envelope and shape decoding demo.
//!
//! Reads newline-delimited JSON from a file or stdin and writes one JSON
//! report per input line to stdout. Logs go to stderr.
//!
//!   courier-decode envelope --mode optional --errors object responses.ndjson
//!   courier-decode --config courier.toml envelope --errors primitive:int
//!   echo '{"kind":"square","side":"2"}' | courier-decode shape

mod protocol;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use courier_core::{
    CallSite, DecodeMode, DecoderConfig, ErrorAnnotation, ErrorDescriptor, Ignored, Optional,
    Required, ResponseError, resolve_annotations,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "courier-decode", about = "Decode response envelopes and shape records")]
struct Cli {
    /// TOML file with a `[decoder]` table.
    #[arg(long, env = "COURIER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
    /// Overrides the success status code from the config file.
    #[arg(long, env = "COURIER_SUCCESS_CODE")]
    success_code: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one response envelope per line.
    Envelope {
        #[arg(long, value_enum, default_value_t = Mode::Required)]
        mode: Mode,
        /// Error payload shape: `primitive:<kind>`, `object` or `array`.
        #[arg(long = "errors", value_name = "ANNOTATION")]
        errors: Vec<ErrorAnnotation>,
        input: Option<PathBuf>,
    },
    /// Decode one shape record per line and re-encode it.
    Shape {
        /// Map unknown kinds to null instead of failing the line.
        #[arg(long)]
        skip_unknown: bool,
        input: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Required,
    Optional,
    Ignored,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    decoder: DecoderConfig,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("courier_decode=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => load_config(path)?.decoder,
        None => DecoderConfig::default(),
    };
    if let Some(code) = cli.success_code {
        config = config.with_success_code(code);
    }

    match cli.command {
        Command::Envelope { mode, errors, input } => {
            let descriptor = resolve_annotations(&errors)?;
            let input = open_input(input.as_deref())?;
            match mode {
                Mode::Required => run_envelope(Required::<Value>::new(), descriptor, config, input),
                Mode::Optional => run_envelope(Optional::<Value>::new(), descriptor, config, input),
                Mode::Ignored => run_envelope(Ignored, descriptor, config, input),
            }
        }
        Command::Shape { skip_unknown, input } => {
            run_shapes(skip_unknown, open_input(input.as_deref())?)
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded config");
    Ok(config)
}

fn open_input(path: Option<&Path>) -> anyhow::Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn run_envelope<M>(
    mode: M,
    descriptor: Option<ErrorDescriptor<Value>>,
    config: DecoderConfig,
    input: Box<dyn BufRead>,
) -> anyhow::Result<()>
where
    M: DecodeMode,
    M::Output: Serialize,
{
    let site = CallSite::new(mode).with_config(config);
    match descriptor {
        Some(descriptor) => decode_envelopes(&site.with_errors(descriptor)?, input),
        None => decode_envelopes(&site, input),
    }
}

fn decode_envelopes<M, E>(site: &CallSite<M, E>, input: Box<dyn BufRead>) -> anyhow::Result<()>
where
    M: DecodeMode,
    M::Output: Serialize,
    E: Serialize,
{
    let (mut ok, mut failed, mut malformed) = (0usize, 0usize, 0usize);
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let report = match site.decode(&line) {
            Ok(data) => {
                ok += 1;
                json!({ "ok": data })
            }
            Err(ResponseError::Server(failure)) => {
                failed += 1;
                json!({
                    "status": failure.status(),
                    "message": failure.message(),
                    "errors": failure.error_data(),
                })
            }
            Err(ResponseError::Decode(error)) => {
                malformed += 1;
                tracing::warn!(line = index + 1, %error, "malformed envelope");
                json!({ "malformed": error.to_string() })
            }
        };
        println!("{report}");
    }
    tracing::info!(ok, failed, malformed, "done");
    Ok(())
}

fn run_shapes(skip_unknown: bool, input: Box<dyn BufRead>) -> anyhow::Result<()> {
    let mut builder = protocol::shapes();
    if skip_unknown {
        builder = builder.with_default(None);
    }
    let registry = builder.build()?;
    tracing::debug!(?registry, "shape registry ready");

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match registry.decode(&line) {
            Ok(Some(shape)) => {
                tracing::info!(line = index + 1, area = shape.area(), "decoded {shape:?}");
                println!("{}", registry.encode_to_string(&shape)?);
            }
            Ok(None) => println!("null"),
            Err(error) => {
                tracing::warn!(line = index + 1, %error, "undecodable shape");
                println!("{}", json!({ "malformed": error.to_string() }));
            }
        }
    }
    Ok(())
}
