//! Command line surface of `quilt-native`.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::quilt_pipeline::{BackendPreference, ConversionConfig, QuiltGrid, Result};

pub const USAGE_HINT: &str = "Use --help";

#[derive(Parser, Debug)]
#[command(
    name = "quilt-native",
    about = "Converts a light-field quilt into the native image of a lenticular display",
    long_about = "Converts a light-field quilt into the native image of a lenticular display. \
                  Rows and cols must match the display model. Results are stored in the output \
                  directory as output.hdr, plus quilt.png when the input is a directory of views."
)]
pub struct Cli {
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATH",
        help = "Input quilt image or directory of views (all views with the same resolution)"
    )]
    pub input: Option<PathBuf>,

    #[arg(short = 'o', long = "output", value_name = "DIR", help = "Output directory")]
    pub output: Option<PathBuf>,

    #[arg(long, allow_negative_numbers = true, help = "Number of rows in the quilt (also accepted as -rows)")]
    pub rows: Option<i64>,

    #[arg(long, allow_negative_numbers = true, help = "Number of cols in the quilt (also accepted as -cols)")]
    pub cols: Option<i64>,

    #[arg(long, default_value = "auto", help = "Compute backend: auto, cpu or cuda")]
    pub backend: BackendPreference,

    #[arg(long, default_value_t = 0, help = "GPU ordinal for the cuda backend")]
    pub device: usize,

    #[arg(long, help = "Create the output directory when it does not exist")]
    pub create_output_dir: bool,

    #[arg(long, help = "Log a per-stage timing summary")]
    pub timings: bool,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        help = "Increase log verbosity (-v: debug, -vv: trace)"
    )]
    pub verbose: u8,

    #[arg(
        long = "log-filter",
        value_name = "FILTER",
        help = "Explicit tracing filter (overrides RUST_LOG and -v)"
    )]
    pub log_filter: Option<String>,
}

/// A fully specified conversion request
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub backend: BackendPreference,
    pub device: usize,
    pub config: ConversionConfig,
}

#[derive(Debug)]
pub enum Invocation {
    Run(RunRequest),
    /// Required arguments are missing; print the hint and exit successfully.
    Usage(String),
}

/// Rewrites the single-dash long flags `-rows` and `-cols` to their `--` form.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            for flag in ["-rows", "-cols"] {
                if let Some(rest) = text.strip_prefix(flag) {
                    if rest.is_empty() || rest.starts_with('=') {
                        return OsString::from(format!("-{text}"));
                    }
                }
            }
            arg
        })
        .collect()
}

impl Cli {
    pub fn into_invocation(self) -> Result<Invocation> {
        let missing: Vec<&str> = [
            ("-i", self.input.is_none()),
            ("-o", self.output.is_none()),
            ("-rows", self.rows.is_none()),
            ("-cols", self.cols.is_none()),
        ]
        .into_iter()
        .filter_map(|(flag, absent)| absent.then_some(flag))
        .collect();

        let (Some(input), Some(output), Some(rows), Some(cols)) =
            (self.input, self.output, self.rows, self.cols)
        else {
            return Ok(Invocation::Usage(format!(
                "Missing {}. {USAGE_HINT}",
                missing.join(", ")
            )));
        };

        let config = ConversionConfig::builder()
            .grid(QuiltGrid::new(rows, cols)?)
            .create_output_dir(self.create_output_dir)
            .log_timings(self.timings)
            .build();

        Ok(Invocation::Run(RunRequest {
            input,
            output,
            backend: self.backend,
            device: self.device,
            config,
        }))
    }
}
