use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use quilt_native_rs::cli::{normalize_legacy_flags, Cli, Invocation, RunRequest, USAGE_HINT};
use quilt_native_rs::logger;
use quilt_native_rs::quilt_pipeline::{
    select_device, ComputeDevice, ConversionReport, QuiltToNativePipeline, SelectedDevice,
};

use tracing::{error, info};

fn main() -> ExitCode {
    let args: Vec<OsString> = std::env::args_os().collect();
    if args.len() < 2 {
        eprintln!("{USAGE_HINT}");
        return ExitCode::SUCCESS;
    }

    let cli = match Cli::try_parse_from(normalize_legacy_flags(args)) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    logger::init(cli.log_filter.as_deref(), cli.verbose);

    let request = match cli.into_invocation() {
        Ok(Invocation::Run(request)) => request,
        Ok(Invocation::Usage(hint)) => {
            eprintln!("{hint}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&request) {
        Ok(report) => {
            info!(
                "Wrote {} ({} views, {})",
                report.native_path.display(),
                report.views_used,
                report.device
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(request: &RunRequest) -> anyhow::Result<ConversionReport> {
    let device = select_device(request.backend, request.device)
        .with_context(|| format!("cannot use the {} backend", request.backend))?;

    let report = match device {
        SelectedDevice::Cpu(device) => convert(device, request)?,
        #[cfg(feature = "cuda")]
        SelectedDevice::Cuda(device) => convert(device, request)?,
    };
    Ok(report)
}

fn convert<D: ComputeDevice>(device: D, request: &RunRequest) -> anyhow::Result<ConversionReport> {
    let pipeline = QuiltToNativePipeline::new(device, request.config.clone());
    let report = pipeline.convert(&request.input, &request.output)?;
    Ok(report)
}
