use std::process;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tidesoap::cli::{Args, init_logging};
use tidesoap::{Runner, SoapClient, StationList};
use tracing::info;

fn main() {
    let args = Args::parse();
    init_logging(&args);

    match run(&args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.run_config().context("invalid arguments")?;
    let endpoint = args.endpoint().context("failed to load endpoint configuration")?;

    let stations = StationList::open(&args.input, config.input_format)
        .with_context(|| format!("cannot read station list {}", args.input.display()))?;
    let ids: Vec<String> = stations.iter()?.collect();
    if ids.is_empty() {
        bail!("no station ids found in {}", args.input.display());
    }

    info!(
        "{} stations, datum {}, {} to {} GMT, endpoint {}",
        ids.len(),
        config.datum,
        config.start,
        config.end,
        endpoint.url
    );

    let client = SoapClient::new(endpoint).context("failed to build HTTP client")?;
    let summary = Runner::new(&config, client).run(&ids);
    summary.log();

    println!(
        "{} of {} stations succeeded ({} faulted, {} transport failures, {} malformed)",
        summary.succeeded,
        summary.attempted,
        summary.faulted,
        summary.transport_failed,
        summary.malformed + summary.write_failed
    );
    Ok(())
}
