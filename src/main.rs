use clap::Parser;
use couponfarm::browser::BrowserHandle;
use couponfarm::config::Options;
use couponfarm::logging::{init_logging, LoggingConfig};
use couponfarm::reporting::HttpReporter;
use couponfarm::workflow;
use dotenvy::dotenv;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenv();

    let opts = Options::parse();
    let _guard = match init_logging(LoggingConfig::from_options(&opts)) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        coupon_type = %opts.coupon_type,
        retailer = %opts.retailer_host,
        report_port = opts.server_port,
        "couponfarm starting"
    );

    let reporter = match HttpReporter::new(&opts) {
        Ok(reporter) => reporter,
        Err(err) => {
            error!("reporter setup failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let handle = match BrowserHandle::launch(&opts).await {
        Ok(handle) => handle,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = workflow::run(&handle, &opts, &reporter).await;

    // Teardown runs no matter how the workflow ended.
    handle.close().await;

    match outcome {
        Ok(()) => {
            info!("run succeeded");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("run failed: {err}");
            ExitCode::FAILURE
        }
    }
}
