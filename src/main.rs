//! Heart Risk - Main Entry Point
//!
//! Opens the screening form, reads one patient record as JSON from stdin,
//! and prints the risk assessment. An empty stdin submits the form defaults.

use anyhow::{Context, Result};
use heart_risk_pipeline::{
    config::{AppConfig, LoggingConfig},
    form::{FormOutcome, RiskForm},
    types::patient::PatientRecord,
};
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let config_found = Path::new(AppConfig::DEFAULT_PATH).exists();
    let config = if config_found {
        AppConfig::load()?
    } else {
        AppConfig::default()
    };

    init_logging(&config.logging)?;

    info!("Starting Heart Risk");
    if config_found {
        info!(path = AppConfig::DEFAULT_PATH, "Configuration loaded successfully");
    } else {
        warn!(
            path = AppConfig::DEFAULT_PATH,
            "Configuration file not found, using defaults"
        );
    }

    // Artifacts are loaded once here and shared for the rest of the process
    let form = RiskForm::open(&config);
    if let Some(status) = form.status_message() {
        println!("{}", status);
        return Ok(ExitCode::FAILURE);
    }

    let record = read_record()?;
    let outcome = form.submit(&record);
    println!("{}", outcome.message());

    match outcome {
        FormOutcome::Assessed(assessment) => {
            println!("{}", serde_json::to_string(&assessment)?);
            Ok(ExitCode::SUCCESS)
        }
        FormOutcome::Rejected(_) | FormOutcome::Failed(_) | FormOutcome::Unavailable(_) => {
            Ok(ExitCode::FAILURE)
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(
        format!("heart_risk_pipeline={}", logging.level)
            .parse()
            .context("Invalid log level")?,
    );

    // Logs go to stderr so stdout only carries the result
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn read_record() -> Result<PatientRecord> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read patient record from stdin")?;

    if input.trim().is_empty() {
        info!("No record on stdin, submitting form defaults");
        return Ok(PatientRecord::default());
    }

    serde_json::from_str(&input).context("Failed to parse patient record")
}
