//! The `schedule` command.

use std::io::Read;
use std::path::Path;

use timeblock_core::{RunResult, SchedulingRequest};
use timeblock_providers::google::GoogleCalendarClient;

use crate::cli::ScheduleArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::scheduler::{ScheduleOptions, Scheduler};

/// Runs one scheduling request against Google Calendar.
pub async fn run(args: &ScheduleArgs, config: &ClientConfig, json: bool) -> ClientResult<()> {
    let request = load_request(args)?;
    let options = ScheduleOptions::from_settings(&config.schedule)?.with_dry_run(args.dry_run);

    let manager = super::credential_manager(config, None, true)?;
    let calendar = GoogleCalendarClient::new(&config.google.to_provider_config())?;

    let result = Scheduler::new(&manager, &calendar, options)
        .run(&request)
        .await?;
    print_result(&result, json)
}

/// Builds the request from `--request` (if given) overlaid with flags.
pub fn load_request(args: &ScheduleArgs) -> ClientResult<SchedulingRequest> {
    let base = match args.request.as_deref() {
        None => SchedulingRequest::default(),
        Some(path) => parse_request(&read_source(path)?, path)?,
    };
    Ok(args.apply_to(base))
}

fn read_source(path: &Path) -> ClientResult<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    std::fs::read_to_string(path).map_err(|e| {
        ClientError::Config(format!("failed to read request {}: {}", path.display(), e))
    })
}

fn parse_request(content: &str, origin: &Path) -> ClientResult<SchedulingRequest> {
    serde_json::from_str(content).map_err(|e| {
        ClientError::Config(format!(
            "failed to parse request {}: {}",
            origin.display(),
            e
        ))
    })
}

fn print_result(result: &RunResult, json: bool) -> ClientResult<()> {
    if json {
        let out = serde_json::to_string_pretty(result)
            .map_err(|e| ClientError::Config(format!("failed to serialize result: {}", e)))?;
        println!("{}", out);
    } else {
        println!("{}", result.message);
    }
    Ok(())
}
