use anyhow::{bail, Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use jkbms_lib::protocol::{DecodedGroup, RegisterGroup};
use log::*;
use std::{ops::Deref, panic};

mod commandline;

use commandline::{CliArgs, OutputFormat};

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown>", 0, 0));
        let cause = panic_info
            .payload()
            .downcast_ref::<String>()
            .map(String::deref);
        let cause = cause.unwrap_or_else(|| {
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .unwrap_or("<cause unknown>")
        });

        error!(
            "Thread '{}' panicked at {}:{}:{}: {}",
            std::thread::current().name().unwrap_or("<unknown>"),
            filename,
            line,
            column,
            cause
        );
    }));
    log_handle
}

fn print_group(group: &DecodedGroup, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for field in &group.fields {
                println!("{field}");
            }
        }
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(group).with_context(|| "Cannot serialize register group")?
        ),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());

    let mut bms = jkbms_lib::serialport::JkBms::new(&args.device, args.baud_rate, args.address)
        .with_context(|| format!("Cannot connect to BMS {} on '{}'", args.address, args.device))?;
    bms.set_timeout(args.timeout)?;
    bms.set_delay(args.delay);

    let mut failed: Vec<RegisterGroup> = Vec::new();
    for (group, outcome) in bms.read_all() {
        match outcome {
            Ok(decoded) => {
                print_group(&decoded, args.format)?;
                if let Err(err) = decoded.check_complete() {
                    error!("{err}");
                    failed.push(group);
                }
            }
            Err(err) => {
                error!("Cannot read {group} registers: {err}");
                failed.push(group);
            }
        }
    }

    if !failed.is_empty() {
        bail!("Reading failed for: {failed:?}");
    }
    Ok(())
}
