use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use jkbms_lib::serialport::DEFAULT_BAUD_RATE;
use std::time::Duration;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    /// One `name: value` line per register
    Text,
    /// One JSON object per register group
    Json,
}

const fn about_text() -> &'static str {
    "jk bms command line tool, prints all known registers of the BMS"
}

#[derive(Parser, Debug)]
#[command(version, about=about_text(), long_about = None)]
pub struct CliArgs {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Serial port device path (e.g., /dev/ttyUSB0 on Linux, COM1 on Windows)
    #[arg(default_value_t = default_device_name())]
    pub device: String,

    /// RS485 address of the BMS (1-15)
    #[arg(default_value_t = 1)]
    pub address: u8,

    /// Baud rate of the serial port
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    /// Quiet time after which a response is considered complete (e.g., "500ms", "1s")
    #[arg(value_parser = humantime::parse_duration, long, default_value = "1s")]
    pub timeout: Duration,

    // Some USB - RS485 dongles requires time to switch between TX and RX, so use a save delay between frames
    /// Delay between requesting the register groups (e.g., "15ms", "100ms")
    #[arg(value_parser = humantime::parse_duration, long, default_value = "15ms")]
    pub delay: Duration,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_test() {
        let args = CliArgs::try_parse_from(["jkbms", "/dev/ttyS3"]).unwrap();
        assert_eq!(args.device, "/dev/ttyS3");
        assert_eq!(args.address, 1);
        assert_eq!(args.baud_rate, 115_200);
        assert_eq!(args.timeout, Duration::from_secs(1));
        assert_eq!(args.format, OutputFormat::Text);
    }

    #[test]
    fn address_and_options_test() {
        let args = CliArgs::try_parse_from([
            "jkbms",
            "/dev/ttyUSB1",
            "2",
            "--timeout",
            "500ms",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.address, 2);
        assert_eq!(args.timeout, Duration::from_millis(500));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn verify_cli_test() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }
}
