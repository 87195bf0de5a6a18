use crate::errors::{DriverError, Result};

/// Driver configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port the Connection Multiplexer listens on.
    pub tcp_port: u16,

    /// Listen backlog for the accept queue.
    pub tcp_backlog: u32,

    /// SQLite connection string for the template / barcode-template store.
    pub database_url: String,

    /// Serial device for the label printer.
    pub printer_device: String,

    /// Printer baud rate (8N1, no flow control).
    pub printer_baud: u32,

    /// Serial device for the weighing scale.
    pub scale_device: String,

    /// Scale baud rate (8N1, VMIN=0 VTIME=5).
    pub scale_baud: u32,

    /// Dots per millimetre of the print head (fixed at 8 for this head, but
    /// kept configurable for test fixtures that use a synthetic geometry).
    pub dots_per_mm: u32,

    /// Whether sub-kilogram weights render as integer grams (datapoint 72).
    pub lbl_wtgrams: bool,

    /// Version string surfaced by `--version`.
    pub driver_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tcp_port: 8888,
            tcp_backlog: 5,
            database_url: "sqlite:scalelabel.db".to_string(),
            printer_device: "/dev/ttyUSB0".to_string(),
            printer_baud: 115_200,
            scale_device: "/dev/ttyUSB1".to_string(),
            scale_baud: 9_600,
            dots_per_mm: 8,
            lbl_wtgrams: true,
            driver_version: "scalelabel 0.1.0".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to sane
    /// defaults for everything except values that would be silently wrong
    /// if malformed (port numbers, baud rates).
    ///
    /// # Errors
    /// Returns an error if a variable that must parse does not.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let tcp_port = match std::env::var("SCALELABEL_TCP_PORT") {
            Ok(v) => v
                .parse()
                .map_err(|_| DriverError::ConfigError("SCALELABEL_TCP_PORT must be a valid port number".into()))?,
            Err(_) => defaults.tcp_port,
        };

        let tcp_backlog = std::env::var("SCALELABEL_TCP_BACKLOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.tcp_backlog);

        let database_url =
            std::env::var("SCALELABEL_DATABASE_URL").unwrap_or(defaults.database_url);

        let printer_device =
            std::env::var("SCALELABEL_PRINTER_DEVICE").unwrap_or(defaults.printer_device);

        let printer_baud = match std::env::var("SCALELABEL_PRINTER_BAUD") {
            Ok(v) => v
                .parse()
                .map_err(|_| DriverError::ConfigError("SCALELABEL_PRINTER_BAUD must be numeric".into()))?,
            Err(_) => defaults.printer_baud,
        };

        let scale_device =
            std::env::var("SCALELABEL_SCALE_DEVICE").unwrap_or(defaults.scale_device);

        let scale_baud = match std::env::var("SCALELABEL_SCALE_BAUD") {
            Ok(v) => v
                .parse()
                .map_err(|_| DriverError::ConfigError("SCALELABEL_SCALE_BAUD must be numeric".into()))?,
            Err(_) => defaults.scale_baud,
        };

        let dots_per_mm = std::env::var("SCALELABEL_DOTS_PER_MM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.dots_per_mm);

        let lbl_wtgrams = std::env::var("SCALELABEL_LBL_WTGRAMS")
            .ok()
            .map(|v| v != "false" && v != "0")
            .unwrap_or(defaults.lbl_wtgrams);

        let driver_version =
            std::env::var("SCALELABEL_VERSION").unwrap_or(defaults.driver_version);

        Ok(Self {
            tcp_port,
            tcp_backlog,
            database_url,
            printer_device,
            printer_baud,
            scale_device,
            scale_baud,
            dots_per_mm,
            lbl_wtgrams,
            driver_version,
        })
    }
}
