use std::sync::Arc;

use scalelabel::config::Config;
use scalelabel::errors::DriverError;
use scalelabel::orchestrator;
use scalelabel::server::{self, AppState};
use scalelabel::storage::Storage;
use scalelabel::transport::{Port, SerialPort};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--version") {
        let config = Config::from_env().unwrap_or_default();
        println!("{}", config.driver_version);
        return;
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("╔══════════════════════════════════════════════════════════════╗");
            eprintln!("║                    CONFIGURATION ERROR                        ║");
            eprintln!("╠══════════════════════════════════════════════════════════════╣");
            eprintln!("║ {}", e);
            eprintln!("╠══════════════════════════════════════════════════════════════╣");
            eprintln!("║ Please check your environment variables.                      ║");
            eprintln!("║ See README for the SCALELABEL_* settings.                     ║");
            eprintln!("╚══════════════════════════════════════════════════════════════╝");
            std::process::exit(1);
        }
    };

    match args.as_slice() {
        [job_path, slot] => {
            let slot: i64 = match slot.parse() {
                Ok(v) => v,
                Err(_) => {
                    eprintln!("Error: slot must be a number");
                    std::process::exit(1);
                }
            };
            std::process::exit(run_single_job(&config, job_path, slot).await);
        }
        [] => {
            if let Err(e) = run_server(config).await {
                tracing::error!("server exited: {}", e);
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("usage: scalelabel [--version] | <config.json> <slot>");
            std::process::exit(1);
        }
    }
}

async fn run_single_job(config: &Config, job_path: &str, slot: i64) -> i32 {
    let storage = match Storage::new(&config.database_url).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };

    let printer = match SerialPort::open(&config.printer_device, config.printer_baud) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: printer unavailable: {}", e);
            return 3;
        }
    };

    let scale = SerialPort::open(&config.scale_device, config.scale_baud).ok();

    let job_document = match orchestrator::load_job_document(job_path).await {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let result = orchestrator::run_job(
        &storage,
        &printer,
        scale.as_ref().map(|s| s as &dyn Port),
        config.dots_per_mm,
        config.lbl_wtgrams,
        job_document,
        slot,
        0,
    )
    .await;

    match result {
        Ok(()) => 0,
        Err(DriverError::TemplateNotFound(_)) => 2,
        Err(e) => {
            eprintln!("Error printing: {}", e);
            1
        }
    }
}

async fn run_server(config: Config) -> scalelabel::errors::Result<()> {
    let storage = Storage::new(&config.database_url).await?;
    storage.initialize_tables().await?;

    let printer = SerialPort::open(&config.printer_device, config.printer_baud)?;
    let scale: Option<Arc<dyn Port>> = match SerialPort::open(&config.scale_device, config.scale_baud) {
        Ok(s) => Some(Arc::new(s)),
        Err(e) => {
            tracing::warn!("scale unavailable at startup, continuing without it: {}", e);
            None
        }
    };

    tracing::info!(
        "scalelabel driver starting, printer={} scale={}",
        config.printer_device,
        config.scale_device
    );

    let listener = server::bind(&config).await?;
    tracing::info!("listening on port {}", config.tcp_port);

    let state = Arc::new(AppState::new(config, storage, Arc::new(printer), scale));
    server::serve(listener, state).await
}
