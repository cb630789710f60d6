use clap::{Arg, ArgMatches, Command};
use log::LevelFilter;
use nophish::api::{self, AppState, EmailScanRequest};
use nophish::fetcher;
use nophish::hooks::{HookSet, ScanRecord};
use nophish::{Config, ScanReport};
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("nophish")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Layered heuristic phishing scanner for URLs, files and emails")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/nophish.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write a default configuration file and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the configuration and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("scan-url")
                .long("scan-url")
                .value_name("URL")
                .help("Scan a single URL and print the report")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("scan-file")
                .long("scan-file")
                .value_name("PATH")
                .help("Scan a file's content and print the report")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("scan-email")
                .long("scan-email")
                .value_name("JSON_FILE")
                .help("Scan an email payload ({sender, subject, body, timestamp}) and print the report")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("no-fetch")
                .long("no-fetch")
                .help("Do not fetch target pages during URL scans")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/etc/nophish.yaml");

    let mut config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };
    config.apply_env_overrides();
    if matches.get_flag("no-fetch") {
        config.fetch.enabled = false;
    }

    if let Err(e) = config.validate() {
        eprintln!("❌ Configuration validation failed: {e:#}");
        process::exit(1);
    }

    if matches.get_flag("test-config") {
        println!("✅ Configuration is valid");
        println!("  Bind address: {}", config.server.bind_address);
        println!(
            "  Page fetch: {} (timeout {} ms, max {} bytes)",
            if config.fetch.enabled { "enabled" } else { "disabled" },
            config.fetch.timeout_ms,
            config.fetch.max_bytes
        );
        println!(
            "  EmailJS alerts: {}",
            if config.alerts.enabled { "enabled" } else { "disabled" }
        );
        println!(
            "  Record forwarding: {}",
            config.recorder.endpoint.as_deref().unwrap_or("disabled")
        );
        return;
    }

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error initializing scanner: {e:#}");
            process::exit(1);
        }
    };

    if let Err(e) = run(&matches, &config, state).await {
        log::error!("{e:#}");
        process::exit(1);
    }
}

async fn run(matches: &ArgMatches, config: &Config, state: AppState) -> anyhow::Result<()> {
    if let Some(url) = matches.get_one::<String>("scan-url") {
        url::Url::parse(url).map_err(|e| anyhow::anyhow!("Invalid URL format: {e}"))?;
        let page = fetcher::page_content(state.fetcher.as_deref(), url).await;
        let result = state.engine.scan_url(url, &page);
        let report = ScanReport::from_result(&result);
        return finish_one_shot(&state.hooks, ScanRecord::new(result), &report).await;
    }

    if let Some(path) = matches.get_one::<String>("scan-file") {
        let content = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {path}: {e}"))?;
        let content = String::from_utf8_lossy(&content);
        let file_name = std::path::Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        let result = state.engine.scan_file(&file_name, &content);
        let report = ScanReport::from_result(&result);
        return finish_one_shot(&state.hooks, ScanRecord::new(result), &report).await;
    }

    if let Some(path) = matches.get_one::<String>("scan-email") {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {path}: {e}"))?;
        let request: EmailScanRequest = serde_json::from_str(&raw)?;
        let submission = request.submission()?;
        let (record, report) = submission.conclude(submission.scan(&state.engine), &state.hooks);
        return finish_one_shot(&state.hooks, record, &report).await;
    }

    serve(config, state).await
}

async fn finish_one_shot(
    hooks: &HookSet,
    record: ScanRecord,
    report: &ScanReport,
) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);

    for (name, outcome) in hooks.run_all(&record).await {
        match outcome {
            Ok(outcome) => log::info!("Hook {name}: {outcome:?}"),
            Err(e) => log::warn!("Hook {name} failed: {e}"),
        }
    }
    Ok(())
}

async fn serve(config: &Config, state: AppState) -> anyhow::Result<()> {
    let addr: std::net::SocketAddr = config.server.bind_address.parse()?;
    let app = api::router(state);

    log::info!("Starting nophish scanner on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            log::info!("Received shutdown signal, stopping...");
        })
        .await?;
    Ok(())
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    let written = config
        .to_yaml()
        .and_then(|yaml| std::fs::write(path, yaml).map_err(anyhow::Error::from));

    match written {
        Ok(()) => println!("Default configuration written to: {path}"),
        Err(e) => {
            eprintln!("Error writing configuration file: {e:#}");
            process::exit(1);
        }
    }
}
