//! kfetch-telemetry - version 0.1.0
//!
//! Host vitals and process risk reports with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod startup_checks;
mod state;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use kfetch_telemetry::InfoDevice;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, Level};

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_fetch, command_risk};
use config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR, DEFAULT_PORT,
};
use handlers::{
    close_handler, health_handler, open_handler, read_handler, risk_handler, root_handler,
    write_handler,
};
use state::{AppState, SharedState};

/// Initializes tracing logging subsystem with configured log level.
///
/// Logs go to stderr so report output on stdout stays byte-exact.
fn setup_logging(config: &Config, args: &Args) {
    let level = args
        .log_level
        .clone()
        .or_else(|| config.log_level.as_deref().and_then(LogLevel::from_name))
        .unwrap_or(LogLevel::Info);

    if level == LogLevel::Off {
        return;
    }

    let log_level = match level {
        LogLevel::Off | LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {:?}", level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Builds the HTTP router for the given state.
fn build_router(state: SharedState) -> Router {
    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/kfetch", post(open_handler))
        .route(
            "/kfetch/{id}",
            get(read_handler).put(write_handler).delete(close_handler),
        )
        .route("/kfetch_risk", get(risk_handler));

    if state.config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }

    app.with_state(state)
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    // Config generation works without a valid config
    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        return Ok(command_config(output.clone(), format.clone(), *commented)?);
    }

    let config = load_validated_config(&args)?;
    setup_logging(&config, &args);

    match &args.command {
        Some(Commands::Fetch { mask }) => {
            let device = InfoDevice::new(config.host_paths());
            return Ok(command_fetch(&device, *mask)?);
        }
        Some(Commands::Risk) => return Ok(command_risk(&config.host_paths())?),
        Some(Commands::Check { proc, all }) => return Ok(command_check(*proc, *all, &config)?),
        Some(Commands::Config { .. }) => unreachable!("Config handled above"),
        Some(Commands::Serve) | None => {}
    }

    info!("Starting kfetch-telemetry");

    if let Err(e) = startup_checks::validate_requirements(&config.host_paths()) {
        error!("❌ Startup validation failed: {}", e);
        error!("   The service will start but sessions cannot be opened until this is fixed");
    }

    let bind_ip_str = config
        .bind
        .clone()
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::new(bind_ip_str.parse::<IpAddr>()?, port);

    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("kfetch-telemetry listening on http://{}:{}", bind_ip_str, port);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("kfetch-telemetry stopped gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use kfetch_telemetry::fields::KERNEL_RELEASE;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fake_host() -> TempDir {
        let dir = tempdir().expect("Failed to create temp dir");
        let root = dir.path();
        write(root, "proc/sys/kernel/hostname", "box\n");
        write(root, "proc/sys/kernel/osrelease", "6.1.0\n");
        write(root, "proc/cpuinfo", "processor\t: 0\nmodel name\t: Test CPU\n");
        write(
            root,
            "proc/meminfo",
            "MemTotal:        2048000 kB\nMemFree:         1024000 kB\n",
        );
        write(root, "proc/uptime", "600.00 1200.00\n");
        write(root, "sys/devices/system/cpu/online", "0\n");
        write(root, "sys/devices/system/cpu/possible", "0-1\n");
        dir
    }

    fn test_config(host: &TempDir) -> Config {
        Config {
            proc_root: Some(host.path().join("proc")),
            sys_root: Some(host.path().join("sys")),
            ..Config::default()
        }
    }

    fn app(config: Config) -> Router {
        build_router(Arc::new(AppState::new(config)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn open_session(app: &Router) -> u64 {
        let (status, body) = send(app, "POST", "/kfetch", Body::empty()).await;
        assert_eq!(status, StatusCode::CREATED);
        String::from_utf8(body).unwrap().trim().parse().unwrap()
    }

    #[tokio::test]
    async fn test_session_lifecycle_over_http() {
        let host = fake_host();
        let app = app(test_config(&host));
        let id = open_session(&app).await;
        let uri = format!("/kfetch/{}", id);

        let (status, body) = send(
            &app,
            "PUT",
            &uri,
            Body::from(KERNEL_RELEASE.to_ne_bytes().to_vec()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"4\n");

        let (status, _) = send(&app, "PUT", &uri, Body::from(vec![1u8, 2, 3])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "GET", &uri, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("Kernel: 6.1.0"));
        assert!(!text.contains("Uptime:"));

        let (status, body) = send(&app, "GET", &uri, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let (status, _) = send(&app, "DELETE", &uri, Body::empty()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "DELETE", &uri, Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "GET", &uri, Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_read_len_truncates_on_line_boundary() {
        let host = fake_host();
        let app = app(test_config(&host));

        let full_id = open_session(&app).await;
        let (_, full) = send(&app, "GET", &format!("/kfetch/{}", full_id), Body::empty()).await;
        let full = String::from_utf8(full).unwrap();
        assert_eq!(full.lines().count(), 8);

        let short_id = open_session(&app).await;
        let (status, short) = send(
            &app,
            "GET",
            &format!("/kfetch/{}?len=80", short_id),
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let short = String::from_utf8(short).unwrap();
        assert!(short.len() <= 80);
        assert_eq!(short.lines().count(), 1);
        assert!(short.ends_with("box\n"));
        assert!(full.starts_with(&short));
    }

    #[tokio::test]
    async fn test_full_table_answers_503() {
        let host = fake_host();
        let app = app(Config {
            max_sessions: Some(1),
            ..test_config(&host)
        });

        open_session(&app).await;
        let (status, _) = send(&app, "POST", "/kfetch", Body::empty()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_can_be_disabled() {
        let host = fake_host();

        let (status, body) = send(&app(test_config(&host)), "GET", "/health", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("OK"));
        assert!(text.contains("SESSION TABLE"));

        let disabled = app(Config {
            enable_health: Some(false),
            ..test_config(&host)
        });
        let (status, _) = send(&disabled, "GET", "/health", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_risk_report_endpoint() {
        let host = fake_host();
        let app = app(test_config(&host));
        let (status, body) = send(&app, "GET", "/kfetch_risk", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.is_empty());
    }
}
