mod walker;

use metagov_core::audit::log::{verify_chain, AuditLog, ChainStatus};
use metagov_core::compliance::failures_csv::render_failures_csv;
use metagov_core::config::AuditConfig;
use metagov_core::error::CoreResult;
use metagov_core::run::engine::{ArtifactInput, AuditEngine};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "usage: header_auditor <config.json|config.yaml> [--failures-csv <out.csv>]\n       header_auditor verify-log <audit_log.ndjson>";

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    if args[1] == "verify-log" {
        let Some(path) = args.get(2) else {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        };
        std::process::exit(verify_log(Path::new(path)));
    }

    let mut failures_csv: Option<PathBuf> = None;
    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        match (flag.as_str(), rest.next()) {
            ("--failures-csv", Some(out)) => failures_csv = Some(PathBuf::from(out)),
            _ => {
                eprintln!("{}", USAGE);
                std::process::exit(2);
            }
        }
    }

    match audit(Path::new(&args[1]), failures_csv.as_deref()) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("audit error: {}", e);
            std::process::exit(2);
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("HEADER_AUDITOR_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("HEADER_AUDITOR_LOG_JSON")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Returns whether every scanned artifact is compliant.
fn audit(config_path: &Path, failures_csv: Option<&Path>) -> CoreResult<bool> {
    let cfg = AuditConfig::load(config_path)?;
    let engine = AuditEngine::from_config(&cfg)?;
    let artifacts = walker::governed_artifacts(&cfg, config_path)?;
    tracing::info!(artifacts = artifacts.len(), "governed artifacts discovered");

    let mut audit_log = match &cfg.audit_log_path {
        Some(p) => Some(AuditLog::open_or_create(p)?),
        None => None,
    };

    let inputs = artifacts.into_iter().map(ArtifactInput::read);
    let snapshot = engine.run(inputs, audit_log.as_mut(), |_| {})?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    if let Some(out) = failures_csv {
        std::fs::write(out, render_failures_csv(&snapshot)?)?;
    }
    Ok(snapshot.all_compliant())
}

fn verify_log(path: &Path) -> i32 {
    match verify_chain(path) {
        Ok(ChainStatus::Intact { events }) => {
            println!("audit log intact: {} events", events);
            0
        }
        Ok(ChainStatus::Broken { line, reason }) => {
            println!("audit log broken at line {}: {}", line, reason);
            1
        }
        Err(e) => {
            eprintln!("audit log error: {}", e);
            2
        }
    }
}
