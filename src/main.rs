use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use mealdash::config::load_settings;
use mealdash::models::DashboardSnapshot;
use mealdash::{DashboardScope, HttpDashboardApi, LoadingContext, RefreshController, RefreshOutcome, Role};

const USAGE: &str = "usage: mealdash <admin|chef|user> [email] [--watch]";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let (scope, watch) = parse_args(std::env::args().skip(1).collect())?;
    let settings = load_settings();
    tracing::info!(api = %settings.api_base_url, scope = %scope, "Starting dashboard");

    let api = HttpDashboardApi::new(&settings).context("HTTP client")?;
    let loading = LoadingContext::new();
    let controller = RefreshController::new(Arc::new(api), loading.clone(), scope, settings.loading_tier);

    let mut busy = loading.subscribe();
    tokio::spawn(async move {
        while busy.changed().await.is_ok() {
            let status = busy.borrow_and_update().clone();
            match status.label {
                Some(label) if status.busy => tracing::info!(label = %label, "Loading..."),
                _ => tracing::debug!("Loading indicator cleared"),
            }
        }
    });

    match controller.refresh_data().await {
        RefreshOutcome::Failed(message) if !watch => return Err(anyhow!(message)),
        RefreshOutcome::Failed(message) => tracing::error!(error = %message, "Initial load failed"),
        _ => print_snapshot(&controller.snapshot())?,
    }

    if !watch {
        return Ok(());
    }

    let Some(period) = settings.refresh_interval else {
        return Err(anyhow!("--watch needs MEALDASH_REFRESH_SECS greater than 0"));
    };
    let _auto = controller.spawn_auto_refresh(period);
    let mut updates = controller.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping");
                return Ok(());
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let snapshot = updates.borrow_and_update().clone();
                if !snapshot.is_refreshing && !snapshot.is_loading {
                    print_snapshot(&snapshot)?;
                }
            }
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<(DashboardScope, bool)> {
    let watch = args.iter().any(|arg| arg == "--watch");
    let positional: Vec<&String> = args.iter().filter(|arg| !arg.starts_with("--")).collect();

    let role = positional
        .first()
        .and_then(|raw| Role::parse(raw))
        .ok_or_else(|| anyhow!(USAGE))?;
    let email = positional.get(1).map(|email| email.to_string());

    let scope = match (role, email) {
        (Role::Admin, _) => DashboardScope::Admin,
        (Role::Chef, Some(email)) => DashboardScope::Chef(email),
        (Role::User, Some(email)) => DashboardScope::User(email),
        (_, None) => return Err(anyhow!("{} dashboards need an email. {}", role, USAGE)),
    };
    Ok((scope, watch))
}

fn print_snapshot(snapshot: &DashboardSnapshot) -> Result<()> {
    if let Some(error) = &snapshot.error {
        tracing::warn!(error = %error, "Showing last good data");
    }
    if let Some(view) = &snapshot.view {
        println!("{}", serde_json::to_string_pretty(view)?);
    }
    Ok(())
}
