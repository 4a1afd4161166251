use std::env;
use std::time::Duration;

use crate::models::Settings;
use crate::services::loading::LoadingTier;

pub const LOCAL_API_URL: &str = "http://localhost:5000";
pub const DEPLOYED_API_URL: &str = "https://mealdash-server.vercel.app";

const DEFAULT_REFRESH_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Reads settings from the environment, after loading `.env` if one exists.
pub fn load_settings() -> Settings {
    dotenvy::dotenv().ok();
    settings_from(|key| env::var(key).ok())
}

pub fn settings_from(lookup: impl Fn(&str) -> Option<String>) -> Settings {
    let hostname = lookup("MEALDASH_HOSTNAME").or_else(|| lookup("HOSTNAME"));
    let api_base_url = resolve_base_url(lookup("MEALDASH_API_URL").as_deref(), hostname.as_deref());

    let refresh_secs = parse_secs(&lookup, "MEALDASH_REFRESH_SECS", DEFAULT_REFRESH_SECS);
    let request_timeout_secs = parse_secs(&lookup, "MEALDASH_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS);

    let loading_tier = match lookup("MEALDASH_LOADING_TIER") {
        Some(raw) => LoadingTier::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(value = %raw, "Unknown MEALDASH_LOADING_TIER, using standard");
            LoadingTier::Standard
        }),
        None => LoadingTier::Standard,
    };

    Settings {
        api_base_url,
        refresh_interval: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
        request_timeout: Duration::from_secs(request_timeout_secs.max(1)),
        loading_tier,
    }
}

/// An explicit override wins; otherwise the host decides between local and deployed.
pub fn resolve_base_url(explicit: Option<&str>, hostname: Option<&str>) -> String {
    if let Some(url) = explicit.map(str::trim).filter(|url| !url.is_empty()) {
        return url.trim_end_matches('/').to_string();
    }
    if is_local_host(hostname.unwrap_or("")) {
        LOCAL_API_URL.to_string()
    } else {
        DEPLOYED_API_URL.to_string()
    }
}

pub fn is_local_host(hostname: &str) -> bool {
    let host = hostname.trim().to_ascii_lowercase();
    matches!(host.as_str(), "" | "localhost" | "127.0.0.1" | "0.0.0.0" | "::1")
        || host.ends_with(".local")
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match lookup(key) {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!(key = %key, value = %raw, fallback = default, "Invalid number in environment, using default");
            default
        }),
        None => default,
    }
}
