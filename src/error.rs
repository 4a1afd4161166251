use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Server rejected request: {0}")]
    Envelope(String),

    #[error("Invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("All {} sources failed for {scope}", .failures.len())]
    AllSourcesFailed { scope: String, failures: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DashboardError {
    /// Message shown next to the retry button.
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::AllSourcesFailed { .. } => {
                "Failed to load dashboard data. Please try again.".to_string()
            }
            DashboardError::Http(e) if e.is_timeout() => {
                "The server took too long to respond. Please try again.".to_string()
            }
            DashboardError::Http(_) => "Could not reach the server. Please try again.".to_string(),
            DashboardError::Status { status, .. } => {
                format!("Server returned an error ({}). Please try again.", status)
            }
            DashboardError::Envelope(message) => message.clone(),
            DashboardError::Decode(_) => "Received malformed data from the server.".to_string(),
            DashboardError::Config(message) => message.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sources_failed_reports_count() {
        let err = DashboardError::AllSourcesFailed {
            scope: "admin".to_string(),
            failures: vec!["orders".to_string(), "users".to_string()],
        };
        assert_eq!(err.to_string(), "All 2 sources failed for admin");
        assert_eq!(
            err.user_message(),
            "Failed to load dashboard data. Please try again."
        );
    }

    #[test]
    fn envelope_message_is_passed_through() {
        let err = DashboardError::Envelope("Chef not found".to_string());
        assert_eq!(err.user_message(), "Chef not found");
    }
}
