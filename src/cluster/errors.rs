use thiserror::Error;

// * Unified Error type for the gather engine and the cluster adapters.
#[derive(Error, Debug)]
pub enum GatherError {
    #[error("Cluster API request failed: {0}")]
    Api(#[from] kube::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Gather cancelled")]
    Cancelled,

    #[error("Invalid log buffer size {0}")]
    InvalidBudget(i64),

    #[error("Log buffer is empty")]
    EmptyLog,

    #[error("Invalid image reference: {0}")]
    InvalidImageReference(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl GatherError {
    /// True for a missing resource, whether reported by a fake or by the API server
    pub fn is_not_found(&self) -> bool {
        match self {
            GatherError::NotFound(_) => true,
            GatherError::Api(kube::Error::Api(response)) => response.code == 404,
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatherError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(GatherError::NotFound("clusteroperators".into()).is_not_found());
        assert!(!GatherError::Upstream("boom".into()).is_not_found());
        assert!(!GatherError::Cancelled.is_not_found());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            GatherError::InvalidBudget(-3).to_string(),
            "Invalid log buffer size -3"
        );
        assert!(GatherError::Cancelled.is_cancelled());
    }
}
