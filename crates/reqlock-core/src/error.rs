use semver::Version;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid requirement '{line}': {reason}")]
    InvalidSpecifier { line: String, reason: String },

    #[error("{}", conflict_message(.left, .right, .left_via, .right_via))]
    Conflict {
        name: String,
        left: String,
        right: String,
        left_via: Vec<String>,
        right_via: Vec<String>,
    },

    #[error("{}", no_candidate_message(.requirement, .tried))]
    NoMatchingVersion {
        name: String,
        requirement: String,
        tried: Vec<Version>,
        via: Vec<String>,
    },

    #[error("repository contract violated: {0}")]
    PreconditionViolated(String),

    #[error("resolution did not stabilize within {rounds} rounds")]
    RoundLimitExceeded { rounds: usize },

    #[error("could not fetch hashes for {name}: {reason}")]
    HashUnavailable { name: String, reason: String },

    #[error("repository error: {0}")]
    Repository(String),
}

impl ResolveError {
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository(message.into())
    }
}

fn conflict_message(left: &str, right: &str, left_via: &[String], right_via: &[String]) -> String {
    let mut message = format!("Incompatible requirements found: {left} and {right}");
    if !left_via.is_empty() {
        message.push_str(&format!("\n{left} is pulled in via: {}", left_via.join(", ")));
    }
    if !right_via.is_empty() {
        message.push_str(&format!(
            "\n{right} is pulled in via: {}",
            right_via.join(", ")
        ));
    }
    message
}

fn no_candidate_message(requirement: &str, tried: &[Version]) -> String {
    let tried_line = if tried.is_empty() {
        "(no version found at all)".to_string()
    } else {
        tried
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("Could not find a version that matches {requirement}\nTried: {tried_line}")
}
