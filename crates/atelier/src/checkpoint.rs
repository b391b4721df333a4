use async_trait::async_trait;

use crate::errors::AgentResult;

/// Prompts addressed to the operator for termination review carry this
/// prefix by convention
pub const FEEDBACK_PREFIX: &str = "Please give feedback to";

/// How long the gate waits for the operator before timing out, in seconds
pub const REVIEW_TIMEOUT_SECS: u64 = 60;

/// The operator's answer to a termination-review prompt
#[derive(Debug, Clone, PartialEq)]
pub enum CheckpointAction {
    /// Let the terminal condition stand
    Continue,
    /// Inject free-text feedback as the next human message and resume
    Feedback(String),
    /// Unconditionally end the session, regardless of other checks
    Exit,
}

/// Human-in-the-loop approval step, consulted by the coordinator when a
/// termination-style message is produced.
///
/// Implementations must answer within [`REVIEW_TIMEOUT_SECS`] or fail with
/// `AgentError::InputTimeout`, which the coordinator treats as `Continue`.
#[async_trait]
pub trait CheckpointGate: Send + Sync {
    async fn review(&self, prompt: &str) -> AgentResult<CheckpointAction>;
}

/// Whether a prompt string is a termination-review prompt
pub fn is_feedback_prompt(prompt: &str) -> bool {
    prompt.starts_with(FEEDBACK_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_prompt_detection() {
        assert!(is_feedback_prompt(
            "Please give feedback to Copywriter. Press continue to accept."
        ));
        assert!(!is_feedback_prompt("What should we write about?"));
    }
}
