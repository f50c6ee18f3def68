//! Handling of "shouldn't happen" states

use serde::{Deserialize, Serialize};
use tracing::error;

/// What to do when the broadcaster reaches a state that correct sequencing
/// of platform callbacks should never produce.
///
/// `Strict` panics so the violation surfaces as a test failure or crash in
/// development. `Lenient` logs the violation and the current operation
/// becomes a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvariantPolicy {
    Strict,
    Lenient,
}

impl Default for InvariantPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            InvariantPolicy::Strict
        } else {
            InvariantPolicy::Lenient
        }
    }
}

impl InvariantPolicy {
    /// Report an invariant violation. Returns only under `Lenient`.
    pub fn violated(self, message: &str) {
        match self {
            InvariantPolicy::Strict => panic!("invariant violated: {}", message),
            InvariantPolicy::Lenient => error!("invariant violated: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_returns() {
        InvariantPolicy::Lenient.violated("no pending value");
    }

    #[test]
    #[should_panic(expected = "invariant violated: no pending value")]
    fn test_strict_panics() {
        InvariantPolicy::Strict.violated("no pending value");
    }

    #[test]
    fn test_deserialize_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: InvariantPolicy,
        }
        let parsed: Wrapper = toml::from_str("policy = \"lenient\"").unwrap();
        assert_eq!(parsed.policy, InvariantPolicy::Lenient);
    }
}
