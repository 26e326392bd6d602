//! Hook pipe keys and pipeline stage definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The value threaded through a call pipeline.
pub type Payload = serde_json::Value;

/// Which side of a call a hook pipe runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStage {
    /// Runs before the call handler and may transform its input.
    Before,
    /// Runs after the call handler and may transform its output.
    After,
}

impl HookStage {
    /// Returns the string name of this stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a hook pipe, rendered as `before.<call>` or `after.<call>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipeKey {
    /// Side of the call.
    pub stage: HookStage,
    /// Call name.
    pub call: String,
}

impl PipeKey {
    /// Key of the pipe running before `call`.
    pub fn before(call: &str) -> Self {
        Self {
            stage: HookStage::Before,
            call: call.to_string(),
        }
    }

    /// Key of the pipe running after `call`.
    pub fn after(call: &str) -> Self {
        Self {
            stage: HookStage::After,
            call: call.to_string(),
        }
    }
}

impl fmt::Display for PipeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.stage, self.call)
    }
}

/// Stage of the call pipeline at which a call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// No handler was registered under the call name.
    Lookup,
    /// A `before.<call>` hook failed.
    Before,
    /// The call handler failed.
    Operation,
    /// An `after.<call>` hook failed.
    After,
}

impl PipelineStage {
    /// Returns the string name of this stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Before => "before",
            Self::Operation => "operation",
            Self::After => "after",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HookStage> for PipelineStage {
    fn from(stage: HookStage) -> Self {
        match stage {
            HookStage::Before => Self::Before,
            HookStage::After => Self::After,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_key_display() {
        assert_eq!(PipeKey::before("greet").to_string(), "before.greet");
        assert_eq!(PipeKey::after("post.save").to_string(), "after.post.save");
    }

    #[test]
    fn test_before_pipes_sort_first() {
        assert!(PipeKey::before("z") < PipeKey::after("a"));
        assert_eq!(PipelineStage::from(HookStage::After), PipelineStage::After);
    }
}
