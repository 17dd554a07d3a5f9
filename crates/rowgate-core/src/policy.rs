use serde::{Deserialize, Serialize};

/// Condition language tag written by the administration path
pub const CEL_CONDITION_TYPE: &str = "cel";

/// Outcome a policy contributes when applicable
///
/// Stored as text. Only the exact string `allow` is [`Effect::Allow`]; every
/// other value, including unknown spellings, reads as [`Effect::Deny`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }
}

impl From<String> for Effect {
    fn from(value: String) -> Self {
        Effect::from(value.as_str())
    }
}

impl From<&str> for Effect {
    fn from(value: &str) -> Self {
        if value == "allow" {
            Effect::Allow
        } else {
            Effect::Deny
        }
    }
}

impl From<Effect> for String {
    fn from(effect: Effect) -> Self {
        effect.as_str().to_string()
    }
}

/// A stored access-control rule for one role
///
/// Read-only snapshot; the engine never mutates policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub resource: String,
    pub operation: String,
    pub effect: Effect,
    #[serde(default = "default_condition_type")]
    pub condition_type: String,
    pub condition_expression: String,
}

fn default_condition_type() -> String {
    CEL_CONDITION_TYPE.to_string()
}

impl Policy {
    pub fn new(
        resource: impl Into<String>,
        operation: impl Into<String>,
        effect: Effect,
        condition_expression: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            operation: operation.into(),
            effect,
            condition_type: default_condition_type(),
            condition_expression: condition_expression.into(),
        }
    }

    /// Create an allow policy
    pub fn allow(
        resource: impl Into<String>,
        operation: impl Into<String>,
        condition_expression: impl Into<String>,
    ) -> Self {
        Self::new(resource, operation, Effect::Allow, condition_expression)
    }

    /// Create a deny policy
    pub fn deny(
        resource: impl Into<String>,
        operation: impl Into<String>,
        condition_expression: impl Into<String>,
    ) -> Self {
        Self::new(resource, operation, Effect::Deny, condition_expression)
    }

    pub fn is_allow(&self) -> bool {
        self.effect == Effect::Allow
    }
}
