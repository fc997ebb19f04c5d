//! Planned changes and their results

use serde::{Deserialize, Serialize};

/// A planned change to one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g., "network", "clustering_profile")
    pub resource_type: String,

    /// Manifest key of the resource (`type:name`)
    pub resource_key: String,

    /// Remote ID when the resource already exists
    pub remote_id: Option<String>,

    /// Top-level config fields that differ from the last applied config
    pub changed_fields: Vec<String>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        resource_type: impl Into<String>,
        resource_key: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            resource_type: resource_type.into(),
            resource_key: resource_key.into(),
            remote_id: None,
            changed_fields: Vec::new(),
        }
    }

    pub fn with_remote_id(mut self, id: impl Into<String>) -> Self {
        self.remote_id = Some(id.into());
        self
    }

    pub fn with_changes(mut self, fields: Vec<String>) -> Self {
        self.changed_fields = fields;
        self
    }

    /// One-line human readable description
    pub fn describe(&self) -> String {
        match (&self.remote_id, self.changed_fields.is_empty()) {
            (Some(id), false) => format!(
                "{} {} ({}): {}",
                self.action_type,
                self.resource_key,
                id,
                self.changed_fields.join(", ")
            ),
            (Some(id), true) => format!("{} {} ({})", self.action_type, self.resource_key, id),
            (None, _) => format!("{} {}", self.action_type, self.resource_key),
        }
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource in place
    Update,
    /// Delete and re-create a resource whose immutable fields changed
    Replace,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    pub succeeded: Vec<ActionResult>,
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, resource_key: impl Into<String>, message: impl Into<String>) {
        self.succeeded.push(ActionResult {
            resource_key: resource_key.into(),
            message: message.into(),
            error: None,
        });
    }

    pub fn add_failure(&mut self, resource_key: impl Into<String>, error: impl ToString) {
        self.failed.push(ActionResult {
            resource_key: resource_key.into(),
            message: String::new(),
            error: Some(error.to_string()),
        });
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub resource_key: String,
    pub message: String,
    pub error: Option<String>,
}

/// Ordered list of actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn has_changes(&self) -> bool {
        self.actions.iter().any(|a| a.action_type != ActionType::NoOp)
    }

    /// Actions that actually touch the remote
    pub fn changes(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.action_type != ActionType::NoOp)
    }

    pub fn count(&self, action_type: ActionType) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.count(ActionType::Create),
            update: self.count(ActionType::Update),
            replace: self.count(ActionType::Replace),
            delete: self.count(ActionType::Delete),
            no_change: self.count(ActionType::NoOp),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.no_change
        )
    }
}
