use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Importance
// ---------------------------------------------------------------------------

/// Coarse importance level assigned during prioritization.
///
/// `Unset` serializes as the empty string so a freshly parsed task looks the
/// same on the wire as it did before prioritization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Importance {
    #[default]
    #[serde(rename = "")]
    Unset,
    High,
    Medium,
    Low,
}

impl Importance {
    /// Case-insensitive parse of a model-supplied label. Unknown labels map
    /// to `Unset`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Importance::High,
            "medium" => Importance::Medium,
            "low" => Importance::Low,
            _ => Importance::Unset,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Unset => "",
            Importance::High => "High",
            Importance::Medium => "Medium",
            Importance::Low => "Low",
        }
    }

    pub fn is_set(&self) -> bool {
        *self != Importance::Unset
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskRecord
// ---------------------------------------------------------------------------

/// A single structured task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub description: String,
    /// Free-form; not validated as a calendar date.
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub importance: Importance,
    #[serde(default)]
    pub priority_score: f64,
}

impl TaskRecord {
    /// A task as produced by parsing: importance unset, score 0.0.
    pub fn parsed(
        description: impl Into<String>,
        due_date: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            description: description.into(),
            due_date: due_date.into(),
            tags,
            importance: Importance::Unset,
            priority_score: 0.0,
        }
    }

    /// Replace the prioritization fields, returning a new record.
    pub fn prioritized(self, importance: Importance, priority_score: f64) -> Self {
        Self {
            importance,
            priority_score,
            ..self
        }
    }
}
