//! Installation progress status carried by mesh nodes

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::SceneNode;

/// Metadata key the progress status is stored under in a node's user data
pub const PROGRESS_KEY: &str = "propertyValue";

/// The four installation stages a mesh can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProgressCode {
    NotStarted = 1,
    InProgress = 2,
    PartiallyInstalled = 3,
    Installed = 4,
}

impl ProgressCode {
    /// All codes in ascending order
    pub const ALL: [ProgressCode; 4] = [
        ProgressCode::NotStarted,
        ProgressCode::InProgress,
        ProgressCode::PartiallyInstalled,
        ProgressCode::Installed,
    ];

    /// Look up a code by its integer value (1..=4)
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ProgressCode::NotStarted),
            2 => Some(ProgressCode::InProgress),
            3 => Some(ProgressCode::PartiallyInstalled),
            4 => Some(ProgressCode::Installed),
            _ => None,
        }
    }

    /// Integer value of the code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Canonical display text for the code
    pub fn text(self) -> &'static str {
        match self {
            ProgressCode::NotStarted => "Not Started",
            ProgressCode::InProgress => "In Progress",
            ProgressCode::PartiallyInstalled => "Partially Installed",
            ProgressCode::Installed => "Installed",
        }
    }
}

impl fmt::Display for ProgressCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Progress status as stored in node metadata.
///
/// `status_text` is always the canonical text of `status_code`; build values
/// through [`ProgressStatus::new`] to keep the two in step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStatus {
    pub status_code: u8,
    pub status_text: String,
}

impl ProgressStatus {
    pub fn new(code: ProgressCode) -> Self {
        Self {
            status_code: code.code(),
            status_text: code.text().to_string(),
        }
    }

    /// The typed code, if `status_code` is in range
    pub fn code(&self) -> Option<ProgressCode> {
        ProgressCode::from_code(self.status_code)
    }
}

impl From<ProgressCode> for ProgressStatus {
    fn from(code: ProgressCode) -> Self {
        Self::new(code)
    }
}

/// Source of progress values for mesh nodes.
///
/// Implementations must be deterministic for a given node.
pub trait ProgressPolicy: Send + Sync {
    /// Progress status to assign to `node`
    fn status_for(&self, node: &SceneNode) -> ProgressStatus;
}

/// Cycles through the four stages by node id: `(id mod 4) + 1`.
///
/// Placeholder until nodes carry real progress data.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdCyclePolicy;

impl IdCyclePolicy {
    /// Code assigned to the node with stable id `id`
    pub fn code_for_id(id: u32) -> ProgressCode {
        ProgressCode::ALL[(id % 4) as usize]
    }
}

impl ProgressPolicy for IdCyclePolicy {
    fn status_for(&self, node: &SceneNode) -> ProgressStatus {
        ProgressStatus::new(Self::code_for_id(node.id.get()))
    }
}
