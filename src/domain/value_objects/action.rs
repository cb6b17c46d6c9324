//! Action value object - the pipeline stage names
//!
//! Stages are not persisted as an enum: the record stores a comma-separated
//! set of legal next action names (`NextActions`), and each invocation names
//! one `Action` to run. The wildcard entry `<any>` marks a record under
//! manual control (post-relock), where every stage is legal.

use std::collections::BTreeSet;

/// One runnable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Action {
    /// Take the deploy lock and create the record
    AcquireLock,
    /// Reconcile the release branch with the stable branch
    SyncBranch,
    /// Wait for a human to test the primed version
    ManualGate,
    /// Switch live traffic to the new version and monitor
    SwitchLive,
    /// Tag, merge back to stable, drop the lock
    FinishSuccess,
    /// Mark the deploy failed and keep a lock backup
    FinishFailure,
    /// Roll live traffic back, then finish as failed
    FinishRollback,
    /// Manually release someone's lock
    ForceUnlock,
    /// Restore a released lock from its backup
    Relock,
}

impl Action {
    /// Always-reachable recovery stages, legal from any pipeline position
    pub const ESCAPE_HATCHES: [Action; 4] = [
        Action::FinishFailure,
        Action::FinishRollback,
        Action::ForceUnlock,
        Action::Relock,
    ];

    /// The name used in records, links and the CLI
    pub fn name(&self) -> &'static str {
        match self {
            Action::AcquireLock => "acquire-lock",
            Action::SyncBranch => "sync-branch",
            Action::ManualGate => "manual-gate",
            Action::SwitchLive => "switch-live",
            Action::FinishSuccess => "finish-success",
            Action::FinishFailure => "finish-failure",
            Action::FinishRollback => "finish-rollback",
            Action::ForceUnlock => "force-unlock",
            Action::Relock => "relock",
        }
    }

    /// Returns true for the recovery stages in `ESCAPE_HATCHES`
    pub fn is_escape_hatch(&self) -> bool {
        Action::ESCAPE_HATCHES.contains(self)
    }

    /// Returns true for stages that run before traffic has switched
    ///
    /// Used when suggesting recovery to a waiting caller: if the holder has
    /// not switched traffic yet, cancelling their deploy is cheap.
    pub fn is_pre_switch(&self) -> bool {
        matches!(
            self,
            Action::SyncBranch | Action::ManualGate | Action::SwitchLive
        )
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The legal-next-actions set from a deploy record
///
/// Stored as strings so unknown tokens in a hand-edited record survive a
/// read/write cycle instead of being silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NextActions {
    entries: BTreeSet<String>,
}

/// Record token meaning "every stage is legal"
pub const WILDCARD: &str = "<any>";

impl NextActions {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Exactly the given actions, nothing else
    pub fn only(actions: &[Action]) -> Self {
        let mut next = Self::new();
        for action in actions {
            next.insert(*action);
        }
        next
    }

    /// The wildcard set
    pub fn any() -> Self {
        let mut entries = BTreeSet::new();
        entries.insert(WILDCARD.to_string());
        Self { entries }
    }

    /// Parse the comma-separated record field
    pub fn from_field(field: &str) -> Self {
        let entries = field
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { entries }
    }

    /// Serialize sorted, comma-separated
    pub fn to_field(&self) -> String {
        self.entries.iter().cloned().collect::<Vec<_>>().join(",")
    }

    pub fn insert(&mut self, action: Action) {
        self.entries.insert(action.name().to_string());
    }

    /// Union in the escape-hatch stages
    pub fn with_escape_hatches(mut self) -> Self {
        for hatch in Action::ESCAPE_HATCHES {
            self.insert(hatch);
        }
        self
    }

    /// Membership test, exact (wildcard not considered)
    pub fn contains(&self, action: Action) -> bool {
        self.entries.contains(action.name())
    }

    /// Whether running `action` is legal (member, or wildcard present)
    pub fn allows(&self, action: Action) -> bool {
        self.entries.contains(WILDCARD) || self.contains(action)
    }

    /// Whether any pre-switch stage is still legal
    pub fn any_pre_switch(&self) -> bool {
        [Action::SyncBranch, Action::ManualGate, Action::SwitchLive]
            .iter()
            .any(|a| self.contains(*a))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for NextActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_field())
    }
}
