//! Dispatch Outcome
//!
//! What a stage invocation came to. The split between "failed" and
//! "ignored" matters more than it looks: the external job runner releases
//! the deploy lock when an invocation reports failure, so an invocation
//! that does not own the lock must report success even when it did nothing.

/// Result of dispatching one stage invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The stage ran and succeeded
    Completed,
    /// The stage ran and failed; the message is also persisted as the
    /// record's last error where a record exists
    Failed(String),
    /// The supplied token does not match the record's; nothing ran, and
    /// reporting success keeps the non-owner's runner from releasing a
    /// lock it does not hold
    IgnoredTokenMismatch,
    /// The action is not currently legal; nothing ran (a double-clicked
    /// link, usually)
    IgnoredIllegalAction,
    /// No record could be loaded; nothing ran and there is no lock to
    /// release
    NoRecord,
}

impl DispatchOutcome {
    /// The boolean signal handed to the job runner (exit status 0 or 1)
    pub fn success(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::Completed
                | DispatchOutcome::IgnoredTokenMismatch
                | DispatchOutcome::IgnoredIllegalAction
        )
    }
}
