//! Stage-transition rules
//!
//! The pipeline topology in one place: which stages become legal after a
//! stage completes, and what to suggest to a caller stuck waiting behind a
//! lock holder. Pure functions, no I/O.

use crate::domain::value_objects::{Action, NextActions};

/// Successor set for a completed stage, before escape hatches are unioned in
///
/// `None` means the stage does not advance the machine itself: terminal
/// stages release the lock, and an auto-deploy `switch-live` runs
/// `finish-success` inline instead of scheduling it.
pub fn successors(stage: Action, auto_deploy: bool) -> Option<NextActions> {
    match stage {
        Action::AcquireLock => Some(NextActions::only(&[Action::SyncBranch])),
        Action::SyncBranch => {
            let gate = if auto_deploy {
                Action::SwitchLive
            } else {
                Action::ManualGate
            };
            // finish-success is always reachable after sync: a no-op deploy
            // (nothing new to ship) is permitted.
            Some(NextActions::only(&[gate, Action::FinishSuccess]))
        }
        Action::ManualGate => Some(NextActions::only(&[Action::SwitchLive])),
        Action::SwitchLive => {
            if auto_deploy {
                None
            } else {
                Some(NextActions::only(&[Action::FinishSuccess]))
            }
        }
        // A relocked record is in an unknown state; a human has taken over.
        Action::Relock => Some(NextActions::any()),
        Action::FinishSuccess
        | Action::FinishFailure
        | Action::FinishRollback
        | Action::ForceUnlock => None,
    }
}

/// What a queued caller should be told about unsticking the current holder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Holder has not switched traffic yet: cancelling is cheap
    CancelDeploy,
    /// Holder's deploy is live but unfinished: finish or roll back
    FinishDeploy,
    /// Holder's record is wedged: only a forced unlock remains
    ForceUnlock,
}

/// Tie-break over the holder's legal-next-actions set
pub fn recovery_suggestion(holder_next: &NextActions) -> RecoverySuggestion {
    if holder_next.any_pre_switch() {
        RecoverySuggestion::CancelDeploy
    } else if holder_next.contains(Action::FinishSuccess) {
        RecoverySuggestion::FinishDeploy
    } else {
        RecoverySuggestion::ForceUnlock
    }
}

/// Display name derived from a deployer identity: the local part
pub fn display_name(identity: &str) -> &str {
    identity.split('@').next().unwrap_or(identity)
}

/// Deterministic chat-mention guess when the directory lookup fails
pub fn fallback_mention(name: &str) -> String {
    format!("@{}", name)
}
