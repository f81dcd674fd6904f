//! Pipeline state machine.

use chrono::{DateTime, Utc};

/// Stage of one pipeline run. Each variant names the step that has just completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Record created, nothing done yet.
    Pending,
    /// Staged JSON fetched and parsed.
    Loaded,
    /// Routing identities and destination path derived.
    Extracted,
    /// Raw message compiled.
    Compiled,
    /// Raw message accepted by the transport.
    Sent,
    /// Raw message written under the reserved prefix.
    Staged,
    /// Staged copy copied to the archive path.
    Copied,
    /// Original staged JSON removed.
    SourceDeleted,
    /// Temporary raw copy removed.
    StagedDeleted,
    /// Run finished successfully.
    Done,
    /// Run stopped on a failure.
    Aborted,
}

impl Stage {
    /// The single successor on the happy path.
    pub fn next(&self) -> Option<Stage> {
        use Stage::*;

        match self {
            Pending => Some(Loaded),
            Loaded => Some(Extracted),
            Extracted => Some(Compiled),
            Compiled => Some(Sent),
            Sent => Some(Staged),
            Staged => Some(Copied),
            Copied => Some(SourceDeleted),
            SourceDeleted => Some(StagedDeleted),
            StagedDeleted => Some(Done),
            Done | Aborted => None,
        }
    }

    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == Stage::Aborted || self.next() == Some(target)
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Loaded => "loaded",
            Self::Extracted => "extracted",
            Self::Compiled => "compiled",
            Self::Sent => "sent",
            Self::Staged => "staged",
            Self::Copied => "copied",
            Self::SourceDeleted => "source_deleted",
            Self::StagedDeleted => "staged_deleted",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

/// External side effects that have landed by a given stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    pub sent: bool,
    pub staged: bool,
    pub archived: bool,
    pub source_deleted: bool,
    pub staged_deleted: bool,
}

impl Effects {
    /// Effects implied by having completed `stage`.
    pub fn after(stage: Stage) -> Self {
        use Stage::*;

        let rank = |s: Stage| match s {
            Pending | Aborted => 0,
            Loaded => 1,
            Extracted => 2,
            Compiled => 3,
            Sent => 4,
            Staged => 5,
            Copied => 6,
            SourceDeleted => 7,
            StagedDeleted | Done => 8,
        };
        let reached = rank(stage);
        Self {
            sent: reached >= rank(Sent),
            staged: reached >= rank(Staged),
            archived: reached >= rank(Copied),
            source_deleted: reached >= rank(SourceDeleted),
            staged_deleted: reached >= rank(StagedDeleted),
        }
    }

    /// Short human summary for logs, e.g. `"sent, archived"`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.sent {
            parts.push("sent");
        }
        if self.staged && !self.staged_deleted {
            parts.push("temp copy present");
        }
        if self.archived {
            parts.push("archived");
        }
        if self.sent && !self.source_deleted {
            parts.push("source still staged");
        }
        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// A state transition event.
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// Previous state.
    pub from: Stage,
    /// New state.
    pub to: Stage,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
}

/// Current stage plus transition history of one run.
#[derive(Debug, Clone)]
pub struct RunTracker {
    stage: Stage,
    transitions: Vec<StateTransition>,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            stage: Stage::Pending,
            transitions: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Move to `target`. Returns `false` and leaves the state untouched if the
    /// transition is not allowed.
    pub fn transition_to(&mut self, target: Stage) -> bool {
        if !self.stage.can_transition_to(target) {
            return false;
        }
        self.transitions.push(StateTransition {
            from: self.stage,
            to: target,
            timestamp: Utc::now(),
        });
        self.stage = target;
        true
    }

    pub fn into_transitions(self) -> Vec<StateTransition> {
        self.transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_strictly_linear() {
        let mut stage = Stage::Pending;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(stage.can_transition_to(next));
            stage = next;
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                Stage::Pending,
                Stage::Loaded,
                Stage::Extracted,
                Stage::Compiled,
                Stage::Sent,
                Stage::Staged,
                Stage::Copied,
                Stage::SourceDeleted,
                Stage::StagedDeleted,
                Stage::Done,
            ]
        );
    }

    #[test]
    fn no_skipping_or_going_back() {
        assert!(!Stage::Loaded.can_transition_to(Stage::Compiled));
        assert!(!Stage::Sent.can_transition_to(Stage::Compiled));
        assert!(!Stage::Pending.can_transition_to(Stage::Done));
    }

    #[test]
    fn every_non_terminal_stage_can_abort() {
        for stage in [
            Stage::Pending,
            Stage::Loaded,
            Stage::Extracted,
            Stage::Compiled,
            Stage::Sent,
            Stage::Staged,
            Stage::Copied,
            Stage::SourceDeleted,
            Stage::StagedDeleted,
        ] {
            assert!(stage.can_transition_to(Stage::Aborted), "{stage}");
        }
    }

    #[test]
    fn terminal_states_are_absorbing() {
        assert!(!Stage::Done.can_transition_to(Stage::Aborted));
        assert!(!Stage::Aborted.can_transition_to(Stage::Loaded));
        assert!(!Stage::Aborted.can_transition_to(Stage::Aborted));
    }

    #[test]
    fn tracker_records_history_and_rejects_bad_moves() {
        let mut tracker = RunTracker::new();
        assert!(tracker.transition_to(Stage::Loaded));
        assert!(!tracker.transition_to(Stage::Sent));
        assert_eq!(tracker.stage(), Stage::Loaded);
        assert!(tracker.transition_to(Stage::Aborted));
        assert!(!tracker.transition_to(Stage::Extracted));

        let steps: Vec<(Stage, Stage)> = tracker
            .transitions()
            .iter()
            .map(|t| (t.from, t.to))
            .collect();
        assert_eq!(
            steps,
            vec![(Stage::Pending, Stage::Loaded), (Stage::Loaded, Stage::Aborted)]
        );
    }

    #[test]
    fn effects_follow_completed_stage() {
        assert_eq!(Effects::after(Stage::Compiled), Effects::default());

        let sent = Effects::after(Stage::Sent);
        assert!(sent.sent && !sent.staged && !sent.archived);
        assert_eq!(sent.summary(), "sent, source still staged");

        let copied = Effects::after(Stage::Copied);
        assert!(copied.archived && !copied.source_deleted);
        assert_eq!(copied.summary(), "sent, temp copy present, archived, source still staged");

        let done = Effects::after(Stage::Done);
        assert!(done.staged_deleted);
        assert_eq!(done.summary(), "sent, archived");
    }

    #[test]
    fn display_uses_snake_case() {
        assert_eq!(Stage::SourceDeleted.to_string(), "source_deleted");
        assert_eq!(Stage::Done.to_string(), "done");
    }
}
