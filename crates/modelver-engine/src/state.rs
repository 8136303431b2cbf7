//! Migration state machine
//!
//! `Identified -> (Migrating -> Validated)* -> Current`, with `Failed`
//! reachable from every non-terminal state.

use crate::MigrationError;
use modelver_schema::Version;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// State of one document migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// Declared version read, nothing applied
    Identified,
    /// A rule is being applied
    Migrating,
    /// Output of the last rule passed validation
    Validated,
    /// Terminal success
    Current,
    /// Terminal failure
    Failed,
}

impl MigrationState {
    /// Whether no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Current | Self::Failed)
    }
}

impl Display for MigrationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Identified => "identified",
            Self::Migrating => "migrating",
            Self::Validated => "validated",
            Self::Current => "current",
            Self::Failed => "failed",
        })
    }
}

/// States reachable from `from` in one transition
#[must_use]
pub fn allowed_transitions(from: MigrationState) -> Vec<MigrationState> {
    use MigrationState::*;
    match from {
        Identified => vec![Migrating, Current, Failed],
        Migrating => vec![Validated, Failed],
        Validated => vec![Migrating, Current, Failed],
        Current | Failed => vec![],
    }
}

/// Check one transition against [`allowed_transitions`]
///
/// # Errors
/// Returns [`MigrationError::IllegalTransition`] if `to` is not reachable
pub fn validate_transition(from: MigrationState, to: MigrationState) -> Result<(), MigrationError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(MigrationError::IllegalTransition { from, to })
    }
}

/// Current state plus the version it applies to
#[derive(Debug)]
pub(crate) struct StateTracker {
    state: MigrationState,
    version: Version,
}

impl StateTracker {
    pub(crate) fn new(version: Version) -> Self {
        tracing::debug!(%version, state = %MigrationState::Identified, "migration state");
        Self {
            state: MigrationState::Identified,
            version,
        }
    }

    pub(crate) fn state(&self) -> MigrationState {
        self.state
    }

    /// Last version the document was identified or validated at
    pub(crate) fn version(&self) -> Version {
        self.version
    }

    pub(crate) fn advance(&mut self, to: MigrationState) -> Result<(), MigrationError> {
        validate_transition(self.state, to)?;
        tracing::debug!(version = %self.version, from = %self.state, %to, "migration state");
        self.state = to;
        Ok(())
    }

    /// Enter `Validated` at `version`
    pub(crate) fn validated(&mut self, version: Version) -> Result<(), MigrationError> {
        self.advance(MigrationState::Validated)?;
        self.version = version;
        Ok(())
    }

    /// Enter `Failed` unless already terminal
    pub(crate) fn fail(&mut self) {
        if !self.state.is_terminal() {
            tracing::debug!(version = %self.version, from = %self.state, "migration state failed");
            self.state = MigrationState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identified_transitions() {
        use MigrationState::*;
        assert!(validate_transition(Identified, Migrating).is_ok());
        assert!(validate_transition(Identified, Current).is_ok());
        assert!(validate_transition(Identified, Failed).is_ok());

        assert!(validate_transition(Identified, Validated).is_err());
    }

    #[test]
    fn migrating_must_validate_before_current() {
        use MigrationState::*;
        assert!(validate_transition(Migrating, Validated).is_ok());
        assert!(validate_transition(Migrating, Current).is_err());
        assert!(validate_transition(Migrating, Migrating).is_err());
    }

    #[test]
    fn terminal_states_are_final() {
        use MigrationState::*;
        for to in [Identified, Migrating, Validated, Current, Failed] {
            assert!(validate_transition(Current, to).is_err());
            assert!(validate_transition(Failed, to).is_err());
        }
    }

    #[test]
    fn tracker_walks_the_loop() {
        let mut tracker = StateTracker::new(Version::new(3, 0, 0));
        tracker.advance(MigrationState::Migrating).unwrap();
        tracker.validated(Version::new(3, 0, 1)).unwrap();
        tracker.advance(MigrationState::Migrating).unwrap();
        tracker.validated(Version::new(3, 1, 0)).unwrap();
        tracker.advance(MigrationState::Current).unwrap();

        assert_eq!(tracker.state(), MigrationState::Current);
        assert_eq!(tracker.version(), Version::new(3, 1, 0));

        tracker.fail();
        assert_eq!(tracker.state(), MigrationState::Current);
    }

    #[test]
    fn illegal_transition_leaves_state() {
        let mut tracker = StateTracker::new(Version::new(3, 0, 0));
        let err = tracker.advance(MigrationState::Validated).unwrap_err();
        assert!(matches!(err, MigrationError::IllegalTransition { .. }));
        assert_eq!(tracker.state(), MigrationState::Identified);
    }

    fn any_state() -> impl Strategy<Value = MigrationState> {
        prop_oneof![
            Just(MigrationState::Identified),
            Just(MigrationState::Migrating),
            Just(MigrationState::Validated),
            Just(MigrationState::Current),
            Just(MigrationState::Failed),
        ]
    }

    proptest! {
        #[test]
        fn prop_validate_matches_table(from in any_state(), to in any_state()) {
            let allowed = allowed_transitions(from);
            prop_assert_eq!(validate_transition(from, to).is_ok(), allowed.contains(&to));
        }

        #[test]
        fn prop_failed_reachable_from_non_terminal(from in any_state()) {
            prop_assume!(!from.is_terminal());
            prop_assert!(validate_transition(from, MigrationState::Failed).is_ok());
        }
    }
}
