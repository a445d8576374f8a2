//! Build status state machine.

/// Lifecycle state of a [`Builder`](crate::Builder).
///
/// Owned and mutated exclusively by the builder instance; collaborators
/// only ever read it. Transitions:
///
/// - `Initial -> Building` on build start
/// - `Building -> BuildDone` on pipeline completion
/// - `BuildDone -> Building` on a dev-mode rebuild
/// - `Building | BuildDone -> Initial` on close
///
/// A validation failure leaves the status at `Building`; the caller must
/// recover explicitly by retrying or closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildStatus {
    #[default]
    Initial,
    Building,
    BuildDone,
}

impl BuildStatus {
    pub fn is_initial(&self) -> bool {
        matches!(self, BuildStatus::Initial)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, BuildStatus::BuildDone)
    }
}
