use std::fmt;

use tracing::debug;

/// Stages of one conversion run.
///
/// The happy path is strictly linear; `Failed` is reachable from every
/// non-terminal stage and is itself terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    Init,
    LayoutResolved,
    InputAssembled,
    Dispatched,
    ResultStored,
    Done,
    Failed,
}

impl ConversionState {
    /// The stage after `self` on the happy path.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::LayoutResolved),
            Self::LayoutResolved => Some(Self::InputAssembled),
            Self::InputAssembled => Some(Self::Dispatched),
            Self::Dispatched => Some(Self::ResultStored),
            Self::ResultStored => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == Self::Failed || self.next() == Some(target)
    }
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::LayoutResolved => "layout resolved",
            Self::InputAssembled => "input assembled",
            Self::Dispatched => "dispatched",
            Self::ResultStored => "result stored",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the current stage of a run and rejects out-of-order transitions.
#[derive(Debug)]
pub struct StateTracker {
    state: ConversionState,
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            state: ConversionState::Init,
        }
    }

    pub fn state(&self) -> ConversionState {
        self.state
    }

    /// Moves to the next happy-path stage.
    pub fn advance(&mut self, target: ConversionState) {
        debug_assert!(
            self.state.can_transition_to(target) && target != ConversionState::Failed,
            "invalid transition {} -> {}",
            self.state,
            target
        );
        debug!("{} -> {}", self.state, target);
        self.state = target;
    }

    /// Enters `Failed`, returning the stage the run was in.
    pub fn fail(&mut self) -> ConversionState {
        let previous = self.state;
        self.state = ConversionState::Failed;
        previous
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}
