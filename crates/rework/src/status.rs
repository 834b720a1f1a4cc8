//! Broadcast status of a syntax unit and the dispatch phases.

use std::fmt;

/// Where a unit is in its broadcast lifecycle.
///
/// The order of the variants is the order of the state machine; a unit's
/// status only ever moves forward, except that destroying a unit jumps to
/// [`Status::NeverEmit`] from anywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    #[default]
    Unbroadcasted,
    /// Buffered by a paused queue, not yet emitted.
    Queued,
    /// The emitter is dispatching it.
    Emitting,
    Refined,
    Processed,
    Validated,
    /// Destroyed; excluded from every future dispatch.
    NeverEmit,
}

impl Status {
    /// Whether a unit in this status still has to go through `phase`.
    pub fn should_broadcast(self, phase: Phase) -> bool {
        self != Status::NeverEmit && self < phase.completed()
    }

    /// The status after moving towards `next`, never moving backwards.
    pub fn advance(self, next: Status) -> Status {
        if self == Status::NeverEmit {
            self
        } else {
            self.max(next)
        }
    }
}

/// Ordered stages of subscriber dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Lazy parsing of nested raw content.
    Refine,
    /// General tree rework and observation.
    Process,
    /// Read-only checks reporting to the error manager.
    Validate,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Refine, Phase::Process, Phase::Validate];

    /// The status a unit reaches once this phase has been dispatched for it.
    pub fn completed(self) -> Status {
        match self {
            Phase::Refine => Status::Refined,
            Phase::Process => Status::Processed,
            Phase::Validate => Status::Validated,
        }
    }

    /// This phase and every phase before it, in order.
    pub fn through(self) -> impl Iterator<Item = Phase> {
        Phase::ALL.into_iter().filter(move |phase| *phase <= self)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Refine => write!(f, "refine"),
            Phase::Process => write!(f, "process"),
            Phase::Validate => write!(f, "validate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_never_moves_backwards() {
        let status = Status::Processed;
        assert_eq!(status.advance(Status::Emitting), Status::Processed);
        assert_eq!(status.advance(Status::Validated), Status::Validated);
    }

    #[test]
    fn never_emit_is_terminal() {
        assert_eq!(Status::NeverEmit.advance(Status::Validated), Status::NeverEmit);
        for phase in Phase::ALL {
            assert!(!Status::NeverEmit.should_broadcast(phase));
        }
    }

    #[test]
    fn should_broadcast_tracks_completed_phases() {
        assert!(Status::Unbroadcasted.should_broadcast(Phase::Refine));
        assert!(Status::Queued.should_broadcast(Phase::Refine));
        assert!(!Status::Refined.should_broadcast(Phase::Refine));
        assert!(Status::Refined.should_broadcast(Phase::Process));
        assert!(!Status::Processed.should_broadcast(Phase::Process));
        assert!(Status::Processed.should_broadcast(Phase::Validate));
        assert!(!Status::Validated.should_broadcast(Phase::Validate));
    }

    #[test]
    fn phases_run_in_order() {
        let phases: Vec<Phase> = Phase::Process.through().collect();
        assert_eq!(phases, vec![Phase::Refine, Phase::Process]);
    }
}
