//! Frame loop lifecycle state machine.
//!
//! The loop moves `Uninitialized -> Initialized -> {Rendering <-> Idle} ->
//! Destroyed`. `Destroyed` is terminal and only reachable once the GPU has
//! been drained; every other edge is rejected.

use thiserror::Error;

/// Lifecycle errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// An edge the state machine does not have.
    #[error("illegal frame loop transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Phase the loop was in.
        from: LoopPhase,
        /// Phase the caller asked for.
        to: LoopPhase,
    },

    /// Teardown started while submitted GPU work had not completed.
    #[error("destroyed while GPU work was outstanding (pending fence value {pending})")]
    PrematureDestruction {
        /// Fence value the drain was still waiting on.
        pending: u64,
    },
}

/// Phase of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// No GPU objects exist yet.
    Uninitialized,
    /// Device, swapchain and static uploads are complete; no frame submitted.
    Initialized,
    /// Frames are being produced.
    Rendering,
    /// The window is not visible; no frames are submitted.
    Idle,
    /// All GPU objects released. Terminal.
    Destroyed,
}

impl LoopPhase {
    /// Returns whether the edge `self -> to` exists.
    pub fn can_advance(self, to: LoopPhase) -> bool {
        use LoopPhase::*;
        matches!(
            (self, to),
            (Uninitialized, Initialized)
                | (Initialized, Rendering)
                | (Initialized, Idle)
                | (Rendering, Idle)
                | (Idle, Rendering)
                | (Initialized, Destroyed)
                | (Rendering, Destroyed)
                | (Idle, Destroyed)
        )
    }

    /// Takes the edge `self -> to`, returning the new phase.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] if the edge does not
    /// exist.
    pub fn advance(self, to: LoopPhase) -> Result<LoopPhase, LifecycleError> {
        if self.can_advance(to) {
            Ok(to)
        } else {
            Err(LifecycleError::InvalidTransition { from: self, to })
        }
    }

    /// Returns true while the loop may submit frames.
    #[inline]
    pub fn is_rendering(self) -> bool {
        self == LoopPhase::Rendering
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LoopPhase::*;

    const ALL: [LoopPhase; 5] = [Uninitialized, Initialized, Rendering, Idle, Destroyed];

    #[test]
    fn test_startup_path() {
        let phase = Uninitialized.advance(Initialized).unwrap();
        let phase = phase.advance(Rendering).unwrap();
        assert!(phase.is_rendering());
    }

    #[test]
    fn test_rendering_idle_round_trip() {
        let phase = Rendering.advance(Idle).unwrap();
        assert!(!phase.is_rendering());
        let phase = phase.advance(Rendering).unwrap();
        assert!(phase.is_rendering());
    }

    #[test]
    fn test_idle_before_first_frame() {
        assert_eq!(Initialized.advance(Idle), Ok(Idle));
    }

    #[test]
    fn test_destroyed_is_terminal() {
        for to in ALL {
            assert!(!Destroyed.can_advance(to), "Destroyed -> {to:?} must not exist");
        }
    }

    #[test]
    fn test_destroy_requires_initialization() {
        assert!(!Uninitialized.can_advance(Destroyed));
        assert!(Initialized.can_advance(Destroyed));
        assert!(Rendering.can_advance(Destroyed));
        assert!(Idle.can_advance(Destroyed));
    }

    #[test]
    fn test_no_self_edges() {
        for phase in ALL {
            assert!(!phase.can_advance(phase), "{phase:?} -> {phase:?} must not exist");
        }
    }

    #[test]
    fn test_cannot_skip_initialization() {
        assert!(!Uninitialized.can_advance(Rendering));
        assert!(!Uninitialized.can_advance(Idle));
    }

    #[test]
    fn test_invalid_edge_reports_both_ends() {
        let err = Destroyed.advance(Rendering).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: Destroyed,
                to: Rendering,
            }
        );
    }
}
