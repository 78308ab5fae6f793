//! Navigation states and the shared state cell

use crate::hardware::MotorController;
use crate::NavigationError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Which leg of a two-phase wall maneuver is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallPhase {
    First,
    Second,
}

/// Navigation state.
///
/// The order below is the order the track script visits them in. `Waiting`
/// is the idle state and the target of every external stop; `Calibrate`
/// suppresses segmentation entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Calibrate,
    Waiting,
    Start,
    GotoLine,
    FollowLine,
    GotoWall,
    FromWallToLine,
    FollowLineAfterWall,
    FollowLineSpeedy,
    EndOfLine,
    StickToWall,
    StraightUntilWallGone(WallPhase),
    FollowWall(WallPhase),
    TrackCompleted,
}

/// Shared navigation state cell.
///
/// The capture thread transitions it from `update`, the command thread from
/// shell input, and the LED thread reads it for pattern selection. All reads
/// go through the mutex so no thread ever observes a torn value.
#[derive(Clone)]
pub struct NavigationHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    state: Mutex<NavigationState>,
    stop: AtomicBool,
}

impl NavigationHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HandleInner {
                state: Mutex::new(NavigationState::Waiting),
                stop: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> NavigationState {
        match self.inner.state.lock() {
            Ok(guard) => *guard,
            // A poisoned cell still holds a valid Copy value
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set_state(&self, next: NavigationState) {
        let mut guard = match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *guard != next {
            info!(from = ?*guard, to = ?next, "navigation transition");
        }
        *guard = next;
    }

    /// Request an immediate stop: force `Waiting` and flag the machine to
    /// discard its in-flight maneuver state. The caller is responsible for
    /// the single brake call (it holds the motor handle).
    pub fn request_stop(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
        self.set_state(NavigationState::Waiting);
    }

    /// Consume a pending stop request
    pub fn take_stop(&self) -> bool {
        self.inner.stop.swap(false, Ordering::SeqCst)
    }

    /// External stop: exactly one brake call, then force `Waiting`.
    ///
    /// Callable from any thread that holds a motor handle; it does not wait
    /// for the in-flight frame. The machine discards its maneuver state at
    /// its next update via [`NavigationHandle::take_stop`].
    pub fn stop_with<M: MotorController>(
        &self,
        motors: &Mutex<M>,
    ) -> Result<(), NavigationError> {
        match motors.lock() {
            Ok(mut motors) => motors.brake()?,
            Err(_) => return Err(NavigationError::Poisoned),
        }
        self.request_stop();
        Ok(())
    }
}

impl Default for NavigationHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_waiting() {
        let handle = NavigationHandle::new();
        assert_eq!(handle.state(), NavigationState::Waiting);
    }

    #[test]
    fn test_stop_forces_waiting_and_flags_once() {
        let handle = NavigationHandle::new();
        handle.set_state(NavigationState::FollowLine);
        handle.request_stop();
        assert_eq!(handle.state(), NavigationState::Waiting);
        assert!(handle.take_stop());
        assert!(!handle.take_stop());
    }

    #[test]
    fn test_shared_across_clones() {
        let a = NavigationHandle::new();
        let b = a.clone();
        a.set_state(NavigationState::GotoLine);
        assert_eq!(b.state(), NavigationState::GotoLine);
    }
}
