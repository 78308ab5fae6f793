//! LED pattern thread

use navigation::{Indicator, NavigationHandle, NavigationState, WallPhase};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Pattern frame period
const TICK: Duration = Duration::from_millis(200);

/// Cooperative pattern renderer: reads the shared navigation state at a
/// fixed delay and drives the indicator. Purely advisory; it never writes
/// navigation state.
pub fn run<I: Indicator>(
    indicator: Arc<Mutex<I>>,
    handle: NavigationHandle,
    running: Arc<AtomicBool>,
) {
    let mut tick: u32 = 0;
    while running.load(Ordering::SeqCst) {
        let mask = pattern_for(handle.state(), tick);
        if let Ok(mut indicator) = indicator.lock() {
            indicator.set_lights(mask);
        }
        tick = tick.wrapping_add(1);
        thread::sleep(TICK);
    }
    if let Ok(mut indicator) = indicator.lock() {
        indicator.set_lights(0);
    }
}

/// One mask per pattern frame
fn pattern_for(state: NavigationState, tick: u32) -> u8 {
    let blink = tick % 2 == 0;
    match state {
        NavigationState::Waiting => {
            if tick % 8 == 0 {
                0b0001
            } else {
                0b0000
            }
        }
        NavigationState::Calibrate => {
            if blink {
                0b1001
            } else {
                0b0110
            }
        }
        NavigationState::Start | NavigationState::GotoLine => 0b0001,
        NavigationState::FollowLine
        | NavigationState::FollowLineAfterWall
        | NavigationState::FromWallToLine => 0b0011,
        NavigationState::FollowLineSpeedy => {
            if blink {
                0b1111
            } else {
                0b0011
            }
        }
        NavigationState::GotoWall
        | NavigationState::EndOfLine
        | NavigationState::StickToWall
        | NavigationState::StraightUntilWallGone(_) => 0b0100,
        NavigationState::FollowWall(WallPhase::First) => 0b0110,
        NavigationState::FollowWall(WallPhase::Second) => 0b0111,
        NavigationState::TrackCompleted => {
            if blink {
                0b1111
            } else {
                0b0000
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waiting_is_mostly_dark() {
        let lit = (0..8)
            .filter(|&t| pattern_for(NavigationState::Waiting, t) != 0)
            .count();
        assert_eq!(lit, 1);
    }

    #[test]
    fn test_completed_blinks() {
        assert_ne!(
            pattern_for(NavigationState::TrackCompleted, 0),
            pattern_for(NavigationState::TrackCompleted, 1)
        );
    }
}
