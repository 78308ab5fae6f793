//! Line-oriented command shell

use crate::config::ConfigStore;
use chrono::Utc;
use frame_capture::Frame;
use navigation::{MotorController, NavigationHandle, NavigationState, WallPhase};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Reload,
    Calibrate,
    ExitCalibration,
    Dump,
    ShowConfig,
    Exit,
    /// Maneuver-test shortcut: jump straight to a state
    Force(NavigationState),
}

/// Parse one input line; `None` for unknown tokens
pub fn parse(line: &str) -> Option<Command> {
    match line.trim() {
        "start" => Some(Command::Start),
        "stop" => Some(Command::Stop),
        "reload" => Some(Command::Reload),
        "cal" => Some(Command::Calibrate),
        "nocal" => Some(Command::ExitCalibration),
        "dump" => Some(Command::Dump),
        "show-config" => Some(Command::ShowConfig),
        "exit" => Some(Command::Exit),
        "goto-line" => Some(Command::Force(NavigationState::GotoLine)),
        "follow-line" => Some(Command::Force(NavigationState::FollowLine)),
        "goto-wall" => Some(Command::Force(NavigationState::GotoWall)),
        "from-wall" => Some(Command::Force(NavigationState::FromWallToLine)),
        "follow-after-wall" => Some(Command::Force(NavigationState::FollowLineAfterWall)),
        "speedy" => Some(Command::Force(NavigationState::FollowLineSpeedy)),
        "end-of-line" => Some(Command::Force(NavigationState::EndOfLine)),
        "stick-wall" => Some(Command::Force(NavigationState::StickToWall)),
        "straight-1" => Some(Command::Force(NavigationState::StraightUntilWallGone(
            WallPhase::First,
        ))),
        "straight-2" => Some(Command::Force(NavigationState::StraightUntilWallGone(
            WallPhase::Second,
        ))),
        "wall-1" => Some(Command::Force(NavigationState::FollowWall(WallPhase::First))),
        "wall-2" => Some(Command::Force(NavigationState::FollowWall(
            WallPhase::Second,
        ))),
        "completed" => Some(Command::Force(NavigationState::TrackCompleted)),
        _ => None,
    }
}

/// Everything the shell needs a handle on
pub struct ShellContext<M: MotorController> {
    pub handle: NavigationHandle,
    pub motors: Arc<Mutex<M>>,
    pub frame: Arc<Mutex<Frame>>,
    pub config: Arc<ConfigStore>,
    pub running: Arc<AtomicBool>,
}

/// Apply one command. Returns false when the shell should exit.
pub fn apply<M: MotorController>(ctx: &ShellContext<M>, command: Command) -> bool {
    match command {
        Command::Start => ctx.handle.set_state(NavigationState::Start),
        Command::Stop => {
            if let Err(e) = ctx.handle.stop_with(&ctx.motors) {
                warn!(error = %e, "stop failed");
            }
        }
        Command::Reload => {
            // Failure keeps the previous snapshot; already logged
            let _ = ctx.config.reload();
        }
        Command::Calibrate => ctx.handle.set_state(NavigationState::Calibrate),
        Command::ExitCalibration => ctx.handle.set_state(NavigationState::Waiting),
        Command::Dump => {
            let path = format!("frame-{}.png", Utc::now().format("%Y%m%dT%H%M%S"));
            let frame = match ctx.frame.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match frame.save_png(&path) {
                Ok(()) => info!(path = %path, "frame dumped"),
                Err(e) => warn!(error = %e, "frame dump failed"),
            }
        }
        Command::ShowConfig => match serde_json::to_string_pretty(&ctx.config.current()) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => warn!(error = %e, "config render failed"),
        },
        Command::Exit => {
            if let Err(e) = ctx.handle.stop_with(&ctx.motors) {
                warn!(error = %e, "stop on exit failed");
            }
            ctx.running.store(false, Ordering::SeqCst);
            return false;
        }
        Command::Force(state) => {
            info!(?state, "maneuver test shortcut");
            ctx.handle.set_state(state);
        }
    }
    true
}

/// Blocking shell loop over an input stream (stdin in production)
pub fn run<M: MotorController, R: BufRead>(ctx: &ShellContext<M>, input: R) {
    for line in input.lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse(&line) {
            Some(command) => {
                if !apply(ctx, command) {
                    break;
                }
            }
            None => eprintln!("unknown command: {}", line.trim()),
        }
        if !ctx.running.load(Ordering::SeqCst) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::sim::SimMotors;

    fn context() -> ShellContext<SimMotors> {
        ShellContext {
            handle: NavigationHandle::new(),
            motors: Arc::new(Mutex::new(SimMotors::default())),
            frame: Arc::new(Mutex::new(Frame::new(4, 4))),
            config: Arc::new(ConfigStore::new(AppConfig::default(), None)),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    #[test]
    fn test_parse_core_commands() {
        assert_eq!(parse("start"), Some(Command::Start));
        assert_eq!(parse(" stop "), Some(Command::Stop));
        assert_eq!(
            parse("wall-2"),
            Some(Command::Force(NavigationState::FollowWall(
                WallPhase::Second
            )))
        );
        assert_eq!(parse("flip-table"), None);
    }

    #[test]
    fn test_stop_brakes_and_forces_waiting() {
        let ctx = context();
        ctx.handle.set_state(NavigationState::FollowLineSpeedy);
        assert!(apply(&ctx, Command::Stop));
        assert_eq!(ctx.handle.state(), NavigationState::Waiting);
        assert!(ctx.motors.lock().unwrap().braked);
    }

    #[test]
    fn test_exit_clears_run_flag() {
        let ctx = context();
        assert!(!apply(&ctx, Command::Exit));
        assert!(!ctx.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_unknown_lines_change_nothing() {
        let ctx = context();
        let input = std::io::Cursor::new(b"bogus\nstart\nexit\n".to_vec());
        run(&ctx, input);
        // bogus was ignored, start then exit were applied
        assert_eq!(ctx.handle.state(), NavigationState::Waiting);
        assert!(!ctx.running.load(Ordering::SeqCst));
    }
}
