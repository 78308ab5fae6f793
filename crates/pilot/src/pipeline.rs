//! Per-frame processing pipeline

use crate::config::BandConfig;
use frame_capture::{Frame, FrameSink};
use line_vision::{LineSegmenter, Slice};
use navigation::{
    DistanceSensors, Indicator, MotorController, NavigationHandle, NavigationMachine,
    NavigationState,
};
use std::sync::{Arc, Mutex};
use tracing::{error, warn};
use viewer_broadcast::{FrameBroadcaster, ViewerPacket};

/// Capture-thread pipeline: frame copy, segmentation, navigation update and
/// the every-Nth-frame diagnostic publish.
///
/// The working frame lives behind a mutex shared with the shell's dump
/// command, so a dump never observes a half-thresholded buffer.
pub struct FramePipeline<M, D, I>
where
    M: MotorController,
    D: DistanceSensors,
    I: Indicator,
{
    frame: Arc<Mutex<Frame>>,
    segmenter: LineSegmenter,
    machine: NavigationMachine<M, D, I>,
    handle: NavigationHandle,
    broadcaster: FrameBroadcaster,
    packet: ViewerPacket,
    bands: BandConfig,
    frame_divisor: u32,
    frames_processed: u64,
}

impl<M, D, I> FramePipeline<M, D, I>
where
    M: MotorController,
    D: DistanceSensors,
    I: Indicator,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frame: Arc<Mutex<Frame>>,
        segmenter: LineSegmenter,
        machine: NavigationMachine<M, D, I>,
        handle: NavigationHandle,
        broadcaster: FrameBroadcaster,
        bands: BandConfig,
        frame_divisor: u32,
    ) -> Self {
        let frame_len = {
            let guard = match frame.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.data().len()
        };
        Self {
            frame,
            segmenter,
            machine,
            handle,
            broadcaster,
            packet: ViewerPacket::sized(frame_len),
            bands,
            frame_divisor: frame_divisor.max(1),
            frames_processed: 0,
        }
    }

    /// Shared working-frame handle for the dump command
    pub fn frame_handle(&self) -> Arc<Mutex<Frame>> {
        Arc::clone(&self.frame)
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    fn process(&mut self, raw: &[u8]) {
        // Calibration wants the operator staring at raw camera output;
        // segmentation and control are fully suppressed.
        if self.handle.state() == NavigationState::Calibrate {
            return;
        }

        let (upper, lower): (Slice, Slice) = {
            let mut frame = match self.frame.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(e) = frame.copy_from_packed(raw) {
                warn!(error = %e, "frame rejected");
                return;
            }
            let data = frame.data_mut();
            let upper = self
                .segmenter
                .extract_band(data, self.bands.upper.0..self.bands.upper.1);
            let lower = self
                .segmenter
                .extract_band(data, self.bands.lower.0..self.bands.lower.1);

            if self.frames_processed % self.frame_divisor as u64 == 0 {
                self.packet.l_x = lower.x;
                self.packet.l_y = lower.y;
                self.packet.u_x = upper.x;
                self.packet.u_y = upper.y;
                self.packet.error_lower = lower.error;
                self.packet.error_upper = upper.error;
                self.packet.mass = upper.mass + lower.mass;
                self.packet.frame.clear();
                self.packet.frame.extend_from_slice(frame.data());
            }
            (upper, lower)
        };

        if self.frames_processed % self.frame_divisor as u64 == 0 {
            // Outside the frame lock: a slow dump must not delay the publish
            self.broadcaster.publish(&self.packet);
        }
        self.frames_processed += 1;

        let mass = upper.mass + lower.mass;
        if let Err(e) = self.machine.update(mass, upper, lower) {
            error!(error = %e, "navigation update failed");
        }
    }
}

impl<M, D, I> FrameSink for FramePipeline<M, D, I>
where
    M: MotorController,
    D: DistanceSensors,
    I: Indicator,
{
    fn on_frame(&mut self, raw: &[u8]) {
        self.process(raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::sim::{SimIndicator, SimMotors, SimSensors};
    use frame_capture::CaptureConfig;
    use viewer_broadcast::BroadcastConfig;

    fn test_pipeline() -> (
        FramePipeline<SimMotors, SimSensors, SimIndicator>,
        NavigationHandle,
    ) {
        let config = AppConfig {
            capture: CaptureConfig {
                width: 320,
                height: 240,
                ..CaptureConfig::default()
            },
            broadcast: BroadcastConfig {
                port: 0,
                frame_divisor: 4,
            },
            ..AppConfig::default()
        };
        let handle = NavigationHandle::new();
        let motors = Arc::new(Mutex::new(SimMotors::default()));
        let indicator = Arc::new(Mutex::new(SimIndicator::default()));
        let machine = NavigationMachine::new(
            config.navigation.clone(),
            handle.clone(),
            motors,
            SimSensors::default(),
            indicator,
        );
        let frame = Arc::new(Mutex::new(Frame::new(
            config.capture.width,
            config.capture.height,
        )));
        let broadcaster = FrameBroadcaster::start(&config.broadcast, 320 * 240).unwrap();
        let pipeline = FramePipeline::new(
            frame,
            LineSegmenter::new(&config.segmenter),
            machine,
            handle.clone(),
            broadcaster,
            config.bands.clone(),
            config.broadcast.frame_divisor,
        );
        (pipeline, handle)
    }

    fn packed_frame_with_line(line_x: usize) -> Vec<u8> {
        let mut raw = vec![0u8; 320 * 240 * 2];
        for px in raw.iter_mut().step_by(2) {
            *px = 200;
        }
        for row in 0..240 {
            for col in line_x..line_x + 12 {
                raw[(row * 320 + col) * 2] = 20;
            }
        }
        raw
    }

    #[test]
    fn test_calibrate_suppresses_processing() {
        let (mut pipeline, handle) = test_pipeline();
        handle.set_state(NavigationState::Calibrate);

        pipeline.on_frame(&packed_frame_with_line(100));

        assert_eq!(pipeline.frames_processed(), 0);
        // The working buffer was never touched
        let frame = pipeline.frame_handle();
        let frame = frame.lock().unwrap();
        assert!(frame.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_frame_flows_through_segmentation() {
        let (mut pipeline, handle) = test_pipeline();
        // Waiting: machine no-ops but segmentation still runs
        assert_eq!(handle.state(), NavigationState::Waiting);

        pipeline.on_frame(&packed_frame_with_line(100));

        assert_eq!(pipeline.frames_processed(), 1);
        let frame = pipeline.frame_handle();
        let frame = frame.lock().unwrap();
        // Band rows are thresholded in place; only LINE/FLOOR values remain
        let binarized =
            |rows: std::ops::Range<usize>| {
                frame.data()[rows.start * 320..rows.end * 320]
                    .iter()
                    .all(|&v| v == line_vision::LINE || v == line_vision::FLOOR)
            };
        assert!(binarized(0..80));
        assert!(binarized(160..240));
        // The gap between the bands stays raw grayscale
        assert!(frame.data()[100 * 320..101 * 320].iter().any(|&v| v == 200));
    }

    #[test]
    fn test_short_frame_is_dropped() {
        let (mut pipeline, _handle) = test_pipeline();
        pipeline.on_frame(&[0u8; 100]);
        assert_eq!(pipeline.frames_processed(), 0);
    }
}
