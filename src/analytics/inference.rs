use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::decision::{decide, Command};
use super::detector::Detector;
use super::geometry::describe_regions;
use crate::api::ResultDispatcher;
use crate::buffer::FrameSlot;
use crate::stats::PipelineStats;

/// Outcome of a single pass over the frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Idle,
    Dispatched(Command),
    Abandoned,
}

pub struct InferenceLoop<D> {
    slot: Arc<FrameSlot>,
    detector: D,
    dispatcher: ResultDispatcher,
    stats: Arc<PipelineStats>,
    idle_interval: Duration,
}

impl<D: Detector> InferenceLoop<D> {
    pub fn new(
        slot: Arc<FrameSlot>,
        detector: D,
        dispatcher: ResultDispatcher,
        stats: Arc<PipelineStats>,
        idle_interval: Duration,
    ) -> Self {
        Self {
            slot,
            detector,
            dispatcher,
            stats,
            idle_interval,
        }
    }

    /// Takes the latest frame, if any, and runs it through detection,
    /// decision and dispatch. Detector failures only abandon this frame.
    pub fn step(&mut self) -> Cycle {
        let Some(frame) = self.slot.take_latest() else {
            return Cycle::Idle;
        };

        let detection = match self.detector.detect(frame) {
            Ok(d) => d,
            Err(e) => {
                self.stats.record_failed();
                tracing::warn!(error = %e, "detection failed, frame abandoned");
                return Cycle::Abandoned;
            }
        };

        let dims = detection.annotated.dimensions();
        let descriptors = describe_regions(detection.regions(), dims);
        let command = decide(&descriptors, dims);

        let clients = self.dispatcher.dispatch(&detection.annotated, command);
        self.stats.record_processed();

        tracing::debug!(
            regions = descriptors.len(),
            command = %command,
            clients,
            "frame processed"
        );

        Cycle::Dispatched(command)
    }

    pub fn run(mut self, shutdown: Arc<AtomicBool>) {
        tracing::info!("inference loop started");

        while !shutdown.load(Ordering::Relaxed) {
            if self.step() == Cycle::Idle {
                thread::sleep(self.idle_interval);
            }
        }

        tracing::info!("inference loop stopped");
    }
}

/// Runs the inference loop on the blocking pool. The detector is built on the
/// worker thread, so detectors that own blocking clients are safe to use.
pub fn spawn_inference<D, F>(
    make_detector: F,
    slot: Arc<FrameSlot>,
    dispatcher: ResultDispatcher,
    stats: Arc<PipelineStats>,
    idle_interval: Duration,
    shutdown: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()>
where
    D: Detector + 'static,
    F: FnOnce() -> Result<D, Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
{
    tokio::task::spawn_blocking(move || match make_detector() {
        Ok(detector) => {
            InferenceLoop::new(slot, detector, dispatcher, stats, idle_interval).run(shutdown)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to create detector");
        }
    })
}
