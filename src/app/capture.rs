//! Capture → classify → enrich, with a bounded retry budget.
//!
//! The budget covers the perception pipeline only.  Once a label has been
//! identified the enrichment lookup is made exactly once, whatever its
//! outcome.

use log::{info, warn};

use super::ports::{CaptureSource, Classifier, FrameAllocator, FrameBuffer, Label, NetworkClient, ReplySink};
use super::replies::DeviceReply;

/// Attempts per `CAPTURE` command.
pub const MAX_CAPTURE_ATTEMPTS: u8 = 5;

/// How a capture run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// A label was detected and enriched.
    Identified { label: Label, value: f32 },
    /// A label was detected but the lookup failed.
    EnrichmentFailed { label: Label },
    /// The budget ran out without a detection.
    NotRecognised,
    /// No frame memory; the run was abandoned.
    OutOfMemory,
}

impl CaptureOutcome {
    /// Whether a label was detected.
    pub fn detected(&self) -> bool {
        matches!(self, Self::Identified { .. } | Self::EnrichmentFailed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReport {
    pub outcome: CaptureOutcome,
    /// Attempts started, including the one that ended the run.
    pub attempts: u8,
}

/// Result of one attempt.
enum Attempt {
    Done(CaptureOutcome),
    Retry,
}

/// Run the loop, reporting every step through `out`.
pub fn run_capture<K, C, N, M>(
    camera: &mut K,
    classifier: &mut C,
    network: &mut N,
    frames: &mut M,
    out: &mut dyn ReplySink,
) -> CaptureReport
where
    K: CaptureSource,
    C: Classifier,
    N: NetworkClient,
    M: FrameAllocator,
{
    let size = classifier.input_size();

    for attempt in 1..=MAX_CAPTURE_ATTEMPTS {
        let Some(mut frame) = frames.allocate(size) else {
            warn!("capture: no memory for {}x{} frame", size.width, size.height);
            out.send(&DeviceReply::CaptureFail);
            return CaptureReport {
                outcome: CaptureOutcome::OutOfMemory,
                attempts: attempt,
            };
        };

        let result = attempt_once(attempt, &mut frame, camera, classifier, network, out);
        frames.release(frame);

        if let Attempt::Done(outcome) = result {
            return CaptureReport {
                outcome,
                attempts: attempt,
            };
        }
    }

    info!("capture: nothing recognised after {MAX_CAPTURE_ATTEMPTS} attempts");
    out.send(&DeviceReply::FishNotRecognised);
    CaptureReport {
        outcome: CaptureOutcome::NotRecognised,
        attempts: MAX_CAPTURE_ATTEMPTS,
    }
}

fn attempt_once<K, C, N>(
    attempt: u8,
    frame: &mut FrameBuffer,
    camera: &mut K,
    classifier: &mut C,
    network: &mut N,
    out: &mut dyn ReplySink,
) -> Attempt
where
    K: CaptureSource,
    C: Classifier,
    N: NetworkClient,
{
    if let Err(e) = camera.capture_into(frame) {
        warn!("capture: attempt {attempt}: {e}");
        out.send(&DeviceReply::CaptureFail);
        return Attempt::Retry;
    }

    let detections = match classifier.classify(frame) {
        Ok(d) => d,
        Err(e) => {
            warn!("capture: attempt {attempt}: {e}");
            out.send(&DeviceReply::AiFail);
            return Attempt::Retry;
        }
    };

    let Some(hit) = detections.into_iter().find(|d| d.is_actionable()) else {
        info!("capture: attempt {attempt}: no detection");
        return Attempt::Retry;
    };

    info!("capture: attempt {attempt}: detected '{}' ({})", hit.label, hit.value);
    match network.lookup(&hit.label) {
        Ok(value) => {
            out.send(&DeviceReply::FishInfo {
                label: hit.label.clone(),
                value,
            });
            Attempt::Done(CaptureOutcome::Identified {
                label: hit.label,
                value,
            })
        }
        Err(e) => {
            warn!("capture: lookup for '{}' failed: {e}", hit.label);
            out.send(&DeviceReply::CaptureFail);
            Attempt::Done(CaptureOutcome::EnrichmentFailed { label: hit.label })
        }
    }
}
