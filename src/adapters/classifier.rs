//! Edge Impulse object-detection model.
//!
//! Implements [`Classifier`].  The exported C++ library is wrapped by the
//! small C shim in `components/ei_classifier`; this adapter packs frames
//! into the model's feature format and copies the bounding boxes back out.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: FFI into the shim.
//! - **all other targets**: scripted detection passes for host-side tests.

use log::debug;

use crate::app::ports::{Classifier, Detection, Detections, FrameBuffer, FrameSize, Label};
use crate::error::ClassifierError;

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

/// Pack an RGB888 frame into one `f32` feature per pixel.
///
/// The camera decoder emits pixels as B, G, R; each feature is
/// `R << 16 | G << 8 | B`.
pub fn pack_features(frame: &FrameBuffer) -> Vec<f32> {
    frame
        .pixels()
        .chunks_exact(3)
        .map(|p| ((u32::from(p[2]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[0])) as f32)
        .collect()
}

/// Build a label from a NUL-terminated byte string, truncating to capacity.
pub fn label_from_bytes(raw: &[u8]) -> Label {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let mut label = Label::new();
    for c in String::from_utf8_lossy(&raw[..end]).chars() {
        if label.push(c).is_err() {
            break;
        }
    }
    label
}

// ───────────────────────────────────────────────────────────────
// FFI
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod ffi {
    use core::ffi::c_char;

    pub const MAX_BOXES: usize = crate::app::ports::MAX_DETECTIONS;

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct AqDetection {
        pub label: [c_char; 32],
        pub value: f32,
    }

    unsafe extern "C" {
        pub fn aq_ei_input_width() -> u32;
        pub fn aq_ei_input_height() -> u32;
        /// Returns `EI_IMPULSE_OK` (0) on success.
        pub fn aq_ei_classify(
            features: *const f32,
            len: usize,
            out: *mut AqDetection,
            max: usize,
            count: *mut usize,
        ) -> i32;
    }
}

// ───────────────────────────────────────────────────────────────
// Classifier adapter
// ───────────────────────────────────────────────────────────────

pub struct EdgeImpulseClassifier {
    input: FrameSize,
    #[cfg(not(target_os = "espidf"))]
    script: VecDeque<Result<Vec<(String, f32)>, ClassifierError>>,
    #[cfg(not(target_os = "espidf"))]
    calls: u32,
}

#[cfg(target_os = "espidf")]
impl Default for EdgeImpulseClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl EdgeImpulseClassifier {
    pub fn new() -> Self {
        // SAFETY: pure getters over compile-time model constants.
        let (w, h) = unsafe { (ffi::aq_ei_input_width(), ffi::aq_ei_input_height()) };
        log::info!("Classifier: model input {w}x{h}");
        Self {
            input: FrameSize::new(w as u16, h as u16),
        }
    }

    fn platform_classify(&mut self, features: &[f32]) -> Result<Detections, ClassifierError> {
        let mut boxes = [ffi::AqDetection {
            label: [0; 32],
            value: 0.0,
        }; ffi::MAX_BOXES];
        let mut count = 0usize;

        // SAFETY: every pointer is valid for the stated length for the
        // duration of the call; the shim writes at most `MAX_BOXES` entries.
        let rc = unsafe {
            ffi::aq_ei_classify(
                features.as_ptr(),
                features.len(),
                boxes.as_mut_ptr(),
                ffi::MAX_BOXES,
                &mut count,
            )
        };
        if rc != 0 {
            return Err(ClassifierError::Inference(rc));
        }

        let mut out = Detections::new();
        for b in boxes.iter().take(count.min(ffi::MAX_BOXES)) {
            let raw = b.label.map(|c| c as u8);
            let _ = out.push(Detection {
                label: label_from_bytes(&raw),
                value: b.value,
            });
        }
        Ok(out)
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for EdgeImpulseClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl EdgeImpulseClassifier {
    /// Simulated model input.
    pub const SIM_INPUT: FrameSize = FrameSize::new(96, 96);

    pub fn new() -> Self {
        Self::with_input(Self::SIM_INPUT)
    }

    pub fn with_input(input: FrameSize) -> Self {
        Self {
            input,
            script: VecDeque::new(),
            calls: 0,
        }
    }

    /// Queue the result of the next classification pass.
    pub fn sim_push_pass(&mut self, detections: &[(&str, f32)]) {
        self.script.push_back(Ok(detections
            .iter()
            .map(|(l, v)| ((*l).to_owned(), *v))
            .collect()));
    }

    /// Queue a failing pass.
    pub fn sim_push_error(&mut self, err: ClassifierError) {
        self.script.push_back(Err(err));
    }

    pub fn sim_calls(&self) -> u32 {
        self.calls
    }

    fn platform_classify(&mut self, features: &[f32]) -> Result<Detections, ClassifierError> {
        self.calls += 1;
        debug!("Classifier(sim): {} features", features.len());
        let pass = self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))?;
        let mut out = Detections::new();
        for (label, value) in pass {
            let _ = out.push(Detection {
                label: label_from_bytes(label.as_bytes()),
                value,
            });
        }
        Ok(out)
    }
}

impl Classifier for EdgeImpulseClassifier {
    fn input_size(&self) -> FrameSize {
        self.input
    }

    fn classify(&mut self, frame: &FrameBuffer) -> Result<Detections, ClassifierError> {
        if frame.size() != self.input {
            return Err(ClassifierError::InputMismatch);
        }
        let features = pack_features(frame);
        let detections = self.platform_classify(&features)?;
        debug!("Classifier: {} detection(s)", detections.len());
        Ok(detections)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
