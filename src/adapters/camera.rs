//! OV2640 camera adapter (ESP-WROVER-KIT wiring).
//!
//! Implements [`CaptureSource`].  The sensor produces QVGA JPEG frames; each
//! capture is decoded to RGB888 into a scratch buffer and then centre-cropped
//! and scaled into the caller's frame.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp32-camera` component through the
//!   `esp_idf_svc::sys::camera` bindings.
//! - **all other targets**: a deterministic gradient with scriptable
//!   failures for host-side tests.

use log::{info, warn};

use crate::app::ports::{CaptureSource, FrameBuffer, FrameSize};
use crate::error::CaptureError;

/// Size of the decoded sensor frame.
pub const RAW_FRAME: FrameSize = FrameSize::new(320, 240);

#[cfg(target_os = "espidf")]
mod pins {
    pub const PWDN: i32 = -1;
    pub const RESET: i32 = -1;
    pub const XCLK: i32 = 21;
    pub const SIOD: i32 = 26;
    pub const SIOC: i32 = 27;
    pub const Y9: i32 = 35;
    pub const Y8: i32 = 34;
    pub const Y7: i32 = 39;
    pub const Y6: i32 = 36;
    pub const Y5: i32 = 19;
    pub const Y4: i32 = 18;
    pub const Y3: i32 = 5;
    pub const Y2: i32 = 4;
    pub const VSYNC: i32 = 25;
    pub const HREF: i32 = 23;
    pub const PCLK: i32 = 22;
}

/// Centre-crop `src` to the aspect ratio of `dst`, then nearest-neighbour
/// scale into `dst`.  Both buffers are RGB888.
pub fn crop_and_scale_rgb888(
    src: &[u8],
    src_size: FrameSize,
    dst: &mut [u8],
    dst_size: FrameSize,
) -> Result<(), CaptureError> {
    let (sw, sh) = (src_size.width as usize, src_size.height as usize);
    let (dw, dh) = (dst_size.width as usize, dst_size.height as usize);
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return Err(CaptureError::ConversionFailed);
    }
    if src.len() != src_size.byte_len() || dst.len() != dst_size.byte_len() {
        return Err(CaptureError::ConversionFailed);
    }

    let (cw, ch) = if sw * dh > sh * dw {
        (sh * dw / dh, sh)
    } else {
        (sw, sw * dh / dw)
    };
    let (cw, ch) = (cw.max(1), ch.max(1));
    let (x0, y0) = ((sw - cw) / 2, (sh - ch) / 2);

    for y in 0..dh {
        let sy = y0 + (2 * y + 1) * ch / (2 * dh);
        for x in 0..dw {
            let sx = x0 + (2 * x + 1) * cw / (2 * dw);
            let s = (sy * sw + sx) * 3;
            let d = (y * dw + x) * 3;
            dst[d..d + 3].copy_from_slice(&src[s..s + 3]);
        }
    }
    Ok(())
}

fn alloc_scratch() -> Result<Vec<u8>, CaptureError> {
    let mut raw = Vec::new();
    raw.try_reserve_exact(RAW_FRAME.byte_len())
        .map_err(|_| CaptureError::InitFailed(0))?;
    raw.resize(RAW_FRAME.byte_len(), 0);
    Ok(raw)
}

// ───────────────────────────────────────────────────────────────
// Camera adapter
// ───────────────────────────────────────────────────────────────

pub struct CameraAdapter {
    initialised: bool,
    /// Decoded sensor frame, allocated while initialised.
    raw: Vec<u8>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimCamera,
}

impl Default for CameraAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraAdapter {
    pub fn new() -> Self {
        Self {
            initialised: false,
            raw: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim: SimCamera::default(),
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_init(&mut self) -> Result<(), CaptureError> {
        use esp_idf_svc::sys::camera;

        let config = camera::camera_config_t {
            pin_pwdn: pins::PWDN,
            pin_reset: pins::RESET,
            pin_xclk: pins::XCLK,
            __bindgen_anon_1: camera::camera_config_t__bindgen_ty_1 {
                pin_sccb_sda: pins::SIOD,
            },
            __bindgen_anon_2: camera::camera_config_t__bindgen_ty_2 {
                pin_sccb_scl: pins::SIOC,
            },
            pin_d7: pins::Y9,
            pin_d6: pins::Y8,
            pin_d5: pins::Y7,
            pin_d4: pins::Y6,
            pin_d3: pins::Y5,
            pin_d2: pins::Y4,
            pin_d1: pins::Y3,
            pin_d0: pins::Y2,
            pin_vsync: pins::VSYNC,
            pin_href: pins::HREF,
            pin_pclk: pins::PCLK,
            xclk_freq_hz: 20_000_000,
            ledc_timer: camera::ledc_timer_t_LEDC_TIMER_0,
            ledc_channel: camera::ledc_channel_t_LEDC_CHANNEL_0,
            pixel_format: camera::pixformat_t_PIXFORMAT_JPEG,
            frame_size: camera::framesize_t_FRAMESIZE_QVGA,
            jpeg_quality: 12,
            fb_count: 1,
            fb_location: camera::camera_fb_location_t_CAMERA_FB_IN_PSRAM,
            grab_mode: camera::camera_grab_mode_t_CAMERA_GRAB_WHEN_EMPTY,
            ..Default::default()
        };

        // SAFETY: called from the main task only; the driver copies `config`.
        let err = unsafe { camera::esp_camera_init(&config) };
        if err != esp_idf_svc::sys::ESP_OK {
            return Err(CaptureError::InitFailed(err));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_init(&mut self) -> Result<(), CaptureError> {
        if self.sim.fail_init {
            return Err(CaptureError::InitFailed(-1));
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_deinit(&mut self) {
        use esp_idf_svc::sys::camera;
        // SAFETY: main task only; no frame buffer is held across this call.
        let err = unsafe { camera::esp_camera_deinit() };
        if err != esp_idf_svc::sys::ESP_OK {
            warn!("Camera: deinit returned 0x{err:x}");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_deinit(&mut self) {}

    /// Grab one frame and decode it into `self.raw`.
    #[cfg(target_os = "espidf")]
    fn platform_grab(&mut self) -> Result<(), CaptureError> {
        use esp_idf_svc::sys::camera;

        // SAFETY: the driver is initialised; the frame is returned below
        // before any other driver call.
        let fb = unsafe { camera::esp_camera_fb_get() };
        if fb.is_null() {
            return Err(CaptureError::FrameUnavailable);
        }
        let converted = unsafe {
            camera::fmt2rgb888(
                (*fb).buf,
                (*fb).len,
                camera::pixformat_t_PIXFORMAT_JPEG,
                self.raw.as_mut_ptr(),
            )
        };
        unsafe { camera::esp_camera_fb_return(fb) };

        if converted {
            Ok(())
        } else {
            Err(CaptureError::ConversionFailed)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_grab(&mut self) -> Result<(), CaptureError> {
        self.sim.grabs += 1;
        if self.sim.failing_grabs > 0 {
            self.sim.failing_grabs -= 1;
            return Err(CaptureError::FrameUnavailable);
        }
        let width = RAW_FRAME.width as usize;
        for (i, px) in self.raw.chunks_exact_mut(3).enumerate() {
            let (x, y) = (i % width, i / width);
            px.copy_from_slice(&[x as u8, y as u8, (x + y) as u8]);
        }
        Ok(())
    }
}

impl CaptureSource for CameraAdapter {
    fn initialize(&mut self) -> Result<(), CaptureError> {
        if self.initialised {
            return Ok(());
        }
        self.raw = alloc_scratch()?;
        if let Err(e) = self.platform_init() {
            warn!("Camera: {e}");
            self.raw = Vec::new();
            return Err(e);
        }
        self.initialised = true;
        info!("Camera: initialised ({}x{} RGB888 scratch)", RAW_FRAME.width, RAW_FRAME.height);
        Ok(())
    }

    fn deinitialize(&mut self) {
        self.platform_deinit();
        self.initialised = false;
        self.raw = Vec::new();
        info!("Camera: released");
    }

    fn capture_into(&mut self, frame: &mut FrameBuffer) -> Result<(), CaptureError> {
        if !self.initialised {
            return Err(CaptureError::NotInitialised);
        }
        self.platform_grab()?;
        let size = frame.size();
        crop_and_scale_rgb888(&self.raw, RAW_FRAME, frame.pixels_mut(), size)
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct SimCamera {
    fail_init: bool,
    failing_grabs: u32,
    grabs: u32,
}

#[cfg(not(target_os = "espidf"))]
impl CameraAdapter {
    pub fn sim_fail_init(&mut self, fail: bool) {
        self.sim.fail_init = fail;
    }

    /// The next `n` grabs return no frame.
    pub fn sim_fail_next_grabs(&mut self, n: u32) {
        self.sim.failing_grabs = n;
    }

    pub fn sim_grabs(&self) -> u32 {
        self.sim.grabs
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
