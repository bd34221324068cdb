//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements      | Connects to                   |
//! |--------------|-----------------|-------------------------------|
//! | `camera`     | CaptureSource   | OV2640 via esp32-camera       |
//! | `classifier` | Classifier      | Edge Impulse model (C shim)   |
//! | `frame_pool` | FrameAllocator  | Heap / PSRAM                  |
//! | `sd_card`    | ConfigStore     | FAT on SD card (VFS)          |
//! | `serial`     | Transport       | UART0 host link               |
//! | `time`       | Clock           | ESP-IDF high-res timer        |
//! | `wifi`       | NetworkClient   | ESP-IDF WiFi STA + HTTP       |

pub mod camera;
pub mod classifier;
pub mod frame_pool;
pub mod sd_card;
pub mod serial;
pub mod time;
pub mod wifi;
