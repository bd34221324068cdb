//! Uptime clock backing the HELLO broadcast timer.
//!
//! On device this reads the ESP-IDF high-resolution timer; on the host it
//! measures from construction with `std::time::Instant`.

use crate::app::ports::Clock;

#[derive(Debug, Clone, Copy)]
pub struct UptimeClock {
    #[cfg(not(target_os = "espidf"))]
    origin: std::time::Instant,
}

impl Default for UptimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl UptimeClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            origin: std::time::Instant::now(),
        }
    }

    #[cfg(target_os = "espidf")]
    fn micros(&self) -> u64 {
        // Never negative after boot.
        let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        u64::try_from(us).unwrap_or(0)
    }

    #[cfg(not(target_os = "espidf"))]
    fn micros(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

impl Clock for UptimeClock {
    fn uptime_ms(&self) -> u64 {
        self.micros() / 1_000
    }
}
