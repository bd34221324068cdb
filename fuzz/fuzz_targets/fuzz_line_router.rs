//! Fuzz target: `CommandRouter::feed`
//!
//! Drives arbitrary byte streams through a router bound to the real
//! `AppService` routes (over inert collaborators) and asserts that the
//! buffer never exceeds its capacity and every line is accounted for.
//!
//! cargo fuzz run fuzz_line_router

#![no_main]

use aquabotica::app::ports::{
    CaptureSource, Classifier, ConfigStore, Detections, FrameAllocator, FrameBuffer, FrameSize,
    NetworkClient, ReplySink,
};
use aquabotica::app::replies::DeviceReply;
use aquabotica::app::service::{AppService, Peripherals};
use aquabotica::config::{NetworkConfig, SystemConfig};
use aquabotica::error::{CaptureError, ClassifierError, ConfigError, NetworkError, StorageError};
use aquabotica::serial::{COMMAND_BUFFER_SIZE, CommandRouter};
use libfuzzer_sys::fuzz_target;

struct Inert;

impl ConfigStore for Inert {
    fn initialize(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
    fn read_network_config(&mut self) -> Result<NetworkConfig, ConfigError> {
        NetworkConfig::parse("SSID=a\nPassword=b\n")
    }
}

impl NetworkClient for Inert {
    fn connect(&mut self, _config: &NetworkConfig) -> Result<(), NetworkError> {
        Ok(())
    }
    fn lookup(&mut self, _label: &str) -> Result<f32, NetworkError> {
        Ok(1.0)
    }
    fn ping(&mut self) -> Result<(), NetworkError> {
        Ok(())
    }
}

impl CaptureSource for Inert {
    fn initialize(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }
    fn deinitialize(&mut self) {}
    fn capture_into(&mut self, _frame: &mut FrameBuffer) -> Result<(), CaptureError> {
        Ok(())
    }
}

impl Classifier for Inert {
    fn input_size(&self) -> FrameSize {
        FrameSize::new(4, 4)
    }
    fn classify(&mut self, _frame: &FrameBuffer) -> Result<Detections, ClassifierError> {
        Ok(Detections::new())
    }
}

impl FrameAllocator for Inert {
    fn allocate(&mut self, size: FrameSize) -> Option<FrameBuffer> {
        FrameBuffer::from_pixels(size, vec![0; size.byte_len()])
    }
    fn release(&mut self, _frame: FrameBuffer) {}
}

struct Count(usize);

impl ReplySink for Count {
    fn send(&mut self, _reply: &DeviceReply) {
        self.0 += 1;
    }
}

type App = AppService<Inert, Inert, Inert, Inert, Inert>;

fuzz_target!(|data: &[u8]| {
    let hw = Peripherals {
        store: Inert,
        network: Inert,
        camera: Inert,
        classifier: Inert,
        frames: Inert,
    };
    let mut app: App = AppService::new(SystemConfig::default(), hw);
    let mut router = CommandRouter::<App>::new();
    assert!(App::register_routes(&mut router));

    let mut out = Count(0);
    router.feed(data, &mut app, &mut out);

    assert!(router.pending() < COMMAND_BUFFER_SIZE);
    let stats = router.stats();
    let lines = data.iter().filter(|&&b| b == b'\n').count();
    assert_eq!(
        (stats.dispatched + stats.unmatched + stats.skipped) as usize,
        lines
    );
});
