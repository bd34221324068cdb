//! End-to-end: bytes on the simulated UART → router → service → reply lines.

use aquabotica::adapters::serial::UartTransport;
use aquabotica::app::service::AppService;
use aquabotica::fsm::DeviceState;
use aquabotica::serial::{CommandRouter, SerialLink};

use crate::mock_hw::{MockApp, make_app};

struct Rig {
    app: MockApp,
    router: CommandRouter<MockApp>,
    link: SerialLink<UartTransport>,
}

impl Rig {
    fn new() -> Self {
        let mut router = CommandRouter::new();
        assert!(AppService::register_routes(&mut router));
        Self {
            app: make_app(),
            router,
            link: SerialLink::new(UartTransport::new()),
        }
    }

    /// Inject `bytes`, run one poll, return the reply lines.
    fn exchange(&mut self, bytes: &[u8]) -> Vec<String> {
        self.link.transport_mut().inject(bytes);
        self.router.handle_incoming(&mut self.link, &mut self.app);
        self.link.transport_mut().take_lines()
    }
}

#[test]
fn every_command_has_a_route() {
    let rig = Rig::new();
    let names: Vec<&str> = rig.router.routes().map(|r| r.name()).collect();
    assert_eq!(names, vec!["HELLO", "INIT", "READY", "STATUS", "CAPTURE"]);
}

#[test]
fn full_session_over_the_wire() {
    let mut rig = Rig::new();

    assert_eq!(rig.exchange(b"HELLO\n"), vec!["READY"]);
    assert_eq!(rig.exchange(b"INIT\n"), vec!["INIT_SUCCESS"]);
    assert_eq!(rig.exchange(b"STATUS\n"), vec!["STATUS 3"]);

    rig.app
        .peripherals_mut()
        .classifier
        .push(Ok(vec![("clownfish", 0.88)]));
    rig.app.peripherals_mut().network.lookup_script.push_back(Ok(0.42));
    assert_eq!(rig.exchange(b"CAPTURE\n"), vec!["FISH_INFO clownfish 0.42"]);

    assert_eq!(rig.router.stats().dispatched, 4);
}

#[test]
fn commands_are_case_and_whitespace_insensitive() {
    let mut rig = Rig::new();
    assert_eq!(rig.exchange(b"  hello  \r\n"), vec!["READY"]);
    assert_eq!(rig.exchange(b"Status\n"), vec!["STATUS 1"]);
}

#[test]
fn arguments_reach_the_handler_without_changing_the_outcome() {
    let mut rig = Rig::new();
    assert_eq!(rig.exchange(b"HELLO from host\n"), vec!["READY"]);
    assert_eq!(rig.app.state(), DeviceState::Synced);
}

#[test]
fn line_noise_in_arguments_does_not_lose_the_command() {
    let mut rig = Rig::new();
    assert_eq!(rig.exchange(b"STATUS \xff\n"), vec!["STATUS 0"]);
    assert_eq!(rig.exchange(b"status abc\n"), vec!["STATUS 0"]);

    let stats = rig.router.stats();
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.skipped, 0);
}

#[test]
fn several_lines_in_one_read() {
    let mut rig = Rig::new();
    let lines = rig.exchange(b"HELLO\nINIT\nSTATUS\n");
    assert_eq!(lines, vec!["READY", "INIT_SUCCESS", "STATUS 3"]);
}

#[test]
fn split_line_dispatches_on_newline() {
    let mut rig = Rig::new();
    assert!(rig.exchange(b"HEL").is_empty());
    assert_eq!(rig.router.pending(), 3);
    assert!(rig.exchange(b"LO").is_empty());
    assert_eq!(rig.exchange(b"\n"), vec!["READY"]);
    assert_eq!(rig.router.pending(), 0);
}

#[test]
fn unknown_and_blank_lines_are_ignored() {
    let mut rig = Rig::new();
    assert!(rig.exchange(b"FEED THE FISH\n\n   \n").is_empty());

    let stats = rig.router.stats();
    assert_eq!(stats.unmatched, 1);
    assert_eq!(stats.skipped, 2);
    assert_eq!(rig.app.state(), DeviceState::Boot);
}

#[test]
fn overlong_garbage_does_not_wedge_the_link() {
    let mut rig = Rig::new();
    let mut noise = vec![b'x'; 200];
    noise.push(b'\n');
    assert!(rig.exchange(&noise).is_empty());
    assert!(rig.router.stats().overflows > 0);

    assert_eq!(rig.exchange(b"HELLO\n"), vec!["READY"]);
}

#[test]
fn closed_link_counts_write_errors() {
    let mut rig = Rig::new();
    rig.link.transport_mut().close();
    assert!(rig.exchange(b"STATUS\n").is_empty());
    assert_eq!(rig.link.write_errors(), 1);
    assert_eq!(rig.router.stats().dispatched, 1);
}
