//! Command router: turns the incoming byte stream into handler calls.
//!
//! **Context-generic**: the router does not know what its handlers act on.
//! Callers pass the context `C` (normally the
//! [`AppService`](crate::app::service::AppService)) into [`feed`] or
//! [`handle_incoming`], and each handler receives it mutably together with
//! the command arguments and a reply sink.
//!
//! [`feed`]: CommandRouter::feed
//! [`handle_incoming`]: CommandRouter::handle_incoming

use log::{debug, warn};

use crate::app::ports::ReplySink;

use super::codec::{COMMAND_BUFFER_SIZE, CommandName, LineBuffer, Push, parse_line};
use super::transport::{SerialLink, Transport};

/// Maximum number of registered routes.
pub const MAX_ROUTES: usize = 20;

/// Bytes pulled from the transport per read.
const READ_CHUNK: usize = 32;

/// Handler signature: `(context, args, replies)`.
pub type RouteHandler<C> = Box<dyn FnMut(&mut C, &str, &mut dyn ReplySink)>;

/// One command name bound to its handler.
pub struct CommandRoute<C> {
    /// Normalised (trimmed, upper-cased) command name.
    name: CommandName,
    handler: RouteHandler<C>,
}

impl<C> CommandRoute<C> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Lines that reached a handler.
    pub dispatched: u32,
    /// Lines whose command matched no route.
    pub unmatched: u32,
    /// Buffer overflows (line discarded and resynchronised).
    pub overflows: u32,
    /// Lines skipped because they were blank or their command was not UTF-8.
    pub skipped: u32,
}

pub struct CommandRouter<C> {
    routes: heapless::Vec<CommandRoute<C>, MAX_ROUTES>,
    buffer: LineBuffer<COMMAND_BUFFER_SIZE>,
    stats: RouterStats,
}

impl<C> Default for CommandRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CommandRouter<C> {
    pub fn new() -> Self {
        Self {
            routes: heapless::Vec::new(),
            buffer: LineBuffer::new(),
            stats: RouterStats::default(),
        }
    }

    /// Bind `name` to `handler`.
    ///
    /// Returns `false` (and registers nothing) when the table is full or
    /// the name is blank.  Duplicate names are accepted; the route
    /// registered first wins.
    pub fn register_route<F>(&mut self, name: &str, handler: F) -> bool
    where
        F: FnMut(&mut C, &str, &mut dyn ReplySink) + 'static,
    {
        let trimmed = name.trim();
        let mut key = CommandName::new();
        if trimmed.is_empty() || key.push_str(trimmed).is_err() {
            warn!("router: rejected route name '{name}'");
            return false;
        }
        key.make_ascii_uppercase();

        let route = CommandRoute {
            name: key,
            handler: Box::new(handler),
        };
        if self.routes.push(route).is_err() {
            warn!("router: route table full, '{trimmed}' not registered");
            return false;
        }
        true
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn routes(&self) -> impl Iterator<Item = &CommandRoute<C>> {
        self.routes.iter()
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Bytes received since the last completed line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Process a chunk of the incoming byte stream.
    ///
    /// Every `\n` completes a line and dispatches it; other bytes are
    /// buffered.  Chunk boundaries are irrelevant: the outcome depends only
    /// on the concatenated byte sequence.
    pub fn feed(&mut self, bytes: &[u8], ctx: &mut C, out: &mut dyn ReplySink) {
        for &byte in bytes {
            if byte == b'\n' {
                self.dispatch_line(ctx, out);
                continue;
            }
            if self.buffer.push(byte) == Push::Overflow {
                self.stats.overflows = self.stats.overflows.wrapping_add(1);
                warn!("router: line exceeds {COMMAND_BUFFER_SIZE} bytes, buffer reset");
            }
        }
    }

    /// Drain every byte the transport currently has and dispatch complete
    /// lines.  Never blocks; replies go out over the same link.
    pub fn handle_incoming<T: Transport>(&mut self, link: &mut SerialLink<T>, ctx: &mut C) {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = link.read_available(&mut chunk);
            if n == 0 {
                break;
            }
            self.feed(&chunk[..n], ctx, link);
        }
    }

    fn dispatch_line(&mut self, ctx: &mut C, out: &mut dyn ReplySink) {
        match parse_line(self.buffer.as_bytes()) {
            Some((cmd, args)) => {
                match self.routes.iter_mut().find(|r| r.name == cmd) {
                    Some(route) => {
                        debug!("router: dispatch {cmd} '{args}'");
                        self.stats.dispatched = self.stats.dispatched.wrapping_add(1);
                        (route.handler)(ctx, &args, out);
                    }
                    None => {
                        self.stats.unmatched = self.stats.unmatched.wrapping_add(1);
                        warn!("router: unknown command '{cmd}'");
                    }
                }
            }
            None => {
                self.stats.skipped = self.stats.skipped.wrapping_add(1);
            }
        }
        self.buffer.clear();
    }
}
