//! Line framing for the host protocol.
//!
//! Commands arrive as `NAME[ ARGS]\n`.  Bytes accumulate in a
//! [`LineBuffer`] until a newline; the completed line is split by
//! [`parse_line`] into an upper-cased command name and its raw arguments.

use core::str;

/// Capacity of the accumulation buffer, including the slot reserved for
/// the terminator.  At most `COMMAND_BUFFER_SIZE - 1` bytes are stored.
pub const COMMAND_BUFFER_SIZE: usize = 64;

/// Command names are never longer than a full line.
pub type CommandName = heapless::String<COMMAND_BUFFER_SIZE>;

/// Result of pushing one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    Stored,
    /// The buffer was full: contents were cleared and the byte dropped.
    Overflow,
}

/// Fixed-capacity byte accumulator.
pub struct LineBuffer<const N: usize> {
    data: [u8; N],
    cursor: usize,
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        const { assert!(N > 1, "line buffer needs room for at least one byte") };
        Self {
            data: [0; N],
            cursor: 0,
        }
    }

    /// Usable capacity in bytes.
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.cursor]
    }

    pub fn push(&mut self, byte: u8) -> Push {
        if self.cursor < N - 1 {
            self.data[self.cursor] = byte;
            self.cursor += 1;
            Push::Stored
        } else {
            self.clear();
            Push::Overflow
        }
    }

    /// Zero the contents and reset the cursor.
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.cursor = 0;
    }
}

/// Split a completed line into `(COMMAND, ARGS)`.
///
/// Works on raw bytes: the line is trimmed of ASCII whitespace, split at the
/// first space and ASCII upper-cased as a whole.  The arguments are decoded
/// lossily, so noise after a valid command never hides the command.
/// Returns `None` for blank lines and when the command itself is not UTF-8.
pub fn parse_line(line: &[u8]) -> Option<(CommandName, String)> {
    let text = line.trim_ascii();
    if text.is_empty() {
        return None;
    }

    let (name, args) = match text.iter().position(|&b| b == b' ') {
        Some(at) => (&text[..at], &text[at + 1..]),
        None => (text, &[][..]),
    };

    let mut cmd = CommandName::new();
    cmd.push_str(str::from_utf8(name).ok()?).ok()?;
    cmd.make_ascii_uppercase();

    let mut args = String::from_utf8_lossy(args).into_owned();
    args.make_ascii_uppercase();
    Some((cmd, args))
}
