//! Frame reassembly for the sensor node's line-oriented JSON output
//!
//! The node prints one JSON document spread over several lines, preceded by
//! whatever boot chatter the firmware emits:
//!
//! ```text
//! Initializing sensors...
//! {
//! 'nh3': [12.1, 12.4, ...],
//! 'ch4': [480, 492, ...],
//! ...
//! }
//! ```
//!
//! A frame starts on a line beginning with `{` (the nesting counter starts at
//! 1 and that line's own braces are not counted). Each later line is appended
//! verbatim and moves the counter by its `{`/`}` balance. The frame is complete
//! when the counter reaches exactly zero. Single quotes are rewritten to
//! double quotes on emission because the firmware prints Python-style dicts.

use thiserror::Error;

/// Default upper bound on a buffered frame (bytes).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Frame-level failures. The partial frame is discarded in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("brace nesting went negative ({depth}) while assembling frame: {partial}")]
    Unbalanced { depth: i64, partial: String },

    #[error("frame exceeded {limit} bytes without closing")]
    Oversized { limit: usize },
}

/// A brace-balanced document with quotes normalized, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    text: String,
}

impl RawFrame {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Incremental line-to-frame assembler.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: String,
    depth: i64,
    started: bool,
    max_frame_bytes: usize,
    /// Lines dropped before any frame started
    noise_lines: u64,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl FrameAssembler {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buffer: String::with_capacity(1024),
            depth: 0,
            started: false,
            max_frame_bytes,
            noise_lines: 0,
        }
    }

    /// Feed one line. Returns a frame when this line closes one.
    pub fn feed(&mut self, line: &str) -> Result<Option<RawFrame>, FrameError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if line.starts_with('{') {
            if self.started {
                tracing::debug!(
                    discarded = %self.buffer,
                    "New frame started before previous one closed"
                );
            }
            self.buffer.clear();
            self.buffer.push_str(line);
            self.depth = 1;
            self.started = true;
            return self.check_size().map(|()| None);
        }

        if !self.started {
            self.noise_lines += 1;
            tracing::debug!(line = %line, "Skipping pre-frame noise");
            return Ok(None);
        }

        self.buffer.push_str(line);
        self.depth += brace_delta(line);
        self.check_size()?;

        match self.depth {
            0 => {
                let text = self.buffer.replace('\'', "\"");
                self.reset();
                Ok(Some(RawFrame { text }))
            }
            depth if depth < 0 => {
                let partial = std::mem::take(&mut self.buffer);
                self.reset();
                Err(FrameError::Unbalanced { depth, partial })
            }
            _ => Ok(None),
        }
    }

    /// True while a frame is partially buffered.
    pub const fn in_frame(&self) -> bool {
        self.started
    }

    pub const fn noise_lines(&self) -> u64 {
        self.noise_lines
    }

    fn check_size(&mut self) -> Result<(), FrameError> {
        if self.buffer.len() > self.max_frame_bytes {
            self.reset();
            return Err(FrameError::Oversized {
                limit: self.max_frame_bytes,
            });
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.depth = 0;
        self.started = false;
    }
}

fn brace_delta(line: &str) -> i64 {
    line.chars().fold(0, |acc, c| match c {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    })
}
