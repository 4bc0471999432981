//! # Key source
//!
//! Reads single key presses from the operator's terminal. The terminal is switched into raw mode
//! for as long as a [`TermKeySource`] exists, and restored when it is dropped, including when the
//! teleop loop exits with an error or a panic unwinds through it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use log::{debug, warn};
use std::time::Duration;

use crate::cmd_shaper::{SafetyMode, QUIT_KEY};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of operator key presses.
pub trait KeySource {
    /// Read one key.
    ///
    /// Returns `Ok(None)` if no key was pressed within the wait allowed by `mode`.
    fn read_key(&mut self, mode: ReadMode) -> Result<Option<char>, KeySrcError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How long a key read may wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadMode {
    /// Wait at most the given time, then return no key.
    Bounded(Duration),

    /// Wait until a key is pressed.
    Blocking,
}

#[derive(Debug, thiserror::Error)]
pub enum KeySrcError {
    #[error("Could not switch the terminal into raw mode: {0}")]
    RawModeError(std::io::Error),

    #[error("Could not read a terminal event: {0}")]
    ReadError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Key source reading from the controlling terminal.
pub struct TermKeySource {
    _guard: RawModeGuard,
}

/// Holds the terminal in raw mode until dropped.
struct RawModeGuard;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReadMode {
    /// Get the read mode required by the safety mode.
    pub fn for_safety_mode(safety_mode: SafetyMode, poll_timeout: Duration) -> Self {
        match safety_mode {
            SafetyMode::Standard => ReadMode::Bounded(poll_timeout),
            SafetyMode::Safety => ReadMode::Blocking,
        }
    }
}

impl RawModeGuard {
    fn acquire() -> Result<Self, KeySrcError> {
        terminal::enable_raw_mode().map_err(KeySrcError::RawModeError)?;
        debug!("Terminal raw mode enabled");
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        match terminal::disable_raw_mode() {
            Ok(_) => debug!("Terminal raw mode disabled"),
            Err(e) => warn!("Could not restore the terminal mode: {}", e),
        }
    }
}

impl TermKeySource {
    /// Switch the terminal into raw mode and create the key source.
    pub fn new() -> Result<Self, KeySrcError> {
        Ok(Self {
            _guard: RawModeGuard::acquire()?,
        })
    }
}

impl KeySource for TermKeySource {
    fn read_key(&mut self, mode: ReadMode) -> Result<Option<char>, KeySrcError> {
        match mode {
            ReadMode::Bounded(timeout) => {
                // Any event other than a key press still counts as an empty read, so a burst of
                // resize or release events can never stall the loop
                if event::poll(timeout).map_err(KeySrcError::ReadError)? {
                    Ok(event_to_key(
                        event::read().map_err(KeySrcError::ReadError)?,
                    ))
                } else {
                    Ok(None)
                }
            }
            ReadMode::Blocking => loop {
                if let Some(key) = event_to_key(event::read().map_err(KeySrcError::ReadError)?) {
                    return Ok(Some(key));
                }
            },
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a terminal event into the character the key would produce in a raw terminal.
fn event_to_key(event: Event) -> Option<char> {
    match event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press | KeyEventKind::Repeat,
            ..
        }) => match code {
            // A raw terminal sends Ctrl+key as the control byte, Ctrl-C gives QUIT_KEY
            KeyCode::Char(c) if modifiers.contains(KeyModifiers::CONTROL) => match c.is_ascii() {
                true => Some(((c as u8) & 0x1f) as char),
                false => None,
            },
            KeyCode::Char(c) => Some(c),
            KeyCode::Enter => Some('\r'),
            KeyCode::Tab => Some('\t'),
            KeyCode::Backspace => Some('\x08'),
            KeyCode::Esc => Some('\x1b'),
            _ => None,
        },
        _ => None,
    }
}

// ------------------------------------------------------------------------------------------------
// TEST SUPPORT
// ------------------------------------------------------------------------------------------------

/// Key source replaying a fixed list of reads, used to drive the teleop loop in tests.
///
/// Once the script runs out every read fails, which ends the loop like a lost terminal would.
#[cfg(test)]
pub(crate) struct ScriptedKeySource {
    reads: std::collections::VecDeque<Option<char>>,

    /// Read modes requested by the loop, in order.
    pub modes: Vec<ReadMode>,
}

#[cfg(test)]
impl ScriptedKeySource {
    pub fn new<I: IntoIterator<Item = Option<char>>>(reads: I) -> Self {
        Self {
            reads: reads.into_iter().collect(),
            modes: Vec::new(),
        }
    }
}

#[cfg(test)]
impl KeySource for ScriptedKeySource {
    fn read_key(&mut self, mode: ReadMode) -> Result<Option<char>, KeySrcError> {
        self.modes.push(mode);
        self.reads.pop_front().ok_or_else(|| {
            KeySrcError::ReadError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "key script exhausted",
            ))
        })
    }
}
