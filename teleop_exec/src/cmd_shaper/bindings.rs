//! Key bindings for the command shaper

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Character produced by Ctrl-C in a raw mode terminal.
pub const QUIT_KEY: char = '\x03';

/// Help text shown at startup and periodically while rescaling bounds.
pub const HELP_BANNER: &[&str] = &[
    "Control the vehicle!",
    "-------------------------",
    "Moving around:",
    "        i     ",
    "   j    k    l",
    "        ,     ",
    "w/x : increase/decrease speed bound by 10%",
    "e/c : increase/decrease steering bound by 10%",
    "s   : toggle safety mode",
    "space key, k : force stop",
    "anything else : keep previous commands",
    "CTRL-C to quit",
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Step sizes applied by the move bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Increments {
    /// Units: meters/second
    pub speed_ms: f64,

    /// Units: radians
    pub angle_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The transition a key press requests from the command shaper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyAction {
    /// Add the given deltas to the target speed and steering angle.
    Move { d_speed_ms: f64, d_angle_rad: f64 },

    /// Multiply the speed and steering angle bounds by the given factors.
    Rescale { speed_factor: f64, angle_factor: f64 },

    /// Set both targets to zero.
    Stop,

    /// Switch between standard and safety mode.
    ToggleSafety,

    /// Leave the teleop loop.
    Quit,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the action bound to the given key, or `None` if the key is not bound.
///
/// Move bindings take precedence over all other bindings.
pub fn lookup(key: char, inc: &Increments) -> Option<KeyAction> {
    use KeyAction::*;

    let action = match key {
        // Move
        'i' => Move {
            d_speed_ms: inc.speed_ms,
            d_angle_rad: 0.0,
        },
        'j' => Move {
            d_speed_ms: 0.0,
            d_angle_rad: inc.angle_rad,
        },
        'l' => Move {
            d_speed_ms: 0.0,
            d_angle_rad: -inc.angle_rad,
        },
        ',' => Move {
            d_speed_ms: -inc.speed_ms,
            d_angle_rad: 0.0,
        },

        // Rescale
        'w' => Rescale {
            speed_factor: 1.1,
            angle_factor: 1.0,
        },
        'x' => Rescale {
            speed_factor: 0.9,
            angle_factor: 1.0,
        },
        'e' => Rescale {
            speed_factor: 1.0,
            angle_factor: 1.1,
        },
        'c' => Rescale {
            speed_factor: 1.0,
            angle_factor: 0.9,
        },

        ' ' | 'k' => Stop,
        's' => ToggleSafety,
        QUIT_KEY => Quit,
        _ => return None,
    };

    Some(action)
}

/// Write the help banner to the log.
pub fn log_help_banner() {
    for line in HELP_BANNER {
        info!("{}", line);
    }
}
