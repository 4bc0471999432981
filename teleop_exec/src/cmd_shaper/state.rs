//! Implementations for the CmdShaper state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Serialize;

// Internal
use super::{
    log_help_banner, lookup, CmdShaperError, Increments, KeyAction, Params, HELP_BANNER_PERIOD,
    MAX_ANGLE_BOUND_RAD, MIN_BOUND,
};
use util::{maths::clamp_sym, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command shaping module state
#[derive(Debug, Default)]
pub struct CmdShaper {
    initialised: bool,

    pub(crate) inc: Increments,

    pub(crate) cmd: Command,

    pub(crate) bounds: Bounds,

    pub(crate) safety_mode: SafetyMode,

    /// Rolling count of bound rescales, modulo `HELP_BANNER_PERIOD`.
    num_rescales: u32,

    pub(crate) report: StatusReport,
}

/// The bounded motion command produced by the shaper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Command {
    /// Units: meters/second
    pub target_speed_ms: f64,

    /// Front wheel steering angle, positive to the left.
    ///
    /// Units: radians
    pub target_angle_rad: f64,
}

/// Saturation limits applied to the command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bounds {
    /// Units: meters/second
    pub speed_ms: f64,

    /// Units: radians
    pub angle_rad: f64,
}

/// Output of one CmdShaper processing step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputData {
    pub cmd: Command,

    pub safety_mode: SafetyMode,

    /// The operator asked to leave the teleop loop.
    pub quit: bool,
}

/// Status report for CmdShaper processing.
#[derive(Clone, Copy, Default, Serialize, Debug, PartialEq)]
pub struct StatusReport {
    /// The target speed was clipped to the speed bound.
    pub speed_limited: bool,

    /// The target angle was clipped to the angle bound.
    pub angle_limited: bool,

    /// The bounds were rescaled this cycle.
    pub bounds_rescaled: bool,

    /// The help banner was shown this cycle.
    pub banner_shown: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Operating mode of the teleop loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SafetyMode {
    /// Each cycle waits a bounded time for a key, keeping the previous command
    /// if none arrives.
    Standard,

    /// Each cycle blocks until the operator presses a key.
    Safety,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SafetyMode {
    fn default() -> Self {
        SafetyMode::Standard
    }
}

impl SafetyMode {
    fn toggled(self) -> Self {
        match self {
            SafetyMode::Standard => SafetyMode::Safety,
            SafetyMode::Safety => SafetyMode::Standard,
        }
    }
}

impl State for CmdShaper {
    type InitData = Params;
    type InitError = CmdShaperError;

    type InputData = Option<char>;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = CmdShaperError;

    /// Initialise the CmdShaper module.
    ///
    /// Degree valued parameters are converted into radians here.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.validate()?;

        self.inc = Increments {
            speed_ms: init_data.speed_increment_ms,
            angle_rad: init_data.angle_increment_deg.to_radians(),
        };
        self.bounds = Bounds {
            speed_ms: init_data.speed_bound_ms,
            angle_rad: init_data.angle_bound_deg.to_radians(),
        };
        self.cmd = Command::default();
        self.safety_mode = match init_data.safety_mode {
            true => SafetyMode::Safety,
            false => SafetyMode::Standard,
        };
        self.num_rescales = 0;
        self.initialised = true;

        if self.safety_mode == SafetyMode::Safety {
            info!("Switched to Safety Mode!");
        }

        Ok(())
    }

    /// Process the key read this cycle, `None` if no key was pressed.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !self.initialised {
            return Err(CmdShaperError::NotInit);
        }

        self.report = StatusReport::default();

        let mut quit = false;

        match input_data.and_then(|k| lookup(k, &self.inc)) {
            Some(KeyAction::Move {
                d_speed_ms,
                d_angle_rad,
            }) => self.accumulate(d_speed_ms, d_angle_rad),
            Some(KeyAction::Rescale {
                speed_factor,
                angle_factor,
            }) => self.rescale(speed_factor, angle_factor),
            Some(KeyAction::Stop) => self.apply_stop(),
            Some(KeyAction::ToggleSafety) => {
                self.toggle_safety();
            }
            Some(KeyAction::Quit) => quit = true,
            None => (),
        }

        // Saturation happens after every transition, whatever the key was
        self.saturate();

        debug!("current speed : {}", self.cmd.target_speed_ms);
        debug!("current angle : {}", self.cmd.target_angle_rad.to_degrees());

        Ok((
            OutputData {
                cmd: self.cmd,
                safety_mode: self.safety_mode,
                quit,
            },
            self.report,
        ))
    }
}

impl CmdShaper {
    /// Create and initialise a new shaper from the given parameters.
    pub fn new(params: Params) -> Result<Self, CmdShaperError> {
        let mut shaper = Self::default();
        shaper.init(params)?;
        Ok(shaper)
    }

    /// If `key` is a move key add its increment to the command, then saturate.
    ///
    /// Returns `true` if the key was a move key. Any other key leaves the
    /// command unchanged.
    pub fn apply_move(&mut self, key: char) -> bool {
        match lookup(key, &self.inc) {
            Some(KeyAction::Move {
                d_speed_ms,
                d_angle_rad,
            }) => {
                self.accumulate(d_speed_ms, d_angle_rad);
                self.saturate();
                true
            }
            _ => false,
        }
    }

    /// If `key` is a rescale key multiply the bounds by its factors.
    ///
    /// Returns `true` if the key was a rescale key.
    pub fn apply_bound_rescale(&mut self, key: char) -> bool {
        match lookup(key, &self.inc) {
            Some(KeyAction::Rescale {
                speed_factor,
                angle_factor,
            }) => {
                self.rescale(speed_factor, angle_factor);
                self.saturate();
                true
            }
            _ => false,
        }
    }

    /// Set both targets to zero, leaving the bounds unchanged.
    pub fn apply_stop(&mut self) {
        self.cmd = Command::default();
    }

    /// Switch between standard and safety mode, returning the new mode.
    pub fn toggle_safety(&mut self) -> SafetyMode {
        self.safety_mode = self.safety_mode.toggled();

        match self.safety_mode {
            SafetyMode::Safety => info!("Switched to Safety Mode!"),
            SafetyMode::Standard => info!("Back to Standard Mode!"),
        }

        self.safety_mode
    }

    pub fn current_command(&self) -> Command {
        self.cmd
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn safety_mode(&self) -> SafetyMode {
        self.safety_mode
    }

    /// Log the current bounds.
    pub fn log_bounds(&self) {
        info!(
            "current bounds:\tspeed {:.3} m/s\tangle {:.3} deg",
            self.bounds.speed_ms,
            self.bounds.angle_rad.to_degrees()
        );
    }

    fn accumulate(&mut self, d_speed_ms: f64, d_angle_rad: f64) {
        self.cmd.target_speed_ms += d_speed_ms;
        self.cmd.target_angle_rad += d_angle_rad;
    }

    /// Rescale the bounds, keeping them positive and the angle bound clear of
    /// the steering singularity.
    fn rescale(&mut self, speed_factor: f64, angle_factor: f64) {
        // A unit factor leaves its bound exactly as it was
        if speed_factor != 1.0 {
            self.bounds.speed_ms = (self.bounds.speed_ms * speed_factor).max(MIN_BOUND);
        }
        if angle_factor != 1.0 {
            self.bounds.angle_rad = (self.bounds.angle_rad * angle_factor)
                .max(MIN_BOUND)
                .min(MAX_ANGLE_BOUND_RAD);
        }
        self.report.bounds_rescaled = true;

        self.log_bounds();

        if self.num_rescales == HELP_BANNER_PERIOD - 1 {
            log_help_banner();
            self.report.banner_shown = true;
        }
        self.num_rescales = (self.num_rescales + 1) % HELP_BANNER_PERIOD;
    }

    /// Clip the command into the current bounds.
    fn saturate(&mut self) {
        let (speed, speed_limited) = clamp_sym(&self.cmd.target_speed_ms, &self.bounds.speed_ms);
        let (angle, angle_limited) = clamp_sym(&self.cmd.target_angle_rad, &self.bounds.angle_rad);

        self.cmd = Command {
            target_speed_ms: speed,
            target_angle_rad: angle,
        };
        self.report.speed_limited |= speed_limited;
        self.report.angle_limited |= angle_limited;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn shaper() -> CmdShaper {
        CmdShaper::new(Params::default()).unwrap()
    }

    fn press(shaper: &mut CmdShaper, key: char) -> (OutputData, StatusReport) {
        shaper.proc(&Some(key)).unwrap()
    }

    #[test]
    fn test_init_converts_degrees() {
        let s = shaper();
        assert_relative_eq!(s.bounds().speed_ms, 3.0);
        assert_relative_eq!(s.bounds().angle_rad, 29f64.to_radians());
        assert_relative_eq!(s.inc.angle_rad, 0.2f64.to_radians());
        assert_eq!(s.current_command(), Command::default());
        assert_eq!(s.safety_mode(), SafetyMode::Standard);
    }

    #[test]
    fn test_init_rejects_singular_bound() {
        let res = CmdShaper::new(Params {
            angle_bound_deg: 90.0,
            ..Default::default()
        });
        assert!(matches!(res, Err(CmdShaperError::SteerSingularity(_))));
    }

    #[test]
    fn test_proc_before_init() {
        let mut s = CmdShaper::default();
        assert!(matches!(s.proc(&None), Err(CmdShaperError::NotInit)));
    }

    #[test]
    fn test_speed_accumulates_and_saturates() {
        let mut s = shaper();

        for _ in 0..2 {
            s.apply_move('i');
        }
        assert_relative_eq!(s.current_command().target_speed_ms, 1.0);

        for _ in 0..5 {
            s.apply_move('i');
        }
        // 7 * 0.5 = 3.5 is clipped to exactly the bound
        assert_eq!(s.current_command().target_speed_ms, 3.0);

        let (_, report) = press(&mut s, 'i');
        assert!(report.speed_limited);
        assert!(!report.angle_limited);
    }

    #[test]
    fn test_saturation_invariant() {
        let mut s = shaper();

        // A long, lopsided sequence of move keys
        let keys = "iiiiiiiiijjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjj\
                    jjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjj\
                    jjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjjj\
                    ,,,,,,,,,,,,,,,,,llllllllllllllllllllllllllllllllllllllllllllllllllllllllllllll\
                    lllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllll\
                    lllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllll\
                    lllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllll\
                    lllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllllll";

        for key in keys.chars() {
            let (out, _) = press(&mut s, key);
            let b = s.bounds();
            assert!(out.cmd.target_speed_ms.abs() <= b.speed_ms);
            assert!(out.cmd.target_angle_rad.abs() <= b.angle_rad);
        }

        // The sequence drove both targets into their negative bounds
        assert_eq!(s.current_command().target_speed_ms, -3.0);
        assert_relative_eq!(s.current_command().target_angle_rad, -29f64.to_radians());
    }

    #[test]
    fn test_shrinking_bound_resaturates() {
        let mut s = shaper();
        for _ in 0..6 {
            s.apply_move('i');
        }
        assert_eq!(s.current_command().target_speed_ms, 3.0);

        let (out, report) = press(&mut s, 'x');
        assert!(report.bounds_rescaled);
        assert!(report.speed_limited);
        assert_relative_eq!(out.cmd.target_speed_ms, 2.7);
        assert_relative_eq!(s.bounds().speed_ms, 2.7);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut s = shaper();
        s.apply_move('i');
        s.apply_move('j');
        s.apply_bound_rescale('w');

        let bounds = s.bounds();

        for _ in 0..2 {
            s.apply_stop();
            assert_eq!(s.current_command().target_speed_ms, 0.0);
            assert_eq!(s.current_command().target_angle_rad, 0.0);
        }

        // Stop never touches the bounds
        assert_eq!(s.bounds(), bounds);

        // Both stop keys go through proc
        s.apply_move(',');
        let (out, _) = press(&mut s, ' ');
        assert_eq!(out.cmd, Command::default());
        s.apply_move(',');
        let (out, _) = press(&mut s, 'k');
        assert_eq!(out.cmd, Command::default());
    }

    #[test]
    fn test_rescale_grow_then_shrink_is_not_identity() {
        let mut s = shaper();
        let b = s.bounds().speed_ms;

        assert!(s.apply_bound_rescale('w'));
        assert!(s.apply_bound_rescale('x'));

        assert_relative_eq!(s.bounds().speed_ms, 0.99 * b, epsilon = 1e-12);
        assert!((s.bounds().speed_ms - b).abs() > 1e-3);

        // Angle bound untouched by speed rescales
        assert_relative_eq!(s.bounds().angle_rad, 29f64.to_radians());
    }

    #[test]
    fn test_speed_rescale_keeps_near_singular_angle_bound() {
        // Just under the rescale ceiling, a bound of 89.99 deg is rejected at init
        assert!(CmdShaper::new(Params {
            angle_bound_deg: 89.99,
            ..Default::default()
        })
        .is_err());

        let mut s = CmdShaper::new(Params {
            angle_bound_deg: 89.94,
            ..Default::default()
        })
        .unwrap();
        let before = s.bounds().angle_rad;

        for key in ['w', 'x', 'w'].iter() {
            assert!(s.apply_bound_rescale(*key));
            assert_eq!(s.bounds().angle_rad, before);
        }

        // Likewise a steering rescale leaves the speed bound alone
        let speed = s.bounds().speed_ms;
        s.apply_bound_rescale('c');
        assert_eq!(s.bounds().speed_ms, speed);
    }

    #[test]
    fn test_rescale_angle_only() {
        let mut s = shaper();
        s.apply_bound_rescale('e');
        assert_relative_eq!(s.bounds().angle_rad, 29f64.to_radians() * 1.1);
        s.apply_bound_rescale('c');
        assert_relative_eq!(s.bounds().angle_rad, 29f64.to_radians() * 1.1 * 0.9);
        assert_relative_eq!(s.bounds().speed_ms, 3.0);
    }

    #[test]
    fn test_bounds_stay_positive_and_below_singularity() {
        let mut s = shaper();

        for _ in 0..1000 {
            s.apply_bound_rescale('x');
            s.apply_bound_rescale('c');
        }
        assert!(s.bounds().speed_ms >= MIN_BOUND);
        assert!(s.bounds().angle_rad >= MIN_BOUND);

        for _ in 0..1000 {
            s.apply_bound_rescale('e');
        }
        assert!(s.bounds().angle_rad < std::f64::consts::FRAC_PI_2);
        assert_eq!(s.bounds().angle_rad, MAX_ANGLE_BOUND_RAD);
    }

    #[test]
    fn test_help_banner_every_fifteen_rescales() {
        let mut s = shaper();

        let shown: Vec<bool> = (0..45)
            .map(|i| {
                let key = if i % 2 == 0 { 'w' } else { 'x' };
                press(&mut s, key).1.banner_shown
            })
            .collect();

        for (i, banner) in shown.iter().enumerate() {
            assert_eq!(*banner, i % 15 == 14, "rescale {}", i);
        }
    }

    #[test]
    fn test_non_move_keys_are_not_moves() {
        let mut s = shaper();
        assert!(!s.apply_move('w'));
        assert!(!s.apply_move('z'));
        assert!(!s.apply_bound_rescale('i'));
        assert_eq!(s.current_command(), Command::default());
        assert_relative_eq!(s.bounds().speed_ms, 3.0);
    }

    #[test]
    fn test_unrecognised_key_keeps_command() {
        let mut s = shaper();
        s.apply_move('i');
        s.apply_move('l');
        let before = s.current_command();

        for key in [Some('z'), None, Some('\x1b'), Some('Q')].iter() {
            let (out, report) = s.proc(key).unwrap();
            assert_eq!(out.cmd, before);
            assert!(!out.quit);
            assert_eq!(report, StatusReport::default());
        }
    }

    #[test]
    fn test_toggle_safety() {
        let mut s = shaper();
        let cmd = s.current_command();

        let (out, _) = press(&mut s, 's');
        assert_eq!(out.safety_mode, SafetyMode::Safety);
        assert_eq!(out.cmd, cmd);

        assert_eq!(s.toggle_safety(), SafetyMode::Standard);

        let s = CmdShaper::new(Params {
            safety_mode: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(s.safety_mode(), SafetyMode::Safety);
    }

    #[test]
    fn test_quit() {
        let mut s = shaper();
        s.apply_move('i');
        let (out, _) = press(&mut s, crate::cmd_shaper::QUIT_KEY);
        assert!(out.quit);
        assert_relative_eq!(out.cmd.target_speed_ms, 0.5);
    }
}
