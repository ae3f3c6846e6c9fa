//! Scripted camera tours.
//!
//! A [`FocusProgram`] is an ordered list of [`FocusStep`]s. Each step eases
//! the view from wherever it currently is to the step's target over
//! `duration_ms` with a cubic ease-in-out, then holds for `hold_ms`. Right
//! ascension always travels the short way around the circle.
//!
//! [`FocusPlayer`] is the state machine that plays a program against a
//! monotonic clock. It never sleeps or schedules anything itself: the render
//! loop calls [`FocusPlayer::advance`] once per frame and applies the
//! returned view.

use serde::{Deserialize, Serialize};

use crate::coords::Equatorial;
use crate::viewport::{clamp_dec, clamp_zoom, wrap_ra};

pub const DEFAULT_STEP_DURATION_MS: f64 = 1000.0;

fn default_duration_ms() -> f64 {
    DEFAULT_STEP_DURATION_MS
}

/// One leg of a camera tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusStep {
    pub view_center: Equatorial,
    pub zoom_level: f64,
    /// Transition time; zero or less jumps straight to the target
    #[serde(default = "default_duration_ms")]
    pub duration_ms: f64,
    /// Pause after arriving
    #[serde(default)]
    pub hold_ms: f64,
}

impl FocusStep {
    pub fn new(view_center: Equatorial, zoom_level: f64) -> Self {
        Self {
            view_center,
            zoom_level,
            duration_ms: DEFAULT_STEP_DURATION_MS,
            hold_ms: 0.0,
        }
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_hold(mut self, hold_ms: f64) -> Self {
        self.hold_ms = hold_ms;
        self
    }
}

/// A named sequence of focus steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusProgram {
    pub id: String,
    pub steps: Vec<FocusStep>,
}

impl FocusProgram {
    pub fn new(id: impl Into<String>, steps: Vec<FocusStep>) -> Self {
        Self {
            id: id.into(),
            steps,
        }
    }
}

/// Cubic ease-in-out on [0, 1].
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Interpolate between two view centers, taking the short arc in RA.
pub fn interpolate_center(from: Equatorial, to: Equatorial, eased: f64) -> Equatorial {
    let mut ra_diff = to.ra - from.ra;
    if ra_diff > 180.0 {
        ra_diff -= 360.0;
    } else if ra_diff < -180.0 {
        ra_diff += 360.0;
    }

    Equatorial::new(
        wrap_ra(from.ra + ra_diff * eased),
        clamp_dec(from.dec + (to.dec - from.dec) * eased),
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Step not started yet
    Pending,
    Moving {
        start_ms: f64,
        from: Equatorial,
        from_zoom: f64,
    },
    Holding {
        until_ms: f64,
    },
}

/// Outcome of one [`FocusPlayer::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusStatus {
    /// More frames are needed
    Running,
    /// The last step finished
    Complete,
}

/// Plays a [`FocusProgram`] frame by frame.
#[derive(Debug, Clone)]
pub struct FocusPlayer {
    program: FocusProgram,
    step: usize,
    phase: Phase,
    center: Equatorial,
    zoom: f64,
}

impl FocusPlayer {
    /// Prepare to play `program` starting from the current view.
    pub fn new(program: FocusProgram, center: Equatorial, zoom: f64) -> Self {
        Self {
            program,
            step: 0,
            phase: Phase::Pending,
            center,
            zoom,
        }
    }

    pub fn program_id(&self) -> &str {
        &self.program.id
    }

    /// Index of the step being played.
    pub fn step_index(&self) -> usize {
        self.step
    }

    /// The view the program currently asks for.
    pub fn view(&self) -> (Equatorial, f64) {
        (self.center, self.zoom)
    }

    /// Advance the program to `now_ms`.
    ///
    /// Zero-duration steps and elapsed holds are consumed within the same
    /// call, so a program made only of instant steps completes on its first
    /// advance.
    pub fn advance(&mut self, now_ms: f64) -> FocusStatus {
        loop {
            let Some(step) = self.program.steps.get(self.step) else {
                return FocusStatus::Complete;
            };

            match self.phase {
                Phase::Pending => {
                    log::debug!(
                        "Focus program {:?} step {} -> RA {:.2} Dec {:.2} zoom {:.2}",
                        self.program.id,
                        self.step,
                        step.view_center.ra,
                        step.view_center.dec,
                        step.zoom_level
                    );
                    if step.duration_ms <= 0.0 {
                        self.arrive(now_ms);
                    } else {
                        self.phase = Phase::Moving {
                            start_ms: now_ms,
                            from: self.center,
                            from_zoom: self.zoom,
                        };
                        return FocusStatus::Running;
                    }
                }
                Phase::Moving {
                    start_ms,
                    from,
                    from_zoom,
                } => {
                    let progress = ((now_ms - start_ms) / step.duration_ms).min(1.0);
                    if progress < 1.0 {
                        let eased = ease_in_out_cubic(progress);
                        self.center = interpolate_center(from, step.view_center, eased);
                        self.zoom = from_zoom + (clamp_zoom(step.zoom_level) - from_zoom) * eased;
                        return FocusStatus::Running;
                    }
                    self.arrive(start_ms + step.duration_ms);
                }
                Phase::Holding { until_ms } => {
                    if now_ms < until_ms {
                        return FocusStatus::Running;
                    }
                    self.step += 1;
                    self.phase = Phase::Pending;
                }
            }
        }
    }

    /// Snap to the current step's target, zoom clamped, and start its hold.
    fn arrive(&mut self, arrived_ms: f64) {
        let step = &self.program.steps[self.step];
        self.center = step.view_center;
        self.zoom = clamp_zoom(step.zoom_level);
        self.phase = Phase::Holding {
            until_ms: arrived_ms + step.hold_ms.max(0.0),
        };
    }
}
