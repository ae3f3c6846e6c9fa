//! View state, user interaction and outbound events.
//!
//! [`ViewportController`] owns the mutable [`ViewState`] and turns pointer,
//! wheel and touch input into view changes:
//!
//! ```text
//!            pointer down / 1 touch              2 touches
//!   Idle ─────────────────────────► Panning ─────────────────► PinchZooming
//!    ▲                                 │                            │
//!    └──────── pointer up / leave ─────┘◄──── fewer than 2 touches ─┘
//! ```
//!
//! Pan moves are throttled to one update per 16 ms; motion arriving inside
//! the throttle window is accumulated and applied with the next accepted
//! update. A press released without moving more than 3 px is a click and
//! picks the nearest bright star. While input is locked (a focus program is
//! running) pan and zoom input is ignored.
//!
//! Every change of center or zoom is reported to the registered
//! [`SkyListener`]s as [`SkyEvent::ViewStateChanged`].

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::catalog::{Star, StarCatalog};
use crate::coords::{Equatorial, ObserverLocation, ProjectionMode, Projector, ScreenPoint};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 20.0;

/// Degrees of pan per pixel of drag at zoom 1.0.
pub const PAN_SENSITIVITY: f64 = 0.2;

pub const WHEEL_ZOOM_STEP: f64 = 0.1;

/// Minimum spacing of applied pan updates.
pub const PAN_THROTTLE_MS: f64 = 16.0;

/// A press that travels farther than this is a drag, not a click.
pub const DRAG_THRESHOLD_PX: f64 = 3.0;

/// Clicks pick stars closer than this to the pointer.
pub const PICK_RADIUS_PX: f64 = 50.0;

/// Only stars at least this bright can be picked.
pub const PICK_MAX_MAG: f64 = 6.0;

pub fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Normalize a right ascension to [0, 360).
pub fn wrap_ra(ra: f64) -> f64 {
    ra.rem_euclid(360.0)
}

pub fn clamp_dec(dec: f64) -> f64 {
    dec.clamp(-90.0, 90.0)
}

/// Where the camera looks and how.
///
/// Deserialized views go through [`ViewState::new`], so a stored zoom or
/// declination outside its range is clamped on load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawViewState")]
pub struct ViewState {
    pub view_center: Equatorial,
    pub zoom: f64,
    pub projection_mode: ProjectionMode,
}

impl ViewState {
    /// Build a view state, normalizing the center and clamping the zoom.
    pub fn new(view_center: Equatorial, zoom: f64, projection_mode: ProjectionMode) -> Self {
        Self {
            view_center: Equatorial::new(wrap_ra(view_center.ra), clamp_dec(view_center.dec)),
            zoom: clamp_zoom(zoom),
            projection_mode,
        }
    }
}

#[derive(Deserialize)]
struct RawViewState {
    view_center: Equatorial,
    zoom: f64,
    projection_mode: ProjectionMode,
}

impl From<RawViewState> for ViewState {
    fn from(raw: RawViewState) -> Self {
        Self::new(raw.view_center, raw.zoom, raw.projection_mode)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(Equatorial::new(180.0, 0.0), 1.5, ProjectionMode::Orthographic)
    }
}

/// Notifications sent to the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum SkyEvent {
    /// The number of stars drawn in the last frame changed
    VisibleCountChanged(usize),
    /// A drawing surface became available (`true`) or was lost (`false`)
    CanvasSupportChanged(bool),
    /// A focus program ran to completion; carries the program id
    FocusSequenceComplete(String),
    ViewStateChanged { view_center: Equatorial, zoom: f64 },
    /// A click landed; `None` when no star was close enough
    StarClicked(Option<Star>),
}

/// Receiver of [`SkyEvent`]s.
pub trait SkyListener {
    fn on_event(&mut self, event: SkyEvent);
}

impl<F: FnMut(SkyEvent)> SkyListener for F {
    fn on_event(&mut self, event: SkyEvent) {
        self(event)
    }
}

impl SkyListener for Sender<SkyEvent> {
    fn on_event(&mut self, event: SkyEvent) {
        if self.send(event).is_err() {
            log::trace!("Sky event receiver dropped");
        }
    }
}

/// Pointer/touch interaction state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    Idle,
    Panning {
        /// Position of the press
        origin: ScreenPoint,
        last: ScreenPoint,
        /// True once the press moved past the drag threshold
        dragged: bool,
    },
    PinchZooming {
        last_distance: f64,
    },
}

/// Owns the view state and applies user input to it.
pub struct ViewportController {
    view: ViewState,
    observer: ObserverLocation,
    surface_size: (f64, f64),
    interaction: Interaction,
    input_locked: bool,
    pending_pan: (f64, f64),
    last_pan_ms: Option<f64>,
    listeners: Vec<Box<dyn SkyListener>>,
}

impl ViewportController {
    pub fn new(view: ViewState, observer: ObserverLocation) -> Self {
        Self {
            view: ViewState::new(view.view_center, view.zoom, view.projection_mode),
            observer,
            surface_size: (800.0, 600.0),
            interaction: Interaction::Idle,
            input_locked: false,
            pending_pan: (0.0, 0.0),
            last_pan_ms: None,
            listeners: Vec::new(),
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn observer(&self) -> &ObserverLocation {
        &self.observer
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    pub fn add_listener(&mut self, listener: impl SkyListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Send an event to every listener.
    pub fn emit(&mut self, event: SkyEvent) {
        for listener in &mut self.listeners {
            listener.on_event(event.clone());
        }
    }

    /// Size of the surface the view is drawn on, used for click picking.
    pub fn set_surface_size(&mut self, width: f64, height: f64) {
        self.surface_size = (width, height);
    }

    /// Projector matching what the last frame drew.
    pub fn projector(&self) -> Projector {
        let observer = match self.view.projection_mode {
            ProjectionMode::Stereographic => Some(self.observer),
            ProjectionMode::Orthographic => None,
        };
        Projector::new(
            self.view.view_center,
            self.view.zoom,
            self.surface_size.0,
            self.surface_size.1,
            self.view.projection_mode,
            observer,
        )
    }

    /// Lock or unlock manual pan/zoom input.
    pub fn set_input_locked(&mut self, locked: bool) {
        if locked {
            self.pending_pan = (0.0, 0.0);
        }
        self.input_locked = locked;
    }

    pub fn is_input_locked(&self) -> bool {
        self.input_locked
    }

    /// Set center and zoom programmatically. Fires a view change if either
    /// value actually changed.
    pub fn set_view(&mut self, view_center: Equatorial, zoom: f64) {
        let next = ViewState::new(view_center, zoom, self.view.projection_mode);
        if next != self.view {
            self.view = next;
            self.notify_view_changed();
        }
    }

    pub fn set_projection_mode(&mut self, mode: ProjectionMode) {
        self.view.projection_mode = mode;
    }

    fn notify_view_changed(&mut self) {
        let event = SkyEvent::ViewStateChanged {
            view_center: self.view.view_center,
            zoom: self.view.zoom,
        };
        self.emit(event);
    }

    pub fn pointer_down(&mut self, point: ScreenPoint) {
        self.interaction = Interaction::Panning {
            origin: point,
            last: point,
            dragged: false,
        };
        self.pending_pan = (0.0, 0.0);
    }

    pub fn pointer_move(&mut self, point: ScreenPoint, now_ms: f64) {
        let Interaction::Panning {
            origin,
            last,
            dragged,
        } = self.interaction
        else {
            return;
        };

        self.interaction = Interaction::Panning {
            origin,
            last: point,
            dragged: dragged || origin.distance_to(&point) > DRAG_THRESHOLD_PX,
        };
        self.queue_pan(point.x - last.x, point.y - last.y, now_ms);
    }

    /// Release the pointer. A release that never turned into a drag is a
    /// click: the nearest pickable star is reported and returned.
    pub fn pointer_up(&mut self, point: ScreenPoint, catalog: &StarCatalog) -> Option<Star> {
        let interaction = std::mem::replace(&mut self.interaction, Interaction::Idle);
        self.flush_pan();

        match interaction {
            Interaction::Panning { dragged: false, .. } => self.click(point, catalog),
            _ => None,
        }
    }

    /// Pointer left the surface: end any drag without clicking.
    pub fn pointer_leave(&mut self) {
        self.interaction = Interaction::Idle;
        self.flush_pan();
    }

    /// Wheel input: positive `delta_y` zooms out one step, anything else in.
    pub fn wheel(&mut self, delta_y: f64) {
        if self.input_locked {
            return;
        }
        let step = if delta_y > 0.0 {
            -WHEEL_ZOOM_STEP
        } else {
            WHEEL_ZOOM_STEP
        };
        self.set_view(self.view.view_center, self.view.zoom + step);
    }

    /// Touches went down; `touches` holds every active touch.
    pub fn touch_start(&mut self, touches: &[ScreenPoint]) {
        match touches {
            [] => self.interaction = Interaction::Idle,
            [single] => self.pointer_down(*single),
            [a, b, ..] => {
                self.flush_pan();
                self.interaction = Interaction::PinchZooming {
                    last_distance: a.distance_to(b),
                }
            }
        }
    }

    pub fn touch_move(&mut self, touches: &[ScreenPoint], now_ms: f64) {
        match (self.interaction, touches) {
            (Interaction::PinchZooming { last_distance }, [a, b, ..]) => {
                let distance = a.distance_to(b);
                self.interaction = Interaction::PinchZooming {
                    last_distance: distance,
                };
                if self.input_locked || last_distance <= 0.0 {
                    return;
                }
                let scale = distance / last_distance;
                self.set_view(self.view.view_center, self.view.zoom * scale);
            }
            (Interaction::PinchZooming { .. }, _) => self.interaction = Interaction::Idle,
            (Interaction::Panning { .. }, [single]) => self.pointer_move(*single, now_ms),
            _ => {}
        }
    }

    /// Touches lifted; `remaining` holds the touches still down. Lifting the
    /// last touch of an undragged tap counts as a click.
    pub fn touch_end(
        &mut self,
        remaining: &[ScreenPoint],
        lifted: ScreenPoint,
        catalog: &StarCatalog,
    ) -> Option<Star> {
        match (self.interaction, remaining) {
            (Interaction::Panning { .. }, []) => self.pointer_up(lifted, catalog),
            (Interaction::PinchZooming { .. }, [_, _, ..]) => None,
            (Interaction::PinchZooming { .. }, _) => {
                self.interaction = Interaction::Idle;
                None
            }
            _ => None,
        }
    }

    fn queue_pan(&mut self, dx: f64, dy: f64, now_ms: f64) {
        if self.input_locked {
            return;
        }
        self.pending_pan.0 += dx;
        self.pending_pan.1 += dy;

        let accepted = self
            .last_pan_ms
            .map_or(true, |last| now_ms - last >= PAN_THROTTLE_MS);
        if accepted {
            self.last_pan_ms = Some(now_ms);
            self.flush_pan();
        }
    }

    /// Apply accumulated pan motion.
    fn flush_pan(&mut self) {
        let (dx, dy) = std::mem::take(&mut self.pending_pan);
        if self.input_locked || (dx == 0.0 && dy == 0.0) {
            return;
        }

        let sensitivity = PAN_SENSITIVITY / self.view.zoom;
        let delta_ra = match self.view.projection_mode {
            ProjectionMode::Orthographic => -dx * sensitivity,
            ProjectionMode::Stereographic => dx * sensitivity,
        };
        let delta_dec = dy * sensitivity;

        let center = self.view.view_center;
        self.set_view(
            Equatorial::new(center.ra + delta_ra, center.dec + delta_dec),
            self.view.zoom,
        );
    }

    fn click(&mut self, point: ScreenPoint, catalog: &StarCatalog) -> Option<Star> {
        let picked = pick_star(catalog, &self.projector(), point).cloned();
        log::debug!(
            "Click at ({:.0}, {:.0}) picked {:?}",
            point.x,
            point.y,
            picked.as_ref().map(|star| star.id)
        );
        self.emit(SkyEvent::StarClicked(picked.clone()));
        picked
    }
}

/// Nearest star of magnitude 6 or brighter within 50 px of `point`.
pub fn pick_star<'a>(catalog: &'a StarCatalog, projector: &Projector, point: ScreenPoint) -> Option<&'a Star> {
    let mut nearest = None;
    let mut best = PICK_RADIUS_PX;

    for star in catalog.stars() {
        if !star.vmag.is_some_and(|vmag| vmag <= PICK_MAX_MAG) {
            continue;
        }
        let Some(position) = projector.project(star.ra, star.dec) else {
            continue;
        };
        let distance = position.distance_to(&point);
        if distance < best {
            best = distance;
            nearest = Some(star);
        }
    }
    nearest
}
