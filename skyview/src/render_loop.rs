//! Frame scheduler tying the view, focus programs and the renderer together.
//!
//! The loop is driven from outside: the host calls [`RenderLoop::tick`] once
//! per display frame with a monotonic timestamp and, if it has one, a drawing
//! surface. Each tick
//!
//! 1. checks the teardown token and the active focus program's token,
//! 2. advances the focus program and commits its view,
//! 3. renders one frame, or reports that no surface is available,
//! 4. reports a changed visible-star count.
//!
//! The returned [`FrameStatus`] says whether another frame should be
//! scheduled.

use std::cell::Cell;
use std::rc::Rc;

use crate::catalog::{ConstellationLine, StarCatalog};
use crate::config::RenderConfig;
use crate::coords::{ProjectionMode, ScreenPoint};
use crate::focus::{FocusPlayer, FocusProgram, FocusStatus};
use crate::renderer::{FrameInput, FrameStats, RenderOptions, StarFieldRenderer};
use crate::surface::DrawSurface;
use crate::viewport::{SkyEvent, SkyListener, ViewportController};
use crate::Star;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Result of one [`RenderLoop::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was drawn; schedule the next one
    Continue,
    /// No surface was available; nothing drawn until one is supplied
    Halted,
    /// The loop was torn down
    Cancelled,
}

struct ActiveFocus {
    player: FocusPlayer,
    token: CancellationToken,
}

/// Drives a star field view frame by frame.
pub struct RenderLoop {
    catalog: StarCatalog,
    constellations: Vec<ConstellationLine>,
    renderer: StarFieldRenderer,
    viewport: ViewportController,
    focus: Option<ActiveFocus>,
    canvas_supported: Option<bool>,
    last_visible: usize,
    started_ms: Option<f64>,
    teardown: CancellationToken,
}

impl RenderLoop {
    pub fn new(config: RenderConfig, catalog: StarCatalog, constellations: Vec<ConstellationLine>) -> Self {
        let mut viewport = ViewportController::new(config.view, config.observer);
        viewport.set_surface_size(config.width as f64, config.height as f64);

        log::info!(
            "Render loop with {} stars, {} constellations, {} projection",
            catalog.len(),
            constellations.len(),
            config.view.projection_mode
        );

        Self {
            catalog,
            constellations,
            renderer: StarFieldRenderer::new(config.options),
            viewport,
            focus: None,
            canvas_supported: None,
            last_visible: 0,
            started_ms: None,
            teardown: CancellationToken::new(),
        }
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    pub fn renderer_mut(&mut self) -> &mut StarFieldRenderer {
        &mut self.renderer
    }

    pub fn catalog(&self) -> &StarCatalog {
        &self.catalog
    }

    pub fn add_listener(&mut self, listener: impl SkyListener + 'static) {
        self.viewport.add_listener(listener);
    }

    /// Replace the star set; the id index is rebuilt with it.
    pub fn set_stars(&mut self, catalog: StarCatalog) {
        log::debug!("Star set replaced: {} -> {} stars", self.catalog.len(), catalog.len());
        self.catalog = catalog;
    }

    pub fn set_constellations(&mut self, constellations: Vec<ConstellationLine>) {
        self.constellations = constellations;
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        self.renderer.set_options(options);
    }

    pub fn set_projection_mode(&mut self, mode: ProjectionMode) {
        self.viewport.set_projection_mode(mode);
    }

    /// Token that tears the loop down when cancelled.
    pub fn teardown_token(&self) -> CancellationToken {
        self.teardown.clone()
    }

    pub fn is_focus_active(&self) -> bool {
        self.focus.is_some()
    }

    /// Start a focus program, cancelling any program already running.
    ///
    /// `None` or a program without steps only cancels. A program whose steps
    /// are all instant completes inside this call. The returned token cancels
    /// the new program.
    pub fn submit_focus(&mut self, program: Option<FocusProgram>, now_ms: f64) -> CancellationToken {
        self.cancel_focus();
        let token = CancellationToken::new();

        let Some(program) = program.filter(|program| !program.steps.is_empty()) else {
            return token;
        };

        log::info!(
            "Starting focus program {:?} with {} steps",
            program.id,
            program.steps.len()
        );
        let view = *self.viewport.view();
        let mut player = FocusPlayer::new(program, view.view_center, view.zoom);
        let status = player.advance(now_ms);
        let (center, zoom) = player.view();
        self.viewport.set_view(center, zoom);

        match status {
            FocusStatus::Complete => self.complete_focus(player.program_id().to_string()),
            FocusStatus::Running => {
                self.viewport.set_input_locked(true);
                self.focus = Some(ActiveFocus {
                    player,
                    token: token.clone(),
                });
            }
        }
        token
    }

    /// Stop the running focus program. The view stays where the animation
    /// left it and no completion is reported.
    pub fn cancel_focus(&mut self) {
        if let Some(active) = self.focus.take() {
            active.token.cancel();
            log::info!(
                "Cancelled focus program {:?} at step {}",
                active.player.program_id(),
                active.player.step_index()
            );
        }
        self.viewport.set_input_locked(false);
    }

    fn complete_focus(&mut self, program_id: String) {
        log::info!("Focus program {program_id:?} complete");
        self.viewport.set_input_locked(false);
        self.viewport.emit(SkyEvent::FocusSequenceComplete(program_id));
    }

    fn advance_focus(&mut self, now_ms: f64) {
        let Some(active) = self.focus.as_mut() else {
            return;
        };
        if active.token.is_cancelled() {
            self.cancel_focus();
            return;
        }

        let status = active.player.advance(now_ms);
        let (center, zoom) = active.player.view();
        self.viewport.set_view(center, zoom);

        if status == FocusStatus::Complete {
            if let Some(done) = self.focus.take() {
                self.complete_focus(done.player.program_id().to_string());
            }
        }
    }

    fn report_canvas_support(&mut self, supported: bool) {
        if self.canvas_supported == Some(supported) {
            return;
        }
        if supported {
            log::debug!("Drawing surface available");
        } else {
            log::warn!("No drawing surface available, halting render loop");
        }
        self.canvas_supported = Some(supported);
        self.viewport.emit(SkyEvent::CanvasSupportChanged(supported));
    }

    /// Run one frame.
    pub fn tick(&mut self, now_ms: f64, surface: Option<&mut dyn DrawSurface>) -> FrameStatus {
        if self.teardown.is_cancelled() {
            self.cancel_focus();
            return FrameStatus::Cancelled;
        }

        self.advance_focus(now_ms);

        let Some(surface) = surface else {
            self.report_canvas_support(false);
            return FrameStatus::Halted;
        };
        self.report_canvas_support(true);

        let stats = self.render(surface, now_ms);
        if stats.visible_stars != self.last_visible {
            self.last_visible = stats.visible_stars;
            self.viewport.emit(SkyEvent::VisibleCountChanged(stats.visible_stars));
        }
        FrameStatus::Continue
    }

    fn render(&mut self, surface: &mut dyn DrawSurface, now_ms: f64) -> FrameStats {
        let started_ms = *self.started_ms.get_or_insert(now_ms);
        self.viewport.set_surface_size(surface.width(), surface.height());

        let frame = FrameInput {
            catalog: &self.catalog,
            constellations: &self.constellations,
            view: self.viewport.view(),
            observer: *self.viewport.observer(),
            time_ms: now_ms - started_ms,
        };
        self.renderer.draw_frame(surface, &frame)
    }

    pub fn pointer_down(&mut self, point: ScreenPoint) {
        self.viewport.pointer_down(point);
    }

    pub fn pointer_move(&mut self, point: ScreenPoint, now_ms: f64) {
        self.viewport.pointer_move(point, now_ms);
    }

    /// Release the pointer; returns the clicked star, if this was a click
    /// that landed near one.
    pub fn pointer_up(&mut self, point: ScreenPoint) -> Option<Star> {
        self.viewport.pointer_up(point, &self.catalog)
    }

    pub fn pointer_leave(&mut self) {
        self.viewport.pointer_leave();
    }

    pub fn wheel(&mut self, delta_y: f64) {
        self.viewport.wheel(delta_y);
    }

    pub fn touch_start(&mut self, touches: &[ScreenPoint]) {
        self.viewport.touch_start(touches);
    }

    pub fn touch_move(&mut self, touches: &[ScreenPoint], now_ms: f64) {
        self.viewport.touch_move(touches, now_ms);
    }

    pub fn touch_end(&mut self, remaining: &[ScreenPoint], lifted: ScreenPoint) -> Option<Star> {
        self.viewport.touch_end(remaining, lifted, &self.catalog)
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        if let Some(active) = self.focus.take() {
            active.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Equatorial;
    use crate::focus::FocusStep;
    use crate::surface::RecordingSurface;
    use crate::viewport::ViewState;
    use crossbeam_channel::{unbounded, Receiver};

    fn config() -> RenderConfig {
        let mut config = RenderConfig::default();
        config.view = ViewState::new(Equatorial::new(0.0, 0.0), 1.0, ProjectionMode::Orthographic);
        config
    }

    fn catalog() -> StarCatalog {
        StarCatalog::new(vec![
            Star::new(1, 0.0, 0.0, Some(1.0), None),
            Star::new(2, 3.0, 3.0, Some(4.0), None),
            Star::new(3, 180.0, 0.0, Some(2.5), None),
        ])
    }

    fn with_channel() -> (RenderLoop, Receiver<SkyEvent>) {
        let (tx, rx) = unbounded();
        let mut render_loop = RenderLoop::new(config(), catalog(), Vec::new());
        render_loop.add_listener(tx);
        (render_loop, rx)
    }

    #[test]
    fn test_tick_reports_support_and_count_once() {
        let (mut render_loop, rx) = with_channel();
        let mut surface = RecordingSurface::new(800.0, 600.0);

        assert_eq!(render_loop.tick(0.0, Some(&mut surface)), FrameStatus::Continue);
        assert_eq!(render_loop.tick(16.0, Some(&mut surface)), FrameStatus::Continue);

        let events: Vec<SkyEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                SkyEvent::CanvasSupportChanged(true),
                SkyEvent::VisibleCountChanged(2),
            ]
        );
    }

    #[test]
    fn test_surface_loss_halts_and_recovers() {
        let (mut render_loop, rx) = with_channel();
        let mut surface = RecordingSurface::new(800.0, 600.0);

        assert_eq!(render_loop.tick(0.0, None), FrameStatus::Halted);
        assert_eq!(render_loop.tick(16.0, None), FrameStatus::Halted);
        assert_eq!(render_loop.tick(32.0, Some(&mut surface)), FrameStatus::Continue);

        let support: Vec<bool> = rx
            .try_iter()
            .filter_map(|e| match e {
                SkyEvent::CanvasSupportChanged(supported) => Some(supported),
                _ => None,
            })
            .collect();
        assert_eq!(support, vec![false, true]);
    }

    #[test]
    fn test_teardown_cancels() {
        let (mut render_loop, _rx) = with_channel();
        let token = render_loop.teardown_token();
        token.cancel();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        assert_eq!(render_loop.tick(0.0, Some(&mut surface)), FrameStatus::Cancelled);
        assert!(surface.commands().is_empty());
    }

    #[test]
    fn test_instant_focus_completes_at_submit() {
        let (mut render_loop, rx) = with_channel();
        let program = FocusProgram::new(
            "jump",
            vec![FocusStep::new(Equatorial::new(10.0, 20.0), 3.0).with_duration(0.0)],
        );
        render_loop.submit_focus(Some(program), 0.0);

        assert!(!render_loop.is_focus_active());
        assert_eq!(render_loop.viewport().view().view_center, Equatorial::new(10.0, 20.0));
        assert_eq!(render_loop.viewport().view().zoom, 3.0);

        let completions: Vec<SkyEvent> = rx
            .try_iter()
            .filter(|e| matches!(e, SkyEvent::FocusSequenceComplete(_)))
            .collect();
        assert_eq!(completions, vec![SkyEvent::FocusSequenceComplete("jump".into())]);
    }

    #[test]
    fn test_new_program_cancels_previous_without_completion() {
        let (mut render_loop, rx) = with_channel();
        let slow = FocusProgram::new("slow", vec![FocusStep::new(Equatorial::new(90.0, 0.0), 2.0)]);
        let first = render_loop.submit_focus(Some(slow), 0.0);
        let mut surface = RecordingSurface::new(800.0, 600.0);
        render_loop.tick(500.0, Some(&mut surface));

        let mid = *render_loop.viewport().view();
        assert!(mid.view_center.ra > 0.0 && mid.view_center.ra < 90.0);

        render_loop.submit_focus(None, 600.0);
        assert!(first.is_cancelled());
        assert!(!render_loop.is_focus_active());
        assert_eq!(*render_loop.viewport().view(), mid);

        for t in [700.0, 2000.0, 3000.0] {
            render_loop.tick(t, Some(&mut surface));
        }
        assert_eq!(*render_loop.viewport().view(), mid);
        assert!(!rx
            .try_iter()
            .any(|e| matches!(e, SkyEvent::FocusSequenceComplete(_))));
    }

    #[test]
    fn test_cancelled_token_stops_program() {
        let (mut render_loop, _rx) = with_channel();
        let program = FocusProgram::new("tour", vec![FocusStep::new(Equatorial::new(40.0, 0.0), 2.0)]);
        let token = render_loop.submit_focus(Some(program), 0.0);
        token.cancel();

        let mut surface = RecordingSurface::new(800.0, 600.0);
        render_loop.tick(2000.0, Some(&mut surface));
        assert!(!render_loop.is_focus_active());
        assert_eq!(render_loop.viewport().view().view_center, Equatorial::new(0.0, 0.0));
    }

    #[test]
    fn test_focus_locks_manual_input() {
        let (mut render_loop, _rx) = with_channel();
        let program = FocusProgram::new("tour", vec![FocusStep::new(Equatorial::new(40.0, 0.0), 2.0)]);
        render_loop.submit_focus(Some(program), 0.0);

        render_loop.wheel(1.0);
        assert_eq!(render_loop.viewport().view().zoom, 1.0);

        let mut surface = RecordingSurface::new(800.0, 600.0);
        render_loop.tick(1000.0, Some(&mut surface));
        assert!(!render_loop.is_focus_active());

        render_loop.wheel(1.0);
        assert!((render_loop.viewport().view().zoom - 1.9).abs() < 1e-9);
    }

    #[test]
    fn test_empty_program_only_cancels() {
        let (mut render_loop, rx) = with_channel();
        render_loop.submit_focus(Some(FocusProgram::new("empty", Vec::new())), 0.0);
        assert!(!render_loop.is_focus_active());
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn test_click_through_loop() {
        let (mut render_loop, rx) = with_channel();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        render_loop.tick(0.0, Some(&mut surface));

        let click = ScreenPoint::new(401.0, 300.0);
        render_loop.pointer_down(click);
        let picked = render_loop.pointer_up(click);
        assert_eq!(picked.map(|s| s.id), Some(1));
        assert!(rx
            .try_iter()
            .any(|e| matches!(e, SkyEvent::StarClicked(Some(ref star)) if star.id == 1)));
    }
}
