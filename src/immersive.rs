// immersive.rs - entering and leaving the stereo presentation session
//
// While a session is active the windowed mirror (the 2D overlay) is hidden.
// Leaving the session restores it and asks for one fresh windowed frame.

use std::time::Duration;

/// Whatever is drawn on top of the window outside a session.
pub trait MirrorSurface {
    fn is_visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Windowed,
    Immersive,
}

/// What the host does after the rendering context was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPlan {
    pub exit_session: bool,
    /// Delay before rebuilding the renderer and re-activating the last media.
    pub reload_after: Duration,
}

pub const DEFAULT_EXIT_RELOAD_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug)]
pub struct ImmersiveSessionTracker {
    state: SessionState,
    saved_visibility: Option<bool>,
    redraw_pending: bool,
    exit_reload_delay: Duration,
}

impl Default for ImmersiveSessionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_EXIT_RELOAD_DELAY)
    }
}

impl ImmersiveSessionTracker {
    pub fn new(exit_reload_delay: Duration) -> Self {
        Self {
            state: SessionState::Windowed,
            saved_visibility: None,
            redraw_pending: false,
            exit_reload_delay,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_presenting(&self) -> bool {
        self.state == SessionState::Immersive
    }

    pub fn session_started(&mut self, mirror: &mut dyn MirrorSurface) {
        self.update(SessionState::Immersive, mirror);
    }

    pub fn session_ended(&mut self, mirror: &mut dyn MirrorSurface) {
        self.update(SessionState::Windowed, mirror);
    }

    fn update(&mut self, next: SessionState, mirror: &mut dyn MirrorSurface) {
        if next == self.state {
            // repeated event: re-apply, never re-save
            match next {
                SessionState::Immersive => mirror.set_visible(false),
                SessionState::Windowed => {
                    mirror.set_visible(self.saved_visibility.unwrap_or(true))
                }
            }
            return;
        }

        match next {
            SessionState::Immersive => {
                if self.saved_visibility.is_none() {
                    self.saved_visibility = Some(mirror.is_visible());
                }
                mirror.set_visible(false);
                log::info!("stereo session started");
            }
            SessionState::Windowed => {
                let restore = self.saved_visibility.take().unwrap_or(true);
                mirror.set_visible(restore);
                self.redraw_pending = true;
                log::info!("stereo session ended");
            }
        }
        self.state = next;
    }

    /// Yields the post-exit redraw exactly once. A session started again in
    /// the meantime swallows it.
    pub fn take_redraw(&mut self, presenting: bool) -> bool {
        if !self.redraw_pending {
            return false;
        }
        self.redraw_pending = false;
        !presenting
    }

    pub fn context_lost(&self, presenting: bool) -> RecoveryPlan {
        let reload_after = if presenting {
            self.exit_reload_delay
        } else {
            Duration::ZERO
        };
        log::warn!(
            "rendering context lost, rebuilding in {} ms",
            reload_after.as_millis()
        );
        RecoveryPlan {
            exit_session: presenting,
            reload_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Overlay {
        visible: bool,
        writes: usize,
    }

    impl MirrorSurface for Overlay {
        fn is_visible(&self) -> bool {
            self.visible
        }
        fn set_visible(&mut self, visible: bool) {
            self.visible = visible;
            self.writes += 1;
        }
    }

    #[test]
    fn hides_and_restores_the_mirror() {
        let mut overlay = Overlay { visible: true, writes: 0 };
        let mut tracker = ImmersiveSessionTracker::default();

        tracker.session_started(&mut overlay);
        assert!(!overlay.visible);
        assert!(tracker.is_presenting());

        tracker.session_ended(&mut overlay);
        assert!(overlay.visible);
        assert_eq!(tracker.state(), SessionState::Windowed);
    }

    #[test]
    fn previously_hidden_mirror_stays_hidden() {
        let mut overlay = Overlay { visible: false, writes: 0 };
        let mut tracker = ImmersiveSessionTracker::default();
        tracker.session_started(&mut overlay);
        tracker.session_ended(&mut overlay);
        assert!(!overlay.visible);
    }

    #[test]
    fn repeated_start_does_not_overwrite_saved_visibility() {
        let mut overlay = Overlay { visible: true, writes: 0 };
        let mut tracker = ImmersiveSessionTracker::default();
        tracker.session_started(&mut overlay);
        tracker.session_started(&mut overlay);
        assert!(!overlay.visible);
        tracker.session_ended(&mut overlay);
        assert!(overlay.visible);
    }

    #[test]
    fn end_without_start_shows_the_mirror() {
        let mut overlay = Overlay { visible: false, writes: 0 };
        let mut tracker = ImmersiveSessionTracker::default();
        tracker.session_ended(&mut overlay);
        assert!(overlay.visible);
        assert_eq!(overlay.writes, 1);
        assert!(!tracker.take_redraw(false));
    }

    #[test]
    fn exit_schedules_a_single_redraw() {
        let mut overlay = Overlay::default();
        let mut tracker = ImmersiveSessionTracker::default();
        tracker.session_started(&mut overlay);
        tracker.session_ended(&mut overlay);
        assert!(tracker.take_redraw(false));
        assert!(!tracker.take_redraw(false));
    }

    #[test]
    fn redraw_is_skipped_while_presenting() {
        let mut overlay = Overlay::default();
        let mut tracker = ImmersiveSessionTracker::default();
        tracker.session_started(&mut overlay);
        tracker.session_ended(&mut overlay);
        assert!(!tracker.take_redraw(true));
        assert!(!tracker.take_redraw(false));
    }

    #[test]
    fn context_loss_plan_depends_on_session() {
        let tracker = ImmersiveSessionTracker::new(Duration::from_millis(150));
        let plan = tracker.context_lost(true);
        assert!(plan.exit_session);
        assert_eq!(plan.reload_after, Duration::from_millis(150));

        let plan = tracker.context_lost(false);
        assert!(!plan.exit_session);
        assert_eq!(plan.reload_after, Duration::ZERO);
    }
}
