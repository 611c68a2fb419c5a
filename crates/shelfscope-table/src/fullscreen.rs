//! Fullscreen presentation mode
//!
//! Fullscreen only changes layout. The derived rows are shared with normal
//! mode and are never recomputed here.

use std::sync::Arc;

/// Suppresses and restores background page scrolling
pub trait ScrollLock: Send + Sync {
    fn suppress(&self);
    fn restore(&self);
}

/// Scroll lock for hosts without a scrollable background
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScrollLock;

impl ScrollLock for NoopScrollLock {
    fn suppress(&self) {}
    fn restore(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Normal,
    Fullscreen,
}

/// Keys the controller reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

pub struct FullscreenController {
    mode: ViewMode,
    scroll_lock: Arc<dyn ScrollLock>,
}

impl std::fmt::Debug for FullscreenController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullscreenController")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Default for FullscreenController {
    fn default() -> Self {
        Self::new(Arc::new(NoopScrollLock))
    }
}

impl FullscreenController {
    pub fn new(scroll_lock: Arc<dyn ScrollLock>) -> Self {
        Self {
            mode: ViewMode::Normal,
            scroll_lock,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_fullscreen(&self) -> bool {
        self.mode == ViewMode::Fullscreen
    }

    pub fn enter(&mut self) {
        if self.is_fullscreen() {
            return;
        }
        self.mode = ViewMode::Fullscreen;
        self.scroll_lock.suppress();
        tracing::debug!("Entered fullscreen");
    }

    /// Leave fullscreen. Scroll is restored unconditionally.
    pub fn exit(&mut self) {
        self.mode = ViewMode::Normal;
        self.scroll_lock.restore();
        tracing::debug!("Exited fullscreen");
    }

    pub fn toggle(&mut self) {
        if self.is_fullscreen() {
            self.exit();
        } else {
            self.enter();
        }
    }

    /// Escape dismisses fullscreen; other keys and normal mode are ignored.
    /// Returns whether the key was consumed.
    pub fn key_pressed(&mut self, key: Key) -> bool {
        if key == Key::Escape && self.is_fullscreen() {
            self.exit();
            return true;
        }
        false
    }

    /// Click on the backdrop outside the fullscreen panel
    pub fn outside_click(&mut self) {
        if self.is_fullscreen() {
            self.exit();
        }
    }
}

impl Drop for FullscreenController {
    fn drop(&mut self) {
        if self.is_fullscreen() {
            self.scroll_lock.restore();
        }
    }
}
