use log::debug;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use url::Url;

use crate::util::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollRestoration {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticEvent {
    DomContentLoaded,
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Avif,
    Webp,
}

/// The hosting window
pub trait Viewport: Send + Sync {
    /// Block scrolling and pointer input
    fn lock_interaction(&self);
    fn unlock_interaction(&self);
    fn blur_focus(&self);

    fn scroll_to(&self, offset: u32);
    fn scroll_position(&self) -> u32;
    fn set_scroll_restoration(&self, mode: ScrollRestoration);
    /// Suspend or resume scroll-driven observers while the position jumps
    fn set_scroll_tracking(&self, enabled: bool);
    fn refresh_scroll_observers(&self);

    fn dispatch_synthetic(&self, event: SyntheticEvent);
    /// Resume media paused by the transition
    fn resume_media(&self);

    fn push_history(&self, url: &Url, title: Option<&str>);
    /// Full browser navigation; the current page is abandoned
    fn hard_navigate(&self, url: &Url);

    fn supports_image_format(&self, format: ImageFormat) -> bool;
}

/// Side effects recorded by [`HeadlessViewport`], in call order
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportCall {
    Lock,
    Unlock,
    BlurFocus,
    ScrollTo(u32),
    ScrollRestoration(ScrollRestoration),
    ScrollTracking(bool),
    RefreshObservers,
    Synthetic(SyntheticEvent),
    ResumeMedia,
    PushHistory(String),
    HardNavigate(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportSnapshot {
    pub locked: bool,
    pub scroll_position: u32,
    pub scroll_restoration: ScrollRestoration,
    pub scroll_tracking: bool,
    pub history: Vec<(String, Option<String>)>,
    pub hard_navigations: Vec<String>,
    pub calls: Vec<ViewportCall>,
}

impl Default for ViewportSnapshot {
    fn default() -> Self {
        Self {
            locked: false,
            scroll_position: 0,
            scroll_restoration: ScrollRestoration::Auto,
            scroll_tracking: true,
            history: Vec::new(),
            hard_navigations: Vec::new(),
            calls: Vec::new(),
        }
    }
}

/// A window without a screen; records everything it is asked to do
#[derive(Debug, Clone, Default)]
pub struct HeadlessViewport {
    state: Arc<Mutex<ViewportSnapshot>>,
    formats: HashSet<ImageFormat>,
}

impl HeadlessViewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_formats(mut self, formats: &[ImageFormat]) -> Self {
        self.formats.extend(formats.iter().copied());
        self
    }

    pub fn snapshot(&self) -> ViewportSnapshot {
        lock(&self.state).clone()
    }

    pub fn calls(&self) -> Vec<ViewportCall> {
        lock(&self.state).calls.clone()
    }

    pub fn hard_navigations(&self) -> Vec<String> {
        lock(&self.state).hard_navigations.clone()
    }

    fn record(&self, call: ViewportCall, apply: impl FnOnce(&mut ViewportSnapshot)) {
        let mut state = lock(&self.state);
        apply(&mut state);
        state.calls.push(call);
    }
}

impl Viewport for HeadlessViewport {
    fn lock_interaction(&self) {
        self.record(ViewportCall::Lock, |s| s.locked = true);
    }

    fn unlock_interaction(&self) {
        self.record(ViewportCall::Unlock, |s| s.locked = false);
    }

    fn blur_focus(&self) {
        self.record(ViewportCall::BlurFocus, |_| {});
    }

    fn scroll_to(&self, offset: u32) {
        self.record(ViewportCall::ScrollTo(offset), |s| s.scroll_position = offset);
    }

    fn scroll_position(&self) -> u32 {
        lock(&self.state).scroll_position
    }

    fn set_scroll_restoration(&self, mode: ScrollRestoration) {
        self.record(ViewportCall::ScrollRestoration(mode), |s| s.scroll_restoration = mode);
    }

    fn set_scroll_tracking(&self, enabled: bool) {
        self.record(ViewportCall::ScrollTracking(enabled), |s| s.scroll_tracking = enabled);
    }

    fn refresh_scroll_observers(&self) {
        self.record(ViewportCall::RefreshObservers, |_| {});
    }

    fn dispatch_synthetic(&self, event: SyntheticEvent) {
        self.record(ViewportCall::Synthetic(event), |_| {});
    }

    fn resume_media(&self) {
        self.record(ViewportCall::ResumeMedia, |_| {});
    }

    fn push_history(&self, url: &Url, title: Option<&str>) {
        debug!("History push: {}", url);
        let entry = (url.to_string(), title.map(str::to_string));
        self.record(ViewportCall::PushHistory(url.to_string()), |s| s.history.push(entry));
    }

    fn hard_navigate(&self, url: &Url) {
        debug!("Hard navigation to {}", url);
        let target = url.to_string();
        self.record(ViewportCall::HardNavigate(url.to_string()), |s| s.hard_navigations.push(target));
    }

    fn supports_image_format(&self, format: ImageFormat) -> bool {
        self.formats.contains(&format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        let viewport = HeadlessViewport::new();
        viewport.lock_interaction();
        viewport.set_scroll_tracking(false);
        viewport.scroll_to(240);
        viewport.set_scroll_tracking(true);
        viewport.unlock_interaction();

        let snapshot = viewport.snapshot();
        assert!(!snapshot.locked);
        assert_eq!(snapshot.scroll_position, 240);
        assert_eq!(
            snapshot.calls,
            vec![
                ViewportCall::Lock,
                ViewportCall::ScrollTracking(false),
                ViewportCall::ScrollTo(240),
                ViewportCall::ScrollTracking(true),
                ViewportCall::Unlock,
            ]
        );
    }

    #[test]
    fn test_clones_share_state() {
        let viewport = HeadlessViewport::new();
        let other = viewport.clone();
        let url = Url::parse("https://example.com/about").unwrap();
        other.push_history(&url, Some("About"));

        assert_eq!(
            viewport.snapshot().history,
            vec![("https://example.com/about".to_string(), Some("About".to_string()))]
        );
    }
}
