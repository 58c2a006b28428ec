//! Seams to the hosting browser window
//!
//! The engine never touches a real window. Scroll, focus, history and hard
//! navigation go through [`Viewport`], page markup through [`PageFetcher`],
//! and visual effects through [`TransitionEffects`].

pub mod effects;
pub mod fetch;
pub mod viewport;

pub use effects::{TimedEffects, TransitionEffects};
pub use fetch::{HttpPageFetcher, PageFetcher, StaticFetcher};
pub use viewport::{
    HeadlessViewport, ImageFormat, ScrollRestoration, SyntheticEvent, Viewport, ViewportCall, ViewportSnapshot,
};

/// Accept header value advertising the image formats the viewport decodes
pub fn capability_header(viewport: &dyn Viewport) -> String {
    let mut parts = vec!["text/html", "application/xhtml+xml"];
    if viewport.supports_image_format(ImageFormat::Avif) {
        parts.push("image/avif");
    }
    if viewport.supports_image_format(ImageFormat::Webp) {
        parts.push("image/webp");
    }
    parts.push("*/*;q=0.8");
    parts.join(",")
}
