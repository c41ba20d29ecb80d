//! Backend interface towards the embedding web renderer and window system.

pub mod null;

pub use null::NullBackend;

use crate::surface::{LoadTicket, SurfaceId};

/// What kind of payload a load request carries. URLs are fetched by the
/// renderer itself; markup is handed over verbatim.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadKind {
    Url,
    Markup,
}

/// A single piece of content to load into a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    kind: PayloadKind,
    payload: String,
}

impl LoadRequest {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            kind: PayloadKind::Url,
            payload: url.into(),
        }
    }

    pub fn markup(markup: impl Into<String>) -> Self {
        Self {
            kind: PayloadKind::Markup,
            payload: markup.into(),
        }
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Core backend interface. All calls occur on the presentation thread and
/// must not block; the actual page load happens asynchronously and reports
/// back through the [`LoadTicket`].
pub trait DisplayBackend: Send {
    fn name(&self) -> &'static str;

    /// Begin loading `request` into `surface`. The outcome is reported by
    /// completing `ticket`, from whatever thread the loader runs on.
    fn begin_load(&mut self, surface: SurfaceId, request: &LoadRequest, ticket: LoadTicket);

    /// Stop any in-flight load on `surface`.
    fn cancel_load(&mut self, surface: SurfaceId);

    /// Attach `surface`'s visual output to the shared display container,
    /// detaching all other surfaces. Only one surface is visible at a time;
    /// detached surfaces stay warm for reuse.
    fn present(&mut self, surface: SurfaceId);

    /// Bring the display window to the foreground in fullscreen mode, or
    /// hide it.
    fn set_visible(&mut self, visible: bool);
}
