pub mod backend;
pub mod command;
pub mod config;
pub mod display;
pub mod errors;
pub mod fingerprint;
pub mod pool;
pub mod scheduler;
pub mod surface;
pub mod template;

pub use backend::{DisplayBackend, LoadRequest, NullBackend, PayloadKind};
pub use command::{CommandKind, ContentSpec, DisplayCommand};
pub use config::DisplayConfig;
pub use display::Display;
pub use errors::DisplayError;
pub use fingerprint::Fingerprint;
pub use scheduler::{ScheduledTask, UiScheduler};
pub use surface::{LoadHandle, LoadState, LoadTicket, RenderSurface, SurfaceId};
pub use template::{Severity, Template};
