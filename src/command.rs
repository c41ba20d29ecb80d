//! Decoded display commands as delivered by the remote binding.
//!
//! The transport exposes a point-to-point and a broadcast address per display
//! instance; by the time a command reaches this crate that distinction is
//! gone and the payload is identical either way.

use std::collections::HashMap;

use crate::template::{Severity, Template};

/// Whether a command brings the content to the foreground or only prepares
/// it in the background.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Load and present, making the window visible if it is hidden.
    Show,
    /// Load into the background without touching visibility ("prefetch").
    Set,
}

/// The content payload of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSpec {
    Url(String),
    Html(String),
    Text {
        message: String,
        severity: Severity,
    },
    Image(String),
    Template {
        template: Template,
        variables: HashMap<String, String>,
    },
}

/// One decoded request against the display. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCommand {
    pub kind: CommandKind,
    pub content: ContentSpec,
    /// Force a reload even if the identical payload is already loaded.
    pub force_reload: bool,
}
