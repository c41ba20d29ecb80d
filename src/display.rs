//! The public command surface of the display: show/set variants, visibility
//! and close-all, each returning a future resolved on the presentation
//! thread.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use url::Url;

use crate::backend::{DisplayBackend, LoadRequest};
use crate::command::{CommandKind, ContentSpec, DisplayCommand};
use crate::config::DisplayConfig;
use crate::errors::DisplayError;
use crate::fingerprint::Fingerprint;
use crate::pool::SurfacePool;
use crate::scheduler::{ScheduledTask, UiScheduler};
use crate::surface::{LoadHandle, LoadTicket, SurfaceId};
use crate::template::{Severity, Template, TemplateEngine};

thread_local! {
    /// All mutable display state, owned by the presentation thread.
    static STATE: RefCell<Option<PresentationState>> = const { RefCell::new(None) };
}

/// Runs `f` against the presentation-thread state. Only callable from tasks
/// executing on the presentation thread. Backend calls never happen in here:
/// state mutation only queues [`BackendAction`]s, which [`flush_actions`]
/// drains once the borrow is released. A backend callback is therefore free
/// to issue further display commands.
fn with_state<R>(
    f: impl FnOnce(&mut PresentationState) -> Result<R, DisplayError>,
) -> Result<R, DisplayError> {
    STATE.with(|cell| match cell.borrow_mut().as_mut() {
        Some(state) => f(state),
        None => Err(DisplayError::NotRunning),
    })
}

/// A backend call recorded while the state was borrowed.
enum BackendAction {
    BeginLoad {
        surface: SurfaceId,
        request: LoadRequest,
        ticket: LoadTicket,
    },
    CancelLoad(SurfaceId),
    Present(SurfaceId),
    SetVisible(bool),
}

/// Drains queued backend actions with the state borrow released. The backend
/// is checked out of the state for the duration of the drain; a nested flush
/// (a command issued from within a backend callback) finds it missing, leaves
/// its own actions queued and returns, and the active drain loop picks them
/// up on its next iteration.
fn flush_actions() {
    let checked_out = with_state(|state| Ok(state.backend.take())).ok().flatten();
    let Some(mut backend) = checked_out else {
        return;
    };
    loop {
        let action = match with_state(|state| Ok(state.actions.pop_front())) {
            Ok(Some(action)) => action,
            _ => break,
        };
        match action {
            BackendAction::BeginLoad {
                surface,
                request,
                ticket,
            } => backend.begin_load(surface, &request, ticket),
            BackendAction::CancelLoad(surface) => backend.cancel_load(surface),
            BackendAction::Present(surface) => backend.present(surface),
            BackendAction::SetVisible(visible) => backend.set_visible(visible),
        }
    }
    let _ = with_state(|state| {
        state.backend = Some(backend);
        Ok(())
    });
}

struct PresentationState {
    pool: SurfacePool,
    /// `None` while a drain loop has the backend checked out.
    backend: Option<Box<dyn DisplayBackend>>,
    actions: VecDeque<BackendAction>,
    visible: bool,
    presented: Option<SurfaceId>,
}

impl PresentationState {
    fn install(
        config: &DisplayConfig,
        backend: Box<dyn DisplayBackend>,
    ) -> Result<(), DisplayError> {
        let state = Self {
            pool: SurfacePool::new(config.tab_amount)?,
            backend: Some(backend),
            actions: VecDeque::new(),
            visible: false,
            presented: None,
        };
        STATE.with(|cell| cell.borrow_mut().replace(state));
        Ok(())
    }

    /// Acquires the surface for `fingerprint` and registers the load,
    /// queueing the backend call unless the content short-circuited.
    fn load_surface(
        &mut self,
        fingerprint: Fingerprint,
        request: &LoadRequest,
        force_reload: bool,
    ) -> Result<(SurfaceId, LoadHandle), DisplayError> {
        let surface = self.pool.acquire(fingerprint)?;
        let id = surface.id();
        let (handle, ticket) = surface.load(request, force_reload);
        if let Some(ticket) = ticket {
            self.actions.push_back(BackendAction::BeginLoad {
                surface: id,
                request: request.clone(),
                ticket,
            });
        }
        Ok((id, handle))
    }

    fn present(&mut self, surface: SurfaceId) {
        if self.presented != Some(surface) {
            self.actions.push_back(BackendAction::Present(surface));
            self.presented = Some(surface);
        }
    }

    fn apply_visibility(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        if visible {
            log::info!("show display");
        } else {
            log::info!("hide display");
        }
        self.actions.push_back(BackendAction::SetVisible(visible));
        self.visible = visible;
    }

    fn close_all(&mut self) {
        self.apply_visibility(false);
        for surface in self.pool.reset_all() {
            self.actions.push_back(BackendAction::CancelLoad(surface));
        }
        self.presented = None;
    }
}

/// Handle to a running display. Cloneable; all clones drive the same
/// presentation thread. Every command returns a future which resolves once
/// the presentation thread has performed (or rejected) it; awaiting content
/// readiness on top of that is up to the caller via [`LoadHandle::wait`].
#[derive(Clone)]
pub struct Display {
    scheduler: Arc<UiScheduler>,
    templates: Arc<TemplateEngine>,
    config: Arc<DisplayConfig>,
}

impl Display {
    /// Spawns the presentation thread and initializes the display with a
    /// blank text view, honoring `config.visible_at_startup`.
    pub fn new(
        config: DisplayConfig,
        backend: Box<dyn DisplayBackend>,
    ) -> Result<Self, DisplayError> {
        let templates = Arc::new(TemplateEngine::new(&config));
        let blank = templates.text_view(" ", Severity::Plain)?;
        let visible = config.visible_at_startup;
        let init_config = config.clone();
        let scheduler = Arc::new(UiScheduler::spawn("presentation", move || {
            PresentationState::install(&init_config, backend)?;
            let result = with_state(|state| {
                let fingerprint = Fingerprint::of(&blank);
                let (id, _) = state.load_surface(fingerprint, &LoadRequest::markup(blank), false)?;
                state.present(id);
                state.apply_visibility(visible);
                Ok(())
            });
            flush_actions();
            result
        })?);

        Ok(Self {
            scheduler,
            templates,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Shows the given URL, bringing the display to the foreground if it is
    /// hidden.
    pub fn show_url(&self, url: &str) -> ScheduledTask<LoadHandle> {
        log::info!("show url: {url}");
        self.display_url(url, true, false)
    }

    pub fn show_url_and_reload(&self, url: &str) -> ScheduledTask<LoadHandle> {
        log::info!("show url and reload: {url}");
        self.display_url(url, true, true)
    }

    pub fn set_url(&self, url: &str) -> ScheduledTask<LoadHandle> {
        log::info!("set url: {url}");
        self.display_url(url, false, false)
    }

    /// Shows the given HTML content, bringing the display to the foreground
    /// if it is hidden.
    pub fn show_html(&self, content: &str) -> ScheduledTask<LoadHandle> {
        log::info!("show html content: {}", to_single_line(content));
        self.dispatch(LoadRequest::markup(content), true, false)
    }

    pub fn show_html_and_reload(&self, content: &str) -> ScheduledTask<LoadHandle> {
        log::info!("show html content and reload: {}", to_single_line(content));
        self.dispatch(LoadRequest::markup(content), true, true)
    }

    pub fn set_html(&self, content: &str) -> ScheduledTask<LoadHandle> {
        log::info!("set html content: {}", to_single_line(content));
        self.dispatch(LoadRequest::markup(content), false, false)
    }

    pub fn show_text(&self, message: &str) -> ScheduledTask<LoadHandle> {
        log::info!("show text: {message}");
        self.display_text(message, Severity::Plain, true, false)
    }

    pub fn show_info_text(&self, message: &str) -> ScheduledTask<LoadHandle> {
        log::info!("show info text: {message}");
        self.display_text(message, Severity::Info, true, false)
    }

    pub fn show_warn_text(&self, message: &str) -> ScheduledTask<LoadHandle> {
        log::info!("show warning text: {message}");
        self.display_text(message, Severity::Warn, true, false)
    }

    pub fn show_error_text(&self, message: &str) -> ScheduledTask<LoadHandle> {
        log::info!("show error text: {message}");
        self.display_text(message, Severity::Error, true, false)
    }

    pub fn set_text(&self, message: &str) -> ScheduledTask<LoadHandle> {
        log::info!("set text: {message}");
        self.display_text(message, Severity::Plain, false, false)
    }

    pub fn set_info_text(&self, message: &str) -> ScheduledTask<LoadHandle> {
        log::info!("set info text: {message}");
        self.display_text(message, Severity::Info, false, false)
    }

    pub fn set_warn_text(&self, message: &str) -> ScheduledTask<LoadHandle> {
        log::info!("set warning text: {message}");
        self.display_text(message, Severity::Warn, false, false)
    }

    pub fn set_error_text(&self, message: &str) -> ScheduledTask<LoadHandle> {
        log::info!("set error text: {message}");
        self.display_text(message, Severity::Error, false, false)
    }

    /// Shows the given image centered on the display.
    pub fn show_image(&self, image_url: &str) -> ScheduledTask<LoadHandle> {
        log::info!("show image: {image_url}");
        self.display_image(image_url, true, false)
    }

    pub fn set_image(&self, image_url: &str) -> ScheduledTask<LoadHandle> {
        log::info!("set image: {image_url}");
        self.display_image(image_url, false, false)
    }

    pub fn show_template(
        &self,
        template: Template,
        variables: &HashMap<String, String>,
    ) -> ScheduledTask<LoadHandle> {
        log::info!("show template: {template:?}");
        self.display_template(template, variables, true, false)
    }

    pub fn set_template(
        &self,
        template: Template,
        variables: &HashMap<String, String>,
    ) -> ScheduledTask<LoadHandle> {
        log::info!("set template: {template:?}");
        self.display_template(template, variables, false, false)
    }

    /// Brings the display to the foreground in fullscreen mode, or hides the
    /// whole window.
    pub fn set_visible(&self, visible: bool) -> ScheduledTask<()> {
        self.submit_command(move |state| {
            state.apply_visibility(visible);
            Ok(())
        })
    }

    /// Hides the window, cancels all in-flight loads and resets every pooled
    /// surface to empty. Surfaces themselves stay alive for reuse.
    pub fn close_all(&self) -> ScheduledTask<()> {
        log::info!("close all");
        self.submit_command(|state| {
            state.close_all();
            Ok(())
        })
    }

    /// Executes a decoded remote command.
    pub fn execute(&self, command: DisplayCommand) -> ScheduledTask<LoadHandle> {
        let show = command.kind == CommandKind::Show;
        let reload = command.force_reload;
        match command.content {
            ContentSpec::Url(url) => {
                log::info!("{} url: {url}", command.kind.verb());
                self.display_url(&url, show, reload)
            }
            ContentSpec::Html(html) => {
                log::info!("{} html content: {}", command.kind.verb(), to_single_line(&html));
                self.dispatch(LoadRequest::markup(html), show, reload)
            }
            ContentSpec::Text { message, severity } => {
                log::info!("{} text: {message}", command.kind.verb());
                self.display_text(&message, severity, show, reload)
            }
            ContentSpec::Image(image) => {
                log::info!("{} image: {image}", command.kind.verb());
                self.display_image(&image, show, reload)
            }
            ContentSpec::Template {
                template,
                variables,
            } => {
                log::info!("{} template: {template:?}", command.kind.verb());
                self.display_template(template, &variables, show, reload)
            }
        }
    }

    /// Tears down all surfaces and their profile directories. Further
    /// commands fail with [`DisplayError::NotRunning`].
    pub fn shutdown(&self) -> ScheduledTask<()> {
        log::info!("shut down display");
        self.scheduler.submit(|| {
            with_state(|state| {
                state.apply_visibility(false);
                Ok(())
            })?;
            flush_actions();
            STATE.with(|cell| match cell.borrow_mut().take() {
                Some(state) => {
                    state.pool.shutdown();
                    Ok(())
                }
                None => Err(DisplayError::NotRunning),
            })
        })
    }

    fn display_url(&self, url: &str, show: bool, reload: bool) -> ScheduledTask<LoadHandle> {
        if let Err(e) = Url::parse(url) {
            return ScheduledTask::ready(Err(DisplayError::InvalidPayload(format!(
                "cannot parse url {url:?}: {e}"
            ))));
        }
        self.dispatch(LoadRequest::url(url), show, reload)
    }

    fn display_text(
        &self,
        message: &str,
        severity: Severity,
        show: bool,
        reload: bool,
    ) -> ScheduledTask<LoadHandle> {
        match self.templates.text_view(message, severity) {
            Ok(markup) => self.dispatch(LoadRequest::markup(markup), show, reload),
            Err(e) => ScheduledTask::ready(Err(e)),
        }
    }

    fn display_image(&self, image_url: &str, show: bool, reload: bool) -> ScheduledTask<LoadHandle> {
        match self.templates.image_view(image_url) {
            Ok(markup) => self.dispatch(LoadRequest::markup(markup), show, reload),
            Err(e) => ScheduledTask::ready(Err(e)),
        }
    }

    fn display_template(
        &self,
        template: Template,
        variables: &HashMap<String, String>,
        show: bool,
        reload: bool,
    ) -> ScheduledTask<LoadHandle> {
        match self.templates.render(template, variables) {
            Ok(markup) => self.dispatch(LoadRequest::markup(markup), show, reload),
            Err(e) => ScheduledTask::ready(Err(e)),
        }
    }

    /// Schedules the acquire + load (+ present + visibility) sequence as one
    /// atomic presentation-thread task.
    fn dispatch(&self, request: LoadRequest, show: bool, reload: bool) -> ScheduledTask<LoadHandle> {
        let fingerprint = Fingerprint::of(request.payload());
        self.submit_command(move |state| {
            let (id, handle) = state.load_surface(fingerprint, &request, reload)?;
            if show {
                state.present(id);
                state.apply_visibility(true);
            }
            Ok(handle)
        })
    }

    /// Runs `f` against the state on the presentation thread, then flushes
    /// the backend actions it queued.
    fn submit_command<T, F>(&self, f: F) -> ScheduledTask<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PresentationState) -> Result<T, DisplayError> + Send + 'static,
    {
        self.scheduler.submit(move || {
            let result = with_state(f);
            flush_actions();
            result
        })
    }
}

impl CommandKind {
    fn verb(&self) -> &'static str {
        match self {
            CommandKind::Show => "show",
            CommandKind::Set => "set",
        }
    }
}

fn to_single_line(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
