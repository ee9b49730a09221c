// src/controller.rs
use std::sync::Arc;

use log::{debug, error, warn};
use tokio::runtime::Handle;

use crate::measurement::{FLAG_BUTTON_CLASS, ID_ATTRIBUTE};
use crate::page::{ClickEvent, ClickListener, Page};
use crate::{FlagApi, ToggleError};

const LISTENER_PREFIX: &str = "measurement-flags:toggle";

/// Reloads the page so the new flag state renders.
pub trait Reload: Send + Sync {
    fn reload(&self);
}

impl<F> Reload for F
where
    F: Fn() + Send + Sync,
{
    fn reload(&self) {
        self()
    }
}

struct LogReload;

impl Reload for LogReload {
    fn reload(&self) {
        warn!("Page reload requested but no reload handler is installed");
    }
}

/// Receives the outcome of every click once it settles.
pub trait Diagnostics: Send + Sync {
    fn settled(&self, id: Option<&str>, outcome: &Outcome);
}

/// Writes outcomes to the `log` facade. Only failures are logged as errors.
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn settled(&self, id: Option<&str>, outcome: &Outcome) {
        let id = id.unwrap_or("<none>");
        match outcome {
            Outcome::Reloaded => debug!("Flag toggled for measurement {}, reloading", id),
            Outcome::Declined => debug!("Flag toggle for measurement {} was not applied", id),
            Outcome::MissingId => warn!("Flag button has no {} attribute", ID_ATTRIBUTE),
            Outcome::Failed(e @ ToggleError::ApiError { .. }) => {
                error!("Failed to toggle flag for measurement {}: {}", id, e)
            }
            Outcome::Failed(e @ ToggleError::RuntimeError(_)) => {
                error!("Cannot toggle flag for measurement {}: {}", id, e)
            }
            Outcome::Failed(e) => error!("Error calling flag API for measurement {}: {}", id, e),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// The server applied the toggle and the page was reloaded.
    Reloaded,
    /// The server answered with `success: false`.
    Declined,
    /// The clicked button had no id, so nothing was sent.
    MissingId,
    Failed(ToggleError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn error(&self) -> Option<&ToggleError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

struct Inner {
    api: Arc<dyn FlagApi>,
    reload: Arc<dyn Reload>,
    diagnostics: Arc<dyn Diagnostics>,
}

/// Binds flag buttons to the toggle endpoint. Each click runs as its own task;
/// clicks are never queued, merged or cancelled.
#[derive(Clone)]
pub struct FlagToggleController {
    inner: Arc<Inner>,
}

impl FlagToggleController {
    pub fn builder<A>(api: A) -> ControllerBuilder
    where
        A: FlagApi + 'static,
    {
        ControllerBuilder::new(Arc::new(api))
    }

    /// Attaches a click listener to every flag button under `root` and returns
    /// how many were newly attached. Buttons bound earlier are skipped.
    pub fn bind(&self, root: &dyn Page) -> usize {
        let key = self.listener_key();
        let mut attached = 0;
        for button in root.query_class(FLAG_BUTTON_CLASS) {
            let controller = self.clone();
            let listener: ClickListener =
                Arc::new(move |event: &ClickEvent| controller.on_click(event));
            if button.add_click_listener(&key, listener) {
                attached += 1;
            }
        }
        debug!("Bound {} flag buttons", attached);
        attached
    }

    // Clones share a key; separately built controllers each get their own
    fn listener_key(&self) -> String {
        format!("{}:{:p}", LISTENER_PREFIX, Arc::as_ptr(&self.inner))
    }

    fn on_click(&self, event: &ClickEvent) {
        event.prevent_default();

        let id = match event.target().attribute(ID_ATTRIBUTE) {
            Some(id) => id.to_string(),
            None => {
                self.settle(None, Outcome::MissingId);
                return;
            }
        };

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                let outcome = Outcome::Failed(ToggleError::RuntimeError(e.to_string()));
                self.settle(Some(&id), outcome);
                return;
            }
        };

        let controller = self.clone();
        handle.spawn(async move {
            controller.toggle(&id).await;
        });
    }

    /// Toggles the flag on measurement `id`, reloading on success. Failures
    /// are reported to the diagnostics sink and never returned as errors.
    pub async fn toggle(&self, id: &str) -> Outcome {
        let outcome = match self.inner.api.toggle(id).await {
            Ok(response) if response.success => {
                self.inner.reload.reload();
                Outcome::Reloaded
            }
            Ok(_) => Outcome::Declined,
            Err(e) => Outcome::Failed(e),
        };
        self.settle(Some(id), outcome)
    }

    fn settle(&self, id: Option<&str>, outcome: Outcome) -> Outcome {
        self.inner.diagnostics.settled(id, &outcome);
        outcome
    }
}

pub struct ControllerBuilder {
    api: Arc<dyn FlagApi>,
    reload: Arc<dyn Reload>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl ControllerBuilder {
    fn new(api: Arc<dyn FlagApi>) -> Self {
        Self {
            api,
            reload: Arc::new(LogReload),
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    pub fn with_reload<R>(mut self, reload: R) -> Self
    where
        R: Reload + 'static,
    {
        self.reload = Arc::new(reload);
        self
    }

    pub fn with_diagnostics<D>(mut self, diagnostics: D) -> Self
    where
        D: Diagnostics + 'static,
    {
        self.diagnostics = Arc::new(diagnostics);
        self
    }

    pub fn build(self) -> FlagToggleController {
        FlagToggleController {
            inner: Arc::new(Inner {
                api: self.api,
                reload: self.reload,
                diagnostics: self.diagnostics,
            }),
        }
    }
}
