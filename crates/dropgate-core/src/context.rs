//! Application context shared by UI-side callers.
//!
//! `AppContext` is built once per process or session and handed to whoever
//! needs to raise an alert or know who is signed in. It is cheap to clone.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::Identity;

/// How long an auto-hiding alert stays up.
pub const ALERT_AUTO_DISMISS: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Error,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub show: bool,
    pub message: String,
    pub kind: AlertKind,
}

impl Default for Alert {
    fn default() -> Self {
        Self {
            show: false,
            message: String::new(),
            kind: AlertKind::Success,
        }
    }
}

#[derive(Default)]
struct Inner {
    alert: Mutex<Alert>,
    identity: Mutex<Option<Identity>>,
    dismiss_task: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Clone, Default)]
pub struct AppContext {
    inner: Arc<Inner>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("alert", &self.alert())
            .field("identity", &self.current_identity())
            .finish()
    }
}

impl AppContext {
    pub fn new(identity: Option<Identity>) -> Self {
        let ctx = Self::default();
        ctx.set_identity(identity);
        ctx
    }

    pub fn show_alert(&self, message: impl Into<String>, kind: AlertKind) {
        let message = message.into();
        debug!(kind = ?kind, message = %message, "Alert shown");
        *lock(&self.inner.alert) = Alert {
            show: true,
            message,
            kind,
        };
    }

    /// Hide the alert, keeping its last message and kind.
    pub fn dismiss_alert(&self) {
        lock(&self.inner.alert).show = false;
    }

    /// Show an alert and hide it after [`ALERT_AUTO_DISMISS`]. A newer call
    /// cancels the pending hide of an older one.
    ///
    /// Outside a Tokio runtime the alert is shown but not auto-hidden.
    pub fn show_and_hide_alert(&self, message: impl Into<String>, kind: AlertKind) {
        let mut pending = lock(&self.inner.dismiss_task);
        if let Some(task) = pending.take() {
            task.abort();
        }

        self.show_alert(message, kind);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, alert will not auto-dismiss");
            return;
        };
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(ALERT_AUTO_DISMISS).await;
            if let Some(inner) = weak.upgrade() {
                lock(&inner.alert).show = false;
            }
        }));
    }

    pub fn alert(&self) -> Alert {
        lock(&self.inner.alert).clone()
    }

    /// Identity known to this session, if any. Never fetched implicitly.
    pub fn current_identity(&self) -> Option<Identity> {
        lock(&self.inner.identity).clone()
    }

    pub fn set_identity(&self, identity: Option<Identity>) {
        *lock(&self.inner.identity) = identity;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
