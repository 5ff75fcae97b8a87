use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use log::{debug, warn};

use crate::backend::WidgetBackend;
use crate::error::WidgetError;
use crate::models::WidgetIdentity;

/// Widget identities resolved so far, keyed by API key. Lives as long as the page.
#[derive(Default)]
pub struct WidgetDirectory {
    resolved: Mutex<HashMap<String, WidgetIdentity>>,
}

impl WidgetDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, api_key: &str) -> Option<WidgetIdentity> {
        let resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        resolved.get(api_key).cloned()
    }

    /// Resolves `api_key` to its widget, hitting the backend only on the first call.
    ///
    /// Unknown and inactive widgets are reported as unavailable and are not cached.
    pub async fn resolve<B: WidgetBackend + ?Sized>(
        &self,
        backend: &B,
        api_key: &str,
    ) -> Result<WidgetIdentity, WidgetError> {
        if api_key.trim().is_empty() {
            return Err(WidgetError::validation("api_key", "must not be empty"));
        }
        if let Some(widget) = self.cached(api_key) {
            return Ok(widget);
        }

        let widget = match backend.fetch_widget(api_key).await {
            Ok(widget) => widget,
            Err(e) if e.is_not_found() => {
                warn!("Widget key {api_key} not found");
                return Err(WidgetError::WidgetUnavailable { key: api_key.to_string() });
            }
            Err(e) => return Err(e.into()),
        };

        if !widget.is_active {
            warn!("Widget {} is inactive", widget.id);
            return Err(WidgetError::WidgetUnavailable { key: api_key.to_string() });
        }

        debug!("Resolved widget {} for key {api_key}", widget.id);
        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        resolved.insert(api_key.to_string(), widget.clone());
        Ok(widget)
    }
}
