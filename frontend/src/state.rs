use std::sync::Arc;
use std::time::Duration;

use gloo_timers::callback::{Interval, Timeout};
use leptos::prelude::*;
use leptos::task::spawn_local;
use toledoia_widget_core::{
    CachedMessage, Delivery, FileUpload, Notice, Operation, Refresh, WidgetController,
    WidgetError, WidgetIdentity,
};
use wasm_bindgen_futures::JsFuture;

use crate::api::HttpBackend;

pub type Controller = WidgetController<HttpBackend>;

/// Reactive view of the widget controller, provided via Leptos context.
#[derive(Clone, Copy)]
pub struct WidgetState {
    controller: StoredValue<Arc<Controller>>,

    // --- Read signals (for components to subscribe to) ---
    pub messages: ReadSignal<Vec<CachedMessage>>,
    pub notice: ReadSignal<Option<Notice>>,
    pub sending: ReadSignal<bool>,
    pub uploading: ReadSignal<bool>,
    pub ended: ReadSignal<bool>,

    // --- Write signals ---
    set_messages: WriteSignal<Vec<CachedMessage>>,
    set_notice: WriteSignal<Option<Notice>>,
    set_sending: WriteSignal<bool>,
    set_uploading: WriteSignal<bool>,
    set_ended: WriteSignal<bool>,
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

impl WidgetState {
    /// Wrap `controller` and provide the state in the current Leptos context.
    pub fn provide(controller: Arc<Controller>) -> Self {
        let (messages, set_messages) = signal(controller.messages());
        let (notice, set_notice) = signal(None::<Notice>);
        let (sending, set_sending) = signal(false);
        let (uploading, set_uploading) = signal(false);
        let (ended, set_ended) = signal(false);

        let state = Self {
            controller: StoredValue::new(controller),
            messages,
            notice,
            sending,
            uploading,
            ended,
            set_messages,
            set_notice,
            set_sending,
            set_uploading,
            set_ended,
        };

        provide_context(state);
        state
    }

    fn controller(&self) -> Arc<Controller> {
        self.controller.get_value()
    }

    pub fn widget(&self) -> WidgetIdentity {
        self.controller.with_value(|c| c.widget().clone())
    }

    pub fn dismiss_notice(&self) {
        self.set_notice.set(None);
    }

    /// Copy the controller's message list and busy flags into the signals.
    fn sync(&self) {
        let controller = self.controller();
        self.set_messages.set(controller.messages());
        self.set_sending.set(controller.is_busy(Operation::Send));
        self.set_uploading.set(controller.is_busy(Operation::Upload));
    }

    fn report(&self, e: &WidgetError) {
        if e.is_validation() {
            log::warn!("{e}");
        } else {
            log::error!("{e}");
        }
        self.set_notice.set(Some(e.notice()));
    }

    fn delivered(&self, result: Result<Delivery, WidgetError>) {
        match result {
            Ok(delivery) => {
                if let Some(notice) = delivery.notice() {
                    self.set_notice.set(Some(notice));
                }
                self.schedule_resync();
            }
            Err(e) => self.report(&e),
        }
        self.sync();
    }

    /// Open or adopt the visitor's session and load its history.
    pub fn start(&self) {
        let state = *self;
        self.set_ended.set(false);
        self.set_notice.set(None);
        spawn_local(async move {
            match state.controller().start().await {
                Ok(session) => log::info!("Widget session {} ready", session.id),
                Err(e) => state.report(&e),
            }
            state.sync();
        });
    }

    pub fn send(&self, text: String) {
        let state = *self;
        self.set_notice.set(None);
        self.set_sending.set(true);
        spawn_local(async move {
            let controller = state.controller();
            if let Err(e) = controller.ensure_session().await {
                state.report(&e);
                state.sync();
                return;
            }
            let pending = controller.send_text(&text);
            // Runs once the send is parked on the network, showing its preview.
            spawn_local(async move { state.sync() });
            state.delivered(pending.await);
        });
    }

    pub fn upload(&self, file: web_sys::File) {
        let state = *self;
        self.set_notice.set(None);
        self.set_uploading.set(true);
        spawn_local(async move {
            let upload = match read_file(&file).await {
                Ok(upload) => upload,
                Err(e) => {
                    log::error!("Failed to read {}: {e:?}", file.name());
                    state.set_notice.set(Some(Notice::Error("Não foi possível ler o arquivo.".to_string())));
                    state.sync();
                    return;
                }
            };
            let controller = state.controller();
            if let Err(e) = controller.ensure_session().await {
                state.report(&e);
                state.sync();
                return;
            }
            let pending = controller.upload_file(upload);
            spawn_local(async move { state.sync() });
            state.delivered(pending.await);
        });
    }

    pub fn end(&self) {
        let state = *self;
        spawn_local(async move {
            match state.controller().end_session().await {
                Ok(()) => {
                    state.set_ended.set(true);
                    state.set_notice.set(None);
                }
                Err(e) => state.report(&e),
            }
            state.sync();
        });
    }

    /// Re-read the message list from the server.
    pub fn refresh(&self) {
        let state = *self;
        spawn_local(async move {
            match state.controller().refresh_messages().await {
                Ok(Refresh::SessionRestarted(session)) => {
                    log::info!("Session expired; continuing in {}", session.id);
                    state.set_notice.set(Some(Notice::restarting()));
                }
                Ok(_) => {}
                Err(e) => log::warn!("Message refresh failed: {e}"),
            }
            state.sync();
        });
    }

    fn schedule_resync(&self) {
        let state = *self;
        let delay = self.controller.with_value(|c| millis(c.config().resync_delay));
        Timeout::new(delay, move || state.refresh()).forget();
    }

    /// Poll the message list for the lifetime of the page.
    pub fn start_polling(&self) {
        let state = *self;
        let period = self.controller.with_value(|c| millis(c.config().poll_interval));
        Interval::new(period, move || {
            if !state.ended.get_untracked() {
                state.refresh();
            }
        })
        .forget();
    }
}

async fn read_file(file: &web_sys::File) -> Result<FileUpload, wasm_bindgen::JsValue> {
    let buffer = JsFuture::from(file.array_buffer()).await?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    let mime_type = file.type_();
    let preview_url = if mime_type.starts_with("image/") {
        web_sys::Url::create_object_url_with_blob(file).ok()
    } else {
        None
    };
    Ok(FileUpload { file_name: file.name(), mime_type, bytes, preview_url })
}
