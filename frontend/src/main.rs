mod api;
mod components;
mod models;
mod state;
mod storage;

use std::sync::Arc;

use leptos::mount::mount_to_body;
use leptos::prelude::*;
use leptos::task::spawn_local;
use toledoia_widget_core::{ClientConfig, VisitorStore, WidgetDirectory, resolve_visitor_id};

use api::HttpBackend;
use components::chat::ChatWindow;
use components::header::WidgetHeader;
use state::{Controller, WidgetState};
use storage::LocalVisitorStore;

/// Parameters the embedding page passes in the iframe URL.
struct Embed {
    api_key: String,
    config: ClientConfig,
}

impl Embed {
    /// `?key=<api key>&api=<origin>&lang=<tag>&ref=<page url>`
    fn from_location() -> Option<Self> {
        let window = web_sys::window()?;
        let location = window.location();
        let params = web_sys::UrlSearchParams::new_with_str(&location.search().ok()?).ok()?;

        let api_base = params
            .get("api")
            .or_else(|| location.origin().ok())
            .unwrap_or_default();
        let language = params
            .get("lang")
            .or_else(|| window.navigator().language())
            .unwrap_or_default();
        let referrer = params
            .get("ref")
            .or_else(|| window.document().map(|d| d.referrer()));

        Some(Self {
            api_key: params.get("key")?,
            config: ClientConfig::default()
                .with_api_base(api_base)
                .with_language(language)
                .with_referrer(referrer),
        })
    }
}

#[derive(Clone)]
enum Boot {
    Loading,
    Ready(Arc<Controller>),
    Failed(String),
}

/// Root component: resolves the widget, then renders the chat.
#[component]
fn App() -> impl IntoView {
    let (boot, set_boot) = signal(Boot::Loading);

    spawn_local(async move {
        let Some(embed) = Embed::from_location() else {
            set_boot.set(Boot::Failed("Chave do widget ausente".to_string()));
            return;
        };
        let store = LocalVisitorStore::open();
        let visitor_id = resolve_visitor_id(store.as_ref().map(|s| s as &dyn VisitorStore));
        let backend = Arc::new(HttpBackend::new(&embed.config.api_base));

        let directory = WidgetDirectory::new();
        match Controller::connect(backend, &directory, &embed.api_key, visitor_id, embed.config).await {
            Ok(controller) => set_boot.set(Boot::Ready(Arc::new(controller))),
            Err(e) => {
                log::error!("Failed to load widget: {e}");
                set_boot.set(Boot::Failed(e.to_string()));
            }
        }
    });

    view! {
        <div class="widget-container">
            {move || match boot.get() {
                Boot::Loading => view! { <div class="loading">"Carregando…"</div> }.into_any(),
                Boot::Failed(reason) => view! {
                    <div class="unavailable">"Chat indisponível: " {reason}</div>
                }.into_any(),
                Boot::Ready(controller) => view! { <Widget controller=controller /> }.into_any(),
            }}
        </div>
    }
}

#[component]
fn Widget(controller: Arc<Controller>) -> impl IntoView {
    let state = WidgetState::provide(controller);
    state.start();
    state.start_polling();

    view! {
        <WidgetHeader />
        <ChatWindow />
    }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
