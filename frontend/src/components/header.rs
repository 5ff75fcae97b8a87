use leptos::prelude::*;

use crate::state::WidgetState;

/// Widget name, greeting and the end-conversation control.
#[component]
pub fn WidgetHeader() -> impl IntoView {
    let state = expect_context::<WidgetState>();
    let widget = state.widget();
    let style = widget
        .theme_color
        .map(|color| format!("background-color: {color}"))
        .unwrap_or_default();

    view! {
        <header class="widget-header" style=style>
            <div class="widget-title">{widget.name}</div>
            {widget.greeting.map(|greeting| view! { <div class="widget-greeting">{greeting}</div> })}
            <Show
                when=move || !state.ended.get()
                fallback=move || view! {
                    <button class="restart-btn" on:click=move |_| state.start()>
                        "Nova conversa"
                    </button>
                }
            >
                <button class="end-btn" on:click=move |_| state.end()>
                    "Encerrar"
                </button>
            </Show>
        </header>
    }
}
