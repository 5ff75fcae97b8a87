use leptos::ev;
use leptos::prelude::*;
use toledoia_widget_core::{CachedMessage, Notice};

use crate::models::{Body, bubble_class, entry_key};
use crate::state::WidgetState;

/// Notice banner, message history and input.
#[component]
pub fn ChatWindow() -> impl IntoView {
    let state = expect_context::<WidgetState>();

    view! {
        <main class="chat-window">
            {move || {
                state.notice.get().map(|notice| {
                    let class = match notice {
                        Notice::Error(_) => "notice error",
                        Notice::Restarting(_) => "notice info",
                    };
                    view! {
                        <div class=class on:click=move |_| state.dismiss_notice()>
                            {notice.text().to_string()}
                        </div>
                    }
                })
            }}

            <div class="messages-container">
                {move || {
                    if state.messages.get().is_empty() {
                        view! {
                            <div class="empty-state">"Envie uma mensagem para começar"</div>
                        }.into_any()
                    } else {
                        view! {
                            <For
                                each=move || state.messages.get()
                                key=entry_key
                                let:entry
                            >
                                <MessageBubble entry=entry />
                            </For>
                        }.into_any()
                    }
                }}
            </div>

            <Show
                when=move || !state.ended.get()
                fallback=|| view! { <div class="ended-state">"Conversa encerrada"</div> }
            >
                <ChatInput />
            </Show>
        </main>
    }
}

#[component]
fn MessageBubble(entry: CachedMessage) -> impl IntoView {
    let class = bubble_class(&entry);
    let body = match Body::of(&entry.message) {
        Body::Text(text) => view! { <div class="text">{text}</div> }.into_any(),
        Body::Image { url, alt } => view! {
            <a href=url.clone() target="_blank" rel="noopener">
                <img class="attachment-image" src=url.clone() alt=alt />
            </a>
        }.into_any(),
        Body::File { url: Some(url), name } => view! {
            <a class="attachment-file" href=url target="_blank" rel="noopener">{name}</a>
        }.into_any(),
        Body::File { url: None, name } => view! {
            <span class="attachment-file">{name}</span>
        }.into_any(),
    };

    view! { <div class=class>{body}</div> }
}

/// Text box, send button and file picker.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<WidgetState>();
    let (input, set_input) = signal(String::new());
    let allow_upload = state.widget().allow_file_upload;

    let send = move || {
        let text = input.get().trim().to_string();
        if text.is_empty() || state.sending.get() {
            return;
        }
        set_input.set(String::new());
        state.send(text);
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    let on_file = move |ev: ev::Event| {
        let input = event_target::<web_sys::HtmlInputElement>(&ev);
        if let Some(file) = input.files().and_then(|files| files.get(0)) {
            state.upload(file);
        }
        input.set_value("");
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <Show when=move || allow_upload>
                    <label class="attach-btn" class:busy=move || state.uploading.get()>
                        "📎"
                        <input
                            type="file"
                            accept="image/*,.pdf,.doc,.docx,.txt"
                            on:change=on_file
                            disabled=move || state.uploading.get()
                        />
                    </label>
                </Show>
                <textarea
                    rows="1"
                    placeholder="Digite sua mensagem…"
                    prop:value=input
                    on:input=move |ev| set_input.set(event_target_value(&ev))
                    on:keydown=on_keydown
                />
                <button
                    class="send-btn"
                    on:click=move |_| send()
                    disabled=move || state.sending.get() || input.get().trim().is_empty()
                >
                    {move || if state.sending.get() { "Enviando…" } else { "Enviar" }}
                </button>
            </div>
        </div>
    }
}
