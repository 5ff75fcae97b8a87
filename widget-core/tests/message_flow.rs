mod support;

use std::sync::Arc;

use support::{FakeBackend, controller, image};
use toledoia_widget_core::{
    ApiError, Delivery, FileUpload, MessageKey, MessageType, Notice, Operation, Refresh,
    WidgetController, WidgetError,
};

#[tokio::test]
async fn successful_send_leaves_one_entry_per_message() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);

    let delivery = ctrl.send_text("  Preciso de ajuda  ").await.unwrap();

    let Delivery::Confirmed { user_message, ai_message } = delivery else {
        panic!("send was not confirmed");
    };
    assert_eq!(user_message.content.as_deref(), Some("Preciso de ajuda"));

    let messages = ctrl.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| !m.is_pending()));
    assert_eq!(messages[0].key, MessageKey::Confirmed(user_message.id));
    assert_eq!(messages[1].key, MessageKey::Confirmed(ai_message.unwrap().id));
    assert!(!ctrl.is_busy(Operation::Send));
}

#[tokio::test]
async fn sequential_sends_keep_send_order() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);

    for text in ["um", "dois", "três"] {
        ctrl.send_text(text).await.unwrap();
    }

    let visitor_texts: Vec<String> = ctrl
        .messages()
        .into_iter()
        .filter(|m| m.message.is_user)
        .filter_map(|m| m.message.content)
        .collect();
    assert_eq!(visitor_texts, ["um", "dois", "três"]);
    assert_eq!(ctrl.messages().len(), 6);
}

#[tokio::test]
async fn concurrent_sends_reconcile_without_leftovers() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);
    ctrl.ensure_session().await.unwrap();

    let (a, b) = tokio::join!(ctrl.send_text("primeira"), ctrl.send_text("segunda"));
    a.unwrap();
    b.unwrap();

    let messages = ctrl.messages();
    assert_eq!(messages.iter().filter(|m| m.is_pending()).count(), 0);
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].message.content.as_deref(), Some("primeira"));
}

#[tokio::test]
async fn empty_text_is_rejected_before_network() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);

    let err = ctrl.send_text("   ").await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(backend.calls().find_active, 0);
    assert_eq!(backend.calls().send, 0);
}

#[tokio::test]
async fn transport_failure_rolls_back_preview() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);
    ctrl.ensure_session().await.unwrap();
    backend.fail_next_send(ApiError::Network("offline".into()));

    let err = ctrl.send_text("olá").await.unwrap_err();

    assert!(ctrl.messages().is_empty());
    assert_eq!(err.notice(), Notice::Error("Network error: offline".into()));
    assert!(ctrl.current_session().is_some());
}

#[tokio::test]
async fn image_without_server_url_keeps_local_preview() {
    let backend = Arc::new(FakeBackend::new());
    backend.omit_upload_url();
    let ctrl = controller(&backend);
    let upload = image("foto.png");
    let preview = upload.preview_url.clone();

    let delivery = ctrl.upload_file(upload).await.unwrap();

    let Delivery::Confirmed { user_message, .. } = delivery else {
        panic!("upload was not confirmed");
    };
    assert_eq!(user_message.message_type, MessageType::Image);
    assert_eq!(user_message.file_url, preview);
    assert_eq!(ctrl.messages()[0].message.file_url, preview);
}

#[tokio::test]
async fn image_with_server_url_drops_local_preview() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);

    ctrl.upload_file(image("foto.png")).await.unwrap();

    let messages = ctrl.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].message.file_url.as_deref(),
        Some("https://files.toledoia.test/foto.png")
    );
}

#[tokio::test]
async fn generic_file_never_uses_preview_url() {
    let backend = Arc::new(FakeBackend::new());
    backend.omit_upload_url();
    let ctrl = controller(&backend);
    let pdf = FileUpload {
        file_name: "contrato.pdf".into(),
        mime_type: "application/pdf".into(),
        bytes: b"%PDF-1.7".to_vec(),
        preview_url: Some("blob:https://site.test/contrato".into()),
    };

    let delivery = ctrl.upload_file(pdf).await.unwrap();

    let Delivery::Confirmed { user_message, .. } = delivery else {
        panic!("upload was not confirmed");
    };
    assert_eq!(user_message.message_type, MessageType::File);
    assert!(user_message.file_url.is_none());
}

#[tokio::test]
async fn upload_validation_happens_before_network() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);
    let mut empty = image("vazio.png");
    empty.bytes.clear();

    let err = ctrl.upload_file(empty).await.unwrap_err();
    assert!(matches!(err, WidgetError::Validation { field: "file", .. }));

    let mut locked = support::widget("w-1", true);
    locked.allow_file_upload = false;
    let no_uploads = WidgetController::new(backend.clone(), locked, "v".into(), Default::default());
    assert!(no_uploads.upload_file(image("a.png")).await.unwrap_err().is_validation());

    assert_eq!(backend.calls().upload, 0);
    assert_eq!(backend.calls().create, 0);
}

#[tokio::test]
async fn upload_to_expired_session_restarts() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);
    let first = ctrl.ensure_session().await.unwrap();
    backend.expire(&first.id);

    let delivery = ctrl.upload_file(image("foto.png")).await.unwrap();

    assert!(matches!(delivery, Delivery::SessionRestarted { .. }));
    assert!(ctrl.messages().is_empty());
}

#[tokio::test]
async fn refresh_pulls_messages_from_other_sources() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);
    let session = ctrl.start().await.unwrap();
    ctrl.send_text("oi").await.unwrap();
    backend.inject_message(&session.id, "Um atendente entrou na conversa");

    assert_eq!(ctrl.refresh_messages().await.unwrap(), Refresh::Synced);

    let messages = ctrl.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(
        messages[2].message.content.as_deref(),
        Some("Um atendente entrou na conversa")
    );
}

#[tokio::test]
async fn refresh_without_session_is_idle() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);

    assert_eq!(ctrl.refresh_messages().await.unwrap(), Refresh::NoSession);
    assert_eq!(backend.calls().list, 0);
}

#[tokio::test]
async fn start_loads_existing_history() {
    let backend = Arc::new(FakeBackend::new());
    let earlier = controller(&backend);
    earlier.send_text("mensagem anterior").await.unwrap();

    let reopened = controller(&backend);
    reopened.start().await.unwrap();

    assert_eq!(reopened.messages().len(), 2);
}

#[tokio::test]
async fn resync_keeps_local_preview_of_image_without_server_url() {
    let backend = Arc::new(FakeBackend::new());
    backend.omit_upload_url();
    let ctrl = controller(&backend);
    let upload = image("foto.png");
    let preview = upload.preview_url.clone();

    ctrl.upload_file(upload).await.unwrap();
    assert_eq!(ctrl.refresh_messages().await.unwrap(), Refresh::Synced);

    let messages = ctrl.messages();
    assert_eq!(messages.len(), 1);
    assert!(!messages[0].is_pending());
    assert_eq!(messages[0].message.file_url, preview);
}

#[tokio::test]
async fn refresh_of_expired_session_restarts_with_empty_history() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);
    let first = ctrl.start().await.unwrap();
    ctrl.send_text("oi").await.unwrap();
    backend.expire(&first.id);

    let refresh = ctrl.refresh_messages().await.unwrap();

    let Refresh::SessionRestarted(fresh) = refresh else {
        panic!("expected a restart, got {refresh:?}");
    };
    assert_ne!(fresh.id, first.id);
    assert!(ctrl.messages().is_empty());
    assert_eq!(backend.calls().create, 2);
    assert_eq!(ctrl.current_session().map(|s| s.id), Some(fresh.id));
}

#[tokio::test]
async fn list_arriving_after_session_change_is_ignored() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);
    let first = ctrl.ensure_session().await.unwrap();
    backend.inject_message(&first.id, "mensagem da sessão antiga");
    let release = backend.hold_next_list();

    let (refresh, delivery) = tokio::join!(ctrl.refresh_messages(), async {
        backend.expire(&first.id);
        let delivery = ctrl.send_text("ainda aí?").await;
        release.notify_one();
        delivery
    });

    assert!(matches!(delivery.unwrap(), Delivery::SessionRestarted { .. }));
    assert_eq!(refresh.unwrap(), Refresh::Stale);
    assert!(ctrl.messages().is_empty());
    assert_ne!(ctrl.current_session().map(|s| s.id), Some(first.id));
}

#[tokio::test]
async fn preview_is_visible_while_send_is_in_flight() {
    let backend = Arc::new(FakeBackend::new());
    let ctrl = controller(&backend);
    ctrl.ensure_session().await.unwrap();

    // The second future runs when the send first parks on the network.
    let (sent, (in_flight, busy)) = tokio::join!(ctrl.send_text("oi"), async {
        (ctrl.messages(), ctrl.is_busy(Operation::Send))
    });

    sent.unwrap();
    assert_eq!(in_flight.len(), 1);
    assert!(in_flight[0].is_pending());
    assert_eq!(in_flight[0].message.content.as_deref(), Some("oi"));
    assert!(busy);
    assert!(ctrl.messages().iter().all(|m| !m.is_pending()));
}
