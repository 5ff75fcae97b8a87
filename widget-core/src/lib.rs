//! Client core of the ToledoIA chat widget.
//!
//! [`WidgetController`] owns one visitor's conversation with one widget: it
//! keeps a single active [`Session`] (recreating it when the server reports it
//! expired) and an optimistic [`MessageCache`] whose pending previews are
//! reconciled with server-confirmed messages. All I/O goes through a
//! [`WidgetBackend`] implementation supplied by the host.

pub mod backend;
pub mod cache;
pub mod config;
pub mod controller;
pub mod directory;
pub mod error;
pub mod models;
pub mod session;
pub mod visitor;

pub use backend::{Endpoints, WidgetBackend};
pub use cache::{CachedMessage, LocalSeq, MessageCache, MessageKey};
pub use config::ClientConfig;
pub use controller::{Delivery, Operation, Refresh, WidgetController};
pub use directory::WidgetDirectory;
pub use error::{ApiError, Notice, WidgetError};
pub use models::{
    ChatMessage, FileUpload, MessageExchange, MessageType, NewSession, OutgoingMessage, Session,
    UploadExchange, WidgetIdentity,
};
pub use session::{SessionManager, SessionState};
pub use visitor::{MemoryVisitorStore, VISITOR_ID_KEY, VisitorStore, resolve_visitor_id};
