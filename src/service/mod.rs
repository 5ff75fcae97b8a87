pub mod chat_service;
pub mod widget_service;
