pub mod message_repository;
pub mod session_repository;
pub mod widget_repository;
