pub mod auth;
pub mod request_logger;
pub mod timeout;
