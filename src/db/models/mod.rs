pub mod history;
pub mod requests;
pub mod user;
