pub mod models;
pub mod pool;
pub mod queries;
pub mod repository;
pub mod store;
