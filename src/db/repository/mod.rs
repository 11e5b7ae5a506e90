pub mod requests;
pub mod users;

pub use requests::RequestRepository;
pub use users::{NewAccount, UserDirectory};
