pub mod api_response;
pub mod extract;
pub mod geocode;
pub mod photo;
