pub mod api;
pub mod stream;
