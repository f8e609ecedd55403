pub mod core_api;
pub mod images;
pub mod special;
