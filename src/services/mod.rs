pub mod auth_service;
pub mod catalog_service;
pub mod friendship_service;
pub mod saved_service;
pub mod sync_service;
