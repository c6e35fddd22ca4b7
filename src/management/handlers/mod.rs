pub mod api_keys;
pub mod files;
pub mod health;
