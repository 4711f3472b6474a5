// Library exports for the binary and integration tests

pub mod album;
pub mod config;
pub mod discogs;
pub mod export;
pub mod library;
pub mod matcher;
pub mod ui;

// Re-export the controller at crate root for easier access
pub use ui::AppController;
