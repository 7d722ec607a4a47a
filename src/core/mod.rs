pub mod config;
pub mod download;
pub mod extract;
pub mod launcher;
pub mod locate;
pub mod progress;
