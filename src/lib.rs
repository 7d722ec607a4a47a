//! Discord Installer Library
//!
//! Downloads the Discord Linux tarball, unpacks it into the home directory,
//! normalizes the install location and registers desktop launchers.

pub mod commands;
pub mod core;
pub mod error;
pub mod utils;
