//! Capture engine: format resolution, session listing, and the pull loop.

mod capture_loop;
pub mod facade;
pub(crate) mod handles;
mod session_directory;
