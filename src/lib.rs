//! Presentation layer for immediate-mode UI toolkits.
//!
//! The toolkit produces a command buffer each frame; this crate replays it
//! against a render backend, translates platform input for the toolkit, and
//! provides the font metrics the toolkit lays text out with.

pub mod config;
pub mod errors;
pub mod font;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod render;
pub mod session;

pub use config::Config;
pub use errors::AdapterError;
