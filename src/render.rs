pub mod backend;
pub mod present;

/// Rendering backends.
pub mod backends {
    /// Cairo vector backend
    #[cfg(feature = "backend_cairo")]
    pub mod cairo;
    pub mod null;
    /// Raw pixel surface backend
    pub mod raster;
}

mod command;
pub use command::*;

mod dispatch;
pub use dispatch::{DispatchStats, Dispatcher};
