//! # Keystone Internal Library
//!
//! Re-exports the Keystone crates for convenience.

/// Layer 1: plugins, APIs and dependency ordering.
pub use keystone_system;

/// Layer 2: phase-ordered event dispatch.
pub use keystone_event;

/// Infrastructure plugins.
pub use keystone_core_plugins;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use keystone_core_plugins::{
        DefaultPlugins, MinimalPlugins, TracingConfig, TracingFormat, TracingPlugin,
    };
    pub use keystone_event::prelude::*;
    pub use keystone_system::prelude::*;
}
