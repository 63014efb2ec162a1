//! Phase-ordered event dispatch for extensible Rust applications.
//!
//! Extensions register listeners against shared events, group them into
//! named phases and declare how those phases relate. Each event hands its
//! owner one composed callback that runs every listener in a deterministic,
//! dependency-respecting order, even when extensions request conflicting
//! orderings.
//!
//! ```
//! use std::sync::Arc;
//! use keystone::prelude::*;
//!
//! type OnSave = dyn Fn(&mut Vec<&'static str>) + Send + Sync;
//!
//! struct WorldSaved;
//! impl EventKey for WorldSaved {
//!     type Callback = OnSave;
//!     const ID: Identifier = Identifier::from_static("demo", "world_saved");
//!     fn create() -> Event<OnSave> {
//!         Event::new(|listeners: &[Arc<OnSave>]| {
//!             let listeners = listeners.to_vec();
//!             Arc::new(move |log: &mut Vec<&'static str>| {
//!                 listeners.iter().for_each(|l| l(log));
//!             }) as Arc<OnSave>
//!         })
//!     }
//! }
//!
//! let mut server = Server::new();
//! server.add_plugins(MinimalPlugins.build());
//! server.finish();
//!
//! let events = server.api::<EventsAPI>().unwrap();
//! let saved = events.event::<WorldSaved>();
//! saved.register(Arc::new(|log: &mut Vec<&'static str>| log.push("chunks")));
//! saved
//!     .phase(&Identifier::from_static("demo", "flush"))
//!     .run_before(&DEFAULT_PHASE)
//!     .register(Arc::new(|log: &mut Vec<&'static str>| log.push("flush")));
//!
//! let mut log = Vec::new();
//! (saved.invoker())(&mut log);
//! assert_eq!(log, ["flush", "chunks"]);
//! ```

pub use keystone_internal::*;

/// Everything needed to declare events and write plugins.
pub mod prelude {
    pub use keystone_internal::prelude::*;
}
