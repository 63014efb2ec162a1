//! Plugin installing the event registry.

use keystone_system::plugin::Plugin;
use keystone_system::server::Server;

use crate::registry::EventsAPI;

/// Inserts the [`EventsAPI`] so other plugins can declare and listen to
/// events.
///
/// Plugins registering listeners should list this plugin in their
/// dependencies:
///
/// ```
/// use std::sync::Arc;
/// use keystone_event::prelude::*;
/// use keystone_system::prelude::*;
///
/// type OnLoad = dyn Fn() + Send + Sync;
///
/// struct WorldLoaded;
/// impl EventKey for WorldLoaded {
///     type Callback = OnLoad;
///     const ID: Identifier = Identifier::from_static("demo", "world_loaded");
///     fn create() -> Event<OnLoad> {
///         Event::new(|listeners: &[Arc<OnLoad>]| {
///             let listeners = listeners.to_vec();
///             Arc::new(move || listeners.iter().for_each(|l| l())) as Arc<OnLoad>
///         })
///     }
/// }
///
/// struct Weather;
/// impl Plugin for Weather {
///     fn build(&self, server: &mut Server) {
///         let events = server.api::<EventsAPI>().expect("EventsPlugin required");
///         events.event::<WorldLoaded>().register(Arc::new(|| {}));
///     }
///     fn dependencies(&self) -> Vec<PluginId> {
///         vec![PluginId::of::<EventsPlugin>()]
///     }
/// }
///
/// let mut server = Server::new();
/// server.add_plugins(EventsPlugin).add_plugins(Weather);
/// server.finish();
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct EventsPlugin;

impl Plugin for EventsPlugin {
    fn build(&self, server: &mut Server) {
        if !server.contains_api::<EventsAPI>() {
            server.insert_api(EventsAPI::new());
        }
    }

    fn ready(&self, server: &mut Server) {
        let Some(events) = server.api::<EventsAPI>() else {
            return;
        };

        for summary in events.summaries() {
            let phases: Vec<String> = summary.phase_order.iter().map(ToString::to_string).collect();
            tracing::debug!(
                event = %summary.id,
                listeners = summary.listeners,
                phases = ?phases,
                "event ready"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_registry_once() {
        let mut server = Server::new();
        server.add_plugins(EventsPlugin);
        server.finish();

        assert!(server.contains_api::<EventsAPI>());
        assert!(server.api::<EventsAPI>().is_some_and(EventsAPI::is_empty));
    }

    #[test]
    fn keeps_existing_registry() {
        let mut server = Server::new();
        server.insert_api(EventsAPI::new());
        let before: *const EventsAPI = server.api::<EventsAPI>().unwrap();

        server.add_plugins(EventsPlugin);
        server.finish();

        let after: *const EventsAPI = server.api::<EventsAPI>().unwrap();
        assert_eq!(before, after);
    }
}
