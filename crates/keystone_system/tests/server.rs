//! Plugin orchestration tests for `keystone_system`.
//!
//! These tests verify dependency ordering, build-time plugin addition and
//! the error surface of [`Server::try_finish`].

use std::sync::Arc;

use keystone_system::api::API;
use keystone_system::plugin::{Plugin, PluginGroup, PluginGroupBuilder, PluginId};
use keystone_system::server::{BuildError, Server};
use parking_lot::Mutex;

// ═══════════════════════════════════════════════════════════════════════════════
// TEST PLUGINS
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared build log, inserted as an API so plugins can find it.
#[derive(Default)]
struct BuildLog {
    entries: Mutex<Vec<&'static str>>,
}

impl API for BuildLog {}

impl BuildLog {
    fn push(server: &Server, entry: &'static str) {
        server
            .api::<BuildLog>()
            .expect("BuildLog inserted by the test")
            .entries
            .lock()
            .push(entry);
    }

    fn snapshot(server: &Server) -> Vec<&'static str> {
        server
            .api::<BuildLog>()
            .expect("BuildLog inserted by the test")
            .entries
            .lock()
            .clone()
    }
}

fn server_with_log() -> Server {
    let mut server = Server::new();
    server.insert_api(BuildLog::default());
    server
}

struct Registry;
impl Plugin for Registry {
    fn build(&self, server: &mut Server) {
        BuildLog::push(server, "registry");
    }
}

struct Networking;
impl Plugin for Networking {
    fn build(&self, server: &mut Server) {
        BuildLog::push(server, "networking");
    }
    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<Registry>()]
    }
}

struct Lifecycle;
impl Plugin for Lifecycle {
    fn build(&self, server: &mut Server) {
        BuildLog::push(server, "lifecycle");
    }
    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<Networking>(), PluginId::of::<Registry>()]
    }
}

struct Standalone;
impl Plugin for Standalone {
    fn build(&self, server: &mut Server) {
        BuildLog::push(server, "standalone");
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORDERING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn dependencies_build_first_regardless_of_add_order() {
    let mut server = server_with_log();
    server
        .add_plugins(Lifecycle)
        .add_plugins(Standalone)
        .add_plugins(Networking)
        .add_plugins(Registry);
    server.finish();

    assert_eq!(
        BuildLog::snapshot(&server),
        vec!["standalone", "registry", "networking", "lifecycle"]
    );
    assert!(server.is_built());
}

#[test]
fn independent_plugins_build_in_insertion_order() {
    let mut server = server_with_log();
    server.add_plugins(Standalone).add_plugins(Registry);
    server.finish();

    assert_eq!(BuildLog::snapshot(&server), vec!["standalone", "registry"]);
}

struct Parent;
impl Plugin for Parent {
    fn build(&self, server: &mut Server) {
        BuildLog::push(server, "parent");
        server.add_plugins(Standalone);
    }
}

#[test]
fn plugins_added_during_build_are_built_immediately() {
    let mut server = server_with_log();
    server.add_plugins(Parent).add_plugins(Registry);
    server.finish();

    assert_eq!(
        BuildLog::snapshot(&server),
        vec!["parent", "standalone", "registry"]
    );
    assert!(server.has_plugin::<Standalone>());
}

#[test]
fn dependency_on_already_built_plugin_is_satisfied() {
    struct Late;
    impl Plugin for Late {
        fn build(&self, server: &mut Server) {
            BuildLog::push(server, "late");
        }
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<Standalone>()]
        }
    }

    struct Spawner;
    impl Plugin for Spawner {
        fn build(&self, server: &mut Server) {
            server.add_plugins(Standalone).add_plugins(Late);
        }
    }

    let mut server = server_with_log();
    server.add_plugins(Spawner);
    server.finish();

    assert_eq!(BuildLog::snapshot(&server), vec!["standalone", "late"]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

struct CycleA;
impl Plugin for CycleA {
    fn build(&self, _server: &mut Server) {}
    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<CycleB>()]
    }
}

struct CycleB;
impl Plugin for CycleB {
    fn build(&self, _server: &mut Server) {}
    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<CycleA>()]
    }
}

#[test]
fn plugin_cycle_is_a_build_error() {
    let mut server = Server::new();
    server.add_plugins(CycleA).add_plugins(CycleB);

    let Err(BuildError::CircularDependency { plugins }) = server.try_finish() else {
        panic!("expected a circular dependency error");
    };
    assert_eq!(plugins.len(), 2);
    assert!(plugins[0].ends_with("CycleA"));
    assert!(plugins[1].ends_with("CycleB"));
    assert!(!server.is_built());
}

#[test]
#[should_panic(expected = "circular dependency detected")]
fn finish_panics_on_cycle() {
    let mut server = Server::new();
    server.add_plugins(CycleA).add_plugins(CycleB);
    server.finish();
}

#[test]
#[should_panic(expected = "which was not added")]
fn finish_panics_on_missing_dependency() {
    let mut server = Server::new();
    server.add_plugins(Networking);
    server.finish();
}

// ═══════════════════════════════════════════════════════════════════════════════
// GROUPS
// ═══════════════════════════════════════════════════════════════════════════════

struct CorePlugins;

impl PluginGroup for CorePlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(Lifecycle)
            .add(Networking)
            .add(Registry)
    }
}

#[test]
fn plugin_group_is_sorted_like_individual_plugins() {
    let mut server = server_with_log();
    server.add_plugins(CorePlugins.build());
    server.finish();

    assert_eq!(
        BuildLog::snapshot(&server),
        vec!["registry", "networking", "lifecycle"]
    );
}

#[test]
fn disabled_plugin_is_not_built() {
    let mut server = server_with_log();
    server.add_plugins(
        CorePlugins
            .build()
            .disable::<Lifecycle>()
            .add(Standalone),
    );
    server.finish();

    assert!(!server.has_plugin::<Lifecycle>());
    assert_eq!(
        BuildLog::snapshot(&server),
        vec!["registry", "networking", "standalone"]
    );
}

#[test]
fn ready_sees_every_built_plugin() {
    struct Inspector {
        seen: Arc<Mutex<Vec<String>>>,
    }
    impl Plugin for Inspector {
        fn build(&self, _server: &mut Server) {}
        fn ready(&self, server: &mut Server) {
            let names = server.plugin_names().iter().map(ToString::to_string).collect();
            *self.seen.lock() = names;
        }
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut server = server_with_log();
    server
        .add_plugins(Inspector {
            seen: Arc::clone(&seen),
        })
        .add_plugins(Registry);
    server.finish();

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert!(seen[1].ends_with("Registry"));
}
