//! Logging plugin.
//!
//! [`TracingPlugin`] installs a `tracing` subscriber for the whole process.
//! Library crates only emit through the `tracing` macros; nothing is printed
//! until this plugin (or the host application) installs a subscriber.
//!
//! # Lifecycle
//!
//! - **`build()`** inserts the [`TracingConfig`] API so other plugins can see
//!   the configured level while registering their listeners.
//! - **`ready()`** installs the subscriber. Plugins are readied in build
//!   order, so when this plugin comes first every later `ready()` is logged.
//!
//! # Example
//!
//! ```
//! use keystone_core_plugins::{TracingFormat, TracingPlugin};
//! use keystone_system::server::Server;
//! use tracing::Level;
//!
//! let mut server = Server::new();
//! server.add_plugins(
//!     TracingPlugin::default()
//!         .with_level(Level::DEBUG)
//!         .with_format(TracingFormat::Compact),
//! );
//! server.finish();
//! ```

use keystone_system::api::API;
use keystone_system::plugin::Plugin;
use keystone_system::server::Server;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The logging configuration, readable by other plugins.
///
/// ```
/// use keystone_core_plugins::{TracingConfig, TracingPlugin};
/// use keystone_system::server::Server;
/// use tracing::Level;
///
/// let mut server = Server::new();
/// server.add_plugins(TracingPlugin::new().with_level(Level::WARN));
/// server.finish();
///
/// let config = server.api::<TracingConfig>().unwrap();
/// assert!(!config.enabled(Level::DEBUG));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Maximum level used when no filter directive matches.
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
    /// Filter directives such as `keystone_event=trace,info`.
    pub env_filter: Option<String>,
}

impl API for TracingConfig {}

impl TracingConfig {
    /// Returns true if events at `level` pass the configured maximum level.
    ///
    /// Filter directives are not considered.
    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Installs the process-wide `tracing` subscriber.
///
/// # APIs Provided
///
/// | API | Description |
/// |-----|-------------|
/// | [`TracingConfig`] | The configuration this plugin was built with |
///
/// # Filtering
///
/// Directives given to [`with_env_filter`](Self::with_env_filter) take
/// precedence over the level. Use [`from_env`](Self::from_env) to read them
/// from `RUST_LOG`:
///
/// ```
/// use keystone_core_plugins::TracingPlugin;
///
/// // Trace every phase resolution, keep the rest at info
/// TracingPlugin::new().with_env_filter("keystone_event=trace,info")
/// # ;
/// ```
///
/// If a subscriber is already installed, `ready()` leaves it in place.
#[derive(Debug, Clone)]
pub struct TracingPlugin {
    level: Level,
    format: TracingFormat,
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingPlugin {
    /// Creates a plugin logging at `INFO` in the pretty format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a plugin using the filter directives in `RUST_LOG`, if set.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(directives) if !directives.trim().is_empty() => {
                Self::default().with_env_filter(directives)
            }
            _ => Self::default(),
        }
    }

    /// Sets the maximum level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets filter directives, in `target=level,...` form.
    #[must_use]
    pub fn with_env_filter(mut self, directives: impl Into<String>) -> Self {
        self.env_filter = Some(directives.into());
        self
    }

    /// Logs span enter and exit.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the configuration exposed as the [`TracingConfig`] API.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
            env_filter: self.env_filter.clone(),
        }
    }

    fn output_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };
        let layer = tracing_subscriber::fmt::layer().with_span_events(span_events);

        match self.format {
            TracingFormat::Pretty => layer.pretty().boxed(),
            TracingFormat::Compact => layer.compact().boxed(),
            TracingFormat::Json => layer.json().boxed(),
        }
    }
}

impl Plugin for TracingPlugin {
    fn build(&self, server: &mut Server) {
        server.insert_api(self.config());
    }

    fn ready(&self, _server: &mut Server) {
        let fallback = || EnvFilter::new(self.level.as_str());
        let (filter, rejected) = match self.env_filter.as_deref().map(EnvFilter::try_new) {
            Some(Ok(filter)) => (filter, None),
            Some(Err(error)) => (fallback(), Some(error)),
            None => (fallback(), None),
        };

        let installed = tracing_subscriber::registry()
            .with(self.output_layer())
            .with(filter)
            .try_init()
            .is_ok();

        if let Some(error) = rejected {
            tracing::warn!(%error, level = %self.level, "invalid filter directives, using level");
        }
        tracing::debug!(
            level = %self.level,
            format = ?self.format,
            installed,
            "tracing ready"
        );
    }

    fn cleanup(&self, _server: &mut Server) {
        tracing::debug!("tracing shutting down");
    }
}
