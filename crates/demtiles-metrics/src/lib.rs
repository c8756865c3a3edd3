//! Metrics infrastructure for the demtiles contour tile service.
//!
//! Every metric the service records is declared here as a const [`Metric`]
//! so names, units and label keys live in one place. The `metrics` crate is
//! re-exported for convenience.
//!
//! # Example
//!
//! ```rust,ignore
//! use demtiles_metrics::{metric_defs, TileLabels, outcome};
//!
//! let labels = TileLabels::new("terrarium").with_outcome(outcome::OK);
//! metrics::counter!(metric_defs::TILE_REQUESTS.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use demtiles_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const RENDERED: Metric = Metric::counter("demtiles.example.rendered")
///     .with_description("Tiles rendered")
///     .with_unit(Unit::Count)
///     .with_labels(&["tileset"]);
///
/// assert_eq!(RENDERED.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "demtiles.tile.requests").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description)
            }
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(self.name, unit, self.description),
            (MetricKind::Gauge, None) => describe_gauge!(self.name, self.description),
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description)
            }
            (MetricKind::Histogram, None) => describe_histogram!(self.name, self.description),
        }
    }
}

/// Values for the `outcome` label of [`metric_defs::TILE_REQUESTS`].
pub mod outcome {
    /// A tile with at least one contour feature was returned.
    pub const OK: &str = "ok";
    /// The source had data but no contour crossed the tile.
    pub const EMPTY: &str = "empty";
    /// Unknown tileset, out-of-range address, or no source data.
    pub const NOT_FOUND: &str = "not_found";
    /// Malformed request path.
    pub const BAD_REQUEST: &str = "bad_request";
    /// Internal failure while rendering.
    pub const ERROR: &str = "error";
    /// The request exceeded the configured timeout.
    pub const TIMEOUT: &str = "timeout";
}

/// All metric definitions for the service.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Tile Requests
    // ========================================================================

    /// Contour tile requests by outcome.
    ///
    /// Labels: tileset, outcome
    pub const TILE_REQUESTS: Metric = Metric::counter("demtiles.tile.requests")
        .with_description("Contour tile requests by outcome")
        .with_unit(Unit::Count)
        .with_labels(&["tileset", "outcome"]);

    /// Wall-clock time to fetch, contour and encode one tile.
    pub const TILE_RENDER_TIME: Metric = Metric::histogram("demtiles.tile.render_time_ms")
        .with_description("Time to fetch, contour and encode one tile in milliseconds")
        .with_unit(Unit::Milliseconds)
        .with_labels(&["tileset"]);

    /// Contour features written per encoded tile.
    pub const TILE_FEATURES: Metric = Metric::histogram("demtiles.tile.features")
        .with_description("Contour features written per encoded tile")
        .with_unit(Unit::Count)
        .with_labels(&["tileset"]);

    /// Size of encoded tiles.
    pub const TILE_BYTES: Metric = Metric::histogram("demtiles.tile.bytes")
        .with_description("Size of encoded vector tiles in bytes")
        .with_unit(Unit::Bytes)
        .with_labels(&["tileset"]);

    // ========================================================================
    // Raster Source
    // ========================================================================

    /// Neighbor fetches that failed with a transport or I/O error.
    pub const SOURCE_FETCH_FAILURES: Metric = Metric::counter("demtiles.source.fetch_failures")
        .with_description("Raster fetches that failed and were treated as missing")
        .with_unit(Unit::Count);

    /// Fetched rasters the codec could not decode.
    pub const SOURCE_DECODE_FAILURES: Metric = Metric::counter("demtiles.source.decode_failures")
        .with_description("Raster tiles that could not be decoded and were treated as missing")
        .with_unit(Unit::Count);

    /// Present tiles in each 3x3 neighborhood.
    pub const NEIGHBORS_PRESENT: Metric = Metric::histogram("demtiles.assemble.neighbors_present")
        .with_description("Number of the nine neighborhood tiles that were present")
        .with_unit(Unit::Count);

    /// Requests currently being rendered.
    pub const TILES_IN_FLIGHT: Metric = Metric::gauge("demtiles.tile.in_flight")
        .with_description("Tile requests currently being rendered")
        .with_unit(Unit::Count);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &TILE_REQUESTS,
        &TILE_RENDER_TIME,
        &TILE_FEATURES,
        &TILE_BYTES,
        &SOURCE_FETCH_FAILURES,
        &SOURCE_DECODE_FAILURES,
        &NEIGHBORS_PRESENT,
        &TILES_IN_FLIGHT,
    ];
}

/// Labels identifying a tile request.
#[derive(Debug, Clone)]
pub struct TileLabels {
    /// Tileset name from the registry.
    pub tileset: String,
    /// Request outcome, set once the request finishes.
    pub outcome: Option<&'static str>,
}

impl TileLabels {
    /// Creates labels for the given tileset.
    pub fn new(tileset: impl Into<String>) -> Self {
        Self {
            tileset: tileset.into(),
            outcome: None,
        }
    }

    /// Attaches an outcome (see [`outcome`]).
    pub fn with_outcome(mut self, outcome: &'static str) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        let mut labels = vec![("tileset", self.tileset.clone())];
        if let Some(outcome) = self.outcome {
            labels.push(("outcome", outcome.to_string()));
        }
        labels
    }
}

/// Describes all metrics used by the service.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Installs the Prometheus recorder with an HTTP scrape listener.
#[cfg(feature = "prometheus")]
pub fn install_prometheus_exporter(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}
