//! YAML configuration for the tile server.
//!
//! ```yaml
//! listen: "127.0.0.1:8080"
//! public_url: "https://tiles.example.com"
//! request_timeout_secs: 30
//! tilesets:
//!   terrarium:
//!     source:
//!       http:
//!         url: "https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{z}/{x}/{y}.png"
//!     encoding: terrarium
//!     minor_interval: 10
//!     major_interval: 50
//!     max_zoom: 15
//! ```
//!
//! Everything except `tilesets`, each tileset's `source` and its `encoding`
//! has a default. A configuration is validated as a whole when loaded; any
//! problem is fatal before the server binds its socket.

use demtiles_contour::{ContourOptions, ElevationEncoding, DEFAULT_EXTENT, MAX_ZOOM};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Web Mercator bounds `[west, south, east, north]`.
pub const WORLD_BOUNDS: [f64; 4] = [-180.0, -85.0511, 180.0, 85.0511];

/// Largest accepted contour `buffer`, in pixels.
pub const MAX_BUFFER: u32 = 256;

/// Errors found while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The YAML did not match the schema.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// No tilesets were configured.
    #[error("Configuration defines no tilesets")]
    NoTilesets,

    /// A server-level setting is invalid.
    #[error("Invalid setting {field}: {reason}")]
    InvalidSetting {
        /// Setting name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A tileset entry is invalid.
    #[error("Tileset {name:?}: {reason}")]
    InvalidTileset {
        /// Tileset name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_minor_interval() -> f64 {
    10.0
}

fn default_major_interval() -> f64 {
    50.0
}

fn default_buffer() -> u32 {
    1
}

fn default_extent() -> u32 {
    DEFAULT_EXTENT
}

fn default_max_zoom() -> u8 {
    15
}

fn default_bounds() -> [f64; 4] {
    WORLD_BOUNDS
}

fn default_extension() -> String {
    "png".to_string()
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Base URL used in TileJSON tile templates. Defaults to `http://{listen}`.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Per tile request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Prometheus scrape address (requires the `prometheus` feature).
    #[serde(default)]
    pub metrics_listen: Option<SocketAddr>,
    /// Tilesets by name.
    pub tilesets: BTreeMap<String, TilesetConfig>,
}

/// Where a tileset's raster tiles come from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceConfig {
    /// URL template with `{z}`, `{x}` and `{y}` placeholders.
    Http {
        /// Template.
        url: String,
    },
    /// Local `{path}/{z}/{x}/{y}.{extension}` tree.
    Directory {
        /// Root directory.
        path: PathBuf,
        /// File extension, without the dot.
        #[serde(default = "default_extension")]
        extension: String,
    },
}

/// One tileset entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TilesetConfig {
    /// Raster source.
    pub source: SourceConfig,
    /// `terrarium` or `mapbox`.
    pub encoding: String,
    /// Meters between contour lines.
    #[serde(default = "default_minor_interval")]
    pub minor_interval: f64,
    /// Meters between major contour lines.
    #[serde(default = "default_major_interval")]
    pub major_interval: f64,
    /// Halo width in source pixels.
    #[serde(default = "default_buffer")]
    pub buffer: u32,
    /// Vector tile extent.
    #[serde(default = "default_extent")]
    pub extent: u32,
    /// Lowest zoom served.
    #[serde(default)]
    pub min_zoom: u8,
    /// Highest zoom served.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
    /// `[west, south, east, north]` advertised in TileJSON.
    #[serde(default = "default_bounds")]
    pub bounds: [f64; 4],
    /// Attribution advertised in TileJSON.
    #[serde(default)]
    pub attribution: Option<String>,
}

impl TilesetConfig {
    /// Parsed elevation encoding.
    pub fn encoding(
        &self,
    ) -> std::result::Result<ElevationEncoding, demtiles_contour::ContourError> {
        self.encoding.parse()
    }

    /// Contour options for this tileset.
    pub fn options(&self) -> std::result::Result<ContourOptions, demtiles_contour::ContourError> {
        Ok(ContourOptions {
            encoding: self.encoding()?,
            minor_interval: self.minor_interval,
            major_interval: self.major_interval,
            buffer: self.buffer,
            extent: self.extent,
        })
    }

    fn validate(&self, name: &str) -> Result<()> {
        let invalid = |reason: String| ConfigError::InvalidTileset {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() || name.contains('/') {
            return Err(invalid("name must be a non-empty path segment".to_string()));
        }

        let options = self.options().map_err(|e| invalid(e.to_string()))?;
        options.validate().map_err(|e| invalid(e.to_string()))?;

        if self.extent == 0 {
            return Err(invalid("extent must be greater than zero".to_string()));
        }
        if self.buffer > MAX_BUFFER {
            return Err(invalid(format!(
                "buffer {} exceeds {}",
                self.buffer, MAX_BUFFER
            )));
        }
        if self.max_zoom > MAX_ZOOM {
            return Err(invalid(format!(
                "max_zoom {} exceeds {}",
                self.max_zoom, MAX_ZOOM
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(invalid(format!(
                "min_zoom {} is greater than max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }

        let [west, south, east, north] = self.bounds;
        let lon_ok = (-180.0..=180.0).contains(&west) && (-180.0..=180.0).contains(&east);
        let lat_ok = (-90.0..=90.0).contains(&south) && (-90.0..=90.0).contains(&north);
        if !lon_ok || !lat_ok || south >= north {
            return Err(invalid(format!("bounds {:?} are not a valid box", self.bounds)));
        }

        match &self.source {
            SourceConfig::Http { url } => {
                for placeholder in ["{z}", "{x}", "{y}"] {
                    if !url.contains(placeholder) {
                        return Err(invalid(format!(
                            "source url {:?} is missing {}",
                            url, placeholder
                        )));
                    }
                }
            }
            SourceConfig::Directory { extension, .. } => {
                if extension.is_empty() || extension.starts_with('.') {
                    return Err(invalid(format!(
                        "directory extension {:?} must be non-empty and without a leading dot",
                        extension
                    )));
                }
            }
        }

        Ok(())
    }
}

impl ServerConfig {
    /// Read and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ServerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<()> {
        if self.tilesets.is_empty() {
            return Err(ConfigError::NoTilesets);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(url) = &self.public_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidSetting {
                    field: "public_url",
                    reason: format!("{:?} is not an http(s) URL", url),
                });
            }
        }
        for (name, tileset) in &self.tilesets {
            tileset.validate(name)?;
        }
        Ok(())
    }

    /// Base URL for links in TileJSON and the catalog, without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.listen),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
tilesets:
  terrain:
    source:
      directory:
        path: ./tiles
    encoding: terrarium
"#;

    fn with_tileset(extra: &str) -> String {
        let head = concat!(
            "tilesets:\n  terrain:\n    source:\n      http:\n",
            "        url: \"https://example.com/{z}/{x}/{y}.png\"\n",
            "    encoding: mapbox\n",
        );
        format!("{}{}", head, extra)
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = ServerConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.listen, default_listen());
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.base_url(), "http://127.0.0.1:8080");

        let tileset = &config.tilesets["terrain"];
        assert_eq!(
            tileset.source,
            SourceConfig::Directory {
                path: PathBuf::from("./tiles"),
                extension: "png".to_string()
            }
        );
        assert_eq!(tileset.minor_interval, 10.0);
        assert_eq!(tileset.major_interval, 50.0);
        assert_eq!(tileset.buffer, 1);
        assert_eq!(tileset.extent, 4096);
        assert_eq!((tileset.min_zoom, tileset.max_zoom), (0, 15));
        assert_eq!(tileset.bounds, WORLD_BOUNDS);
        assert_eq!(tileset.options().unwrap().encoding, ElevationEncoding::Terrarium);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
listen: "0.0.0.0:9000"
public_url: "https://tiles.example.com/"
request_timeout_secs: 5
metrics_listen: "127.0.0.1:9100"
tilesets:
  mapbox:
    source:
      http:
        url: "https://api.example.com/v4/terrain-rgb/{z}/{x}/{y}.pngraw"
    encoding: mapbox
    minor_interval: 20
    major_interval: 100
    buffer: 2
    extent: 8192
    min_zoom: 5
    max_zoom: 14
    bounds: [-125.0, 24.0, -66.0, 50.0]
    attribution: "© Example"
"#;
        let config = ServerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.base_url(), "https://tiles.example.com");
        assert_eq!(config.metrics_listen, Some("127.0.0.1:9100".parse().unwrap()));

        let options = config.tilesets["mapbox"].options().unwrap();
        assert_eq!(options.encoding, ElevationEncoding::Mapbox);
        assert_eq!(options.minor_interval, 20.0);
        assert_eq!(options.buffer, 2);
        assert_eq!(options.extent, 8192);
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let yaml = MINIMAL.replace("terrarium", "geotiff");
        let err = ServerConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTileset { ref name, .. } if name == "terrain"));
        assert!(err.to_string().contains("geotiff"));
    }

    #[test]
    fn test_invalid_intervals_rejected() {
        for extra in [
            "    minor_interval: 0\n",
            "    minor_interval: -5\n",
            "    minor_interval: 100\n    major_interval: 50\n",
        ] {
            assert!(
                ServerConfig::from_yaml_str(&with_tileset(extra)).is_err(),
                "accepted {:?}",
                extra
            );
        }
    }

    #[test]
    fn test_zoom_and_extent_rejected() {
        for extra in [
            "    min_zoom: 10\n    max_zoom: 4\n",
            "    max_zoom: 23\n",
            "    extent: 0\n",
            "    bounds: [-10.0, 20.0, 10.0, 10.0]\n",
        ] {
            assert!(
                ServerConfig::from_yaml_str(&with_tileset(extra)).is_err(),
                "accepted {:?}",
                extra
            );
        }
    }

    #[test]
    fn test_buffer_limit() {
        let config = ServerConfig::from_yaml_str(&with_tileset("    buffer: 256\n")).unwrap();
        assert_eq!(config.tilesets["terrain"].buffer, MAX_BUFFER);

        let yaml = with_tileset("    buffer: 4294967295\n");
        let err = ServerConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("buffer 4294967295 exceeds 256"), "{}", err);
    }

    #[test]
    fn test_url_template_needs_placeholders() {
        let yaml = r#"
tilesets:
  terrain:
    source:
      http:
        url: "https://example.com/{z}/{x}.png"
    encoding: terrarium
"#;
        let err = ServerConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("{y}"));
    }

    #[test]
    fn test_empty_tilesets_rejected() {
        let err = ServerConfig::from_yaml_str("tilesets: {}\n").unwrap_err();
        assert!(matches!(err, ConfigError::NoTilesets));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = format!("{}    colour: red\n", MINIMAL);
        assert!(matches!(
            ServerConfig::from_yaml_str(&yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let yaml = format!("request_timeout_secs: 0\n{}", MINIMAL);
        assert!(matches!(
            ServerConfig::from_yaml_str(&yaml),
            Err(ConfigError::InvalidSetting { field: "request_timeout_secs", .. })
        ));
    }
}
