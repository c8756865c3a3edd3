//! Tileset registry: the immutable name → tileset map shared by handlers.

use crate::config::{ConfigError, ServerConfig, SourceConfig, TilesetConfig, WORLD_BOUNDS};
use demtiles_contour::{
    fetch_neighborhood, render_neighborhood, ContourOptions, ContourTile, DirectoryRasterSource,
    HttpRasterSource, ImageCodec, Neighborhood, RasterCodec, RasterSource, TileAddress,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// A configured tileset, ready to render.
pub struct Tileset {
    name: String,
    source: Box<dyn RasterSource>,
    codec: Box<dyn RasterCodec>,
    options: ContourOptions,
    min_zoom: u8,
    max_zoom: u8,
    bounds: [f64; 4],
    attribution: Option<String>,
}

impl std::fmt::Debug for Tileset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tileset")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .finish()
    }
}

impl Tileset {
    /// Create a tileset decoding with [`ImageCodec`], serving every zoom
    /// level over the whole world.
    pub fn new(
        name: impl Into<String>,
        source: Box<dyn RasterSource>,
        options: ContourOptions,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            codec: Box::new(ImageCodec),
            options,
            min_zoom: 0,
            max_zoom: demtiles_contour::MAX_ZOOM,
            bounds: WORLD_BOUNDS,
            attribution: None,
        }
    }

    /// Build from a validated configuration entry.
    pub fn from_config(name: &str, config: &TilesetConfig) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTileset {
            name: name.to_string(),
            reason,
        };
        let options = config.options().map_err(|e| invalid(e.to_string()))?;
        let source: Box<dyn RasterSource> = match &config.source {
            SourceConfig::Http { url } => {
                Box::new(HttpRasterSource::new(url.clone()).map_err(|e| invalid(e.to_string()))?)
            }
            SourceConfig::Directory { path, extension } => {
                Box::new(DirectoryRasterSource::new(path, extension.clone()))
            }
        };

        let mut tileset = Self::new(name, source, options)
            .with_zoom_range(config.min_zoom, config.max_zoom)
            .with_bounds(config.bounds);
        tileset.attribution = config.attribution.clone();
        Ok(tileset)
    }

    /// Restrict the zoom levels served.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Set the advertised bounds.
    pub fn with_bounds(mut self, bounds: [f64; 4]) -> Self {
        self.bounds = bounds;
        self
    }

    /// Set the advertised attribution.
    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    /// Replace the raster codec.
    pub fn with_codec(mut self, codec: Box<dyn RasterCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Tileset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contour options.
    pub fn options(&self) -> &ContourOptions {
        &self.options
    }

    /// Lowest zoom served.
    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    /// Highest zoom served.
    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// Whether tiles at zoom `z` are served.
    pub fn serves_zoom(&self, z: u8) -> bool {
        (self.min_zoom..=self.max_zoom).contains(&z)
    }

    /// `[west, south, east, north]`.
    pub fn bounds(&self) -> [f64; 4] {
        self.bounds
    }

    /// Attribution, if configured.
    pub fn attribution(&self) -> Option<&str> {
        self.attribution.as_deref()
    }

    /// Fetch the neighborhood of `center` from this tileset's source.
    pub async fn fetch(&self, center: TileAddress) -> Neighborhood {
        fetch_neighborhood(center, self.source.as_ref()).await
    }

    /// Decode and contour a fetched neighborhood. CPU-bound.
    pub fn render(&self, neighborhood: &Neighborhood) -> demtiles_contour::Result<ContourTile> {
        render_neighborhood(neighborhood, self.codec.as_ref(), &self.options)
    }
}

/// All tilesets, by name. Built once at startup and never mutated.
#[derive(Debug, Default)]
pub struct TilesetRegistry {
    tilesets: BTreeMap<String, Arc<Tileset>>,
}

impl TilesetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every tileset of a validated configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (name, tileset_config) in &config.tilesets {
            let tileset = Tileset::from_config(name, tileset_config)?;
            info!(
                tileset = %name,
                encoding = %tileset.options.encoding,
                minor_interval = tileset.options.minor_interval,
                major_interval = tileset.options.major_interval,
                min_zoom = tileset.min_zoom,
                max_zoom = tileset.max_zoom,
                "registered tileset"
            );
            registry = registry.with_tileset(tileset);
        }
        Ok(registry)
    }

    /// Add a tileset, replacing any with the same name.
    pub fn with_tileset(mut self, tileset: Tileset) -> Self {
        self.tilesets.insert(tileset.name.clone(), Arc::new(tileset));
        self
    }

    /// Look up a tileset.
    pub fn get(&self, name: &str) -> Option<Arc<Tileset>> {
        self.tilesets.get(name).cloned()
    }

    /// Tilesets in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Tileset>> {
        self.tilesets.values()
    }

    /// Number of tilesets.
    pub fn len(&self) -> usize {
        self.tilesets.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tilesets.is_empty()
    }
}
