//! TileJSON 3.0.0 documents describing the contour layer.

use crate::registry::Tileset;
use demtiles_contour::LAYER_NAME;
use serde::Serialize;
use std::collections::BTreeMap;

/// TileJSON specification version written by this server.
pub const TILEJSON_VERSION: &str = "3.0.0";

/// One entry of `vector_layers`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorLayer {
    /// Layer name inside the tiles.
    pub id: String,
    /// Attribute names and their descriptions.
    pub fields: BTreeMap<String, String>,
    /// Lowest zoom with data.
    pub minzoom: u8,
    /// Highest zoom with data.
    pub maxzoom: u8,
}

/// A TileJSON document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileJson {
    /// Specification version.
    pub tilejson: &'static str,
    /// Tileset name.
    pub name: String,
    /// Tile URL templates.
    pub tiles: Vec<String>,
    /// Lowest zoom served.
    pub minzoom: u8,
    /// Highest zoom served.
    pub maxzoom: u8,
    /// `[west, south, east, north]`.
    pub bounds: [f64; 4],
    /// Attribution HTML, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    /// Layers present in every tile.
    pub vector_layers: Vec<VectorLayer>,
}

impl TileJson {
    /// Describe a tileset served under `base_url`.
    pub fn for_tileset(tileset: &Tileset, base_url: &str) -> Self {
        let fields = BTreeMap::from([
            ("ele".to_string(), "Number".to_string()),
            ("level".to_string(), "Number (0 = minor, 1 = major)".to_string()),
        ]);
        Self {
            tilejson: TILEJSON_VERSION,
            name: tileset.name().to_string(),
            tiles: vec![format!("{}/{}/{{z}}/{{x}}/{{y}}.mvt", base_url, tileset.name())],
            minzoom: tileset.min_zoom(),
            maxzoom: tileset.max_zoom(),
            bounds: tileset.bounds(),
            attribution: tileset.attribution().map(str::to_string),
            vector_layers: vec![VectorLayer {
                id: LAYER_NAME.to_string(),
                fields,
                minzoom: tileset.min_zoom(),
                maxzoom: tileset.max_zoom(),
            }],
        }
    }
}
