//! Raster tile sources.
//!
//! A [`RasterSource`] hands back the compressed bytes of a DEM tile, or
//! `None` when it has no tile at that address. Errors are reserved for
//! transport and I/O failures; the pipeline logs them and treats the tile
//! as missing.
//!
//! Three sources ship with the crate:
//! - [`HttpRasterSource`] fetches from a `{z}/{x}/{y}` URL template, such as
//!   the AWS terrain tiles at
//!   `https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{z}/{x}/{y}.png`
//! - [`DirectoryRasterSource`] reads `{root}/{z}/{x}/{y}.{ext}` from disk
//! - [`MemoryRasterSource`] serves tiles from a map, for tests and tooling

use crate::tile::TileAddress;
use crate::{ContourError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// HTTP timeout for a single tile download.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Provider of compressed raster tile bytes.
#[async_trait]
pub trait RasterSource: Send + Sync {
    /// Fetch the raw bytes of a tile. `Ok(None)` means the source has no
    /// tile at this address.
    async fn get(&self, addr: &TileAddress) -> Result<Option<Vec<u8>>>;
}

/// Download statistics for an [`HttpRasterSource`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Number of tiles downloaded this session.
    pub tiles_downloaded: usize,
    /// Total bytes downloaded this session.
    pub bytes_downloaded: u64,
}

/// Fetches tiles over HTTP from a URL template.
pub struct HttpRasterSource {
    url_template: String,
    client: reqwest::Client,
    tiles_downloaded: AtomicUsize,
    bytes_downloaded: AtomicU64,
}

impl std::fmt::Debug for HttpRasterSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRasterSource")
            .field("url_template", &self.url_template)
            .finish()
    }
}

impl HttpRasterSource {
    /// Create a source for a template containing `{z}`, `{x}` and `{y}`.
    pub fn new(url_template: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            url_template: url_template.into(),
            client,
            tiles_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
        })
    }

    /// The URL template this source was built with.
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// URL of one tile.
    pub fn tile_url(&self, addr: &TileAddress) -> String {
        addr.fill_template(&self.url_template)
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            tiles_downloaded: self.tiles_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }

    /// Reset download statistics.
    pub fn reset_download_stats(&self) {
        self.tiles_downloaded.store(0, Ordering::Relaxed);
        self.bytes_downloaded.store(0, Ordering::Relaxed);
    }
}

#[async_trait]
impl RasterSource for HttpRasterSource {
    async fn get(&self, addr: &TileAddress) -> Result<Option<Vec<u8>>> {
        let url = self.tile_url(addr);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN | StatusCode::NO_CONTENT => {
                debug!(%addr, status = %response.status(), "source has no tile");
                return Ok(None);
            }
            status if !status.is_success() => {
                return Err(ContourError::TileDownloadFailed {
                    z: addr.z,
                    x: addr.x,
                    y: addr.y,
                    reason: format!("HTTP {}", status),
                });
            }
            _ => {}
        }

        let bytes = response.bytes().await?;

        self.tiles_downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes.len() as u64, Ordering::Relaxed);

        Ok(Some(bytes.to_vec()))
    }
}

/// Reads tiles laid out as `{root}/{z}/{x}/{y}.{extension}`.
#[derive(Debug, Clone)]
pub struct DirectoryRasterSource {
    root: PathBuf,
    extension: String,
}

impl DirectoryRasterSource {
    /// Create a source rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P, extension: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extension: extension.into(),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of one tile file.
    pub fn tile_path(&self, addr: &TileAddress) -> PathBuf {
        self.root
            .join(addr.z.to_string())
            .join(addr.x.to_string())
            .join(format!("{}.{}", addr.y, self.extension))
    }
}

#[async_trait]
impl RasterSource for DirectoryRasterSource {
    async fn get(&self, addr: &TileAddress) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.tile_path(addr)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Serves tiles from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRasterSource {
    tiles: HashMap<TileAddress, Vec<u8>>,
}

impl MemoryRasterSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tile.
    pub fn insert(&mut self, addr: TileAddress, bytes: Vec<u8>) {
        self.tiles.insert(addr, bytes);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_tile(mut self, addr: TileAddress, bytes: Vec<u8>) -> Self {
        self.insert(addr, bytes);
        self
    }

    /// Number of tiles held.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the source holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[async_trait]
impl RasterSource for MemoryRasterSource {
    async fn get(&self, addr: &TileAddress) -> Result<Option<Vec<u8>>> {
        Ok(self.tiles.get(addr).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(z: u8, x: u32, y: u32) -> TileAddress {
        TileAddress::new(z, x, y).unwrap()
    }

    #[tokio::test]
    async fn test_memory_source() {
        let source = MemoryRasterSource::new().with_tile(addr(3, 1, 2), vec![1, 2, 3]);
        assert_eq!(source.len(), 1);
        assert_eq!(source.get(&addr(3, 1, 2)).await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(source.get(&addr(3, 2, 1)).await.unwrap(), None);
    }

    #[test]
    fn test_directory_tile_path() {
        let source = DirectoryRasterSource::new("/data/terrarium", "png");
        assert_eq!(
            source.tile_path(&addr(12, 655, 1407)),
            PathBuf::from("/data/terrarium/12/655/1407.png")
        );
    }

    #[tokio::test]
    async fn test_directory_source_reads_and_misses() {
        let dir = format!("demtiles-source-test-{}", std::process::id());
        let root = std::env::temp_dir().join(dir);
        let source = DirectoryRasterSource::new(&root, "png");
        let present = addr(2, 1, 3);

        let path = source.tile_path(&present);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not really a png").unwrap();

        assert_eq!(
            source.get(&present).await.unwrap().as_deref(),
            Some(&b"not really a png"[..])
        );
        assert_eq!(source.get(&addr(2, 0, 0)).await.unwrap(), None);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_http_tile_url_and_stats() {
        let source =
            HttpRasterSource::new("https://tiles.example.com/terrarium/{z}/{x}/{y}.png").unwrap();
        assert_eq!(
            source.tile_url(&addr(10, 163, 357)),
            "https://tiles.example.com/terrarium/10/163/357.png"
        );
        assert_eq!(source.download_stats(), DownloadStats::default());
        source.reset_download_stats();
        assert_eq!(source.download_stats().tiles_downloaded, 0);
    }

    // ============================================================================
    // HTTP Status Mapping
    // ============================================================================

    const BODY: &[u8] = b"terrain tile";

    async fn respond(
        axum::extract::Path((status, _, _, _)): axum::extract::Path<(u16, u8, u32, String)>,
    ) -> (StatusCode, Vec<u8>) {
        let status = StatusCode::from_u16(status).unwrap();
        let body = if status == StatusCode::OK { BODY.to_vec() } else { Vec::new() };
        (status, body)
    }

    #[tokio::test]
    async fn test_http_status_mapping() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = listener.local_addr().unwrap();
        let app = axum::Router::new().route("/:status/:z/:x/:y", axum::routing::get(respond));
        let server = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        let source_for = |status: u16| {
            HttpRasterSource::new(format!("http://{}/{}/{{z}}/{{x}}/{{y}}.png", host, status))
                .unwrap()
        };
        let tile = addr(4, 3, 5);

        let ok = source_for(200);
        assert_eq!(ok.get(&tile).await.unwrap().as_deref(), Some(BODY));
        assert_eq!(ok.get(&tile).await.unwrap().as_deref(), Some(BODY));
        assert_eq!(
            ok.download_stats(),
            DownloadStats {
                tiles_downloaded: 2,
                bytes_downloaded: 2 * BODY.len() as u64,
            }
        );

        for status in [404, 403, 204] {
            let source = source_for(status);
            assert_eq!(source.get(&tile).await.unwrap(), None, "HTTP {}", status);
            assert_eq!(source.download_stats(), DownloadStats::default());
        }

        let broken = source_for(500);
        match broken.get(&tile).await {
            Err(ContourError::TileDownloadFailed { z, x, y, reason }) => {
                assert_eq!((z, x, y), (4, 3, 5));
                assert!(reason.contains("500"), "{}", reason);
            }
            other => panic!("expected a download failure, got {:?}", other),
        }
        assert_eq!(broken.download_stats(), DownloadStats::default());

        server.abort();
    }
}
