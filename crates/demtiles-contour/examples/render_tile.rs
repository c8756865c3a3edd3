//! Example: Render one contour tile from a directory of terrarium PNGs.
//!
//! Usage: cargo run --example render_tile -- <lat> <lon> <zoom> [tile_dir] [out.mvt]

use demtiles_contour::{
    fetch_neighborhood, render_neighborhood, ContourOptions, ContourTile, DirectoryRasterSource,
    ImageCodec, TileAddress,
};
use std::env;
use std::time::Instant;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: {} <lat> <lon> <zoom> [tile_dir] [out.mvt]", args[0]);
        eprintln!("Example: {} 46.8523 -121.7603 12 ./terrarium rainier.mvt", args[0]);
        std::process::exit(1);
    }

    let lat: f64 = args[1].parse().expect("Invalid latitude");
    let lon: f64 = args[2].parse().expect("Invalid longitude");
    let zoom: u8 = args[3].parse().expect("Invalid zoom");
    let tile_dir = args.get(4).map(|s| s.as_str()).unwrap_or("terrarium");
    let out = args.get(5).map(|s| s.as_str()).unwrap_or("contours.mvt");

    let center = TileAddress::from_lat_lon(lat, lon, zoom).expect("Invalid tile address");
    let source = DirectoryRasterSource::new(tile_dir, "png");

    println!("Rendering tile {} from {}...", center, tile_dir);
    let start = Instant::now();

    let neighborhood = fetch_neighborhood(center, &source).await;
    println!("Found {} of 9 neighborhood tiles", neighborhood.present());

    match render_neighborhood(&neighborhood, &ImageCodec, &ContourOptions::default()) {
        Ok(ContourTile::Encoded { bytes, features }) => {
            std::fs::write(out, &bytes).expect("Failed to write tile");
            println!(
                "Wrote {} features ({} bytes) to {} in {:.3}s",
                features,
                bytes.len(),
                out,
                start.elapsed().as_secs_f64()
            );
        }
        Ok(ContourTile::Empty) => println!("No contours cross tile {}", center),
        Ok(ContourTile::NotFound) => println!("No source tiles around {}", center),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
