//! Welds and simplifies the golf course model in place.
//!
//! Reads `static/models/world-golfplatz-big-cp.glb` relative to the working
//! directory and overwrites it. The file is left untouched on any failure.

use golf_scene::simplify::{DEFAULT_GLB_PATH, SimplifyOptions, optimize_file};

fn main() -> anyhow::Result<()> {
    golf_scene::init_logging();
    let report = optimize_file(DEFAULT_GLB_PATH, &SimplifyOptions::default())?;
    println!("{DEFAULT_GLB_PATH}: {report}");
    Ok(())
}
