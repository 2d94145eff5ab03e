use std::env;

use anyhow::{Context, Result};
use avatar_assets::{AssetKind, Catalog};

fn main() -> Result<()> {
    env_logger::init();

    let root = env::args().nth(1).context("usage: catalog_dump <asset root>")?;
    let catalog = Catalog::load_from_root(&root)?;
    let stats = catalog.stats();
    println!(
        "{} models, {} textures, {} eyes, {} mouths in {}",
        stats.models,
        stats.textures,
        stats.eyes,
        stats.mouths,
        catalog.root().display()
    );
    for kind in AssetKind::ALL {
        println!("\n[{}] {}", kind, kind.relative_dir());
        for name in catalog.entries(kind) {
            println!("  {name}");
        }
    }
    Ok(())
}
