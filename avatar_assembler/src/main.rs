use anyhow::{Context, Result};
use avatar_assets::{Catalog, PngStore, Resolver};

mod assembly;
mod cli;
mod config;
mod customization;
mod error;
mod manifest;
mod rules;
mod scratch;

use assembly::Assembler;
use cli::Options;
use config::AssemblyConfig;
use customization::CustomizationInput;
use manifest::ExportRequest;
use scratch::ScratchDir;

fn main() -> Result<()> {
    env_logger::init();
    let options = cli::parse()?;
    run(&options)
}

fn run(options: &Options) -> Result<()> {
    let config = AssemblyConfig::load(options.config.as_deref())?;
    let input = CustomizationInput::read(&options.input)?;
    let customization = &input.customization;
    log::info!("assembling customization {}", input.hash);

    let catalog = Catalog::load_from_root(&options.asset_root)
        .with_context(|| format!("loading asset catalog from {}", options.asset_root.display()))?;
    let stats = catalog.stats();
    log::debug!(
        "catalog: {} models, {} textures, {} eyes, {} mouths",
        stats.models,
        stats.textures,
        stats.eyes,
        stats.mouths
    );

    let scratch = ScratchDir::new(&options.tmp_root, &input.hash);
    scratch.prepare(options.reuse_scratch)?;

    let weights = customization.blend_weights(options.thicc)?;
    let mut assembler = Assembler::new(&config, Resolver::new(&catalog), PngStore, scratch.clone());
    assembler.assemble(customization, &weights)?;

    let export = ExportRequest {
        model: options.output.with_extension("fbx"),
        preview: options.preview.then(|| options.output.with_extension("png")),
        rig: options.rig,
        vrc: options.vrc,
        combine_dir: options.vrc.then(|| scratch.root().to_path_buf()),
    };
    let manifest = assembler.finish(input.hash.clone(), weights, export);
    manifest.write(&options.output)?;

    println!("Assembled {} parts into {}", manifest.parts.len(), manifest.scratch.display());
    println!("  decals: {}", manifest.decals.len());
    if !manifest.misses.is_empty() {
        println!("  unresolved:");
        for miss in &manifest.misses {
            println!("    - {miss}");
        }
    }
    println!("Saved scene manifest to {}", options.output.display());
    Ok(())
}
