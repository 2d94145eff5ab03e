use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use avatar_assets::{ImageStore, PixelBuffer, PngStore};
use serde_json::Value;
use tempfile::tempdir;

const CUSTOMIZATION: &str = r#"{
    "color_palette": {
        "SkinColor": [0.5, 0.5, 0.5, 1.0],
        "Generic Top Color": [0.2, 0.4, 0.6, 1.0],
        "Generic Top Secondary Color": [1.0, 1.0, 1.0, 1.0]
    },
    "selections": {
        "Top": { "value": "Tshirt 001", "properties": {} },
        "Eyes": { "value": "Eyes Round", "properties": {} }
    },
    "blend_sets": {
        "FaceShape": { "Pointy": 0.0, "Square": 0.5, "Chiseled": 0.0 },
        "BodyShape": { "Pear": 1.0, "Triangle": 0.0, "Hourglass": 0.0 }
    }
}"#;

fn write_asset_root(root: &Path) -> Result<()> {
    let models = root.join("Models");
    let textures = root.join("Textures");
    fs::create_dir_all(&models).context("creating Models")?;
    fs::create_dir_all(textures.join("eyes")).context("creating eyes")?;
    fs::create_dir_all(textures.join("mouths")).context("creating mouths")?;

    for model in [
        "Avatar_Head.fbx",
        "Avatar_Body.fbx",
        "Avatar_Hand_L.fbx",
        "Avatar_Hand_R.fbx",
        "Avatar_Nails_L.fbx",
        "Avatar_Nails_R.fbx",
        "Cuff_L.fbx",
        "Cuff_R.fbx",
        "Tshirt_001.fbx",
    ] {
        fs::write(models.join(model), b"fbx").with_context(|| format!("writing {model}"))?;
    }

    let white = PixelBuffer::filled(4, 4, [1.0; 4]);
    for texture in [
        "Avatar_Head_BaseColor.png",
        "Body_BaseColor.png",
        "Fingernails_BaseColor.png",
        "Tshirt_001_BaseColor.png",
    ] {
        PngStore.save(&white, &textures.join(texture))?;
    }

    // Black background with a single white pixel to the right of the origin.
    let mut eye = PixelBuffer::filled(2, 2, [0.0, 0.0, 0.0, 1.0]);
    eye.set_pixel(1, 0, [1.0; 4]);
    PngStore.save(&eye, &textures.join("eyes").join("Round_001.png"))?;
    Ok(())
}

#[test]
fn assembles_customization_into_manifest() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for assembly")?;
    let asset_root = temp_dir.path().join("assets");
    write_asset_root(&asset_root)?;

    let input = temp_dir.path().join("customization.json");
    fs::write(&input, CUSTOMIZATION).context("writing customization")?;
    let output = temp_dir.path().join("Exports").join("avatar.json");
    let tmp_root = temp_dir.path().join("tmp");

    let status = Command::new(env!("CARGO_BIN_EXE_avatar_assembler"))
        .current_dir(temp_dir.path())
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--asset-root")
        .arg(&asset_root)
        .arg("--tmp-root")
        .arg(&tmp_root)
        .arg("--preview")
        .status()
        .context("executing avatar_assembler")?;
    assert!(status.success(), "avatar_assembler exited with {status:?}");
    assert!(output.is_file(), "avatar_assembler did not write a manifest");

    let manifest: Value = serde_json::from_str(&fs::read_to_string(&output)?)
        .context("parsing scene manifest")?;

    let requests: Vec<&str> = manifest["parts"]
        .as_array()
        .context("parts array")?
        .iter()
        .filter_map(|part| part["request"].as_str())
        .collect();
    assert_eq!(
        requests,
        [
            "Avatar_Head",
            "Avatar_Body",
            "Tshirt_001",
            "Avatar_Hand_L",
            "Avatar_Hand_R",
            "Avatar_Nails_L",
            "Avatar_Nails_R",
            "Cuff_L",
            "Cuff_R",
        ]
    );
    assert_eq!(manifest["misses"].as_array().map(Vec::len), Some(0));
    assert_eq!(manifest["decals"].as_array().map(Vec::len), Some(2));
    assert_eq!(manifest["export"]["rig"], Value::Bool(false));
    assert!(manifest["export"]["preview"]
        .as_str()
        .is_some_and(|preview| preview.ends_with("avatar.png")));

    let id = manifest["id"].as_str().context("manifest id")?;
    assert_eq!(id.len(), 64);
    let head = tmp_root
        .join(id)
        .join("textures")
        .join("Avatar_Head_BaseColor.png");
    let head = PngStore.load(&head)?;

    // Both eye stamps land on the second row; the rest keeps the skin tint.
    assert_eq!(head.pixel(0, 1), Some([1.0; 4]));
    assert_eq!(head.pixel(1, 1), Some([1.0; 4]));
    let skin = head.pixel(3, 3).context("head pixel")?;
    assert!((skin[0] - 0.5).abs() < 1.0 / 255.0, "unexpected skin tone {skin:?}");
    assert_eq!(skin[3], 1.0);
    Ok(())
}

#[test]
fn missing_input_fails() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory")?;
    let output = Command::new(env!("CARGO_BIN_EXE_avatar_assembler"))
        .current_dir(temp_dir.path())
        .args(["--input", "missing.json"])
        .output()
        .context("executing avatar_assembler")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("doesn't exist"), "stderr was: {stderr}");
    Ok(())
}
