use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use avatar_assets::{
    blend_texture, overlay_texture, select_base_color, AssetKind, ColorVector, ImageStore,
    MatchQuery, OverlayParams, ResolutionMiss, Resolver, SecondaryLayer, BASE_COLOR_MARKER,
};

use crate::config::AssemblyConfig;
use crate::customization::{BlendWeights, Customization, Palette};
use crate::manifest::{DecalRecord, ExportRequest, PartRecord, SceneManifest};
use crate::rules::{is_selected, pattern_name, Overrides, SlotChoice};
use crate::scratch::ScratchDir;

const PATTERN_MARKER: &str = "PatternColor";

/// Inputs for importing one mesh and compositing its texture.
#[derive(Debug, Clone, PartialEq)]
pub struct PartRequest {
    pub name: String,
    pub pattern: Option<String>,
    pub main_texture: Option<String>,
    pub second_texture: Option<String>,
    pub main_tint: ColorVector,
    pub second_tint: Option<ColorVector>,
    pub shape_keys: Option<[f32; 3]>,
    pub excludes: Vec<String>,
    pub includes: Vec<String>,
    pub exact: bool,
}

impl PartRequest {
    pub fn new(name: impl Into<String>, main_tint: ColorVector) -> Self {
        Self {
            name: name.into(),
            pattern: None,
            main_texture: None,
            second_texture: None,
            main_tint,
            second_tint: None,
            shape_keys: None,
            excludes: Vec::new(),
            includes: Vec::new(),
            exact: false,
        }
    }

    pub fn pattern(mut self, pattern: Option<String>) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn main_texture(mut self, texture: Option<String>) -> Self {
        self.main_texture = texture;
        self
    }

    pub fn second_tint(mut self, tint: ColorVector) -> Self {
        self.second_tint = Some(tint);
        self
    }

    pub fn shape_keys(mut self, keys: [f32; 3]) -> Self {
        self.shape_keys = Some(keys);
        self
    }

    pub fn excluding(mut self, excludes: &[String]) -> Self {
        self.excludes.extend_from_slice(excludes);
        self
    }

    pub fn including(mut self, includes: &[String]) -> Self {
        self.includes.extend_from_slice(includes);
        self
    }

    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// Applies the texture, color and lookup settings a slot's rules forced.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(texture) = &overrides.main_texture {
            self.main_texture = Some(texture.clone());
        }
        if let Some(texture) = &overrides.second_texture {
            self.second_texture = Some(texture.clone());
        }
        if let Some(color) = overrides.second_color {
            self.second_tint = Some(color);
        }
        if let Some(exact) = overrides.exact {
            self.exact = exact;
        }
        self
    }
}

/// Drives the engines over one customization, collecting manifest entries.
pub struct Assembler<'a, S: ImageStore> {
    config: &'a AssemblyConfig,
    resolver: Resolver<'a>,
    store: S,
    scratch: ScratchDir,
    parts: Vec<PartRecord>,
    decals: Vec<DecalRecord>,
    misses: Vec<String>,
}

impl<'a, S: ImageStore> Assembler<'a, S> {
    pub fn new(config: &'a AssemblyConfig, resolver: Resolver<'a>, store: S, scratch: ScratchDir) -> Self {
        Self {
            config,
            resolver,
            store,
            scratch,
            parts: Vec::new(),
            decals: Vec::new(),
            misses: Vec::new(),
        }
    }

    pub fn parts(&self) -> &[PartRecord] {
        &self.parts
    }

    pub fn misses(&self) -> &[String] {
        &self.misses
    }

    fn head_target(&self) -> PathBuf {
        self.scratch.texture(&self.config.assets.head_texture)
    }

    fn texture_path(&self, file_name: &str) -> PathBuf {
        self.resolver.catalog().path_of(AssetKind::Texture, file_name)
    }

    /// Resolves a part's model and textures, composites the texture into the
    /// scratch directory and records the part. Returns `false` when no model
    /// matched.
    pub fn import_part(&mut self, request: PartRequest) -> Result<bool> {
        let config = self.config;
        let assets = &config.assets;
        let resolver = self.resolver;
        let query = MatchQuery::new(request.name.as_str())
            .excluding(request.excludes.iter().cloned())
            .including(request.includes.iter().cloned())
            .exact(request.exact);
        let model = match resolver
            .models(&query)
            .require(AssetKind::Model, &request.name)
        {
            Ok(resolution) => resolution.matches.into_iter().next().unwrap_or_default(),
            Err(miss) => {
                log::error!("{miss}");
                self.misses.push(miss.to_string());
                return Ok(false);
            }
        };
        log::debug!("selected model {model} for {}", request.name);

        let (texture_matches, main_texture) = match &request.main_texture {
            Some(texture) => (vec![texture.clone()], texture.clone()),
            None => {
                let mut matches = resolver
                    .textures(&MatchQuery::new(request.name.as_str()).excluding(request.excludes.iter().cloned()))
                    .matches;
                if matches.is_empty() {
                    matches.push(assets.fallback_texture.clone());
                }
                let chosen = match select_base_color(&matches) {
                    Some(texture) => texture.to_string(),
                    None => {
                        log::warn!(
                            "no {BASE_COLOR_MARKER} texture among {} candidates for {}; using {}",
                            matches.len(),
                            request.name,
                            assets.fallback_texture
                        );
                        assets.fallback_texture.clone()
                    }
                };
                (matches, chosen)
            }
        };
        log::debug!("selected main texture {main_texture} for {}", request.name);

        let second_texture = match &request.pattern {
            Some(pattern) => {
                let chosen = pattern_texture(pattern, &request, &texture_matches);
                match &chosen {
                    Some(texture) => log::debug!("selected pattern texture {texture} for {pattern}"),
                    None => log::debug!("no pattern texture for {pattern}"),
                }
                chosen
            }
            None => None,
        };

        let primary = resolver.catalog().path_of(AssetKind::Texture, &main_texture);
        let file_name = Path::new(&main_texture)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| main_texture.clone());
        let destination = self.scratch.texture(&file_name);
        let second_path = second_texture
            .as_deref()
            .map(|texture| resolver.catalog().path_of(AssetKind::Texture, texture));
        let secondary = second_path
            .as_deref()
            .zip(request.second_tint)
            .map(|(path, tint)| SecondaryLayer { path, tint });

        let outcome = blend_texture(&self.store, &primary, request.main_tint, secondary, Some(&destination))
            .with_context(|| format!("compositing texture for {}", request.name))?;
        log::info!("imported {} using {model} and {file_name}", request.name);

        self.parts.push(PartRecord {
            request: request.name,
            model: resolver.catalog().path_of(AssetKind::Model, &model),
            texture: destination,
            main_texture,
            second_texture,
            shape_keys: request.shape_keys,
            blend: outcome,
        });
        Ok(true)
    }

    /// Stamps the first `kind` asset matching `value` into the head texture
    /// once per placement.
    fn stamp_feature(
        &mut self,
        feature: &str,
        kind: AssetKind,
        value: &str,
        placements: &[OverlayParams],
        tint: ColorVector,
    ) -> Result<()> {
        let target = self.head_target();
        if !self.store.exists(&target) {
            log::warn!("skipping {feature}: {} was not composited", target.display());
            return Ok(());
        }
        let resolution = self.resolver.direct(kind, value);
        let Some(source_name) = resolution.first() else {
            let miss = ResolutionMiss {
                kind,
                query: value.to_string(),
            };
            log::error!("no {feature} found: {miss}");
            self.misses.push(miss.to_string());
            return Ok(());
        };
        log::debug!("found {feature} {source_name}");
        let source = self.resolver.catalog().path_of(kind, source_name);
        for params in placements {
            let params = params.with_tint(tint);
            let stats = overlay_texture(&self.store, &target, &source, &params)
                .with_context(|| format!("stamping {feature} {}", source.display()))?;
            self.decals.push(DecalRecord {
                feature: feature.to_string(),
                source: source.clone(),
                target: target.clone(),
                stats: Some(stats),
            });
        }
        Ok(())
    }

    /// Mixes `layer` (a texture file name) over the head texture in place.
    fn blend_into_head(&mut self, feature: &str, layer: &str, tint: ColorVector) -> Result<()> {
        let target = self.head_target();
        if !self.store.exists(&target) {
            log::warn!("skipping {feature}: {} was not composited", target.display());
            return Ok(());
        }
        let source = self.texture_path(layer);
        blend_texture(
            &self.store,
            &target,
            ColorVector::WHITE,
            Some(SecondaryLayer { path: &source, tint }),
            None,
        )
        .with_context(|| format!("blending {feature} into {}", target.display()))?;
        log::debug!("blended {feature} {layer} into head");
        self.decals.push(DecalRecord {
            feature: feature.to_string(),
            source,
            target,
            stats: None,
        });
        Ok(())
    }

    fn choose(&self, customization: &Customization, slot: &str) -> SlotChoice {
        self.config
            .slot(slot)
            .choose(&customization.slot_value(slot), customization.slot_properties(slot))
    }

    /// Imports every part in dependency order; the head texture must exist
    /// before faces are stamped onto it.
    pub fn assemble(&mut self, customization: &Customization, weights: &BlendWeights) -> Result<()> {
        let config = self.config;
        let assets = &config.assets;
        let palette = &customization.color_palette;
        let skin = palette.get("SkinColor").unwrap_or(ColorVector::WHITE);

        self.import_part(PartRequest::new(&assets.head_model, skin).shape_keys(weights.face))?;

        let hat = self.choose(customization, "Hat");
        let hair = self.choose(customization, "Hair");
        let hair_name = if hat.is_selected() {
            self.import_part(
                PartRequest::new(&hat.value, palette.require("Generic Hat Color")?)
                    .pattern(hat.pattern.clone())
                    .second_tint(palette.require("Generic Hat Secondary Color")?)
                    .shape_keys(weights.face)
                    .with_overrides(&hat.overrides),
            )?;
            format!("{}{}", hair.value, assets.hat_hair_suffix)
        } else {
            hair.value.clone()
        };
        if hair.is_selected() {
            self.import_part(
                PartRequest::new(hair_name, palette.require("Hair Color")?)
                    .pattern(hair.pattern.clone())
                    .second_tint(palette.require("Hair Dye Color")?)
                    .shape_keys(weights.face)
                    .with_overrides(&hair.overrides),
            )?;
        }

        let facial_hair = self.choose(customization, "Facial Hair");
        if facial_hair.is_selected() {
            self.import_part(
                PartRequest::new(&facial_hair.value, palette.require("Hair Color")?)
                    .shape_keys(weights.face)
                    .with_overrides(&facial_hair.overrides),
            )?;
        }

        let eyewear = self.choose(customization, "Eyewear");
        if eyewear.is_selected() {
            self.import_part(
                PartRequest::new(&eyewear.value, palette.require("Generic Glasses Color")?)
                    .with_overrides(&eyewear.overrides),
            )?;
        }

        let nose = self.choose(customization, "Noses");
        if nose.is_selected() {
            self.import_part(
                PartRequest::new(&nose.value, palette.require("SkinColor")?)
                    .with_overrides(&nose.overrides),
            )?;
        }

        self.import_part(
            PartRequest::new(&assets.body_model, palette.require("SkinColor")?)
                .shape_keys(weights.body),
        )?;

        let top = self.choose(customization, "Top");
        if top.is_selected() {
            self.import_part(
                PartRequest::new(&top.value, palette.require("Generic Top Color")?)
                    .pattern(top.pattern.clone())
                    .second_tint(palette.require("Generic Top Secondary Color")?)
                    .excluding(&assets.garment_excludes)
                    .shape_keys(weights.body)
                    .with_overrides(&top.overrides),
            )?;
        }

        let jacket = self.choose(customization, "Jacket");
        let jacket_color = palette.jacket_color(&jacket.value).to_string();
        log::debug!("jacket color {jacket_color}");
        if jacket.is_selected() {
            self.import_part(
                PartRequest::new(&jacket.value, palette.require(&jacket_color)?)
                    .pattern(jacket.pattern.clone())
                    .second_tint(palette.require("Generic Jacket Secondary Color")?)
                    .excluding(&assets.garment_excludes)
                    .shape_keys(weights.body)
                    .with_overrides(&jacket.overrides),
            )?;
        }

        let bottom = self.choose(customization, "Bottom");
        if bottom.is_selected() {
            self.import_part(
                PartRequest::new(&bottom.value, palette.require("Generic Bottoms Color")?)
                    .shape_keys(weights.body)
                    .with_overrides(&bottom.overrides),
            )?;
        }

        for hand in &assets.hand_models {
            self.import_part(PartRequest::new(hand, palette.require("SkinColor")?))?;
        }
        let nail_tint = match pattern_name(&customization.slot_properties("Fingernails")) {
            Some(_) => palette.require("NailColor")?,
            None => palette.require("SkinColor")?,
        };
        for nails in &assets.nail_models {
            self.import_part(
                PartRequest::new(nails, nail_tint).main_texture(Some(assets.nail_texture.clone())),
            )?;
        }

        self.import_cuffs(palette, &top, &jacket, &jacket_color)?;

        let eyes = self.choose(customization, "Eyes");
        if eyes.is_selected() {
            self.stamp_feature("eye", AssetKind::Eye, &eyes.value, &config.features.eyes, ColorVector::WHITE)?;
        }
        let mouth = self.choose(customization, "Mouth");
        if mouth.is_selected() {
            self.stamp_feature("mouth", AssetKind::Mouth, &mouth.value, &config.features.mouth, ColorVector::WHITE)?;
        }
        let eyebrows = self.choose(customization, "Eyebrows");
        if eyebrows.is_selected() {
            let tint = palette.require("Hair Color")?;
            self.stamp_feature(
                "eyebrow",
                AssetKind::Texture,
                &eyebrows.value,
                &config.features.eyebrows,
                tint,
            )?;
        }

        if hair.value == assets.buzzed_hair {
            self.blend_into_head("buzzed hair", &assets.shaved_texture, palette.require("Hair Color")?)?;
        }

        let stubble = customization
            .property("Skin", "FacialHairVariants")
            .unwrap_or("No_Stubble");
        if is_selected(stubble) {
            let stubble = config.slot("Stubble").choose(stubble, Default::default());
            match self.resolver.direct(AssetKind::Texture, &stubble.value).first() {
                Some(texture) => {
                    let texture = texture.to_string();
                    self.blend_into_head("stubble", &texture, palette.require("Hair Color")?)?;
                }
                None => {
                    let miss = ResolutionMiss {
                        kind: AssetKind::Texture,
                        query: stubble.value.clone(),
                    };
                    log::warn!("no stubble found: {miss}");
                    self.misses.push(miss.to_string());
                }
            }
        }
        Ok(())
    }

    /// Jacket cuffs for both sides when a jacket is worn; plain cuffs in the
    /// top's color when there is no jacket or either side is missing.
    fn import_cuffs(
        &mut self,
        palette: &Palette,
        top: &SlotChoice,
        jacket: &SlotChoice,
        jacket_color: &str,
    ) -> Result<()> {
        let config = self.config;
        let assets = &config.assets;
        let mut jacket_cuffs = false;
        if jacket.is_selected() {
            let forced = [&top.overrides, &jacket.overrides]
                .into_iter()
                .find(|overrides| overrides.cuff_model.is_some());
            let model = forced
                .and_then(|overrides| overrides.cuff_model.clone())
                .unwrap_or_else(|| jacket.value.clone());
            let texture = forced.and_then(|overrides| overrides.cuff_texture.clone());
            let tint = palette.require(jacket_color)?;

            jacket_cuffs = true;
            for includes in &assets.cuff_includes {
                let found = self.import_part(
                    PartRequest::new(&model, tint)
                        .main_texture(texture.clone())
                        .including(includes),
                )?;
                jacket_cuffs &= found;
            }
        }
        if jacket_cuffs {
            return Ok(());
        }

        let texture = self
            .resolver
            .textures(&MatchQuery::new(top.value.as_str()))
            .marked(BASE_COLOR_MARKER)
            .first()
            .map(|texture| texture.to_string())
            .unwrap_or_else(|| assets.fallback_cuff_texture.clone());
        let tint = palette.require("Generic Top Color")?;
        for cuff in &assets.fallback_cuff_models {
            self.import_part(
                PartRequest::new(cuff, tint)
                    .main_texture(Some(texture.clone()))
                    .exact(true),
            )?;
        }
        Ok(())
    }

    pub fn finish(self, id: String, blend_weights: BlendWeights, export: ExportRequest) -> SceneManifest {
        SceneManifest {
            id,
            scratch: self.scratch.textures().to_path_buf(),
            blend_weights,
            parts: self.parts,
            decals: self.decals,
            misses: self.misses,
            export,
        }
    }
}

/// A forced second texture wins; otherwise the pattern cascade picks among
/// the `PatternColor` candidates, taking the last match or the last candidate
/// when the cascade misses. Nothing is chosen without a second tint.
fn pattern_texture(pattern: &str, request: &PartRequest, texture_matches: &[String]) -> Option<String> {
    if let Some(texture) = &request.second_texture {
        return Some(texture.clone());
    }
    request.second_tint?;
    let candidates: Vec<String> = texture_matches
        .iter()
        .filter(|entry| entry.contains(PATTERN_MARKER))
        .cloned()
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let matched = Resolver::patterns(pattern, &candidates);
    matched
        .last()
        .or_else(|| candidates.last().map(String::as_str))
        .map(str::to_string)
}
