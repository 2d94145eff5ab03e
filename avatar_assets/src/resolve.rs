//! Fuzzy mapping from customization vocabulary to catalog file names.
//!
//! A query matches a file when the lower-cased query is a substring of the
//! file name with its extension stripped, spaces turned into underscores and
//! lower-cased. A [`Cascade`] retries with rewritten queries until one stage
//! produces at least one match.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::{AssetKind, Catalog};
use crate::error::ResolutionMiss;

/// Marker carried by every main ("base color") texture.
pub const BASE_COLOR_MARKER: &str = "BaseColor";

const RECOGNIZED_EXTENSIONS: [&str; 2] = [".fbx", ".png"];

static DIGIT_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"_\d{3}$").expect("valid regex"));
static LEADING_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+_").expect("valid regex"));
static VARIANT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Variant_").expect("valid regex"));
static TRAILING_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_[A-Za-z]+$").expect("valid regex"));

/// Lower-cased comparison form of a catalog file name.
pub fn normalize_entry(name: &str) -> String {
    let lower = name.to_lowercase();
    let stem = RECOGNIZED_EXTENSIONS
        .iter()
        .find_map(|ext| lower.strip_suffix(ext))
        .unwrap_or(lower.as_str());
    stem.replace(' ', "_")
}

pub fn entry_matches(entry: &str, query: &str) -> bool {
    normalize_entry(entry).contains(&query.to_lowercase())
}

fn substring_matches(candidates: &[String], query: &str) -> Vec<String> {
    let needle = query.to_lowercase();
    candidates
        .iter()
        .filter(|entry| normalize_entry(entry).contains(&needle))
        .cloned()
        .collect()
}

/// Query rewrite applied by one fallback stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTransform {
    /// `Top_Shirt_001` -> `Top_Shirt`
    StripDigitSuffix,
    /// `Top_Shirt` -> `Geo_Shirt`
    GeoPrefix,
    /// `Top_Shirt` -> `Shirt`
    StripLeadingWord,
    /// `Variant_Dress_Floral` -> `Dress_Floral`
    StripVariantPrefix,
    /// `Variant_Dress_Floral` -> `Dress`
    StripVariantAndTrailingWord,
}

impl QueryTransform {
    pub fn apply(self, query: &str) -> String {
        match self {
            QueryTransform::StripDigitSuffix => DIGIT_SUFFIX.replace(query, "").into_owned(),
            QueryTransform::GeoPrefix => format!("Geo_{}", LEADING_WORD.replace(query, "")),
            QueryTransform::StripLeadingWord => LEADING_WORD.replace(query, "").into_owned(),
            QueryTransform::StripVariantPrefix => VARIANT_PREFIX.replace(query, "").into_owned(),
            QueryTransform::StripVariantAndTrailingWord => {
                let stripped = VARIANT_PREFIX.replace(query, "");
                TRAILING_WORD.replace(&stripped, "").into_owned()
            }
        }
    }
}

/// Ordered fallback stages for one kind of lookup.
#[derive(Debug, Clone, Copy)]
pub struct Cascade {
    pub label: &'static str,
    /// Suffix removed from the raw query before stage 0.
    pub trim_suffix: Option<&'static str>,
    pub stages: &'static [QueryTransform],
}

impl Cascade {
    pub const MODEL: Cascade = Cascade {
        label: "model",
        trim_suffix: None,
        stages: &[
            QueryTransform::StripDigitSuffix,
            QueryTransform::GeoPrefix,
            QueryTransform::StripLeadingWord,
        ],
    };

    pub const TEXTURE: Cascade = Cascade {
        label: "texture",
        trim_suffix: Some("_HatHair"),
        stages: &[
            QueryTransform::StripDigitSuffix,
            QueryTransform::StripLeadingWord,
        ],
    };

    pub const PATTERN: Cascade = Cascade {
        label: "pattern",
        trim_suffix: None,
        stages: &[
            QueryTransform::StripVariantPrefix,
            QueryTransform::StripVariantAndTrailingWord,
        ],
    };

    /// Plain substring lookup with no fallbacks.
    pub const DIRECT: Cascade = Cascade {
        label: "direct",
        trim_suffix: None,
        stages: &[],
    };

    pub fn stage_count(&self) -> usize {
        self.stages.len() + 1
    }

    /// Query string tried at `stage`; stage 0 is the (trimmed) raw query.
    pub fn stage_query(&self, query: &str, stage: usize) -> Option<String> {
        let base = self.prepare(query);
        match stage {
            0 => Some(base.to_string()),
            n => self.stages.get(n - 1).map(|transform| transform.apply(base)),
        }
    }

    fn prepare<'q>(&self, query: &'q str) -> &'q str {
        self.trim_suffix
            .and_then(|suffix| query.strip_suffix(suffix))
            .unwrap_or(query)
    }

    /// Runs the stages in order against `candidates` and returns the first
    /// non-empty stage result. Later stages are never evaluated once a stage
    /// has matched.
    pub fn run(&self, query: &str, candidates: &[String]) -> Resolution {
        let base = self.prepare(query);
        let mut matches = substring_matches(candidates, base);
        if !matches.is_empty() {
            return Resolution::matched(0, base.to_string(), matches);
        }

        for (index, transform) in self.stages.iter().enumerate() {
            let rewritten = transform.apply(base);
            matches = substring_matches(candidates, &rewritten);
            if !matches.is_empty() {
                return Resolution::matched(index + 1, rewritten, matches);
            }
        }

        Resolution::miss(base.to_string())
    }
}

/// Symbolic lookup request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchQuery {
    pub name: String,
    /// Drop entries containing any of these (case-sensitive, raw file name).
    pub excludes: Vec<String>,
    /// Keep only entries containing at least one of these.
    pub includes: Vec<String>,
    /// Skip the cascade and use `<name>.<ext>` verbatim.
    pub exact: bool,
}

impl MatchQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn excluding<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(excludes.into_iter().map(Into::into));
        self
    }

    pub fn including<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(includes.into_iter().map(Into::into));
        self
    }

    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }
}

/// Outcome of one cascade run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Stage that produced the matches; `None` for a miss or an exact lookup.
    pub stage: Option<usize>,
    /// Query string used by the winning stage, or the raw query on a miss.
    pub query: String,
    pub matches: Vec<String>,
}

impl Resolution {
    fn matched(stage: usize, query: String, matches: Vec<String>) -> Self {
        Self {
            stage: Some(stage),
            query,
            matches,
        }
    }

    fn miss(query: String) -> Self {
        Self {
            stage: None,
            query,
            matches: Vec::new(),
        }
    }

    fn exact(file_name: String) -> Self {
        Self {
            stage: None,
            query: file_name.clone(),
            matches: vec![file_name],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn first(&self) -> Option<&str> {
        self.matches.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.matches.last().map(String::as_str)
    }

    /// Applies excludes then includes to the winning stage's matches. An
    /// emptied result stays empty; no other stage is consulted.
    pub fn filter(mut self, excludes: &[String], includes: &[String]) -> Self {
        if !excludes.is_empty() {
            self.matches
                .retain(|entry| !excludes.iter().any(|needle| entry.contains(needle.as_str())));
        }
        if !includes.is_empty() {
            self.matches
                .retain(|entry| includes.iter().any(|needle| entry.contains(needle.as_str())));
        }
        self
    }

    /// Entries containing `marker`, in catalog order.
    pub fn marked(&self, marker: &str) -> Vec<&str> {
        self.matches
            .iter()
            .filter(|entry| entry.contains(marker))
            .map(String::as_str)
            .collect()
    }

    pub fn base_color(&self) -> Option<&str> {
        select_base_color(&self.matches)
    }

    pub fn require(self, kind: AssetKind, query: &str) -> Result<Self, ResolutionMiss> {
        if self.is_empty() {
            Err(ResolutionMiss {
                kind,
                query: query.to_string(),
            })
        } else {
            Ok(self)
        }
    }
}

/// Shortest entry carrying [`BASE_COLOR_MARKER`]; ties keep catalog order.
pub fn select_base_color(candidates: &[String]) -> Option<&str> {
    candidates
        .iter()
        .filter(|entry| entry.contains(BASE_COLOR_MARKER))
        .min_by_key(|entry| entry.chars().count())
        .map(String::as_str)
}

/// Cascade lookups over a shared, read-only [`Catalog`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'c> {
    catalog: &'c Catalog,
}

impl<'c> Resolver<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    pub fn resolve(&self, kind: AssetKind, cascade: &Cascade, query: &MatchQuery) -> Resolution {
        if query.exact {
            return Resolution::exact(format!("{}.{}", query.name, kind.extension()));
        }
        let resolution = cascade.run(&query.name, self.catalog.entries(kind));
        log::debug!(
            "{} lookup for {} -> {} match(es) at stage {:?}",
            cascade.label,
            query.name,
            resolution.len(),
            resolution.stage
        );
        resolution.filter(&query.excludes, &query.includes)
    }

    pub fn models(&self, query: &MatchQuery) -> Resolution {
        self.resolve(AssetKind::Model, &Cascade::MODEL, query)
    }

    pub fn textures(&self, query: &MatchQuery) -> Resolution {
        self.resolve(AssetKind::Texture, &Cascade::TEXTURE, query)
    }

    /// Substring-only lookup in any folder (eyes, mouths, eyebrow and stubble
    /// textures).
    pub fn direct(&self, kind: AssetKind, name: &str) -> Resolution {
        self.resolve(kind, &Cascade::DIRECT, &MatchQuery::new(name))
    }

    /// Pattern lookup over a caller-supplied shortlist rather than a catalog
    /// folder.
    pub fn patterns(name: &str, shortlist: &[String]) -> Resolution {
        Cascade::PATTERN.run(name, shortlist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|name| name.to_string()).collect()
    }

    fn model_catalog(list: &[&str]) -> Catalog {
        Catalog::from_listings("assets", [(AssetKind::Model, names(list))])
    }

    #[test]
    fn normalizes_extension_spaces_and_case() {
        assert_eq!(normalize_entry("Geo Shirt_001.FBX"), "geo_shirt_001");
        assert_eq!(normalize_entry("Body_BaseColor.png"), "body_basecolor");
        assert_eq!(normalize_entry("notes.txt"), "notes.txt");
        assert!(entry_matches("Hair Buzzed_001.fbx", "hair_BUZZED"));
        assert!(!entry_matches("Hair_Buzzed_001.fbx", "fbx"));
    }

    #[test]
    fn stage_zero_match_skips_fallbacks() {
        let catalog = model_catalog(&["Hair_Buzzed_001.fbx"]);
        let resolution = Resolver::new(&catalog).models(&MatchQuery::new("Hair_Buzzed"));
        assert_eq!(resolution.stage, Some(0));
        assert_eq!(resolution.query, "Hair_Buzzed");
        assert_eq!(resolution.matches, ["Hair_Buzzed_001.fbx"]);
    }

    #[test]
    fn falls_back_to_geo_prefix() {
        let catalog = model_catalog(&["Geo_Shirt_001.fbx"]);
        let resolution = Resolver::new(&catalog).models(&MatchQuery::new("Top_Shirt_001"));
        assert_eq!(resolution.stage, Some(2));
        assert_eq!(resolution.query, "Geo_Shirt_001");
        assert_eq!(resolution.matches, ["Geo_Shirt_001.fbx"]);
    }

    #[test]
    fn falls_back_to_dropping_leading_word() {
        let catalog = model_catalog(&["Shirt_Long.fbx"]);
        let resolution = Resolver::new(&catalog).models(&MatchQuery::new("Top_Shirt_Long"));
        assert_eq!(resolution.stage, Some(3));
        assert_eq!(resolution.matches, ["Shirt_Long.fbx"]);
    }

    #[test]
    fn miss_returns_empty_resolution() {
        let catalog = model_catalog(&["Avatar_Head.fbx"]);
        let resolution = Resolver::new(&catalog).models(&MatchQuery::new("Hat_Cowboy"));
        assert!(resolution.is_empty());
        assert_eq!(resolution.stage, None);
        let miss = resolution.require(AssetKind::Model, "Hat_Cowboy").unwrap_err();
        assert_eq!(miss.to_string(), "no model matches found for Hat_Cowboy");
    }

    #[test]
    fn resolution_is_deterministic_and_sorted() {
        let catalog = model_catalog(&["Hair_B.fbx", "Hair_A.fbx", "Hair_C.fbx"]);
        let resolver = Resolver::new(&catalog);
        let first = resolver.models(&MatchQuery::new("hair"));
        let second = resolver.models(&MatchQuery::new("hair"));
        assert_eq!(first, second);
        assert_eq!(first.matches, ["Hair_A.fbx", "Hair_B.fbx", "Hair_C.fbx"]);
    }

    #[test]
    fn excludes_apply_after_cascade_only() {
        let catalog = model_catalog(&["A_Cuff_L.fbx", "A_Body.fbx"]);
        let resolver = Resolver::new(&catalog);
        let resolution = resolver.models(&MatchQuery::new("A_").excluding(["Cuff"]));
        assert_eq!(resolution.matches, ["A_Body.fbx"]);

        // Emptying the stage result must not trigger a later stage, even
        // though "Body" alone would match at stage 3.
        let catalog = model_catalog(&["X_Body_Cuff.fbx", "Body.fbx"]);
        let resolver = Resolver::new(&catalog);
        let resolution = resolver.models(&MatchQuery::new("X_Body").excluding(["Cuff"]));
        assert_eq!(resolution.stage, Some(0));
        assert!(resolution.is_empty());
    }

    #[test]
    fn includes_keep_any_listed_substring() {
        let catalog = model_catalog(&[
            "Jacket_Cuffs_L.fbx",
            "Jacket_Cuffs_R.fbx",
            "Jacket_Main.fbx",
        ]);
        let resolution = Resolver::new(&catalog)
            .models(&MatchQuery::new("Jacket").including(["Cuffs_L", "Cuff_L"]));
        assert_eq!(resolution.matches, ["Jacket_Cuffs_L.fbx"]);
    }

    #[test]
    fn exact_mode_skips_catalog() {
        let catalog = model_catalog(&[]);
        let resolution = Resolver::new(&catalog).models(&MatchQuery::new("Cuff_L").exact(true));
        assert_eq!(resolution.matches, ["Cuff_L.fbx"]);
        assert_eq!(resolution.stage, None);
    }

    #[test]
    fn texture_cascade_trims_hat_hair_suffix() {
        let catalog = Catalog::from_listings(
            "assets",
            [(
                AssetKind::Texture,
                names(&["Bob_001_BaseColor.png", "Bob_001_HatHair_Normal.png"]),
            )],
        );
        let resolution = Resolver::new(&catalog).textures(&MatchQuery::new("Bob_001_HatHair"));
        assert_eq!(resolution.stage, Some(0));
        assert_eq!(resolution.query, "Bob_001");
        assert_eq!(
            resolution.matches,
            ["Bob_001_BaseColor.png", "Bob_001_HatHair_Normal.png"]
        );
    }

    #[test]
    fn texture_cascade_strips_digits_then_leading_word() {
        let catalog = Catalog::from_listings(
            "assets",
            [(AssetKind::Texture, names(&["Beanie_002_BaseColor.png"]))],
        );
        let resolver = Resolver::new(&catalog);
        let resolution = resolver.textures(&MatchQuery::new("Hat_Beanie_002"));
        assert_eq!(resolution.stage, Some(2));
        assert_eq!(resolution.query, "Beanie_002");
        assert_eq!(resolution.matches, ["Beanie_002_BaseColor.png"]);
    }

    #[test]
    fn pattern_cascade_strips_variant_tokens() {
        let shortlist = names(&[
            "Dress_Wrap_001_PatternColor1.png",
            "Dress_Wrap_001_Stripes_PatternColor1.png",
        ]);
        let stripes = Resolver::patterns("Variant_Dress_Wrap_001_Stripes", &shortlist);
        assert_eq!(stripes.stage, Some(1));
        assert_eq!(stripes.matches, ["Dress_Wrap_001_Stripes_PatternColor1.png"]);

        let floral = Resolver::patterns("Variant_Dress_Wrap_Floral", &shortlist);
        assert_eq!(floral.stage, Some(2));
        assert_eq!(floral.query, "Dress_Wrap");
        assert_eq!(floral.last(), Some("Dress_Wrap_001_Stripes_PatternColor1.png"));
    }

    #[test]
    fn base_color_prefers_shortest_then_catalog_order() {
        let candidates = names(&[
            "Hair_Bob_001_Long_BaseColor.png",
            "Hair_Bob_001_BaseColor.png",
            "Hair_Bob_001_Normal.png",
            "Hair_Bob_002_BaseColor.png",
        ]);
        assert_eq!(
            select_base_color(&candidates),
            Some("Hair_Bob_001_BaseColor.png")
        );
        assert_eq!(select_base_color(&names(&["Hair_Normal.png"])), None);
    }

    #[test]
    fn stage_queries_follow_transform_table() {
        let cascade = Cascade::MODEL;
        assert_eq!(cascade.stage_count(), 4);
        assert_eq!(cascade.stage_query("Top_Shirt_001", 1).as_deref(), Some("Top_Shirt"));
        assert_eq!(cascade.stage_query("Top_Shirt_001", 2).as_deref(), Some("Geo_Shirt_001"));
        assert_eq!(cascade.stage_query("Top_Shirt_001", 3).as_deref(), Some("Shirt_001"));
        assert_eq!(cascade.stage_query("Top_Shirt_001", 4), None);
    }
}
