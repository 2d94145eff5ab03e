use std::collections::BTreeMap;

use avatar_assets::ColorVector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Always,
    Equals(String),
    Contains(String),
    Property { key: String, equals: String },
    All(Vec<Condition>),
}

impl Condition {
    pub fn matches(&self, subject: &str, properties: &BTreeMap<String, String>) -> bool {
        match self {
            Condition::Always => true,
            Condition::Equals(expected) => subject == expected,
            Condition::Contains(needle) => subject.contains(needle.as_str()),
            Condition::Property { key, equals } => {
                properties.get(key).map(String::as_str) == Some(equals.as_str())
            }
            Condition::All(conditions) => conditions
                .iter()
                .all(|condition| condition.matches(subject, properties)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rewrite {
    Set(String),
    Replace { from: String, to: String },
}

impl Rewrite {
    pub fn apply(&self, subject: &str) -> String {
        match self {
            Rewrite::Set(value) => value.clone(),
            Rewrite::Replace { from, to } => subject.replace(from.as_str(), to),
        }
    }
}

/// Per-part settings a rule can force. Unset fields leave the driver's
/// defaults in place.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Overrides {
    pub exact: Option<bool>,
    pub main_texture: Option<String>,
    pub second_texture: Option<String>,
    pub second_color: Option<ColorVector>,
    pub pattern: Option<String>,
    pub cuff_model: Option<String>,
    pub cuff_texture: Option<String>,
}

impl Overrides {
    /// Copies every field `other` sets over the ones in `self`.
    pub fn merge(&mut self, other: &Overrides) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        take(&mut self.exact, &other.exact);
        take(&mut self.main_texture, &other.main_texture);
        take(&mut self.second_texture, &other.second_texture);
        take(&mut self.second_color, &other.second_color);
        take(&mut self.pattern, &other.pattern);
        take(&mut self.cuff_model, &other.cuff_model);
        take(&mut self.cuff_texture, &other.cuff_texture);
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub when: Condition,
    #[serde(default)]
    pub rewrite: Option<Rewrite>,
    #[serde(default)]
    pub overrides: Overrides,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlotRules {
    /// Applied to the slot's selected value.
    pub value: Vec<Rule>,
    /// Applied to the pattern name derived from the slot's properties.
    pub pattern: Vec<Rule>,
}

/// Runs `rules` in order. Each rule sees the subject as rewritten by the
/// rules before it; overrides accumulate with later rules winning.
pub fn apply_rules(
    rules: &[Rule],
    subject: &str,
    properties: &BTreeMap<String, String>,
) -> (String, Overrides) {
    let mut current = subject.to_string();
    let mut overrides = Overrides::default();
    for rule in rules {
        if !rule.when.matches(&current, properties) {
            continue;
        }
        if let Some(rewrite) = &rule.rewrite {
            let rewritten = rewrite.apply(&current);
            if rewritten != current {
                log::debug!("rule rewrote {current} -> {rewritten}");
            }
            current = rewritten;
        }
        overrides.merge(&rule.overrides);
    }
    (current, overrides)
}

/// A slot's value and pattern after its rules ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotChoice {
    pub value: String,
    pub pattern: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub overrides: Overrides,
}

impl SlotChoice {
    pub fn is_selected(&self) -> bool {
        is_selected(&self.value)
    }
}

impl SlotRules {
    /// Resolves a slot. `value` is expected to be normalized already.
    pub fn choose(&self, value: &str, properties: BTreeMap<String, String>) -> SlotChoice {
        let (value, mut overrides) = apply_rules(&self.value, value, &properties);

        let mut pattern = pattern_name(&properties).map(|name| {
            let (name, pattern_overrides) = apply_rules(&self.pattern, name, &properties);
            overrides.merge(&pattern_overrides);
            name
        });
        if let Some(forced) = overrides.pattern.take() {
            pattern = Some(forced);
        }

        SlotChoice {
            value,
            pattern,
            properties,
            overrides,
        }
    }
}

/// A value starting with `No_` marks an empty slot.
pub fn is_selected(value: &str) -> bool {
    !value.starts_with("No_")
}

/// First property (by key) that is neither a geometry variant nor a plain
/// material.
pub fn pattern_name(properties: &BTreeMap<String, String>) -> Option<&str> {
    properties
        .iter()
        .find(|(key, value)| !key.contains("Geo") && !value.contains("Plain"))
        .map(|(_, value)| value.as_str())
}
