//! Adopter preferences: the canonical structured form, a keyword extractor
//! for free text, and a completeness score.

use serde::{Deserialize, Serialize};

/// What an adopter is looking for. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AdopterPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub living_space: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_yard: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_children: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_other_pets: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_preferences: Vec<String>,
}

/// How much of the important information is known.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completeness {
    /// Weighted score in `[0, 1]`.
    pub score: f64,
    /// Human-readable names of the key preferences still unknown.
    pub missing_key: Vec<String>,
}

impl AdopterPreferences {
    /// Pick preferences out of free text by keyword.
    ///
    /// Matching is substring based and case-insensitive. When several keywords
    /// of one category appear, the one checked last wins.
    pub fn from_text(text: &str) -> Self {
        let text = text.to_lowercase();
        let has = |needle: &str| text.contains(needle);
        let mut prefs = Self::default();

        for (needle, species) in [("dog", "dog"), ("cat", "cat")] {
            if has(needle) {
                prefs.animal_type = Some(species.into());
            }
        }

        if has("small") {
            prefs.size = Some("small".into());
        }
        if has("big") || has("large") {
            prefs.size = Some("large".into());
        }
        if has("medium") {
            prefs.size = Some("medium".into());
        }

        if has("puppy") || has("kitten") || has("baby") {
            prefs.age = Some("young".into());
        }
        if has("adult") {
            prefs.age = Some("adult".into());
        }
        if has("senior") || has("older") {
            prefs.age = Some("senior".into());
        }

        if has("active") || has("energetic") {
            prefs.activity_level = Some("high".into());
        }
        if has("calm") || has("lazy") {
            prefs.activity_level = Some("low".into());
        }

        if has("apartment") {
            prefs.living_space = Some("apartment".into());
        }
        if has("house") {
            prefs.living_space = Some("house".into());
        }
        if has("yard") || has("garden") {
            prefs.has_yard = Some(true);
        }

        if has("kid") || has("child") {
            prefs.has_children = Some(true);
        }
        if has("other pet") || has("another pet") {
            prefs.has_other_pets = Some(true);
        }

        prefs.other_preferences = ["hypoallergenic", "trained", "quiet"]
            .into_iter()
            .filter(|k| has(k))
            .map(String::from)
            .collect();

        prefs
    }

    /// Extract from every message an adopter wrote, taken together.
    pub fn from_user_messages<'a>(messages: impl IntoIterator<Item = &'a str>) -> Self {
        let joined = messages.into_iter().collect::<Vec<_>>().join(" ");
        Self::from_text(&joined)
    }

    pub fn completeness(&self) -> Completeness {
        let weight = |known: bool, w: f64| if known { w } else { 0.0 };
        let score = weight(self.animal_type.is_some(), 0.3)
            + weight(self.living_space.is_some(), 0.2)
            + weight(self.has_children.is_some(), 0.2)
            + weight(self.has_other_pets.is_some(), 0.2)
            + weight(self.size.is_some(), 0.025)
            + weight(self.age.is_some(), 0.025)
            + weight(self.activity_level.is_some(), 0.025)
            + weight(self.has_yard.is_some(), 0.025);

        // An explicit `false` still counts as missing here.
        let key = [
            (self.animal_type.is_some(), "type of animal"),
            (self.living_space.is_some(), "living situation"),
            (self.has_children == Some(true), "presence of children"),
            (self.has_other_pets == Some(true), "presence of other pets"),
        ];
        let missing_key = key
            .into_iter()
            .filter(|(known, _)| !known)
            .map(|(_, name)| name.to_string())
            .collect();

        Completeness { score, missing_key }
    }

    /// Take any field from `other` that is still unset here.
    pub fn fill_from(&mut self, other: AdopterPreferences) {
        self.animal_type = self.animal_type.take().or(other.animal_type);
        self.size = self.size.take().or(other.size);
        self.age = self.age.take().or(other.age);
        self.activity_level = self.activity_level.take().or(other.activity_level);
        self.living_space = self.living_space.take().or(other.living_space);
        self.has_yard = self.has_yard.or(other.has_yard);
        self.has_children = self.has_children.or(other.has_children);
        self.has_other_pets = self.has_other_pets.or(other.has_other_pets);
        for pref in other.other_preferences {
            if !self.other_preferences.contains(&pref) {
                self.other_preferences.push(pref);
            }
        }
    }
}

fn yes_no(v: Option<bool>) -> &'static str {
    if v == Some(true) { "yes" } else { "no" }
}

impl AdopterPreferences {
    /// Bullet list used in match requests sent to shelter agents.
    pub fn describe(&self) -> String {
        let or_any = |v: &Option<String>| v.clone().unwrap_or_else(|| "any".to_string());
        let mut lines = vec![
            format!("- Species: {}", or_any(&self.animal_type)),
            format!("- Has garden/yard: {}", yes_no(self.has_yard)),
            format!("- Has children: {}", yes_no(self.has_children)),
            format!("- Has other pets: {}", yes_no(self.has_other_pets)),
            format!("- Living space: {}", or_any(&self.living_space)),
            format!("- Energy level preference: {}", or_any(&self.activity_level)),
            format!("- Age preference: {}", or_any(&self.age)),
        ];
        if let Some(size) = &self.size {
            lines.push(format!("- Size preference: {size}"));
        }
        if !self.other_preferences.is_empty() {
            lines.push(format!("- Other: {}", self.other_preferences.join(", ")));
        }
        lines.join("\n")
    }
}
