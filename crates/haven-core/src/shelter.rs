//! Shelter, animal and donor records.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Unique identifier for a shelter.
pub type ShelterId = String;

/// Adoption status of an animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdoptionStatus {
    #[default]
    Available,
    Adopted,
    Pending,
}

impl fmt::Display for AdoptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Available => "available",
            Self::Adopted => "adopted",
            Self::Pending => "pending",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Temperament {
    Friendly,
    Shy,
    Energetic,
    Calm,
    GoodWithKids,
    GoodWithPets,
}

impl fmt::Display for Temperament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Friendly => "friendly",
            Self::Shy => "shy",
            Self::Energetic => "energetic",
            Self::Calm => "calm",
            Self::GoodWithKids => "good_with_kids",
            Self::GoodWithPets => "good_with_pets",
        })
    }
}

/// Smallest living space an animal can be placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinSpace {
    #[default]
    Apartment,
    House,
    Garden,
    Farm,
}

impl fmt::Display for MinSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Apartment => "apartment",
            Self::House => "house",
            Self::Garden => "garden",
            Self::Farm => "farm",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicalIssues {
    pub has_issues: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceRequirements {
    #[serde(default)]
    pub min_space: MinSpace,
    #[serde(default)]
    pub needs_garden: bool,
    /// `true` means a ground floor is needed.
    #[serde(default)]
    pub floor_restrictions: bool,
}

/// An animal in a shelter's roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    #[serde(default)]
    pub id: String,
    pub species: String,
    #[serde(default)]
    pub breed: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub status: AdoptionStatus,
    #[serde(default)]
    pub intake_date: String,
    #[serde(default)]
    pub temperament: Vec<Temperament>,
    #[serde(default)]
    pub medical_issues: MedicalIssues,
    #[serde(default)]
    pub space_requirements: SpaceRequirements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

/// Operational figures reported by a shelter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShelterMetrics {
    pub current_animals: u32,
    pub monthly_intake: u32,
    pub neutering_count: u32,
    /// Fraction of animals adopted, in `[0, 1]`.
    pub adoption_rate: f64,
}

/// A shelter and its animal roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shelter {
    pub id: ShelterId,
    pub name: String,
    pub location: String,
    /// Monthly operational costs. Sensitive: never exposed by list endpoints.
    #[serde(deserialize_with = "costs_as_string")]
    pub operational_costs: String,
    #[serde(default)]
    pub metrics: ShelterMetrics,
    #[serde(default)]
    pub animals: Vec<Animal>,
}

/// A shelter record before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewShelter {
    pub name: String,
    pub location: String,
    #[serde(deserialize_with = "costs_as_string")]
    pub operational_costs: String,
    #[serde(default)]
    pub metrics: ShelterMetrics,
    #[serde(default)]
    pub animals: Vec<Animal>,
}

impl NewShelter {
    /// An intake registration: no metrics and no animals yet.
    pub fn empty(name: impl Into<String>, location: impl Into<String>, costs: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            operational_costs: costs.into(),
            metrics: ShelterMetrics::default(),
            animals: vec![],
        }
    }
}

/// The public projection of a shelter returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelterSummary {
    pub id: ShelterId,
    pub name: String,
    pub location: String,
    pub metrics: ShelterMetrics,
}

impl From<&Shelter> for ShelterSummary {
    fn from(s: &Shelter) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            location: s.location.clone(),
            metrics: s.metrics,
        }
    }
}

impl Shelter {
    /// Whether this shelter looks like the same organisation as `name` / `location`.
    ///
    /// Case-insensitive substring match in either direction on name or location.
    /// Blank values never match.
    pub fn resembles(&self, name: &str, location: &str) -> bool {
        fn overlaps(a: &str, b: &str) -> bool {
            let (a, b) = (a.trim().to_lowercase(), b.trim().to_lowercase());
            !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
        }
        overlaps(&self.name, name) || overlaps(&self.location, location)
    }
}

/// A recorded donation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    pub id: String,
    pub name: String,
    /// Donation amount. Sensitive.
    pub amount: f64,
    pub recurring: bool,
    pub duration_months: u32,
}

impl Donor {
    /// Check the recurring / duration pairing of a donation.
    pub fn check_duration(recurring: bool, duration_months: i64) -> crate::Result<u32> {
        if duration_months < 0 {
            return Err(crate::HavenError::Validation(
                "duration_months must be 0 or positive".into(),
            ));
        }
        if !recurring && duration_months != 0 {
            return Err(crate::HavenError::Validation(
                "Non-recurring donations must have duration_months set to 0".into(),
            ));
        }
        u32::try_from(duration_months)
            .map_err(|_| crate::HavenError::Validation("duration_months is too large".into()))
    }
}

/// Costs arrive as free text from intake conversations and as numbers from
/// the creation API; both are kept as display text.
fn costs_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Costs {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Costs::deserialize(deserializer)? {
        Costs::Text(s) => s,
        Costs::Number(n) => n.to_string(),
    })
}

pub fn operational_costs_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_costs_accept_number_or_text() {
        let numeric: Shelter = serde_json::from_value(serde_json::json!({
            "id": "s1", "name": "A", "location": "B", "operational_costs": 12000
        }))
        .unwrap();
        assert_eq!(numeric.operational_costs, "12000");

        let text: Shelter = serde_json::from_value(serde_json::json!({
            "id": "s1", "name": "A", "location": "B", "operational_costs": "$5k"
        }))
        .unwrap();
        assert_eq!(text.operational_costs, "$5k");
    }

    #[test]
    fn test_animal_minimal_fields_default() {
        let animal: Animal = serde_json::from_value(serde_json::json!({
            "species": "cat",
            "status": "adopted",
            "intake_date": "2024-03-20"
        }))
        .unwrap();
        assert_eq!(animal.status, AdoptionStatus::Adopted);
        assert!(animal.temperament.is_empty());
        assert_eq!(animal.space_requirements.min_space, MinSpace::Apartment);
        assert!(!animal.medical_issues.has_issues);
    }
}
