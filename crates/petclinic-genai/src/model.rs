//! Clinic records: owners, pets, veterinarians.
//!
//! These are plain value objects. They derive `serde` (camelCase on the wire)
//! and `schemars::JsonSchema`, so the tool parameter schemas the LLM sees are
//! generated straight from them.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::ClinicError;

// ── Owner ──────────────────────────────────────────────────────────

/// A pet owner and the pets registered to them.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    /// Store-assigned identifier. Leave empty when registering a new owner.
    #[serde(default)]
    pub id: Option<i32>,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    /// Ten-digit phone number, digits only.
    pub telephone: String,
    #[serde(default)]
    pub pets: Vec<Pet>,
}

impl Owner {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        address: impl Into<String>,
        city: impl Into<String>,
        telephone: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            address: address.into(),
            city: city.into(),
            telephone: telephone.into(),
            pets: Vec::new(),
        }
    }

    /// Attach a pet to this owner. The pet becomes the last entry.
    pub fn add_pet(&mut self, pet: Pet) {
        self.pets.push(pet);
    }

    /// Look up one of this owner's pets by name (case-insensitive).
    pub fn pet(&self, name: &str) -> Option<&Pet> {
        self.pets.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Check the fields the store requires before persisting.
    pub fn validate(&self) -> Result<(), ClinicError> {
        let blank = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
        ]
        .into_iter()
        .find(|(_, v)| v.trim().is_empty());
        if let Some((field, _)) = blank {
            return Err(ClinicError::Validation(format!("{field} must not be blank")));
        }
        if self.telephone.len() != 10 || !self.telephone.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ClinicError::Validation(format!(
                "telephone must be exactly 10 digits, got '{}'",
                self.telephone
            )));
        }
        for pet in &self.pets {
            if pet.name.trim().is_empty() {
                return Err(ClinicError::Validation("pet name must not be blank".into()));
            }
        }
        Ok(())
    }
}

// ── Pet ────────────────────────────────────────────────────────────

/// A pet. New pets have no `id`; the store assigns one on save.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    #[serde(default)]
    pub id: Option<i32>,
    pub name: String,
    /// Birth date as YYYY-MM-DD.
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub pet_type: PetType,
}

impl Pet {
    pub fn new(name: impl Into<String>, pet_type: PetType, birth_date: Option<NaiveDate>) -> Self {
        Self {
            id: None,
            name: name.into(),
            birth_date,
            pet_type,
        }
    }

    /// Whether this pet has not been persisted yet.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

// ── PetType ────────────────────────────────────────────────────────

/// The fixed set of pet types the clinic accepts, identified by codes 1–6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PetType {
    Cat,
    Dog,
    Lizard,
    Snake,
    Bird,
    Hamster,
}

impl PetType {
    pub const ALL: [PetType; 6] = [
        PetType::Cat,
        PetType::Dog,
        PetType::Lizard,
        PetType::Snake,
        PetType::Bird,
        PetType::Hamster,
    ];

    pub fn id(self) -> u8 {
        match self {
            PetType::Cat => 1,
            PetType::Dog => 2,
            PetType::Lizard => 3,
            PetType::Snake => 4,
            PetType::Bird => 5,
            PetType::Hamster => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PetType::Cat => "cat",
            PetType::Dog => "dog",
            PetType::Lizard => "lizard",
            PetType::Snake => "snake",
            PetType::Bird => "bird",
            PetType::Hamster => "hamster",
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| i64::from(t.id()) == id)
    }
}

impl fmt::Display for PetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == lower)
            .ok_or_else(|| format!("unknown pet type '{s}'; allowed: cat, dog, lizard, snake, bird, hamster"))
    }
}

impl Serialize for PetType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PetType", 2)?;
        state.serialize_field("id", &self.id())?;
        state.serialize_field("name", self.name())?;
        state.end()
    }
}

/// Accepted input shapes: `2`, `"dog"`, or `{"id": 2, "name": "dog"}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PetTypeRepr {
    Code(i64),
    Name(String),
    Object {
        id: Option<i64>,
        name: Option<String>,
    },
}

impl<'de> Deserialize<'de> for PetType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let by_id = |id: i64| -> Result<PetType, D::Error> {
            PetType::from_id(id).ok_or_else(|| {
                de::Error::custom(format!("unknown pet type id {id}; allowed ids are 1-6"))
            })
        };
        match PetTypeRepr::deserialize(deserializer)? {
            PetTypeRepr::Code(id) | PetTypeRepr::Object { id: Some(id), .. } => by_id(id),
            PetTypeRepr::Name(name) | PetTypeRepr::Object { name: Some(name), .. } => {
                name.parse().map_err(de::Error::custom)
            }
            PetTypeRepr::Object { .. } => Err(de::Error::custom("pet type needs an id or a name")),
        }
    }
}

impl JsonSchema for PetType {
    fn schema_name() -> String {
        "PetType".to_string()
    }

    fn json_schema(_generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        let schema = serde_json::json!({
            "description": "Pet type. 1 - cat, 2 - dog, 3 - lizard, 4 - snake, 5 - bird, 6 - hamster.",
            "type": "object",
            "properties": {
                "id": { "type": "integer", "minimum": 1, "maximum": 6 },
                "name": { "type": "string" }
            },
            "required": ["id"]
        });
        serde_json::from_value(schema).unwrap_or(schemars::schema::Schema::Bool(true))
    }
}

// ── Vet ────────────────────────────────────────────────────────────

/// A veterinarian. Every field defaults, so a partially filled `Vet` doubles
/// as a similarity-search filter.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Vet {
    pub id: Option<i32>,
    pub first_name: String,
    pub last_name: String,
    pub specialties: Vec<Specialty>,
}

impl Vet {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }

    /// Add a specialty (builder pattern).
    pub fn with_specialty(mut self, name: impl Into<String>) -> Self {
        self.specialties.push(Specialty::named(name));
        self
    }

    /// A filter matching vets with the given specialty.
    pub fn with_specialty_filter(name: impl Into<String>) -> Self {
        Self::default().with_specialty(name)
    }
}

/// A veterinary specialty such as radiology or surgery.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Specialty {
    pub id: Option<i32>,
    pub name: String,
}

impl Specialty {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Owner {
        Owner::new("George", "Franklin", "110 W. Liberty St.", "Madison", "6085551023")
    }

    #[test]
    fn pet_type_accepts_code_name_and_object() {
        let from_code: PetType = serde_json::from_str("2").unwrap();
        let from_name: PetType = serde_json::from_str("\"Hamster\"").unwrap();
        let from_obj: PetType = serde_json::from_str(r#"{"id": 5, "name": "bird"}"#).unwrap();
        assert_eq!(from_code, PetType::Dog);
        assert_eq!(from_name, PetType::Hamster);
        assert_eq!(from_obj, PetType::Bird);
    }

    #[test]
    fn pet_type_rejects_unknown_code() {
        let err = serde_json::from_str::<PetType>("7").unwrap_err();
        assert!(err.to_string().contains("allowed ids are 1-6"));
    }

    #[test]
    fn pet_type_serializes_as_id_and_name() {
        let json = serde_json::to_value(PetType::Lizard).unwrap();
        assert_eq!(json, serde_json::json!({"id": 3, "name": "lizard"}));
    }

    #[test]
    fn pet_wire_format_is_camel_case() {
        let pet = Pet::new("Leo", PetType::Cat, NaiveDate::from_ymd_opt(2010, 9, 7));
        let json = serde_json::to_value(&pet).unwrap();
        assert_eq!(json["birthDate"], "2010-09-07");
        assert_eq!(json["type"]["id"], 1);
        assert!(json["id"].is_null());
    }

    #[test]
    fn validate_accepts_complete_owner() {
        assert!(owner().validate().is_ok());
    }

    #[test]
    fn validate_rejects_short_telephone() {
        let mut o = owner();
        o.telephone = "555-1023".into();
        let err = o.validate().unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
        assert!(err.to_string().contains("10 digits"));
    }

    #[test]
    fn validate_rejects_blank_last_name() {
        let mut o = owner();
        o.last_name = "  ".into();
        assert!(o.validate().unwrap_err().to_string().contains("lastName"));
    }

    #[test]
    fn partial_vet_deserializes_as_filter() {
        let filter: Vet = serde_json::from_str(r#"{"specialties": [{"name": "surgery"}]}"#).unwrap();
        assert_eq!(filter, Vet::with_specialty_filter("surgery"));
    }

    #[test]
    fn owner_pet_lookup_is_case_insensitive() {
        let mut o = owner();
        o.add_pet(Pet::new("Leo", PetType::Cat, None));
        assert!(o.pet("leo").is_some());
        assert!(o.pet("Max").is_none());
    }
}
