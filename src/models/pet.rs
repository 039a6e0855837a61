use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_LONG_TEXT_LEN, MAX_PET_NAME_LEN, MAX_SHORT_TEXT_LEN};
use crate::routes::timestamp_to_rfc3339;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vaccination {
    pub name: String,
    /// ISO date (YYYY-MM-DD)
    pub date: Option<String>,
}

/// Medical information kept on a pet profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicalInfo {
    pub vaccinations: Vec<Vaccination>,
    pub allergies: Vec<String>,
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
    pub vet_name: Option<String>,
    pub vet_phone: Option<String>,
    pub notes: Option<String>,
}

/// Pet record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetRecord {
    pub owner_id: String,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    /// ISO date (YYYY-MM-DD)
    pub birth_date: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub medical: MedicalInfo,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Attributes for a new pet
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPet {
    pub name: String,
    #[serde(rename = "type")]
    pub species: String,
    pub breed: Option<String>,
    pub birth_date: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub medical: MedicalInfo,
}

/// Partial update of a pet; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub species: Option<String>,
    pub breed: Option<String>,
    pub birth_date: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub medical: Option<MedicalInfo>,
}

/// Pet model for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub species: String,
    pub breed: Option<String>,
    pub birth_date: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub medical: MedicalInfo,
    pub created_at: String,
    pub updated_at: String,
}

/// What a finder sees after scanning a pet's tag
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPetProfile {
    pub name: String,
    #[serde(rename = "type")]
    pub species: String,
    pub breed: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    /// Allergies and conditions a finder should know about
    pub allergies: Vec<String>,
    pub conditions: Vec<String>,
}

impl Pet {
    pub fn from_record(id: String, record: PetRecord) -> Self {
        Self {
            id,
            owner_id: record.owner_id,
            name: record.name,
            species: record.species,
            breed: record.breed,
            birth_date: record.birth_date,
            color: record.color,
            description: record.description,
            medical: record.medical,
            created_at: timestamp_to_rfc3339(record.created_at),
            updated_at: timestamp_to_rfc3339(record.updated_at),
        }
    }
}

impl PublicPetProfile {
    pub fn from_record(record: &PetRecord) -> Self {
        Self {
            name: record.name.clone(),
            species: record.species.clone(),
            breed: record.breed.clone(),
            color: record.color.clone(),
            description: record.description.clone(),
            allergies: record.medical.allergies.clone(),
            conditions: record.medical.conditions.clone(),
        }
    }
}

impl NewPet {
    /// Validate and trim the attributes, producing a record owned by `owner_id`
    pub fn into_record(self, owner_id: &str, now: i64) -> Result<PetRecord, String> {
        let record = PetRecord {
            owner_id: owner_id.to_string(),
            name: self.name.trim().to_string(),
            species: self.species.trim().to_string(),
            breed: clean(self.breed),
            birth_date: clean(self.birth_date),
            color: clean(self.color),
            description: clean(self.description),
            medical: self.medical,
            created_at: now,
            updated_at: now,
        };
        validate_record(&record)?;
        Ok(record)
    }
}

impl PetUpdate {
    pub fn apply(self, record: &mut PetRecord, now: i64) -> Result<(), String> {
        if let Some(name) = self.name {
            record.name = name.trim().to_string();
        }
        if let Some(species) = self.species {
            record.species = species.trim().to_string();
        }
        if self.breed.is_some() {
            record.breed = clean(self.breed);
        }
        if self.birth_date.is_some() {
            record.birth_date = clean(self.birth_date);
        }
        if self.color.is_some() {
            record.color = clean(self.color);
        }
        if self.description.is_some() {
            record.description = clean(self.description);
        }
        if let Some(medical) = self.medical {
            record.medical = medical;
        }
        validate_record(record)?;
        record.updated_at = now;
        Ok(())
    }
}

/// Trim an optional field, mapping blank to `None`
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_record(record: &PetRecord) -> Result<(), String> {
    if record.name.is_empty() || record.name.chars().count() > MAX_PET_NAME_LEN {
        return Err(format!(
            "Pet name must be between 1 and {} characters",
            MAX_PET_NAME_LEN
        ));
    }
    if record.species.is_empty() || record.species.chars().count() > MAX_SHORT_TEXT_LEN {
        return Err("Pet type is required".to_string());
    }
    for field in [&record.breed, &record.color] {
        if field
            .as_ref()
            .is_some_and(|v| v.chars().count() > MAX_SHORT_TEXT_LEN)
        {
            return Err("Pet breed and color must be short".to_string());
        }
    }
    if record
        .description
        .as_ref()
        .is_some_and(|v| v.chars().count() > MAX_LONG_TEXT_LEN)
    {
        return Err("Pet description is too long".to_string());
    }
    if let Some(date) = &record.birth_date {
        validate_date(date)?;
    }
    for vaccination in &record.medical.vaccinations {
        if vaccination.name.trim().is_empty() {
            return Err("Vaccination name is required".to_string());
        }
        if let Some(date) = &vaccination.date {
            validate_date(date)?;
        }
    }
    Ok(())
}

fn validate_date(date: &str) -> Result<(), String> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| format!("Invalid date (expected YYYY-MM-DD): {}", date))
}
