use serde::{Deserialize, Serialize};

use crate::constants::{MAX_LONG_TEXT_LEN, MAX_SHORT_TEXT_LEN};
use crate::routes::timestamp_to_rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Lost,
    Found,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Tip,
    Claim,
    Sighting,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Tip => "tip",
            InteractionKind::Claim => "claim",
            InteractionKind::Sighting => "sighting",
        }
    }
}

/// Lost & found post record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LostFoundPostRecord {
    pub author_id: String,
    pub kind: PostKind,
    pub pet_name: Option<String>,
    pub species: String,
    pub description: String,
    pub last_seen_location: Option<String>,
    pub contact: Option<String>,
    pub status: PostStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Interaction record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub post_id: String,
    pub author_id: String,
    pub kind: InteractionKind,
    pub message: String,
    pub contact: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub kind: PostKind,
    pub pet_name: Option<String>,
    #[serde(rename = "type")]
    pub species: String,
    pub description: String,
    pub last_seen_location: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    pub pet_name: Option<String>,
    pub description: Option<String>,
    pub last_seen_location: Option<String>,
    pub contact: Option<String>,
    pub status: Option<PostStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInteraction {
    pub kind: InteractionKind,
    pub message: String,
    pub contact: Option<String>,
}

/// Lost & found post model for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LostFoundPost {
    pub id: String,
    pub author_id: String,
    pub kind: PostKind,
    pub pet_name: Option<String>,
    #[serde(rename = "type")]
    pub species: String,
    pub description: String,
    pub last_seen_location: Option<String>,
    pub contact: Option<String>,
    pub status: PostStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Interaction model for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub kind: InteractionKind,
    pub message: String,
    pub contact: Option<String>,
    pub created_at: String,
}

impl LostFoundPost {
    pub fn from_record(id: String, record: LostFoundPostRecord) -> Self {
        Self {
            id,
            author_id: record.author_id,
            kind: record.kind,
            pet_name: record.pet_name,
            species: record.species,
            description: record.description,
            last_seen_location: record.last_seen_location,
            contact: record.contact,
            status: record.status,
            created_at: timestamp_to_rfc3339(record.created_at),
            updated_at: timestamp_to_rfc3339(record.updated_at),
        }
    }
}

impl Interaction {
    pub fn from_record(id: String, record: InteractionRecord) -> Self {
        Self {
            id,
            post_id: record.post_id,
            author_id: record.author_id,
            kind: record.kind,
            message: record.message,
            contact: record.contact,
            created_at: timestamp_to_rfc3339(record.created_at),
        }
    }
}

impl NewPost {
    pub fn into_record(self, author_id: &str, now: i64) -> Result<LostFoundPostRecord, String> {
        let record = LostFoundPostRecord {
            author_id: author_id.to_string(),
            kind: self.kind,
            pet_name: clean(self.pet_name),
            species: self.species.trim().to_string(),
            description: self.description.trim().to_string(),
            last_seen_location: clean(self.last_seen_location),
            contact: clean(self.contact),
            status: PostStatus::Open,
            created_at: now,
            updated_at: now,
        };
        validate_post(&record)?;
        Ok(record)
    }
}

impl PostUpdate {
    pub fn apply(self, record: &mut LostFoundPostRecord, now: i64) -> Result<(), String> {
        if self.pet_name.is_some() {
            record.pet_name = clean(self.pet_name);
        }
        if let Some(description) = self.description {
            record.description = description.trim().to_string();
        }
        if self.last_seen_location.is_some() {
            record.last_seen_location = clean(self.last_seen_location);
        }
        if self.contact.is_some() {
            record.contact = clean(self.contact);
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        validate_post(record)?;
        record.updated_at = now;
        Ok(())
    }
}

impl NewInteraction {
    pub fn into_record(
        self,
        post_id: &str,
        author_id: &str,
        now: i64,
    ) -> Result<InteractionRecord, String> {
        let message = self.message.trim().to_string();
        if message.is_empty() || message.chars().count() > MAX_LONG_TEXT_LEN {
            return Err("Interaction message is required".to_string());
        }
        Ok(InteractionRecord {
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            kind: self.kind,
            message,
            contact: clean(self.contact),
            created_at: now,
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_post(record: &LostFoundPostRecord) -> Result<(), String> {
    if record.species.is_empty() || record.species.chars().count() > MAX_SHORT_TEXT_LEN {
        return Err("Pet type is required".to_string());
    }
    if record.description.is_empty() || record.description.chars().count() > MAX_LONG_TEXT_LEN {
        return Err("Description is required".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_post_starts_open() {
        let post: NewPost = serde_json::from_str(
            r#"{"kind":"lost","type":"dog","description":"Black lab, red collar"}"#,
        )
        .unwrap();
        let record = post.into_record("author", 5).unwrap();
        assert_eq!(record.status, PostStatus::Open);
        assert_eq!(record.kind, PostKind::Lost);
    }

    #[test]
    fn test_resolve_post() {
        let post = NewPost {
            kind: PostKind::Found,
            pet_name: None,
            species: "cat".into(),
            description: "Grey cat near the park".into(),
            last_seen_location: Some(" Park ".into()),
            contact: None,
        };
        let mut record = post.into_record("author", 5).unwrap();
        assert_eq!(record.last_seen_location.as_deref(), Some("Park"));

        PostUpdate {
            status: Some(PostStatus::Resolved),
            ..Default::default()
        }
        .apply(&mut record, 9)
        .unwrap();
        assert_eq!(record.status, PostStatus::Resolved);
        assert_eq!(record.updated_at, 9);
    }

    #[test]
    fn test_blank_interaction_rejected() {
        let interaction = NewInteraction {
            kind: InteractionKind::Tip,
            message: "   ".into(),
            contact: None,
        };
        assert!(interaction.into_record("post", "author", 1).is_err());
    }
}
