use serde::{Deserialize, Serialize};

use crate::constants::{MAX_ARTICLE_BODY_LEN, MAX_LONG_TEXT_LEN, MAX_SHORT_TEXT_LEN};
use crate::routes::timestamp_to_rfc3339;

/// Article record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub author_id: String,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub body: String,
    pub published: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub title: String,
    pub summary: Option<String>,
    pub body: String,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub published: Option<bool>,
}

/// Article model for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub body: String,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Article {
    pub fn from_record(id: String, record: ArticleRecord) -> Self {
        Self {
            id,
            author_id: record.author_id,
            title: record.title,
            slug: record.slug,
            summary: record.summary,
            body: record.body,
            published: record.published,
            created_at: timestamp_to_rfc3339(record.created_at),
            updated_at: timestamp_to_rfc3339(record.updated_at),
        }
    }
}

/// Derive a URL slug: lowercase ASCII alphanumeric runs joined with `-`
pub fn slugify(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

impl NewArticle {
    pub fn into_record(self, author_id: &str, now: i64) -> Result<ArticleRecord, String> {
        let title = self.title.trim().to_string();
        let record = ArticleRecord {
            author_id: author_id.to_string(),
            slug: slugify(&title),
            title,
            summary: self
                .summary
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            body: self.body,
            published: self.published,
            created_at: now,
            updated_at: now,
        };
        validate_article(&record)?;
        Ok(record)
    }
}

impl ArticleUpdate {
    pub fn apply(self, record: &mut ArticleRecord, now: i64) -> Result<(), String> {
        if let Some(title) = self.title {
            record.title = title.trim().to_string();
            record.slug = slugify(&record.title);
        }
        if let Some(summary) = self.summary {
            let summary = summary.trim().to_string();
            record.summary = (!summary.is_empty()).then_some(summary);
        }
        if let Some(body) = self.body {
            record.body = body;
        }
        if let Some(published) = self.published {
            record.published = published;
        }
        validate_article(record)?;
        record.updated_at = now;
        Ok(())
    }
}

fn validate_article(record: &ArticleRecord) -> Result<(), String> {
    if record.title.is_empty() || record.title.chars().count() > MAX_SHORT_TEXT_LEN {
        return Err("Article title is required".to_string());
    }
    if record.slug.is_empty() {
        return Err("Article title must contain letters or digits".to_string());
    }
    if record
        .summary
        .as_ref()
        .is_some_and(|s| s.chars().count() > MAX_LONG_TEXT_LEN)
    {
        return Err("Article summary is too long".to_string());
    }
    if record.body.trim().is_empty() || record.body.len() > MAX_ARTICLE_BODY_LEN {
        return Err("Article body is required".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Keeping Your Cat Cool!"), "keeping-your-cat-cool");
        assert_eq!(slugify("  NFC tags -- 101 "), "nfc-tags-101");
        assert_eq!(slugify("¿¡!"), "");
    }

    #[test]
    fn test_retitle_updates_slug() {
        let mut record = NewArticle {
            title: "First Walk".into(),
            summary: None,
            body: "Start slow.".into(),
            published: false,
        }
        .into_record("admin", 1)
        .unwrap();
        assert_eq!(record.slug, "first-walk");

        ArticleUpdate {
            title: Some("First Walks".into()),
            published: Some(true),
            ..Default::default()
        }
        .apply(&mut record, 2)
        .unwrap();
        assert_eq!(record.slug, "first-walks");
        assert!(record.published);
    }
}
