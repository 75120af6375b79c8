use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A saved (or saveable) article in summary form.
///
/// `id <= 0` means the page has not been saved by this user yet; the detail
/// endpoint reports `-1` in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(rename = "wikipedia_id")]
    pub page_id: String,
    #[serde(rename = "wikipedia_url")]
    pub url: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub word_count: Option<u64>,
    #[serde(default)]
    pub frequent_words: Option<Vec<WordFrequency>>,
    #[serde(
        default,
        deserialize_with = "flexible_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "flexible_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub personal_notes: Option<String>,
}

impl Article {
    pub fn is_saved(&self) -> bool {
        self.id > 0
    }

    /// Notes text as shown to the user; absent notes read as empty.
    pub fn notes(&self) -> &str {
        self.personal_notes.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFrequency {
    pub word: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: String,
    pub positive: f32,
    pub negative: f32,
    #[serde(default)]
    pub neutral: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: usize,
}

/// Text analysis attached to a fetched detail. Never updated piecemeal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub word_count: u64,
    /// Ranked most-frequent words, highest first.
    pub frequent_words: Vec<WordFrequency>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub entities: Option<Vec<Entity>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub article: Article,
    pub analysis: Analysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub page_id: u64,
    pub title: String,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Search results, only meaningful for the query that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub query: String,
    pub total: u64,
    pub results: Vec<SearchHit>,
}

/// Body of a create request. Sentiment and entities are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    #[serde(rename = "wikipedia_id")]
    pub page_id: String,
    #[serde(rename = "wikipedia_url")]
    pub url: String,
    pub summary: Option<String>,
    pub word_count: u64,
    pub frequent_words: Vec<WordFrequency>,
}

impl ArticleDraft {
    pub fn from_detail(article: &Article, analysis: &Analysis) -> Self {
        Self {
            title: article.title.clone(),
            page_id: article.page_id.clone(),
            url: article.url.clone(),
            summary: article.summary.clone(),
            word_count: analysis.word_count,
            frequent_words: analysis.frequent_words.clone(),
        }
    }
}

/// Partial update. Absent fields are left untouched by the remote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticlePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_notes: Option<String>,
}

impl ArticlePatch {
    pub fn notes(text: impl Into<String>) -> Self {
        Self {
            personal_notes: Some(text.into()),
            ..Self::default()
        }
    }
}

/// One offset-addressed window of the saved collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticlePage {
    pub items: Vec<Article>,
    pub total: u64,
}

/// Parses RFC 3339 timestamps, falling back to naive ISO timestamps read as UTC.
pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive)),
    }
}

fn flexible_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_timestamp(&s).map_err(serde::de::Error::custom))
        .transpose()
}
