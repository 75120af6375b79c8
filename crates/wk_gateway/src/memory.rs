use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use wk_core::{
    Analysis, Article, ArticleDetail, ArticleDraft, ArticlePage, ArticlePatch, Error, Gateway,
    ResultSet, Result, SearchHit, WordFrequency,
};

const SNIPPET_CHARS: usize = 120;
const TOP_WORDS: usize = 10;
const STOP_WORDS: &[&str] = &[
    "and", "are", "but", "for", "from", "has", "have", "its", "not", "that", "the", "their",
    "this", "was", "were", "which", "with",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Search,
    FetchDetail,
    Create,
    ListPage,
    Patch,
    Delete,
}

/// A page the in-memory remote can search and analyse.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub page_id: u64,
    pub title: String,
    pub summary: String,
    pub content: String,
}

impl CatalogPage {
    pub fn new(page_id: u64, title: &str, content: &str) -> Self {
        let summary = content.split(". ").next().unwrap_or_default().trim().to_string();
        Self {
            page_id,
            title: title.to_string(),
            summary,
            content: content.to_string(),
        }
    }

    pub fn url(&self) -> String {
        format!("https://en.wikipedia.org/?curid={}", self.page_id)
    }
}

#[derive(Default)]
struct RemoteState {
    catalog: BTreeMap<String, CatalogPage>,
    saved: Vec<Article>,
    next_id: i64,
    latency: HashMap<Operation, Duration>,
    query_latency: HashMap<String, Duration>,
    failures: HashMap<Operation, VecDeque<Error>>,
    calls: HashMap<Operation, usize>,
    search_log: Vec<String>,
}

impl RemoteState {
    /// Records the call and returns its scripted latency and failure.
    fn begin(&mut self, op: Operation, query: Option<&str>) -> (Duration, Option<Error>) {
        *self.calls.entry(op).or_default() += 1;
        let mut latency = self.latency.get(&op).copied().unwrap_or_default();
        if let Some(query) = query {
            self.search_log.push(query.to_string());
            if let Some(delay) = self.query_latency.get(query) {
                latency = *delay;
            }
        }
        let failure = self.failures.get_mut(&op).and_then(VecDeque::pop_front);
        (latency, failure)
    }

    fn saved_by_page(&self, page_id: &str) -> Option<&Article> {
        self.saved.iter().find(|a| a.page_id == page_id)
    }
}

/// Self-contained remote: a seeded page catalog plus a saved-article table.
///
/// Latency and one-shot failures can be scripted per operation, which makes
/// it the gateway of choice for exercising session races.
#[derive(Default)]
pub struct InMemoryGateway {
    state: Mutex<RemoteState>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RemoteState {
                next_id: 1,
                ..RemoteState::default()
            }),
        }
    }

    /// A gateway seeded with a handful of pages, for demos and dry runs.
    pub fn with_sample_catalog() -> Self {
        let catalog = sample_catalog()
            .into_iter()
            .map(|page| (page.page_id.to_string(), page))
            .collect();
        Self {
            state: Mutex::new(RemoteState {
                catalog,
                next_id: 1,
                ..RemoteState::default()
            }),
        }
    }

    pub async fn add_page(&self, page: CatalogPage) {
        let mut state = self.state.lock().await;
        state.catalog.insert(page.page_id.to_string(), page);
    }

    /// Saves `page_id` directly, bypassing call accounting.
    pub async fn seed_saved(&self, page_id: &str) -> Result<Article> {
        let mut state = self.state.lock().await;
        save_page(&mut state, page_id)
    }

    pub async fn set_latency(&self, op: Operation, latency: Duration) {
        self.state.lock().await.latency.insert(op, latency);
    }

    /// Latency for searches of exactly `query`; overrides the operation latency.
    pub async fn set_query_latency(&self, query: &str, latency: Duration) {
        self.state.lock().await.query_latency.insert(query.to_string(), latency);
    }

    /// The next call of `op` fails with `error` without touching remote state.
    pub async fn fail_next(&self, op: Operation, error: Error) {
        self.state.lock().await.failures.entry(op).or_default().push_back(error);
    }

    pub async fn calls(&self, op: Operation) -> usize {
        self.state.lock().await.calls.get(&op).copied().unwrap_or_default()
    }

    /// Queries passed to `search`, in call order.
    pub async fn search_log(&self) -> Vec<String> {
        self.state.lock().await.search_log.clone()
    }

    pub async fn saved(&self) -> Vec<Article> {
        self.state.lock().await.saved.clone()
    }

    async fn begin(&self, op: Operation, query: Option<&str>) -> Result<()> {
        let (latency, failure) = self.state.lock().await.begin(op, query);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(error) => {
                debug!("💥 Scripted {:?} failure: {}", op, error);
                Err(error)
            }
            None => Ok(()),
        }
    }
}

fn save_page(state: &mut RemoteState, page_id: &str) -> Result<Article> {
    if state.saved_by_page(page_id).is_some() {
        return Err(Error::remote(400, "El artículo ya está guardado"));
    }
    let page = state
        .catalog
        .get(page_id)
        .ok_or_else(|| Error::remote(404, format!("Unknown page {}", page_id)))?;
    let analysis = analyze(&page.content);
    let draft = ArticleDraft {
        title: page.title.clone(),
        page_id: page_id.to_string(),
        url: page.url(),
        summary: Some(page.summary.clone()),
        word_count: analysis.word_count,
        frequent_words: analysis.frequent_words,
    };
    Ok(insert_saved(state, &draft))
}

fn insert_saved(state: &mut RemoteState, draft: &ArticleDraft) -> Article {
    let now = Utc::now();
    let article = Article {
        id: state.next_id.max(1),
        title: draft.title.clone(),
        page_id: draft.page_id.clone(),
        url: draft.url.clone(),
        summary: draft.summary.clone(),
        word_count: Some(draft.word_count),
        frequent_words: Some(draft.frequent_words.clone()),
        created_at: Some(now),
        updated_at: Some(now),
        personal_notes: None,
    };
    state.next_id = article.id + 1;
    state.saved.push(article.clone());
    article
}

/// Word count plus the most frequent words; ties keep first-seen order.
pub fn analyze(text: &str) -> Analysis {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut counts: Vec<WordFrequency> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for word in &words {
        if word.chars().count() <= 2 || STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        match index.get(word.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(word.as_str(), counts.len());
                counts.push(WordFrequency { word: word.clone(), count: 1 });
            }
        }
    }
    // Stable sort keeps source order among equal counts.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(TOP_WORDS);

    Analysis {
        word_count: words.len() as u64,
        frequent_words: counts,
        sentiment: None,
        entities: None,
    }
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn search(&self, query: &str) -> Result<ResultSet> {
        if query.trim().is_empty() {
            return Err(Error::Validation("Search query must not be empty".to_string()));
        }
        self.begin(Operation::Search, Some(query)).await?;

        let needle = query.trim().to_lowercase();
        let state = self.state.lock().await;
        let results: Vec<SearchHit> = state
            .catalog
            .values()
            .filter(|p| p.title.to_lowercase().contains(&needle) || p.content.to_lowercase().contains(&needle))
            .map(|p| SearchHit {
                page_id: p.page_id,
                title: p.title.clone(),
                snippet: Some(p.summary.chars().take(SNIPPET_CHARS).collect()),
                url: Some(p.url()),
            })
            .collect();

        Ok(ResultSet {
            query: query.to_string(),
            total: results.len() as u64,
            results,
        })
    }

    async fn fetch_detail(&self, page_id: &str) -> Result<ArticleDetail> {
        self.begin(Operation::FetchDetail, None).await?;

        let state = self.state.lock().await;
        let page = state
            .catalog
            .get(page_id)
            .ok_or_else(|| Error::remote(500, format!("Error al obtener detalles del artículo: unknown page {}", page_id)))?;
        let analysis = analyze(&page.content);
        let article = match state.saved_by_page(page_id) {
            Some(saved) => saved.clone(),
            None => {
                let now = Utc::now();
                Article {
                    id: -1,
                    title: page.title.clone(),
                    page_id: page_id.to_string(),
                    url: page.url(),
                    summary: Some(page.summary.clone()),
                    word_count: Some(analysis.word_count),
                    frequent_words: Some(analysis.frequent_words.clone()),
                    created_at: Some(now),
                    updated_at: Some(now),
                    personal_notes: None,
                }
            }
        };
        Ok(ArticleDetail { article, analysis })
    }

    async fn create(&self, draft: &ArticleDraft) -> Result<Article> {
        self.begin(Operation::Create, None).await?;

        let mut state = self.state.lock().await;
        if state.saved_by_page(&draft.page_id).is_some() {
            return Err(Error::remote(400, "El artículo ya está guardado"));
        }
        Ok(insert_saved(&mut state, draft))
    }

    async fn list_page(&self, offset: u64, limit: u64) -> Result<ArticlePage> {
        if limit == 0 {
            return Err(Error::Validation("Page limit must be positive".to_string()));
        }
        self.begin(Operation::ListPage, None).await?;

        let state = self.state.lock().await;
        let items = state
            .saved
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(ArticlePage {
            items,
            total: state.saved.len() as u64,
        })
    }

    async fn patch(&self, id: i64, patch: &ArticlePatch) -> Result<Article> {
        self.begin(Operation::Patch, None).await?;

        let mut state = self.state.lock().await;
        let article = state
            .saved
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::remote(404, "Artículo no encontrado"))?;
        if let Some(title) = &patch.title {
            article.title = title.clone();
        }
        if let Some(summary) = &patch.summary {
            article.summary = Some(summary.clone());
        }
        if let Some(notes) = &patch.personal_notes {
            article.personal_notes = Some(notes.clone());
        }
        article.updated_at = Some(Utc::now());
        Ok(article.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.begin(Operation::Delete, None).await?;

        let mut state = self.state.lock().await;
        let before = state.saved.len();
        state.saved.retain(|a| a.id != id);
        if state.saved.len() == before {
            return Err(Error::remote(404, "Artículo no encontrado"));
        }
        Ok(())
    }
}

fn sample_catalog() -> Vec<CatalogPage> {
    vec![
        CatalogPage::new(
            6678,
            "Cat",
            "The cat is a domestic species of small carnivorous mammal. Cats are valued by humans for companionship and for hunting vermin. The cat is similar in anatomy to the other felid species.",
        ),
        CatalogPage::new(
            4269567,
            "Dog",
            "The dog is a domesticated descendant of the wolf. Dogs were the first species domesticated by humans. Dogs have been bred for herding, hunting and companionship.",
        ),
        CatalogPage::new(
            29414838,
            "Rust (programming language)",
            "Rust is a general-purpose programming language emphasizing performance, type safety and concurrency. Rust enforces memory safety without a garbage collector. Rust was influenced by functional programming.",
        ),
        CatalogPage::new(
            23862,
            "Python (programming language)",
            "Python is a high-level, general-purpose programming language. Python design philosophy emphasizes code readability. Python is dynamically typed and garbage-collected.",
        ),
        CatalogPage::new(
            18839,
            "Octopus",
            "An octopus is a soft-bodied, eight-limbed mollusc. Octopuses are considered the most intelligent invertebrates. The octopus can change colour to camouflage itself.",
        ),
    ]
}
