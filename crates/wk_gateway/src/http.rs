use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;
use url::Url;
use wk_core::{
    Article, ArticleDetail, ArticleDraft, ArticlePage, ArticlePatch, Error, Gateway, ResultSet, Result,
};
use crate::GatewayConfig;

/// Gateway speaking JSON over HTTP to the article service.
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpGateway")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Validation(format!("Invalid base URL {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Validation(format!("Base URL cannot hold paths: {}", config.base_url)));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends percent-encoded `segments` to the base path. The service
    /// expects a trailing slash on collection routes.
    fn endpoint(&self, segments: &[&str], trailing_slash: bool) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::Validation(format!("Base URL cannot hold paths: {}", self.base_url)))?;
            path.pop_if_empty().extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    /// Sends the request and returns the body of a 2xx response.
    async fn execute(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let detail = remote_detail(status, &body);
            debug!("❌ Remote answered {}: {}", status, detail);
            return Err(Error::remote(status.as_u16(), detail));
        }
        Ok(body)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Human-readable failure text: the JSON `detail` field when present, else
/// the raw body, else the status reason.
fn remote_detail(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn search(&self, query: &str) -> Result<ResultSet> {
        if query.trim().is_empty() {
            return Err(Error::Validation("Search query must not be empty".to_string()));
        }
        let url = self.endpoint(&["search"], true)?;
        debug!("🔎 GET {} q={:?}", url, query);
        let mut results: ResultSet = self.fetch(self.client.get(url).query(&[("q", query)])).await?;
        results.query = query.to_string();
        Ok(results)
    }

    async fn fetch_detail(&self, page_id: &str) -> Result<ArticleDetail> {
        if page_id.trim().is_empty() {
            return Err(Error::Validation("Page identifier must not be empty".to_string()));
        }
        let url = self.endpoint(&["articles", "detail", page_id], false)?;
        debug!("📄 GET {}", url);
        self.fetch(self.client.get(url)).await
    }

    async fn create(&self, draft: &ArticleDraft) -> Result<Article> {
        let url = self.endpoint(&["articles"], true)?;
        debug!("💾 POST {} ({})", url, draft.page_id);
        self.fetch(self.client.post(url).json(draft)).await
    }

    async fn list_page(&self, offset: u64, limit: u64) -> Result<ArticlePage> {
        if limit == 0 {
            return Err(Error::Validation("Page limit must be positive".to_string()));
        }
        let url = self.endpoint(&["articles"], true)?;
        debug!("📚 GET {} skip={} limit={}", url, offset, limit);
        self.fetch(self.client.get(url).query(&[("skip", offset), ("limit", limit)]))
            .await
    }

    async fn patch(&self, id: i64, patch: &ArticlePatch) -> Result<Article> {
        let id = id.to_string();
        let url = self.endpoint(&["articles", &id], false)?;
        debug!("📝 PATCH {}", url);
        self.fetch(self.client.patch(url).json(patch)).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let id = id.to_string();
        let url = self.endpoint(&["articles", &id], false)?;
        debug!("🗑️ DELETE {}", url);
        self.execute(self.client.delete(url)).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::StatusCode as HttpStatus,
        routing::{delete, get},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::time::Duration;

    fn article_json(id: i64, page_id: &str, notes: Option<&str>) -> Value {
        json!({
            "id": id,
            "title": format!("Page {}", page_id),
            "wikipedia_id": page_id,
            "wikipedia_url": format!("https://en.wikipedia.org/?curid={}", page_id),
            "summary": "A summary.",
            "word_count": 10,
            "frequent_words": [{"word": "summary", "count": 1}],
            "created_at": "2024-05-01T09:00:00",
            "personal_notes": notes,
        })
    }

    fn remote() -> Router {
        Router::new()
            .route(
                "/api/search/",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    let q = params.get("q").cloned().unwrap_or_default();
                    Json(json!({
                        "total": 42,
                        "results": [{"page_id": 6678, "title": q, "snippet": "<b>cat</b>"}],
                    }))
                }),
            )
            .route(
                "/api/articles/detail/:page_id",
                get(|Path(page_id): Path<String>| async move {
                    if page_id == "0" {
                        return (
                            HttpStatus::INTERNAL_SERVER_ERROR,
                            Json(json!({"detail": "Error al obtener detalles del artículo"})),
                        );
                    }
                    (
                        HttpStatus::OK,
                        Json(json!({
                            "article": article_json(-1, &page_id, None),
                            "analysis": {
                                "word_count": 10,
                                "frequent_words": [{"word": "summary", "count": 1}],
                                "sentiment": {"label": "Neutral", "positive": 0.5, "negative": 0.5, "neutral": 0.8},
                                "entities": [{"text": "Wikipedia", "type": "ORG", "start": 0, "end": 9}],
                            },
                        })),
                    )
                }),
            )
            .route(
                "/api/articles/",
                get(|Query(params): Query<HashMap<String, u64>>| async move {
                    let skip = params.get("skip").copied().unwrap_or_default();
                    let limit = params.get("limit").copied().unwrap_or_default();
                    Json(json!({"items": [article_json(7, "1", None)], "total": skip * 1000 + limit}))
                })
                .post(|Json(body): Json<Value>| async move {
                    if body["wikipedia_id"] == "dup" {
                        return (
                            HttpStatus::BAD_REQUEST,
                            Json(json!({"detail": "El artículo ya está guardado"})),
                        );
                    }
                    let page_id = body["wikipedia_id"].as_str().unwrap_or_default().to_string();
                    (HttpStatus::OK, Json(article_json(11, &page_id, None)))
                }),
            )
            .route(
                "/api/articles/:id",
                delete(|Path(id): Path<i64>| async move {
                    if id == 404 {
                        (HttpStatus::NOT_FOUND, Json(json!({"detail": "Artículo no encontrado"})))
                    } else {
                        (HttpStatus::OK, Json(json!({"message": "Artículo eliminado correctamente"})))
                    }
                })
                .patch(|Path(id): Path<i64>, Json(body): Json<Value>| async move {
                    let mut article = article_json(id, "1", body["personal_notes"].as_str());
                    // Report which keys were sent so the test can check absent fields.
                    article["summary"] = json!(body.as_object().map(|o| o.len()).unwrap_or_default().to_string());
                    Json(article)
                }),
            )
            .route("/api/broken/search/", get(|| async { "not json" }))
    }

    async fn spawn_remote() -> HttpGateway {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, remote()).await.unwrap();
        });
        let config = GatewayConfig::default().with_base_url(&format!("http://{}/api", addr));
        HttpGateway::new(&config).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let gateway = HttpGateway::new(&GatewayConfig::default().with_base_url("http://example.com/api")).unwrap();
        assert_eq!(gateway.base_url().as_str(), "http://example.com/api/");
        let url = gateway.endpoint(&["articles", "detail", "a b"], false).unwrap();
        assert_eq!(url.as_str(), "http://example.com/api/articles/detail/a%20b");
        let url = gateway.endpoint(&["search"], true).unwrap();
        assert_eq!(url.as_str(), "http://example.com/api/search/");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpGateway::new(&GatewayConfig::default().with_base_url("not a url")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_remote_detail_fallbacks() {
        assert_eq!(remote_detail(StatusCode::BAD_REQUEST, r#"{"detail": "duplicate"}"#), "duplicate");
        assert_eq!(
            remote_detail(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail": [{"loc": ["q"]}]}"#),
            r#"[{"loc":["q"]}]"#
        );
        assert_eq!(remote_detail(StatusCode::BAD_GATEWAY, "upstream down\n"), "upstream down");
        assert_eq!(remote_detail(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    #[tokio::test]
    async fn test_search_encodes_query_and_stamps_result() {
        let gateway = spawn_remote().await;
        let results = gateway.search("cats & dogs").await.unwrap();
        assert_eq!(results.query, "cats & dogs");
        assert_eq!(results.total, 42);
        assert_eq!(results.results[0].title, "cats & dogs");
        assert_eq!(results.results[0].page_id, 6678);
    }

    #[tokio::test]
    async fn test_blank_search_is_rejected_locally() {
        // No server: a request would fail with a transport error instead.
        let gateway = HttpGateway::new(&GatewayConfig::default().with_base_url("http://127.0.0.1:9/api")).unwrap();
        let err = gateway.search("   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = gateway.list_page(0, 0).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_fetch_detail_decodes_article_and_analysis() {
        let gateway = spawn_remote().await;
        let detail = gateway.fetch_detail("6678").await.unwrap();
        assert!(!detail.article.is_saved());
        assert_eq!(detail.article.page_id, "6678");
        assert_eq!(detail.analysis.entities.unwrap()[0].kind, "ORG");
        assert_eq!(detail.analysis.sentiment.unwrap().label, "Neutral");
    }

    #[tokio::test]
    async fn test_non_success_becomes_remote_error() {
        let gateway = spawn_remote().await;
        let err = gateway.fetch_detail("0").await.unwrap_err();
        match err {
            Error::Remote { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "Error al obtener detalles del artículo");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_and_duplicate() {
        let gateway = spawn_remote().await;
        let mut draft = ArticleDraft {
            title: "Cat".to_string(),
            page_id: "6678".to_string(),
            url: "https://en.wikipedia.org/?curid=6678".to_string(),
            summary: None,
            word_count: 10,
            frequent_words: vec![],
        };
        let created = gateway.create(&draft).await.unwrap();
        assert_eq!(created.id, 11);
        assert_eq!(created.page_id, "6678");

        draft.page_id = "dup".to_string();
        let err = gateway.create(&draft).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_list_page_sends_skip_and_limit() {
        let gateway = spawn_remote().await;
        let page = gateway.list_page(12, 6).await.unwrap();
        assert_eq!(page.total, 12_006);
        assert_eq!(page.items[0].id, 7);
    }

    #[tokio::test]
    async fn test_patch_sends_only_notes() {
        let gateway = spawn_remote().await;
        let updated = gateway.patch(7, &ArticlePatch::notes("remember this")).await.unwrap();
        assert_eq!(updated.id, 7);
        assert_eq!(updated.personal_notes.as_deref(), Some("remember this"));
        assert_eq!(updated.summary.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_delete_success_and_not_found() {
        let gateway = spawn_remote().await;
        gateway.delete(3).await.unwrap();
        let err = gateway.delete(404).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_undecodable_body_is_serialization_error() {
        let gateway = spawn_remote().await;
        let broken = HttpGateway::new(
            &GatewayConfig::default().with_base_url(gateway.base_url().join("broken").unwrap().as_str()),
        )
        .unwrap();
        let err = broken.search("cat").await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = GatewayConfig::default()
            .with_base_url(&format!("http://{}/api", addr))
            .with_timeout(Duration::from_secs(2));
        let gateway = HttpGateway::new(&config).unwrap();
        let err = gateway.search("cat").await.unwrap_err();
        assert!(err.is_transport(), "expected transport error, got {err:?}");
    }
}
