//! HTTP implementation of [`RemoteStore`]
//!
//! Speaks PostgREST conventions for tables (`select`, `order`, `limit`,
//! `eq.`, `in.()`, `or=()`), `/rest/v1/rpc/{fn}` for counter procedures and
//! the storage object API for binary uploads.
//!
//! Free-text search sends two requests: an `or=` filter over the text columns
//! and a scan of the first [`TAG_SCAN_LIMIT`] rows matching the other
//! filters, whose tags are matched client-side.

use crate::query::{TextFilter, VideoOrder, VideoQuery, TAG_SCAN_LIMIT};
use crate::records::{
    CounterOp, LiveStreamRecord, NewLiveStream, NewVideoRecord, ProfileChanges, ProfileRecord,
    VideoRecord,
};
use crate::RemoteStore;
use async_trait::async_trait;
use bytes::Bytes;
use error_types::{ErrorContext, ServiceError, ServiceResult};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use resilience::{presets, with_timeout_result, TimeoutError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for [`RestStore`]
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    /// Public API key sent on every request
    pub anon_key: String,
    /// Signed-in user's token; the anon key is used as bearer when absent
    pub access_token: Option<String>,
    pub query_timeout: Duration,
    pub rpc_timeout: Duration,
    pub storage_timeout: Duration,
}

impl RestStoreConfig {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            access_token: None,
            query_timeout: presets::table_query_config().duration,
            rpc_timeout: presets::rpc_config().duration,
            storage_timeout: presets::object_storage_config().duration,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

#[derive(Deserialize)]
struct LikeRow {
    video_id: String,
}

/// REST client for the hosted store
pub struct RestStore {
    client: Client,
    base: Url,
    config: RestStoreConfig,
}

impl RestStore {
    pub fn new(config: RestStoreConfig) -> ServiceResult<Self> {
        let base = Url::parse(&config.base_url)
            .with_context(|| format!("invalid store URL {}", config.base_url))?;
        if base.cannot_be_a_base() {
            return Err(ServiceError::internal(anyhow::anyhow!(
                "store URL cannot carry a path: {}",
                config.base_url
            )));
        }

        // Outer bound so body reads cannot hang past the slowest preset
        let client = Client::builder()
            .timeout(config.storage_timeout)
            .build()
            .context("failed to build HTTP client")?;

        info!(base_url = %base, "remote store client initialized");

        Ok(Self {
            client,
            base,
            config,
        })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments.into_iter().filter(|s| !s.is_empty()));
        }
        url
    }

    fn table(&self, name: &str) -> Url {
        self.endpoint(["rest", "v1", name])
    }

    fn object_url(&self, prefix: &[&str], bucket: &str, path: &str) -> Url {
        let segments = prefix
            .iter()
            .copied()
            .chain(std::iter::once(bucket))
            .chain(path.split('/'));
        self.endpoint(segments)
    }

    /// Public URL of an object in a public bucket
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        self.object_url(&["storage", "v1", "object", "public"], bucket, path)
            .to_string()
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    async fn send_raw(
        &self,
        operation: &str,
        timeout: Duration,
        request: RequestBuilder,
    ) -> ServiceResult<Response> {
        match with_timeout_result(operation, timeout, request.send()).await {
            Ok(response) => Ok(response),
            Err(TimeoutError::Elapsed { operation, after }) => Err(ServiceError::Timeout {
                operation,
                timeout_ms: after.as_millis() as u64,
            }),
            Err(TimeoutError::Failed { operation, error }) => {
                Err(ServiceError::network(operation, error))
            }
        }
    }

    async fn send(
        &self,
        operation: &str,
        timeout: Duration,
        request: RequestBuilder,
    ) -> ServiceResult<Response> {
        let response = self.send_raw(operation, timeout, request).await?;
        check_status(operation, response).await
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> ServiceResult<T> {
        let response = self
            .send(operation, self.config.query_timeout, request)
            .await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::network(operation, format!("undecodable response: {}", e)))
    }
}

async fn check_status(operation: &str, response: Response) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(operation, %status, body = %body, "store returned error status");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ServiceError::PermissionDenied {
            action: operation.to_string(),
        }),
        _ => Err(ServiceError::network(operation, format!("{}: {}", status, body))),
    }
}

/// Double-quote a filter value so reserved characters survive PostgREST parsing
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn in_list(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("in.({})", quoted.join(","))
}

/// Escape LIKE metacharacters so the needle matches literally
fn like_escape(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `or=` filter for free-text search across title, description and category
pub(crate) fn any_text_filter(needle: &str) -> String {
    let pattern = quote(&format!("*{}*", like_escape(needle)));
    format!(
        "(title.ilike.{p},description.ilike.{p},category.ilike.{p})",
        p = pattern
    )
}

pub(crate) fn list_params(query: &VideoQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", "*".to_string())];

    if let Some(category) = &query.category {
        params.push(("category", format!("eq.{}", category)));
    }
    if let Some(owner) = &query.owner_id {
        params.push(("user_id", format!("eq.{}", owner)));
    }
    match &query.text {
        Some(TextFilter::Any(needle)) => params.push(("or", any_text_filter(needle))),
        Some(TextFilter::Hashtag(tag)) => {
            params.push(("description", format!("ilike.*{}*", like_escape(tag))))
        }
        None => {}
    }

    let order = match query.order {
        VideoOrder::Recency => "created_at.desc",
        VideoOrder::Ranking => "like_count.desc,view_count.desc",
    };
    params.push(("order", order.to_string()));
    params.push(("limit", query.limit.to_string()));
    params
}

/// Same filters and order without the text predicate, over the tag scan window
pub(crate) fn tag_scan_params(query: &VideoQuery) -> Vec<(&'static str, String)> {
    let scan = VideoQuery {
        text: None,
        limit: TAG_SCAN_LIMIT,
        ..query.clone()
    };
    list_params(&scan)
}

/// Text-column matches plus scanned rows whose tags match, in query order
pub(crate) fn merge_tag_matches(
    query: &VideoQuery,
    matched: Vec<VideoRecord>,
    scanned: Vec<VideoRecord>,
) -> Vec<VideoRecord> {
    let Some(filter) = &query.text else {
        return matched;
    };
    let mut seen: HashSet<String> = matched.iter().filter_map(VideoRecord::id_string).collect();
    let mut rows = matched;
    rows.extend(
        scanned
            .into_iter()
            .filter(|row| filter.matches_tags(row.tags.as_deref().unwrap_or(&[])))
            .filter(|row| row.id_string().is_some_and(|id| seen.insert(id))),
    );
    query.order.sort(&mut rows);
    rows.truncate(query.limit);
    rows
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn list_videos(&self, query: &VideoQuery) -> ServiceResult<Vec<VideoRecord>> {
        debug!(?query, "listing videos");
        let request = self
            .request(Method::GET, self.table("videos"))
            .query(&list_params(query));
        if !matches!(query.text, Some(TextFilter::Any(_))) {
            return self.fetch_json("list videos", request).await;
        }

        let scan = self
            .request(Method::GET, self.table("videos"))
            .query(&tag_scan_params(query));
        let (matched, scanned) = tokio::join!(
            self.fetch_json::<Vec<VideoRecord>>("list videos", request),
            self.fetch_json::<Vec<VideoRecord>>("scan video tags", scan),
        );
        Ok(merge_tag_matches(query, matched?, scanned?))
    }

    async fn fetch_profiles(&self, user_ids: &[String]) -> ServiceResult<Vec<ProfileRecord>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = self.request(Method::GET, self.table("profiles")).query(&[
            ("select", "user_id,username,display_name,avatar_url".to_string()),
            ("user_id", in_list(user_ids)),
        ]);
        self.fetch_json("load creators", request).await
    }

    async fn fetch_profile(&self, user_id: &str) -> ServiceResult<Option<ProfileRecord>> {
        let request = self.request(Method::GET, self.table("profiles")).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", user_id)),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<ProfileRecord> = self.fetch_json("load profile", request).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_profile(&self, user_id: &str, changes: &ProfileChanges) -> ServiceResult<()> {
        let request = self
            .request(Method::PATCH, self.table("profiles"))
            .query(&[("user_id", format!("eq.{}", user_id))])
            .json(changes);
        self.send("update your profile", self.config.query_timeout, request)
            .await?;
        Ok(())
    }

    async fn insert_video(&self, video: &NewVideoRecord) -> ServiceResult<VideoRecord> {
        let request = self
            .request(Method::POST, self.table("videos"))
            .header("Prefer", "return=representation")
            .json(video);
        let rows: Vec<VideoRecord> = self.fetch_json("upload videos", request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::network("upload videos", "insert returned no row"))
    }

    async fn adjust_counter(&self, op: CounterOp, id: &str) -> ServiceResult<()> {
        let mut body = Map::new();
        body.insert(op.argument_name().to_string(), Value::String(id.to_string()));

        let request = self
            .request(Method::POST, self.endpoint(["rest", "v1", "rpc", op.function_name()]))
            .json(&body);
        self.send(op.function_name(), self.config.rpc_timeout, request)
            .await?;
        Ok(())
    }

    async fn insert_like(&self, user_id: &str, video_id: &str) -> ServiceResult<()> {
        let request = self
            .request(Method::POST, self.table("video_likes"))
            .json(&json!({ "user_id": user_id, "video_id": video_id }));
        let response = self
            .send_raw("like videos", self.config.query_timeout, request)
            .await?;

        // Unique (user_id, video_id): an existing row means already liked
        if response.status() == StatusCode::CONFLICT {
            debug!(user_id, video_id, "like row already present");
            return Ok(());
        }
        check_status("like videos", response).await?;
        Ok(())
    }

    async fn delete_like(&self, user_id: &str, video_id: &str) -> ServiceResult<()> {
        let request = self
            .request(Method::DELETE, self.table("video_likes"))
            .query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("video_id", format!("eq.{}", video_id)),
            ]);
        self.send("like videos", self.config.query_timeout, request)
            .await?;
        Ok(())
    }

    async fn liked_video_ids(
        &self,
        user_id: &str,
        video_ids: &[String],
    ) -> ServiceResult<Vec<String>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = self.request(Method::GET, self.table("video_likes")).query(&[
            ("select", "video_id".to_string()),
            ("user_id", format!("eq.{}", user_id)),
            ("video_id", in_list(video_ids)),
        ]);
        let rows: Vec<LikeRow> = self.fetch_json("load likes", request).await?;
        Ok(rows.into_iter().map(|r| r.video_id).collect())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        upsert: bool,
    ) -> ServiceResult<String> {
        let size = bytes.len();
        let request = self
            .request(
                Method::POST,
                self.object_url(&["storage", "v1", "object"], bucket, path),
            )
            .header("Content-Type", content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes);
        self.send("upload media", self.config.storage_timeout, request)
            .await?;

        info!(bucket, path, size, "object uploaded");
        Ok(self.public_url(bucket, path))
    }

    async fn remove_object(&self, bucket: &str, path: &str) -> ServiceResult<()> {
        let request = self
            .request(Method::DELETE, self.endpoint(["storage", "v1", "object", bucket]))
            .json(&json!({ "prefixes": [path] }));
        self.send("remove media", self.config.storage_timeout, request)
            .await?;
        Ok(())
    }

    async fn insert_live_stream(&self, stream: &NewLiveStream) -> ServiceResult<LiveStreamRecord> {
        let request = self
            .request(Method::POST, self.table("live_streams"))
            .header("Prefer", "return=representation")
            .json(stream);
        let rows: Vec<LiveStreamRecord> = self.fetch_json("go live", request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::network("go live", "insert returned no row"))
    }

    async fn deactivate_live_streams(&self, user_id: &str) -> ServiceResult<()> {
        let request = self
            .request(Method::PATCH, self.table("live_streams"))
            .query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("is_active", "eq.true".to_string()),
            ])
            .json(&json!({ "is_active": false }));
        self.send("end live streams", self.config.query_timeout, request)
            .await?;
        Ok(())
    }
}
