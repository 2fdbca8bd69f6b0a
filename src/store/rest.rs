//! HTTP client for the hosted row API.
//!
//! Requests carry the project API key plus a bearer token (the signed-in
//! user's access token when available). Filters are plain query
//! parameters in the `column=op.value` form; writes use `Prefer` headers
//! to pick between returning the stored row and returning nothing.

use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    NewSection, NewTask, SectionPatch, StoreCapabilities, StoreError, TaskDayRow, TaskPatch,
    TaskStore,
};
use crate::types::{DailyStats, Section, Task};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const TASKS_TABLE: &str = "tasks";
const SECTIONS_TABLE: &str = "sections";
const STATS_TABLE: &str = "daily_stats";

#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Project base URL, e.g. `https://abc.example.co`.
    pub base_url: String,
    /// Project API key, sent on every request.
    pub api_key: String,
    /// Signed-in user's access token; the API key doubles as the bearer
    /// when absent.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl RestStoreConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        RestStoreConfig {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

pub struct RestStore {
    config: RestStoreConfig,
    client: reqwest::Client,
}

/// Accumulates `column=op.value` pairs with percent-encoded values.
#[derive(Debug, Default)]
struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    fn select(columns: &str) -> Self {
        let mut query = Query::default();
        query.raw("select", columns);
        query
    }

    fn raw(&mut self, key: &str, value: &str) -> &mut Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    fn eq(&mut self, column: &str, value: impl ToString) -> &mut Self {
        self.raw(column, &format!("eq.{}", value.to_string()))
    }

    fn gte(&mut self, column: &str, value: impl ToString) -> &mut Self {
        self.raw(column, &format!("gte.{}", value.to_string()))
    }

    fn lte(&mut self, column: &str, value: impl ToString) -> &mut Self {
        self.raw(column, &format!("lte.{}", value.to_string()))
    }

    fn id_in(&mut self, ids: &[Uuid]) -> &mut Self {
        let list = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.raw("id", &format!("in.({list})"))
    }

    fn order(&mut self, spec: &str) -> &mut Self {
        self.raw("order", spec)
    }

    fn limit(&mut self, n: usize) -> &mut Self {
        self.raw("limit", &n.to_string())
    }

    fn encode(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl RestStore {
    pub fn new(config: RestStoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| StoreError::new("CLIENT_INIT", err.to_string()))?;
        Ok(RestStore { config, client })
    }

    fn table_url(&self, table: &str, query: &Query) -> String {
        format!(
            "{}/rest/v1/{}?{}",
            self.config.base_url.trim_end_matches('/'),
            table,
            query.encode()
        )
    }

    fn bearer(&self) -> &str {
        self.config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.api_key)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.bearer())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = request.send().await.map_err(request_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status, &body))
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table, query);
        debug!(url = %url, "store fetch");
        let response = self.send(self.request(reqwest::Method::GET, &url)).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|err| StoreError::new("BAD_RESPONSE", err.to_string()))
    }

    async fn write(
        &self,
        method: reqwest::Method,
        table: &str,
        query: &Query,
        body: &serde_json::Value,
        prefer: &str,
    ) -> Result<reqwest::Response, StoreError> {
        let url = self.table_url(table, query);
        debug!(url = %url, method = %method, "store write");
        self.send(
            self.request(method, &url)
                .header("Prefer", prefer)
                .json(body),
        )
        .await
    }
}

fn request_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::new("TIMEOUT", err.to_string())
    } else if err.is_connect() {
        StoreError::new("CONNECT_FAILED", err.to_string())
    } else {
        StoreError::new("REQUEST_FAILED", err.to_string())
    }
}

/// Server errors arrive as JSON `{code, message, ...}`; anything else is
/// reported under the HTTP status code.
fn error_from_body(status: reqwest::StatusCode, body: &str) -> StoreError {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) {
        let code = parsed
            .get("code")
            .and_then(|value| value.as_str())
            .unwrap_or_else(|| status.as_str())
            .to_string();
        let message = parsed
            .get("message")
            .and_then(|value| value.as_str())
            .unwrap_or(body)
            .to_string();
        return StoreError { code, message };
    }

    StoreError::new(status.as_str(), body.trim().to_string())
}

fn task_insert_body(task: &NewTask, with_sort_order: bool) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    body.insert("user_id".into(), serde_json::json!(task.user_id));
    body.insert("text".into(), serde_json::json!(task.text));
    body.insert("completed".into(), serde_json::json!(task.completed));
    body.insert(
        "pomodoros_spent".into(),
        serde_json::json!(task.pomodoros_spent),
    );
    body.insert(
        "scheduled_date".into(),
        serde_json::json!(task.scheduled_date),
    );
    if let Some(completed_at) = &task.completed_at {
        body.insert("completed_at".into(), serde_json::json!(completed_at));
    }
    if let Some(section_id) = &task.section_id {
        body.insert("section_id".into(), serde_json::json!(section_id));
    }
    if with_sort_order && let Some(order) = task.sort_order {
        body.insert("sort_order".into(), serde_json::json!(order));
    }
    serde_json::Value::Object(body)
}

impl TaskStore for RestStore {
    async fn probe_capabilities(&self) -> Result<StoreCapabilities, StoreError> {
        let mut query = Query::select("sort_order");
        query.limit(1);

        match self
            .fetch_rows::<serde_json::Value>(TASKS_TABLE, &query)
            .await
        {
            Ok(_) => Ok(StoreCapabilities {
                task_ordering: true,
            }),
            Err(err) if err.is_missing_column("sort_order") => {
                warn!(error = %err, "task ordering column absent; ordering writes disabled");
                Ok(StoreCapabilities {
                    task_ordering: false,
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_tasks_for_date(
        &self,
        user: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Task>, StoreError> {
        let mut query = Query::select("*");
        query
            .eq("user_id", user)
            .eq("scheduled_date", date)
            .order("created_at.asc");
        self.fetch_rows(TASKS_TABLE, &query).await
    }

    async fn fetch_incomplete_tasks(
        &self,
        user: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Task>, StoreError> {
        let mut query = Query::select("*");
        query
            .eq("user_id", user)
            .eq("scheduled_date", date)
            .eq("completed", false);
        self.fetch_rows(TASKS_TABLE, &query).await
    }

    async fn fetch_task_days(
        &self,
        user: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TaskDayRow>, StoreError> {
        let mut query = Query::select("scheduled_date,completed");
        query
            .eq("user_id", user)
            .gte("scheduled_date", from)
            .lte("scheduled_date", to);
        self.fetch_rows(TASKS_TABLE, &query).await
    }

    async fn fetch_stats(
        &self,
        user: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyStats>, StoreError> {
        let mut query = Query::select("*");
        query.eq("user_id", user).eq("date", date).limit(1);
        let mut rows: Vec<DailyStats> = self.fetch_rows(STATS_TABLE, &query).await?;
        Ok(rows.pop())
    }

    async fn fetch_stats_range(
        &self,
        user: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyStats>, StoreError> {
        let mut query = Query::select("*");
        query
            .eq("user_id", user)
            .gte("date", from)
            .lte("date", to)
            .order("date.asc");
        self.fetch_rows(STATS_TABLE, &query).await
    }

    async fn fetch_sections(&self, user: Uuid) -> Result<Vec<Section>, StoreError> {
        let mut query = Query::select("*");
        query.eq("user_id", user).order("sort_order.asc");
        self.fetch_rows(SECTIONS_TABLE, &query).await
    }

    async fn has_any_tasks(&self, user: Uuid) -> Result<bool, StoreError> {
        let mut query = Query::select("id");
        query.eq("user_id", user).limit(1);
        let rows: Vec<serde_json::Value> = self.fetch_rows(TASKS_TABLE, &query).await?;
        Ok(!rows.is_empty())
    }

    async fn insert_task(
        &self,
        task: &NewTask,
        with_sort_order: bool,
    ) -> Result<Task, StoreError> {
        let query = Query::select("*");
        let body = task_insert_body(task, with_sort_order);
        let response = self
            .write(
                reqwest::Method::POST,
                TASKS_TABLE,
                &query,
                &body,
                "return=representation",
            )
            .await?;
        let mut rows: Vec<Task> = response
            .json()
            .await
            .map_err(|err| StoreError::new("BAD_RESPONSE", err.to_string()))?;
        rows.pop()
            .ok_or_else(|| StoreError::new("BAD_RESPONSE", "insert returned no row"))
    }

    async fn insert_tasks(&self, tasks: &[NewTask]) -> Result<(), StoreError> {
        if tasks.is_empty() {
            return Ok(());
        }
        let body = serde_json::Value::Array(
            tasks
                .iter()
                .map(|task| task_insert_body(task, false))
                .collect(),
        );
        self.write(
            reqwest::Method::POST,
            TASKS_TABLE,
            &Query::default(),
            &body,
            "return=minimal",
        )
        .await?;
        Ok(())
    }

    async fn update_task(
        &self,
        user: Uuid,
        id: Uuid,
        patch: &TaskPatch,
    ) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut query = Query::default();
        query.eq("id", id).eq("user_id", user);
        self.write(
            reqwest::Method::PATCH,
            TASKS_TABLE,
            &query,
            &patch.to_json(),
            "return=minimal",
        )
        .await?;
        Ok(())
    }

    async fn update_tasks_date(
        &self,
        user: Uuid,
        ids: &[Uuid],
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut query = Query::default();
        query.id_in(ids).eq("user_id", user);
        let body = serde_json::json!({ "scheduled_date": date });
        self.write(
            reqwest::Method::PATCH,
            TASKS_TABLE,
            &query,
            &body,
            "return=minimal",
        )
        .await?;
        Ok(())
    }

    async fn update_task_order(
        &self,
        user: Uuid,
        orders: &[(Uuid, i64)],
    ) -> Result<(), StoreError> {
        for (id, sort_order) in orders {
            let patch = TaskPatch {
                sort_order: Some(*sort_order),
                ..TaskPatch::default()
            };
            self.update_task(user, *id, &patch).await?;
        }
        Ok(())
    }

    async fn delete_task(&self, user: Uuid, id: Uuid) -> Result<(), StoreError> {
        let mut query = Query::default();
        query.eq("id", id).eq("user_id", user);
        let url = self.table_url(TASKS_TABLE, &query);
        self.send(self.request(reqwest::Method::DELETE, &url))
            .await?;
        Ok(())
    }

    async fn insert_section(&self, section: &NewSection) -> Result<Section, StoreError> {
        let query = Query::select("*");
        let body = serde_json::to_value(section)
            .map_err(|err| StoreError::new("BAD_REQUEST", err.to_string()))?;
        let response = self
            .write(
                reqwest::Method::POST,
                SECTIONS_TABLE,
                &query,
                &body,
                "return=representation",
            )
            .await?;
        let mut rows: Vec<Section> = response
            .json()
            .await
            .map_err(|err| StoreError::new("BAD_RESPONSE", err.to_string()))?;
        rows.pop()
            .ok_or_else(|| StoreError::new("BAD_RESPONSE", "insert returned no row"))
    }

    async fn update_section(
        &self,
        user: Uuid,
        id: Uuid,
        patch: &SectionPatch,
    ) -> Result<(), StoreError> {
        let mut query = Query::default();
        query.eq("id", id).eq("user_id", user);
        self.write(
            reqwest::Method::PATCH,
            SECTIONS_TABLE,
            &query,
            &patch.to_json(),
            "return=minimal",
        )
        .await?;
        Ok(())
    }

    async fn update_section_order(
        &self,
        user: Uuid,
        orders: &[(Uuid, i64)],
    ) -> Result<(), StoreError> {
        for (id, sort_order) in orders {
            let patch = SectionPatch {
                sort_order: Some(*sort_order),
                ..SectionPatch::default()
            };
            self.update_section(user, *id, &patch).await?;
        }
        Ok(())
    }

    async fn delete_section(&self, user: Uuid, id: Uuid) -> Result<(), StoreError> {
        let mut query = Query::default();
        query.eq("id", id).eq("user_id", user);
        let url = self.table_url(SECTIONS_TABLE, &query);
        self.send(self.request(reqwest::Method::DELETE, &url))
            .await?;
        Ok(())
    }

    async fn upsert_stats(&self, stats: &DailyStats) -> Result<(), StoreError> {
        let mut query = Query::default();
        query.raw("on_conflict", "user_id,date");
        let body = serde_json::to_value(stats)
            .map_err(|err| StoreError::new("BAD_REQUEST", err.to_string()))?;
        self.write(
            reqwest::Method::POST,
            STATS_TABLE,
            &query,
            &body,
            "resolution=merge-duplicates,return=minimal",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testhttp::{http_error, http_ok, leak, spawn_single_response_server};

    fn store_for(base_url: &str) -> RestStore {
        RestStore::new(
            RestStoreConfig::new(base_url, "test-api-key").with_access_token("user-token"),
        )
        .expect("client should build")
    }

    #[tokio::test]
    async fn fetch_tasks_sends_filters_and_parses_rows() {
        let body = r#"[{
            "id": "6f2426d8-489f-4113-8e68-66096e47726e",
            "user_id": "9afe4eed-0c4c-4b0c-b038-9c5d7f843b14",
            "text": "Review notes",
            "completed": false,
            "pomodoros_spent": 1,
            "scheduled_date": "2024-06-15",
            "completed_at": null,
            "sort_order": 0,
            "description": null,
            "section_id": null,
            "created_at": "2024-06-15T08:00:00Z"
        }]"#;
        let (base_url, handle) = spawn_single_response_server(leak(http_ok(body)));
        let store = store_for(&base_url);

        let user: Uuid = "9afe4eed-0c4c-4b0c-b038-9c5d7f843b14".parse().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let tasks = store
            .fetch_tasks_for_date(user, date)
            .await
            .expect("fetch should succeed");

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "Review notes");

        let request = handle.join().expect("server thread");
        assert!(request.starts_with("GET /rest/v1/tasks?"));
        assert!(request.contains("user_id=eq.9afe4eed-0c4c-4b0c-b038-9c5d7f843b14"));
        assert!(request.contains("scheduled_date=eq.2024-06-15"));
        assert!(request.contains("order=created_at.asc"));
        assert!(request.contains("apikey: test-api-key"));
        assert!(request.contains("authorization: Bearer user-token"));
    }

    #[tokio::test]
    async fn probe_reports_missing_ordering_column() {
        let body = r#"{"code":"42703","message":"column tasks.sort_order does not exist"}"#;
        let (base_url, handle) = spawn_single_response_server(leak(http_error("400 Bad Request", body)));
        let store = store_for(&base_url);

        let caps = store
            .probe_capabilities()
            .await
            .expect("probe should classify the error");
        assert!(!caps.task_ordering);
        handle.join().expect("server thread");
    }

    #[tokio::test]
    async fn probe_reports_ordering_supported() {
        let (base_url, handle) = spawn_single_response_server(leak(http_ok("[]")));
        let store = store_for(&base_url);

        let caps = store.probe_capabilities().await.expect("probe ok");
        assert!(caps.task_ordering);

        let request = handle.join().expect("server thread");
        assert!(request.contains("select=sort_order"));
        assert!(request.contains("limit=1"));
    }

    #[tokio::test]
    async fn insert_task_posts_body_and_returns_row() {
        let body = r#"[{
            "id": "6f2426d8-489f-4113-8e68-66096e47726e",
            "user_id": "9afe4eed-0c4c-4b0c-b038-9c5d7f843b14",
            "text": "Draft email",
            "completed": false,
            "pomodoros_spent": 0,
            "scheduled_date": "2024-06-15",
            "completed_at": null,
            "sort_order": 4,
            "description": null,
            "section_id": null,
            "created_at": "2024-06-15T09:00:00Z"
        }]"#;
        let (base_url, handle) = spawn_single_response_server(leak(http_ok(body)));
        let store = store_for(&base_url);

        let user: Uuid = "9afe4eed-0c4c-4b0c-b038-9c5d7f843b14".parse().unwrap();
        let mut new_task = NewTask::for_date(
            user,
            "Draft email",
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        );
        new_task.sort_order = Some(4);

        let task = store
            .insert_task(&new_task, true)
            .await
            .expect("insert should succeed");
        assert_eq!(task.sort_order, Some(4));

        let request = handle.join().expect("server thread");
        assert!(request.starts_with("POST /rest/v1/tasks?"));
        assert!(request.contains("prefer: return=representation"));
        assert!(request.contains("\"sort_order\":4"));
        assert!(request.contains("\"text\":\"Draft email\""));
        // Unset optional columns stay out of the payload.
        assert!(!request.contains("\"section_id\""));
        assert!(!request.contains("\"completed_at\""));
    }

    #[tokio::test]
    async fn insert_task_without_ordering_omits_column() {
        let body = r#"[{
            "id": "6f2426d8-489f-4113-8e68-66096e47726e",
            "user_id": "9afe4eed-0c4c-4b0c-b038-9c5d7f843b14",
            "text": "Draft email",
            "completed": false,
            "pomodoros_spent": 0,
            "scheduled_date": "2024-06-15",
            "completed_at": null,
            "description": null,
            "section_id": null,
            "created_at": "2024-06-15T09:00:00Z"
        }]"#;
        let (base_url, handle) = spawn_single_response_server(leak(http_ok(body)));
        let store = store_for(&base_url);

        let user = Uuid::new_v4();
        let mut new_task = NewTask::for_date(
            user,
            "Draft email",
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        );
        new_task.sort_order = Some(9);

        store
            .insert_task(&new_task, false)
            .await
            .expect("insert should succeed");

        let request = handle.join().expect("server thread");
        assert!(!request.contains("sort_order"));
    }

    #[tokio::test]
    async fn update_tasks_date_uses_id_set_filter() {
        let (base_url, handle) = spawn_single_response_server(leak(http_ok("[]")));
        let store = store_for(&base_url);

        let user = Uuid::new_v4();
        let first: Uuid = "6f2426d8-489f-4113-8e68-66096e47726e".parse().unwrap();
        let second: Uuid = "9afe4eed-0c4c-4b0c-b038-9c5d7f843b14".parse().unwrap();
        store
            .update_tasks_date(
                user,
                &[first, second],
                NaiveDate::from_ymd_opt(2024, 6, 16).unwrap(),
            )
            .await
            .expect("update should succeed");

        let request = handle.join().expect("server thread");
        assert!(request.starts_with("PATCH /rest/v1/tasks?"));
        // Set filter survives percent-encoding of parens and comma.
        assert!(request.contains(
            "id=in.%286f2426d8-489f-4113-8e68-66096e47726e%2C9afe4eed-0c4c-4b0c-b038-9c5d7f843b14%29"
        ));
        assert!(request.contains("\"scheduled_date\":\"2024-06-16\""));
    }

    #[tokio::test]
    async fn upsert_stats_targets_conflict_key() {
        let (base_url, handle) = spawn_single_response_server(leak(http_ok("[]")));
        let store = store_for(&base_url);

        let stats = DailyStats {
            user_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            total_focus_minutes: 25,
            sessions_completed: 1,
        };
        store.upsert_stats(&stats).await.expect("upsert ok");

        let request = handle.join().expect("server thread");
        assert!(request.starts_with("POST /rest/v1/daily_stats?"));
        assert!(request.contains("on_conflict=user_id%2Cdate"));
        assert!(request.contains("prefer: resolution=merge-duplicates,return=minimal"));
        assert!(request.contains("\"total_focus_minutes\":25"));
    }

    #[tokio::test]
    async fn server_error_body_maps_to_store_error() {
        let body = r#"{"code":"PGRST301","message":"JWT expired"}"#;
        let (base_url, handle) = spawn_single_response_server(leak(http_error("401 Unauthorized", body)));
        let store = store_for(&base_url);

        let err = store
            .fetch_sections(Uuid::new_v4())
            .await
            .expect_err("expired token should fail");
        assert_eq!(err.code, "PGRST301");
        assert_eq!(err.message, "JWT expired");
        handle.join().expect("server thread");
    }

    #[tokio::test]
    async fn non_json_error_body_maps_to_status_code() {
        let (base_url, handle) =
            spawn_single_response_server(leak(http_error("502 Bad Gateway", "upstream out")));
        let store = store_for(&base_url);

        let err = store
            .fetch_sections(Uuid::new_v4())
            .await
            .expect_err("bad gateway should fail");
        assert_eq!(err.code, "502");
        assert_eq!(err.message, "upstream out");
        handle.join().expect("server thread");
    }

    #[tokio::test]
    async fn fetch_stats_returns_none_when_no_row() {
        let (base_url, handle) = spawn_single_response_server(leak(http_ok("[]")));
        let store = store_for(&base_url);

        let stats = store
            .fetch_stats(Uuid::new_v4(), NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
            .await
            .expect("fetch ok");
        assert_eq!(stats, None);
        handle.join().expect("server thread");
    }

    #[test]
    fn connect_failure_maps_to_connect_code() {
        // Port 1 on localhost refuses connections.
        let store = store_for("http://127.0.0.1:1");
        let err = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime")
            .block_on(store.fetch_sections(Uuid::new_v4()))
            .expect_err("connection should fail");
        assert_eq!(err.code, "CONNECT_FAILED");
    }
}
