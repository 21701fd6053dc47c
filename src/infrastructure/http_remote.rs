use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::repository::RemoteCollection;
use crate::domain::todo::{CreateTodo, Todo, TodoId};
use crate::error::{SyncError, SyncResult};

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// Remote collection spoken to over HTTP: `GET/POST /todos`, `DELETE /todos/{id}`.
#[derive(Clone)]
pub struct HttpCollection {
    client: Client,
    base_url: String,
}

impl HttpCollection {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> SyncResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| SyncError::transport("build http client", e.to_string()))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

    /// Sends and returns the body of a 2xx response; anything else is a transport failure.
    async fn send(&self, operation: &'static str, request: RequestBuilder) -> SyncResult<String> {
        let response = request.send().await.map_err(|e| SyncError::transport(operation, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::transport(operation, format!("server responded with {status}")));
        }
        response.text().await.map_err(|e| SyncError::transport(operation, e.to_string()))
    }

    fn decode<T: DeserializeOwned>(what: &'static str, body: &str) -> SyncResult<T> {
        serde_json::from_str(body).map_err(|e| SyncError::decode(what, e))
    }
}

#[async_trait]
impl RemoteCollection for HttpCollection {
    async fn fetch_all(&self) -> SyncResult<Vec<Todo>> {
        let body = self.send("fetch todos", self.client.get(self.url("/todos"))).await?;
        let todos: Vec<Todo> = Self::decode("todo list", &body)?;
        debug!(count = todos.len(), "fetched remote todos");
        Ok(todos)
    }

    async fn create(&self, input: CreateTodo) -> SyncResult<Todo> {
        let body = self.send("create todo", self.client.post(self.url("/todos")).json(&input)).await?;
        Self::decode("created todo", &body)
    }

    async fn delete(&self, id: TodoId) -> SyncResult<()> {
        self.send("delete todo", self.client.delete(self.url(&format!("/todos/{id}")))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped_from_base() {
        let remote = HttpCollection::new("http://127.0.0.1:3000/", None).unwrap();
        assert_eq!(remote.base_url(), "http://127.0.0.1:3000");
        assert_eq!(remote.url("/todos/4"), "http://127.0.0.1:3000/todos/4");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_failure() {
        // Port 9 (discard) is closed on test machines.
        let remote = HttpCollection::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
        let err = remote.fetch_all().await.unwrap_err();
        assert!(err.is_transport());
    }
}
