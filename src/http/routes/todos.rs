use std::sync::Arc;

use axum::{extract::{Path, State}, routing::{delete, get}, Json, Router};
use axum::http::StatusCode;
use tracing::info;

use crate::domain::repository::RemoteCollection;
use crate::domain::todo::{CreateTodo, Todo, TodoId};
use crate::http::types::ApiError;

pub struct AppState<C: RemoteCollection> { pub collection: Arc<C> }

impl<C: RemoteCollection> Clone for AppState<C> {
    fn clone(&self) -> Self { Self { collection: Arc::clone(&self.collection) } }
}

impl<C: RemoteCollection> AppState<C> {
    pub fn new(collection: C) -> Self { Self { collection: Arc::new(collection) } }
}

/// Serves any collection under the same protocol the sync client speaks.
pub fn router<C: RemoteCollection>(state: AppState<C>) -> Router {
    Router::new()
        .route("/todos", get(list_todos::<C>).post(create_todo::<C>))
        .route("/todos/:id", delete(delete_todo::<C>))
        .with_state(state)
}

async fn list_todos<C: RemoteCollection>(State(state): State<AppState<C>>) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(state.collection.fetch_all().await?))
}

async fn create_todo<C: RemoteCollection>(State(state): State<AppState<C>>, Json(payload): Json<CreateTodo>) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let todo = state.collection.create(payload).await?;
    info!(id = ?todo.id, title = %todo.title, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn delete_todo<C: RemoteCollection>(State(state): State<AppState<C>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.collection.delete(id).await?;
    info!(%id, "todo deleted");
    Ok(StatusCode::OK)
}

fn parse_id(s: &str) -> Result<TodoId, ApiError> { s.parse().map(TodoId).map_err(|_| ApiError::bad_request(format!("invalid id `{s}`"))) }
