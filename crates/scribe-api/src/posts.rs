use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::{debug, error, info};

use scribe_db::Database;
use scribe_db::models::{NewPost, PostRow};
use scribe_types::api::{CreatePostRequest, PostResponse, UpdatePostRequest};

use crate::error::ApiError;
use crate::state::AppState;

/// Post routes, relative to wherever the caller nests them.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{id}", get(get_post).put(update_post).delete(delete_post))
        .with_state(state)
}

pub async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = match state.cache.all_posts().await {
        Some(rows) => {
            debug!("Serving {} posts from cache", rows.len());
            rows
        }
        None => {
            let generation = state.cache.generation().await;
            let rows = blocking(&state, |db| db.list_posts()).await?;
            if !state.cache.refresh(generation, rows.clone()).await {
                debug!("Post listing changed while reading, not caching");
            }
            rows
        }
    };

    let posts = rows
        .into_iter()
        .map(to_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let row = blocking(&state, move |db| db.get_post(id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(to_response(row)?))
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewPost::new(req.author_id, req.title, req.content);
    let row = blocking(&state, move |db| db.insert(&new)).await?;
    state.cache.invalidate().await;

    info!("Post {} created by {}", row.id, row.author_id);
    Ok((StatusCode::CREATED, Json(to_response(row)?)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = blocking(&state, move |db| db.update_post(id, &req.title, &req.content))
        .await?
        .ok_or(ApiError::NotFound)?;
    state.cache.invalidate().await;
    Ok(Json(to_response(row)?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = blocking(&state, move |db| db.delete_post(id)).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    state.cache.invalidate().await;
    Ok(StatusCode::NO_CONTENT)
}

/// Run a database call off the async runtime.
async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> scribe_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

fn to_response(row: PostRow) -> Result<PostResponse, ApiError> {
    let Some(created_at) = row.created_at_utc() else {
        error!("Corrupt created_at '{}' on post {}", row.created_at, row.id);
        return Err(ApiError::Internal);
    };
    Ok(PostResponse {
        id: row.id,
        author_id: row.author_id,
        title: row.title,
        content: row.content,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, Response};
    use http_body_util::BodyExt;
    use scribe_db::models::NewUser;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::state::AppStateInner;

    fn setup() -> (AppState, Router, String) {
        let db = Database::open_in_memory().unwrap();
        let author = db.insert(&NewUser::new("writer@example.com", "hash")).unwrap();
        let state = AppStateInner::new(db);
        let app = Router::new().nest("/posts", router(state.clone()));
        (state, app, author.id)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    async fn json_body(resp: Response<Body>) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_then_fetch() {
        let (_, app, author) = setup();

        let resp = send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({ "authorId": author, "title": "Hello", "content": "First post" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = json_body(resp).await;
        assert_eq!(created["authorId"], author.as_str());
        assert!(created["createdAt"].is_string());

        let id = created["id"].as_i64().unwrap();
        let resp = send(&app, Method::GET, &format!("/posts/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["title"], "Hello");
    }

    #[tokio::test]
    async fn unknown_author_is_a_conflict() {
        let (_, app, _) = setup();
        let resp = send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({ "authorId": "nobody", "title": "Hello", "content": "Body" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn overlong_title_is_rejected() {
        let (_, app, author) = setup();
        let resp = send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({ "authorId": author, "title": "t".repeat(257), "content": "Body" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json_body(resp).await["error"].as_str().unwrap().contains("title"));
    }

    #[tokio::test]
    async fn listing_is_cached_until_a_write() {
        let (state, app, author) = setup();

        let resp = send(&app, Method::GET, "/posts", None).await;
        assert_eq!(json_body(resp).await, json!([]));
        assert_eq!(state.cache.all_posts().await, Some(vec![]));

        send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({ "authorId": author, "title": "Hello", "content": "Body" })),
        )
        .await;
        assert!(state.cache.all_posts().await.is_none());

        let listed = json_body(send(&app, Method::GET, "/posts", None).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let (state, app, author) = setup();
        let post = state
            .db
            .insert(&NewPost::new(&author, "Draft", "Body"))
            .unwrap();
        let uri = format!("/posts/{}", post.id);

        let resp = send(
            &app,
            Method::PUT,
            &uri,
            Some(json!({ "title": "Final", "content": "Edited" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["title"], "Final");

        let resp = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(&app, Method::GET, &uri, None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn corrupt_timestamp_is_an_internal_error() {
        let (state, app, author) = setup();
        let post = state
            .db
            .insert(&NewPost {
                created_at: Some("not a date".into()),
                ..NewPost::new(&author, "Imported", "Body")
            })
            .unwrap();

        let resp = send(&app, Method::GET, &format!("/posts/{}", post.id), None).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = send(&app, Method::GET, "/posts", None).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn listing_matches_storage_after_concurrent_writes() {
        let (state, app, author) = setup();

        for round in 0..100 {
            let mut tasks = Vec::new();
            for i in 0..4 {
                let reader = app.clone();
                tasks.push(tokio::spawn(async move {
                    send(&reader, Method::GET, "/posts", None).await.status()
                }));
                let writer = app.clone();
                let body = json!({
                    "authorId": author,
                    "title": format!("{round}-{i}"),
                    "content": "Body",
                });
                tasks.push(tokio::spawn(async move {
                    send(&writer, Method::POST, "/posts", Some(body)).await.status()
                }));
            }
            for task in tasks {
                assert!(task.await.unwrap().is_success());
            }

            let listed = json_body(send(&app, Method::GET, "/posts", None).await).await;
            let listed: Vec<i64> = listed
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p["id"].as_i64().unwrap())
                .collect();
            let stored: Vec<i64> = state
                .db
                .list_posts()
                .unwrap()
                .iter()
                .map(|p| p.id)
                .collect();
            assert_eq!(listed, stored, "stale listing after round {round}");
        }
    }

    #[tokio::test]
    async fn update_missing_post_is_not_found() {
        let (_, app, _) = setup();
        let resp = send(
            &app,
            Method::PUT,
            "/posts/404",
            Some(json!({ "title": "x", "content": "y" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
