//! Fake upstream service
//!
//! A single axum server playing the artist directory, the content catalog and the
//! community service at once. Tests mutate its data between requests.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Default)]
struct UpstreamData {
    artists: BTreeMap<i64, Value>,
    contents: BTreeMap<i64, Value>,
    comments: HashMap<i64, Value>,
    failing_comments: HashSet<i64>,
    communities: BTreeMap<i64, Value>,
    unavailable: bool,
}

type SharedData = Arc<Mutex<UpstreamData>>;

pub struct FakeUpstream {
    /// Base URL shared by the three fake services
    pub base_url: String,
    data: SharedData,
    _shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FakeUpstream {
    pub async fn spawn() -> Self {
        let data = SharedData::default();

        let app = Router::new()
            .route("/artists", get(list_artists))
            .route("/artists/{id}", get(get_artist))
            .route("/elementos", get(list_contents))
            .route("/elementos/{id}", get(get_content))
            .route("/elementos/{id}/comentarios", get(get_comments))
            .route("/comunidad/", get(list_communities))
            .with_state(data.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake upstream");
        let port = listener.local_addr().expect("No local address").port();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake upstream failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            data,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn put_artist(&self, artist_id: i64, listeners: f64, rating: f64) {
        self.put_artist_json(
            artist_id,
            json!({
                "idArtista": artist_id,
                "nombre": format!("artist-{}", artist_id),
                "oyentes": listeners,
                "valoracion": rating,
            }),
        );
    }

    /// Stores a raw artist record, for payloads with missing or malformed metrics.
    pub fn put_artist_json(&self, artist_id: i64, artist: Value) {
        self.data.lock().unwrap().artists.insert(artist_id, artist);
    }

    pub fn remove_artist(&self, artist_id: i64) {
        self.data.lock().unwrap().artists.remove(&artist_id);
    }

    pub fn put_content(
        &self,
        content_id: i64,
        sales: f64,
        rating: f64,
        genre: Option<&str>,
        is_album: bool,
    ) {
        let genre = genre.map(|name| json!({ "nombre": name }));
        self.data.lock().unwrap().contents.insert(
            content_id,
            json!({
                "idContenido": content_id,
                "numventas": sales,
                "valoracion": rating,
                "esalbum": is_album,
                "esnovedad": false,
                "genero": genre,
            }),
        );
    }

    pub fn put_comments(&self, content_id: i64, comments: &[&str]) {
        let comments: Vec<Value> = comments
            .iter()
            .map(|text| json!({ "comentario": text }))
            .collect();
        self.data
            .lock()
            .unwrap()
            .comments
            .insert(content_id, Value::Array(comments));
    }

    /// Makes the comment listing of `content_id` answer 500.
    pub fn fail_comments(&self, content_id: i64) {
        self.data.lock().unwrap().failing_comments.insert(content_id);
    }

    pub fn put_community(&self, community_id: i64, posts: f64, members: f64) {
        self.data.lock().unwrap().communities.insert(
            community_id,
            json!({
                "idComunidad": community_id,
                "numPublicaciones": posts,
                "numUsuarios": members,
            }),
        );
    }

    /// When set, every endpoint answers 503.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.data.lock().unwrap().unavailable = unavailable;
    }
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn unavailable() -> Response {
    StatusCode::SERVICE_UNAVAILABLE.into_response()
}

fn found_or_404(value: Option<&Value>) -> Response {
    match value {
        Some(value) => Json(value.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_artists(State(data): State<SharedData>) -> Response {
    let data = data.lock().unwrap();
    if data.unavailable {
        return unavailable();
    }
    let refs: Vec<Value> = data
        .artists
        .keys()
        .map(|id| json!({ "idArtista": id }))
        .collect();
    Json(refs).into_response()
}

async fn get_artist(State(data): State<SharedData>, Path(id): Path<i64>) -> Response {
    let data = data.lock().unwrap();
    if data.unavailable {
        return unavailable();
    }
    found_or_404(data.artists.get(&id))
}

async fn list_contents(State(data): State<SharedData>) -> Response {
    let data = data.lock().unwrap();
    if data.unavailable {
        return unavailable();
    }
    let refs: Vec<Value> = data
        .contents
        .keys()
        .map(|id| json!({ "idContenido": id }))
        .collect();
    Json(refs).into_response()
}

async fn get_content(State(data): State<SharedData>, Path(id): Path<i64>) -> Response {
    let data = data.lock().unwrap();
    if data.unavailable {
        return unavailable();
    }
    found_or_404(data.contents.get(&id))
}

async fn get_comments(State(data): State<SharedData>, Path(id): Path<i64>) -> Response {
    let data = data.lock().unwrap();
    if data.unavailable || data.failing_comments.contains(&id) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match data.comments.get(&id) {
        Some(comments) => Json(comments.clone()).into_response(),
        None => Json(json!([])).into_response(),
    }
}

async fn list_communities(State(data): State<SharedData>) -> Response {
    let data = data.lock().unwrap();
    if data.unavailable {
        return unavailable();
    }
    let communities: Vec<Value> = data.communities.values().cloned().collect();
    Json(communities).into_response()
}
