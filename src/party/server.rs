//! The HTTP surface: the roster, ballot submission, the standings and their
//! live stream over a WebSocket.
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::cors::{Any, CorsLayer};

use crate::args::ServeArgs;
use crate::party::channel::{SharedSnapshot, StandingsChannel};
use crate::party::standings::standings_snapshot;
use crate::party::store::BallotStore;
use crate::party::submit::{submit_ballot, voter_exists, BallotRequest, VoterCheckRequest};
use crate::party::*;

/// Snapshots a slow viewer may fall behind before skipping ahead.
const CHANNEL_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct AppState {
    pub store: BallotStore,
    pub channel: Arc<StandingsChannel>,
}

impl AppState {
    pub fn new(store: BallotStore) -> AppState {
        let channel = Arc::new(StandingsChannel::new(store.clone(), CHANNEL_CAPACITY));
        AppState { store, channel }
    }
}

impl IntoResponse for PartyError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            "badRequest" | "missingIdentity" | "incompleteBallot" | "unknownCandidate" => {
                StatusCode::BAD_REQUEST
            }
            "duplicateVoter" => StatusCode::CONFLICT,
            "storage" | "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if status.is_server_error() {
            warn!("Request failed: {}", self);
            "The ballot box is not available right now, please try again.".to_string()
        } else {
            self.to_string()
        };
        let body = json!({"error": self.kind(), "message": message});
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/cocktails", get(cocktails_handler))
        .route("/api/dragons", get(dragons_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/stats/live", get(live_stats_handler))
        .route("/api/vote", post(vote_handler))
        .route("/api/voters/check", post(check_voter_handler))
        .layer(cors)
        .with_state(state)
}

async fn cocktails_handler(State(state): State<AppState>) -> PartyResult<Json<JSValue>> {
    let cocktails = state.store.list_cocktails().await?;
    let js: Vec<JSValue> = cocktails.iter().map(cocktail_to_json).collect();
    Ok(Json(JSValue::Array(js)))
}

async fn dragons_handler(State(state): State<AppState>) -> PartyResult<Json<JSValue>> {
    let dragons = state.store.list_dragons().await?;
    let js: Vec<JSValue> = dragons.iter().map(dragon_to_json).collect();
    Ok(Json(JSValue::Array(js)))
}

async fn stats_handler(State(state): State<AppState>) -> PartyResult<Json<JSValue>> {
    let snapshot = standings_snapshot(&state.store).await?;
    Ok(Json(snapshot_to_json(&snapshot)))
}

async fn vote_handler(
    State(state): State<AppState>,
    body: Result<Json<BallotRequest>, JsonRejection>,
) -> PartyResult<(StatusCode, Json<JSValue>)> {
    let Json(request) = body.context(MalformedRequestSnafu {})?;
    let voter = submit_ballot(&state.store, &state.channel, &request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"accepted": true, "voterId": voter.id})),
    ))
}

async fn check_voter_handler(
    State(state): State<AppState>,
    body: Result<Json<VoterCheckRequest>, JsonRejection>,
) -> PartyResult<Json<JSValue>> {
    let Json(request) = body.context(MalformedRequestSnafu {})?;
    let exists = voter_exists(&state.store, &request).await?;
    Ok(Json(json!({ "exists": exists })))
}

async fn live_stats_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_standings(socket, state.channel))
}

fn snapshot_message(snapshot: &SharedSnapshot) -> Message {
    Message::Text(snapshot_to_json(snapshot).to_string())
}

async fn stream_standings(mut socket: WebSocket, channel: Arc<StandingsChannel>) {
    let mut subscription = match channel.subscribe().await {
        Ok(s) => s,
        Err(e) => {
            warn!("Live standings refused: {}", e);
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    info!("Viewer connected ({} watching)", channel.subscriber_count());

    loop {
        tokio::select! {
            next = subscription.next() => match next {
                Some(snapshot) => {
                    if socket.send(snapshot_message(&snapshot)).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = socket.recv() => match incoming {
                // Viewers have nothing to say; only a close matters.
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    drop(subscription);
    info!("Viewer disconnected ({} watching)", channel.subscriber_count());
}

pub async fn run_server(args: &ServeArgs) -> PartyResult<()> {
    let store = BallotStore::connect(&args.database).await?;
    if let Some(roster_path) = &args.roster {
        let roster = roster_reader::read_roster(roster_path)?;
        store.seed_roster(&roster).await?;
        info!(
            "Loaded {} cocktails and {} dragons",
            roster.cocktails.len(),
            roster.dragons.len()
        );
    }

    let state = AppState::new(store);
    let channel = state.channel.clone();
    let app = router(state);

    let address = format!("{}:{}", args.bind, args.port);
    info!("Binding to {}", address);
    let listener = TcpListener::bind(&address)
        .await
        .context(ServingSnafu { address: &address })?;
    info!("Accepting ballots on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(channel))
        .await
        .context(ServingSnafu { address: &address })?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(channel: Arc<StandingsChannel>) {
    let interrupt = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Could not listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Could not listen for the terminate signal: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
    // Open WebSockets would otherwise hold the graceful shutdown forever.
    channel.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::party::store::tests::seeded_store;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use futures::StreamExt;
    use tokio_tungstenite::tungstenite;
    use tower::ServiceExt;

    async fn call(app: Router, method: Method, uri: &str, body: Option<JSValue>) -> (StatusCode, JSValue) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(js) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(js.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let js = if bytes.is_empty() {
            JSValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, js)
    }

    fn ballot(given_name: &str, family_name: &str, cocktails: [i64; 3], dragons: [i64; 3]) -> JSValue {
        let mut votes: Vec<JSValue> = Vec::new();
        for (class, ids) in [("cocktail", cocktails), ("dragon", dragons)] {
            for (idx, id) in ids.iter().enumerate() {
                votes.push(json!({"type": class, "optionId": id, "priority": idx + 1}));
            }
        }
        json!({"name": given_name, "surname": family_name, "votes": votes})
    }

    async fn app() -> Router {
        router(AppState::new(seeded_store().await))
    }

    #[tokio::test]
    async fn roster_routes() {
        let app = app().await;
        let (status, js) = call(app.clone(), Method::GET, "/api/cocktails", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(js.as_array().map(|a| a.len()), Some(3));
        assert_eq!(js[0]["presenterName"], json!("Smaug"));

        let (status, js) = call(app, Method::GET, "/api/dragons", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(js[0], json!({"id": 1, "name": "Norbert"}));
    }

    #[tokio::test]
    async fn vote_then_stats() {
        let app = app().await;
        let (status, js) = call(
            app.clone(),
            Method::POST,
            "/api/vote",
            Some(ballot("Ada", "Lovelace", [2, 1, 3], [3, 1, 2])),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(js["accepted"], json!(true));

        let (status, js) = call(app, Method::GET, "/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(js["cocktails"][0]["id"], json!(2));
        assert_eq!(js["cocktails"][0]["points"], json!(5));
        assert_eq!(js["dragons"][2]["id"], json!(2));
        assert_eq!(js["dragons"][2]["points"], json!(1));
    }

    #[tokio::test]
    async fn rejected_ballots() {
        let app = app().await;
        let mut anonymous = ballot("Ada", "Lovelace", [1, 2, 3], [1, 2, 3]);
        anonymous["name"] = json!("   ");
        let (status, js) = call(app.clone(), Method::POST, "/api/vote", Some(anonymous)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(js["error"], json!("missingIdentity"));

        let (status, js) = call(
            app.clone(),
            Method::POST,
            "/api/vote",
            Some(ballot("Ada", "Lovelace", [1, 2, 7], [1, 2, 3])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(js["error"], json!("unknownCandidate"));

        let good = ballot("Ada", "Lovelace", [1, 2, 3], [1, 2, 3]);
        let (status, _) = call(app.clone(), Method::POST, "/api/vote", Some(good.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, js) = call(app, Method::POST, "/api/vote", Some(good)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(js["error"], json!("duplicateVoter"));
        assert_eq!(js["message"], json!("Ada Lovelace has already voted"));
    }

    #[tokio::test]
    async fn voter_check() {
        let app = app().await;
        let who = json!({"name": "Ada", "surname": "Lovelace"});
        let (status, js) = call(app.clone(), Method::POST, "/api/voters/check", Some(who.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(js, json!({"exists": false}));

        call(
            app.clone(),
            Method::POST,
            "/api/vote",
            Some(ballot("Ada", "Lovelace", [1, 2, 3], [1, 2, 3])),
        )
        .await;
        let (_, js) = call(app, Method::POST, "/api/voters/check", Some(who)).await;
        assert_eq!(js, json!({"exists": true}));
    }

    #[tokio::test]
    async fn malformed_bodies() {
        let app = app().await;
        let wizard = json!({
            "name": "Ada",
            "surname": "Lovelace",
            "votes": [{"type": "wizard", "optionId": 1, "priority": 1}]
        });
        let (status, js) = call(app.clone(), Method::POST, "/api/vote", Some(wizard)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(js["error"], json!("badRequest"));
        assert!(js["message"].as_str().map(|m| m.contains("wizard")).unwrap_or(false));

        let mut wordy = ballot("Ada", "Lovelace", [1, 2, 3], [1, 2, 3]);
        wordy["votes"][0]["priority"] = json!("first");
        let (status, js) = call(app.clone(), Method::POST, "/api/vote", Some(wordy)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(js["error"], json!("badRequest"));

        // No content type.
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/voters/check")
            .body(Body::from(r#"{"name": "Ada", "surname": "Lovelace"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let js: JSValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(js["error"], json!("badRequest"));

        // Nothing was recorded.
        let (_, js) = call(app, Method::GET, "/api/stats", None).await;
        assert_eq!(js["cocktails"][0]["points"], json!(0));
    }

    // The text of the next frame as JSON, or None once the stream is closed.
    async fn next_frame<S>(ws: &mut S) -> Option<JSValue>
    where
        S: futures::Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
    {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("no frame received");
        match frame {
            Some(Ok(tungstenite::Message::Text(text))) => Some(serde_json::from_str(&text).unwrap()),
            Some(Ok(tungstenite::Message::Close(_))) | Some(Err(_)) | None => None,
            Some(Ok(other)) => panic!("unexpected frame {:?}", other),
        }
    }

    #[tokio::test]
    async fn live_standings_stream() {
        let state = AppState::new(seeded_store().await);
        let channel = state.channel.clone();
        let app = router(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let served = app.clone();
        tokio::spawn(async move { axum::serve(listener, served).await });

        let url = format!("ws://{}/api/stats/live", address);
        let (mut viewer, _) = tokio_tungstenite::connect_async(url.clone()).await.unwrap();
        let first = next_frame(&mut viewer).await.unwrap();
        let (_, stats) = call(app.clone(), Method::GET, "/api/stats", None).await;
        assert_eq!(first, stats);

        // A second viewer comes and goes.
        let (mut passer_by, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        next_frame(&mut passer_by).await.unwrap();
        assert_eq!(channel.subscriber_count(), 2);
        passer_by.close(None).await.unwrap();
        let mut waited = 0;
        while channel.subscriber_count() > 1 && waited < 100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += 1;
        }
        assert_eq!(channel.subscriber_count(), 1);

        let (status, _) = call(
            app.clone(),
            Method::POST,
            "/api/vote",
            Some(ballot("Ada", "Lovelace", [3, 1, 2], [2, 1, 3])),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let pushed = next_frame(&mut viewer).await.unwrap();
        assert_eq!(pushed["cocktails"][0]["id"], json!(3));
        assert_eq!(pushed["cocktails"][0]["points"], json!(5));
        assert_eq!(pushed["dragons"][0]["id"], json!(2));

        // A rejected ballot pushes nothing.
        call(
            app,
            Method::POST,
            "/api/vote",
            Some(ballot("Ada", "Lovelace", [1, 2, 3], [1, 2, 3])),
        )
        .await;
        channel.close();
        assert_eq!(next_frame(&mut viewer).await, None);
    }

    #[test]
    fn error_statuses() {
        let storage = PartyError::Storage {
            source: sqlx::Error::PoolTimedOut,
        };
        let response = storage.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            PartyError::ChannelClosed {}.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn live_message_is_the_standings() {
        let state = AppState::new(seeded_store().await);
        let mut sub = state.channel.subscribe().await.unwrap();
        let snapshot = sub.next().await.unwrap();
        match snapshot_message(&snapshot) {
            Message::Text(text) => {
                let js: JSValue = serde_json::from_str(&text).unwrap();
                assert_eq!(js, snapshot_to_json(&snapshot));
                assert_eq!(js["dragons"].as_array().map(|a| a.len()), Some(3));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }
}
