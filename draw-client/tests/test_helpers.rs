#![allow(dead_code)]

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use draw_client::config::Config;
use futures_util::stream::{self, StreamExt};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use warp::Filter;
use warp::http::StatusCode;
use warp::sse::Event;

pub const HOST_PASSWORD: &str = "secreto";
pub const HOST_TOKEN: &str = "host-token";

/// Default backend state: Ana is waiting and two prizes are left.
pub fn raffle_state() -> Value {
    json!({
        "waitingPeople": [
            { "id": 2, "name": "Ana", "email": "ana@example.com" },
            { "id": 5, "name": "Luis" }
        ],
        "upcomingPrizes": [
            { "id": 1, "name": "Taza", "description": "Taza de cerámica" },
            { "id": 3, "name": "Gorra" }
        ],
        "recentWinners": []
    })
}

pub fn taza() -> Value {
    json!({ "id": 1, "name": "Taza" })
}

pub fn gorra() -> Value {
    json!({ "id": 3, "name": "Gorra" })
}

pub fn ana() -> Value {
    json!({ "id": 2, "name": "Ana" })
}

pub fn draw_start(session_id: &str) -> Value {
    json!({
        "sessionId": session_id,
        "segments": [taza(), gorra()],
        "targetPrize": taza(),
        "targetPerson": ana()
    })
}

pub fn draw_complete(session_id: &str) -> Value {
    json!({
        "sessionId": session_id,
        "person": ana(),
        "prize": taza()
    })
}

/// `spin-start` as the existing raffle backend sends it: the start time is the
/// only identity and no person is named.
pub fn spin_envelope(started_at: &str) -> Value {
    json!({
        "startedAt": started_at,
        "targetPrize": taza(),
        "segments": [taza(), gorra()],
        "remainingPeople": 2,
        "remainingPrizes": 2
    })
}

/// `spin-complete` as the existing raffle backend sends it: the stored winner
/// record, with no reference to the spin it ends.
pub fn winner_record() -> Value {
    json!({
        "id": 7,
        "person": ana(),
        "prize": taza(),
        "awardedAt": "2024-12-20T18:30:06Z"
    })
}

/// Engine config with short timings, pointed at `base_url`.
pub fn test_config(base_url: &str) -> Config {
    Config {
        api_base: base_url.to_string(),
        host_password: None,
        reconnect_delay_ms: 50,
        request_timeout_seconds: 5,
        draw_deadline_seconds: 1,
        armed_deadline_seconds: 1,
        display_window_seconds: 1,
        whole_turns: 6,
    }
}

/// Wait at most five seconds for `future`.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

#[derive(Debug, Clone)]
pub struct RecordedDraw {
    pub authorization: Option<String>,
    pub body: Value,
}

/// In-process stand-in for the raffle backend: plain JSON endpoints plus an
/// SSE stream at `/events` that tests can push to or cut.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<Mutex<String>>,
    events: broadcast::Sender<Option<(String, String)>>,
    connections: Arc<AtomicUsize>,
    draw_requests: Arc<Mutex<Vec<RecordedDraw>>>,
    draw_status: Arc<AtomicU16>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        Self::start_on(([127, 0, 0, 1], 0).into()).await
    }

    /// Serve on `addr`; port 0 picks a free one.
    pub async fn start_on(addr: SocketAddr) -> Self {
        let state = Arc::new(Mutex::new(raffle_state().to_string()));
        let (events, _) = broadcast::channel(64);
        let connections = Arc::new(AtomicUsize::new(0));
        let draw_requests = Arc::new(Mutex::new(Vec::new()));
        let draw_status = Arc::new(AtomicU16::new(200));

        let state_route = {
            let state = state.clone();
            warp::path!("api" / "state").and(warp::get()).map(move || {
                let body = state.lock().unwrap().clone();
                warp::reply::with_header(body, "content-type", "application/json")
            })
        };

        let login_route = warp::path!("api" / "auth" / "login")
            .and(warp::post())
            .and(warp::body::json())
            .map(|body: Value| {
                if body["password"] == HOST_PASSWORD {
                    warp::reply::with_status(
                        warp::reply::json(&json!({ "token": HOST_TOKEN })),
                        StatusCode::OK,
                    )
                } else {
                    warp::reply::with_status(
                        warp::reply::json(&json!({ "error": "Contraseña incorrecta" })),
                        StatusCode::UNAUTHORIZED,
                    )
                }
            });

        let draw_route = {
            let draw_requests = draw_requests.clone();
            let draw_status = draw_status.clone();
            warp::path!("api" / "draw")
                .and(warp::post())
                .and(warp::header::optional::<String>("authorization"))
                .and(warp::body::json())
                .map(move |authorization: Option<String>, body: Value| {
                    draw_requests.lock().unwrap().push(RecordedDraw {
                        authorization,
                        body,
                    });
                    let status = StatusCode::from_u16(draw_status.load(Ordering::SeqCst))
                        .unwrap_or(StatusCode::OK);
                    let reply = if status.is_success() {
                        json!({ "ok": true })
                    } else {
                        json!({ "error": "No hay premios disponibles" })
                    };
                    warp::reply::with_status(warp::reply::json(&reply), status)
                })
        };

        let events_route = {
            let state = state.clone();
            let events = events.clone();
            let connections = connections.clone();
            warp::path("events").and(warp::get()).map(move || {
                connections.fetch_add(1, Ordering::SeqCst);
                let receiver = events.subscribe();
                let initial = Event::default()
                    .event("state")
                    .data(state.lock().unwrap().clone());

                let live = stream::unfold(receiver, |mut receiver| async move {
                    loop {
                        match receiver.recv().await {
                            Ok(Some((name, data))) => {
                                let event = Event::default().event(name).data(data);
                                return Some((Ok::<_, Infallible>(event), receiver));
                            }
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                            Ok(None) | Err(broadcast::error::RecvError::Closed) => return None,
                        }
                    }
                });
                let stream = stream::once(async move { Ok::<_, Infallible>(initial) }).chain(live);

                warp::sse::reply(warp::sse::keep_alive().stream(stream))
            })
        };

        let routes = state_route.or(login_route).or(draw_route).or(events_route);
        let (addr, server) = warp::serve(routes).bind_ephemeral(addr);
        tokio::spawn(server);

        Self {
            addr,
            state,
            events,
            connections,
            draw_requests,
            draw_status,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Send a named event to every open `/events` stream.
    pub fn push(&self, event: &str, data: Value) {
        let _ = self.events.send(Some((event.to_string(), data.to_string())));
    }

    /// End every open `/events` stream, as a backend restart would.
    pub fn disconnect_all(&self) {
        let _ = self.events.send(None);
    }

    pub fn set_state(&self, state: Value) {
        *self.state.lock().unwrap() = state.to_string();
    }

    pub fn set_state_raw(&self, body: &str) {
        *self.state.lock().unwrap() = body.to_string();
    }

    pub fn set_draw_status(&self, status: u16) {
        self.draw_status.store(status, Ordering::SeqCst);
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn draw_requests(&self) -> Vec<RecordedDraw> {
        self.draw_requests.lock().unwrap().clone()
    }

    pub async fn wait_for_connections(&self, count: usize) {
        within(async {
            while self.connections() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
    }

    pub async fn wait_for_draw_requests(&self, count: usize) -> Vec<RecordedDraw> {
        within(async {
            loop {
                let requests = self.draw_requests();
                if requests.len() >= count {
                    return requests;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
    }
}
