//! Warp wiring for the combined HTTP/WebSocket listener.
//!
//! One socket serves both surfaces: the upgrade filter claims WebSocket
//! handshakes on any path, everything else falls through to the HTTP
//! pipeline's catch-all capture route.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use warp::http::HeaderMap;
use warp::{Filter, Rejection, Reply};

use super::router::{self, client_ip, user_agent_of};
use crate::controller::AppContext;
use crate::gateway::connection;

/// Bodies beyond this are refused before buffering.
const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug)]
struct BodyTooLarge;
impl warp::reject::Reject for BodyTooLarge {}

/// The complete route tree.
pub fn routes(
    app: Arc<AppContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    gateway_route(app.clone())
        .or(http_route(app))
        .recover(recover_to_ack)
}

/// WebSocket upgrade on any path.
pub fn gateway_route(
    app: Arc<AppContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let with_app = warp::any().map(move || app.clone());
    warp::ws()
        .and(warp::header::headers_cloned())
        .and(warp::addr::remote())
        .and(with_app)
        .map(
            |ws: warp::ws::Ws, headers: HeaderMap, remote: Option<SocketAddr>, app: Arc<AppContext>| {
                let source_ip = client_ip(&headers, remote);
                let user_agent = user_agent_of(&headers);
                ws.on_upgrade(move |socket| {
                    connection::handle_socket(socket, source_ip, user_agent, app)
                })
            },
        )
}

/// Catch-all HTTP capture: method, path, query, headers, peer and body all
/// land in the router pipeline regardless of endpoint.
fn http_route(
    app: Arc<AppContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let with_app = warp::any().map(move || app.clone());
    warp::method()
        .and(warp::path::full())
        .and(raw_query())
        .and(warp::header::headers_cloned())
        .and(warp::addr::remote())
        .and(bounded_body())
        .and(with_app)
        .and_then(router::handle_request)
}

fn raw_query() -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
}

fn bounded_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and_then(|length: Option<u64>| async move {
            match length {
                Some(len) if len > MAX_BODY_BYTES => Err(warp::reject::custom(BodyTooLarge)),
                _ => Ok(()),
            }
        })
        .untuple_one()
        .and(warp::body::bytes())
}

/// A honeypot never refuses: whatever warp rejected still gets a friendly
/// acknowledgement.
async fn recover_to_ack(_rejection: Rejection) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "ok": true })),
        warp::http::StatusCode::OK,
    ))
}
