//! HTTP/JSON API (default port 8080): aircraft snapshots, receiver info,
//! and a static file fallback.
//!
//! Grounded on `jet1090/web.rs`'s warp filter/CORS/rejection-handler
//! pattern (`icao24`, `all`, `handle_rejection`), adapted to the exact
//! routes and `receiver.json` shape `spec.md` ss4.8/ss6 specify.

use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::reply::Reply;
use warp::Filter;

use crate::AppState;

#[derive(Serialize)]
struct ReceiverInfo {
    version: &'static str,
    refresh: u64,
    history: u64,
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

async fn aircraft_json(state: Arc<AppState>) -> Result<warp::reply::Json, Infallible> {
    let tracker = state.router.tracker.lock().await;
    let aircraft: Vec<_> = tracker.all().collect();
    Ok(warp::reply::json(&aircraft))
}

/// Pulled out of the warp handler so the `lat:0,lon:0` unset-home default
/// (spec ss4.8/ss6) is testable without spinning up a server.
fn receiver_info(home: Option<modes_core::prelude::Position>) -> ReceiverInfo {
    let (lat, lon) = home.map(|p| (p.latitude, p.longitude)).unwrap_or((0.0, 0.0));
    ReceiverInfo {
        version: env!("CARGO_PKG_VERSION"),
        refresh: 1000,
        history: 0,
        lat,
        lon,
    }
}

async fn receiver_json(state: Arc<AppState>) -> Result<warp::reply::Json, Infallible> {
    Ok(warp::reply::json(&receiver_info(state.home)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiver_info_defaults_to_zero_when_home_unset() {
        let info = receiver_info(None);
        assert_eq!(info.lat, 0.0);
        assert_eq!(info.lon, 0.0);
    }

    #[test]
    fn receiver_info_reports_configured_home() {
        let home = modes_core::prelude::Position {
            latitude: 43.3,
            longitude: 1.35,
        };
        let info = receiver_info(Some(home));
        assert_eq!(info.lat, 43.3);
        assert_eq!(info.lon, 1.35);
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "route not found".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "only GET is supported".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "unknown error".to_string())
    };
    let json = warp::reply::json(&ErrorMessage {
        code: code.as_u16(),
        message,
    });
    Ok(warp::reply::with_status(json, code))
}

/// Serve the HTTP API until the process exits. Binds independently of the
/// other services (spec ss4.8: one service failing doesn't bring down
/// the others) — a bind failure here is logged and this future returns.
pub async fn serve(state: Arc<AppState>, port: u16) {
    let with_state = warp::any().map(move || state.clone());

    let home = warp::path::end().map(|| warp::redirect::found(warp::http::Uri::from_static("/index.html")));

    let data_json = warp::path("data.json")
        .and(with_state.clone())
        .and_then(aircraft_json);
    let aircraft_json_route = warp::path!("data" / "aircraft.json")
        .and(with_state.clone())
        .and_then(aircraft_json);
    let chunks_json = warp::path!("chunks" / "chunks.json")
        .and(with_state.clone())
        .and_then(aircraft_json);
    let receiver_json_route = warp::path!("data" / "receiver.json")
        .and(with_state.clone())
        .and_then(receiver_json);

    let web_root = state.web_root.clone();
    let static_files = warp::fs::dir(web_root);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["*"])
        .allow_methods(vec!["GET"]);

    let json_routes = data_json
        .or(aircraft_json_route)
        .unify()
        .or(chunks_json)
        .unify()
        .or(receiver_json_route)
        .unify();

    let routes = warp::get()
        .and(home.or(json_routes).or(static_files))
        .recover(handle_rejection)
        .with(cors);

    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}
