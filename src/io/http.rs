//! JSON HTTP API
//!
//! hyper 1 server with one task per connection. Routing is a plain match on
//! `(method, path)`; bodies are collected fully (up to
//! [`MAX_REQUEST_BODY_BYTES`]) before dispatch, so handlers are synchronous and
//! testable without a socket via [`route`].

use crate::domain::{Shipment, TrackingError};
use crate::infra::metrics::Metrics;
use crate::io::prometheus;
use crate::io::requests::{
    ContactRequest, CreateShipmentRequest, GenerateTrackingRequest, ProfileRequest, TrackRequest,
    TrackingRequest,
};
use crate::services::ShipmentService;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub type HttpResponse = Response<Full<Bytes>>;

/// Largest request body read before answering 400
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Everything a request handler can reach
pub struct AppState {
    pub service: ShipmentService,
    pub metrics: Arc<Metrics>,
    pub metrics_enabled: bool,
}

/// How a route reports failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorStyle {
    /// `{ "error": msg }`
    Bare,
    /// `{ "success": false, "message": msg }`
    Envelope,
}

fn status_for(err: &TrackingError) -> StatusCode {
    match err {
        TrackingError::Validation(_) => StatusCode::BAD_REQUEST,
        TrackingError::NotFound(_) => StatusCode::NOT_FOUND,
        TrackingError::Conflict(_) => StatusCode::CONFLICT,
        TrackingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn with_cors(mut response: HttpResponse) -> HttpResponse {
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn text_response(status: StatusCode, content_type: &'static str, body: String) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn json_response(status: StatusCode, body: &Value) -> HttpResponse {
    with_cors(text_response(status, "application/json", body.to_string()))
}

fn error_response(state: &AppState, err: &TrackingError, style: ErrorStyle) -> HttpResponse {
    state.metrics.record_error(err);
    if let TrackingError::Internal(detail) = err {
        error!(error = %detail, "request_failed");
    }

    let message = err.public_message();
    let body = match style {
        ErrorStyle::Bare => json!({ "error": message }),
        ErrorStyle::Envelope => json!({ "success": false, "message": message }),
    };
    json_response(status_for(err), &body)
}

/// Parse a JSON body. Anything that is not a JSON object of the right shape
/// is a validation failure.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, TrackingError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "invalid_json_body");
        TrackingError::Validation("Invalid JSON body".to_string())
    })
}

fn shipment_body(shipment: &Shipment) -> Value {
    json!({ "success": true, "shipment": shipment })
}

/// Dispatch a fully-read request
pub fn route(method: &Method, path: &str, body: &[u8], state: &AppState) -> HttpResponse {
    match (method, path) {
        (&Method::POST, "/track") => handle_track(body, state),
        (&Method::POST, "/tracking") => handle_tracking(body, state),
        (&Method::POST, "/generate-tracking") => handle_generate_tracking(body, state),
        (&Method::POST, "/shipments") => handle_create_shipment(body, state),
        (&Method::GET, "/shipments") => handle_list_shipments(state),
        (&Method::POST, "/contact") => handle_contact(body, state),
        (&Method::POST, "/profile") => handle_profile(body, state),
        (&Method::GET, "/health") => text_response(StatusCode::OK, "text/plain", "ok".to_string()),
        (&Method::GET, "/metrics") if state.metrics_enabled => {
            let body = prometheus::format_prometheus_metrics(
                &state.metrics.snapshot(),
                state.service.stored_count(),
            );
            text_response(StatusCode::OK, prometheus::CONTENT_TYPE, body)
        }
        // CORS preflight
        (&Method::OPTIONS, _) => {
            let mut response = with_cors(Response::new(Full::new(Bytes::new())));
            let headers = response.headers_mut();
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, OPTIONS"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Content-Type"),
            );
            response
        }
        _ => json_response(StatusCode::NOT_FOUND, &json!({ "error": "Not Found" })),
    }
}

fn handle_track(body: &[u8], state: &AppState) -> HttpResponse {
    let result = parse_body::<TrackRequest>(body)
        .map_err(|e| (e, ErrorStyle::Envelope))
        .and_then(|req| req.validate().map_err(|e| (e, ErrorStyle::Bare)))
        .and_then(|number| state.service.track(&number).map_err(|e| (e, ErrorStyle::Bare)));

    match result {
        Ok(shipment) => json_response(StatusCode::OK, &shipment_body(&shipment)),
        Err((e, style)) => error_response(state, &e, style),
    }
}

fn handle_tracking(body: &[u8], state: &AppState) -> HttpResponse {
    let result = parse_body::<TrackingRequest>(body)
        .and_then(TrackingRequest::validate)
        .and_then(|number| state.service.track_opaque(&number));

    match result {
        Ok(shipment) => json_response(StatusCode::OK, &shipment_body(&shipment)),
        Err(e) => error_response(state, &e, ErrorStyle::Envelope),
    }
}

fn handle_generate_tracking(body: &[u8], state: &AppState) -> HttpResponse {
    let result = parse_body::<GenerateTrackingRequest>(body)
        .map_err(|e| (e, ErrorStyle::Envelope))
        .and_then(|req| req.validate().map_err(|e| (e, ErrorStyle::Bare)))
        .and_then(|req| {
            state
                .service
                .generate_tracking(&req.origin, &req.destination, &req.user_id)
                .map_err(|e| (e, ErrorStyle::Bare))
        });

    match result {
        Ok(shipment) => json_response(StatusCode::OK, &shipment_body(&shipment)),
        Err((e, style)) => error_response(state, &e, style),
    }
}

fn handle_create_shipment(body: &[u8], state: &AppState) -> HttpResponse {
    let result = parse_body::<CreateShipmentRequest>(body)
        .and_then(CreateShipmentRequest::validate)
        .and_then(|new| state.service.create_shipment(new));

    match result {
        Ok(shipment) => json_response(
            StatusCode::OK,
            &json!({
                "success": true,
                "message": "Shipment created successfully",
                "shipment": shipment,
            }),
        ),
        Err(e) => error_response(state, &e, ErrorStyle::Envelope),
    }
}

fn handle_list_shipments(state: &AppState) -> HttpResponse {
    let shipments = state.service.list_shipments();
    json_response(StatusCode::OK, &json!({ "success": true, "shipments": shipments }))
}

fn handle_contact(body: &[u8], state: &AppState) -> HttpResponse {
    match parse_body::<ContactRequest>(body).and_then(ContactRequest::validate) {
        Ok(contact) => {
            info!(
                name = %contact.name,
                email = %contact.email,
                subject = %contact.subject,
                message_len = %contact.message.len(),
                "contact_message_received"
            );
            json_response(
                StatusCode::OK,
                &json!({
                    "success": true,
                    "message": "Your message has been sent successfully. We'll get back to you soon.",
                }),
            )
        }
        Err(e) => error_response(state, &e, ErrorStyle::Envelope),
    }
}

fn handle_profile(body: &[u8], state: &AppState) -> HttpResponse {
    match parse_body::<ProfileRequest>(body).and_then(ProfileRequest::validate) {
        Ok(user) => {
            info!(name = %user.name, "profile_updated");
            json_response(
                StatusCode::OK,
                &json!({
                    "success": true,
                    "message": "Profile updated successfully",
                    "user": user,
                }),
            )
        }
        Err(e) => error_response(state, &e, ErrorStyle::Envelope),
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<HttpResponse, Infallible> {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let body = Limited::new(req.into_body(), MAX_REQUEST_BODY_BYTES);
    let response = match body.collect().await {
        Ok(collected) => route(&method, &path, &collected.to_bytes(), &state),
        Err(e) => {
            let too_large = e.is::<LengthLimitError>();
            warn!(error = %e, path = %path, too_large = %too_large, "request_body_read_failed");
            error_response(
                &state,
                &TrackingError::Validation("Invalid request body".to_string()),
                ErrorStyle::Envelope,
            )
        }
    };

    let latency_us = start.elapsed().as_micros() as u64;
    state.metrics.record_request(latency_us);
    debug!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        latency_us = %latency_us,
        "http_request"
    );

    Ok(response)
}

/// Accept connections until the shutdown flag flips to `true`
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "http_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "http_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("http_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind `addr` and serve the API
pub async fn start_server(
    addr: &str,
    state: Arc<AppState>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "http_server_started");
    serve(listener, state, shutdown).await
}
