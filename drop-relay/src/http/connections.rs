//! Passcode minting and validation endpoints.

use crate::ledger::TransferLedger;
use crate::server::Relay;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use drop_types::Passcode;
use rand::Rng;
use std::sync::Arc;

/// Characters used in minted passcodes. Uppercase alphanumerics, minus the
/// easily confused 0/O and 1/I.
const PASSCODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// How often minting retries after a passcode collision.
const MINT_ATTEMPTS: usize = 4;

/// Mint a random passcode of the given length.
fn mint_passcode(length: usize) -> Passcode {
    let mut rng = rand::thread_rng();
    let code: String = (0..length.max(1))
        .map(|_| PASSCODE_CHARSET[rng.gen_range(0..PASSCODE_CHARSET.len())] as char)
        .collect();
    Passcode::new(code).unwrap_or_else(|| unreachable!("minted passcodes are never empty"))
}

fn error_body(message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": message }))
}

/// `POST /connections/generate-passcode`
///
/// Mints a passcode, records it in the ledger, and returns it. Collisions
/// are retried with a fresh code.
pub async fn generate_passcode_handler(Extension(relay): Extension<Arc<Relay>>) -> Response {
    let length = relay.config().limits.passcode_length;

    for _ in 0..MINT_ATTEMPTS {
        let passcode = mint_passcode(length);
        match relay.ledger().create_passcode(&passcode).await {
            Ok(()) => {
                tracing::info!(%passcode, "minted passcode");
                return Json(serde_json::json!({ "passcode": passcode })).into_response();
            }
            Err(e) => {
                let collision = matches!(
                    &e,
                    crate::error::LedgerError::Database(sqlx::Error::Database(db))
                        if db.is_unique_violation()
                );
                if collision {
                    tracing::debug!(%passcode, "passcode collision, retrying");
                    continue;
                }
                tracing::error!("failed to record passcode: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("failed to generate passcode"),
                )
                    .into_response();
            }
        }
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_body("failed to generate passcode"),
    )
        .into_response()
}

/// `POST /connections/connect/:passcode`
///
/// Validates that the passcode exists and has at least one live WebSocket
/// connection; further communication happens over the socket.
pub async fn connect_handler(
    Path(passcode): Path<String>,
    Extension(relay): Extension<Arc<Relay>>,
) -> Response {
    let Some(passcode) = Passcode::new(passcode) else {
        return (StatusCode::BAD_REQUEST, error_body("Invalid passcode")).into_response();
    };

    match relay.ledger().passcode_exists(&passcode).await {
        Ok(true) => {}
        Ok(false) => {
            return (StatusCode::NOT_FOUND, error_body("Invalid passcode")).into_response();
        }
        Err(e) => {
            tracing::error!(%passcode, "passcode check failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("failed to validate passcode"),
            )
                .into_response();
        }
    }

    if !relay.registry().has_members(&passcode) {
        return (
            StatusCode::BAD_REQUEST,
            error_body("No active connections for this passcode"),
        )
            .into_response();
    }

    Json(serde_json::json!({ "message": "Connected", "passcode": passcode })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_passcodes_have_requested_length() {
        for length in [4, 6, 8] {
            assert_eq!(mint_passcode(length).as_str().len(), length);
        }
    }

    #[test]
    fn minted_passcodes_use_the_charset() {
        let passcode = mint_passcode(32);
        assert!(passcode
            .as_str()
            .bytes()
            .all(|b| PASSCODE_CHARSET.contains(&b)));
    }

    #[test]
    fn zero_length_request_still_mints_something() {
        assert_eq!(mint_passcode(0).as_str().len(), 1);
    }
}
