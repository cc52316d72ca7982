//! Transfer status endpoint.

use crate::ledger::{Transfer, TransferLedger};
use crate::server::Relay;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use drop_types::TransferId;
use serde::Serialize;
use std::sync::Arc;

/// Server-observed view of one transfer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferView {
    transfer_id: TransferId,
    file_name: String,
    file_size: u64,
    total_chunks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_type: Option<String>,
    passcode: String,
    status: String,
}

impl From<Transfer> for TransferView {
    fn from(transfer: Transfer) -> Self {
        Self {
            transfer_id: transfer.id,
            file_name: transfer.file_name,
            file_size: transfer.file_size,
            total_chunks: transfer.total_chunks,
            file_type: transfer.file_type,
            passcode: transfer.passcode.to_string(),
            status: transfer.status.to_string(),
        }
    }
}

/// `GET /transfers/:transfer_id`
pub async fn transfer_handler(
    Path(transfer_id): Path<String>,
    Extension(relay): Extension<Arc<Relay>>,
) -> Response {
    let Some(transfer_id) = TransferId::parse(&transfer_id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "message": "Invalid transfer id" })),
        )
            .into_response();
    };

    match relay.ledger().read_transfer(&transfer_id).await {
        Ok(Some(transfer)) => Json(TransferView::from(transfer)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "message": "Transfer not found" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(%transfer_id, "transfer lookup failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "message": "failed to read transfer" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransferStatus;
    use drop_types::Passcode;

    #[test]
    fn transfer_view_uses_wire_field_names() {
        let view = TransferView::from(Transfer {
            id: TransferId::new(),
            file_name: "x.txt".to_owned(),
            file_size: 10,
            total_chunks: 3,
            file_type: None,
            passcode: Passcode::new("ABCD").unwrap(),
            status: TransferStatus::InProgress,
        });

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains(r#""transferId""#));
        assert!(json.contains(r#""fileName":"x.txt""#));
        assert!(json.contains(r#""totalChunks":3"#));
        assert!(json.contains(r#""status":"in_progress""#));
        assert!(!json.contains("fileType"));
    }
}
