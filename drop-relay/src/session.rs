//! Per-connection session state machine.
//!
//! Each WebSocket connection gets a Session that interprets inbound messages
//! and drives the relay: registering the passcode binding, initiating
//! transfers against the ledger, and fanning chunks out to peers.

use crate::dispatch;
use crate::ledger::{NewTransfer, TransferLedger, TransferStatus};
use crate::registry::ConnectionHandle;
use crate::server::Relay;
use drop_types::{
    decode_chunk_data, decode_client_message, ClientMessage, ConnectionId, Inbound, Passcode,
    ServerMessage, TransferId,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Session state machine states.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Accepted, but the peer has not announced a passcode yet.
    Open,
    /// Passcode announced and registered.
    Bound {
        /// The passcode this connection is bound to.
        passcode: Passcode,
    },
    /// The connection has closed.
    Closed,
}

/// A per-connection session.
pub struct Session {
    relay: Arc<Relay>,
    handle: ConnectionHandle,
    state: SessionState,
}

impl Session {
    /// Create a new session for a freshly accepted connection.
    pub fn new(relay: Arc<Relay>, handle: ConnectionHandle) -> Self {
        Self {
            relay,
            handle,
            state: SessionState::Open,
        }
    }

    /// The connection's identifier.
    pub fn connection_id(&self) -> ConnectionId {
        self.handle.id()
    }

    /// The current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle one inbound text frame.
    ///
    /// Never fails the connection: malformed payloads get an ERROR reply and
    /// the session keeps receiving.
    pub async fn handle_text(&mut self, text: &str) {
        if matches!(self.state, SessionState::Closed) {
            return;
        }

        let message = match decode_client_message(text) {
            Ok(Inbound::Message(message)) => message,
            Ok(Inbound::Unrecognized(kind)) => {
                tracing::debug!(connection = %self.handle.id(), kind, "ignoring unrecognized message kind");
                return;
            }
            Err(e) => {
                tracing::debug!(connection = %self.handle.id(), "malformed message: {}", e);
                self.reply_error("invalid message");
                return;
            }
        };

        match message {
            ClientMessage::SetPasscode { passcode } => self.on_set_passcode(passcode),
            ClientMessage::TransferFile {
                target_passcode,
                file_name,
                file_size,
                total_chunks,
                file_type,
            } => {
                self.on_transfer_file(target_passcode, file_name, file_size, total_chunks, file_type)
                    .await
            }
            ClientMessage::FileChunk {
                target_passcode,
                transfer_id,
                chunk_number,
                chunk_data,
            } => {
                self.on_file_chunk(target_passcode, transfer_id, chunk_number, chunk_data)
                    .await
            }
        }
    }

    /// Close the session, releasing its registry binding.
    ///
    /// In-flight transfers are deliberately left `in_progress`; close has no
    /// effect on ledger state.
    pub fn close(&mut self) {
        if let SessionState::Bound { passcode } = &self.state {
            self.relay.registry().unregister(passcode, self.handle.id());
        }
        self.state = SessionState::Closed;
    }

    fn on_set_passcode(&mut self, passcode: Passcode) {
        // A connection belongs to at most one session: announcing a new
        // passcode releases the previous binding first.
        if let SessionState::Bound { passcode: bound } = &self.state {
            if *bound != passcode {
                self.relay.registry().unregister(bound, self.handle.id());
            }
        }

        self.relay.registry().register(&passcode, self.handle.clone());
        tracing::info!(connection = %self.handle.id(), %passcode, "peer bound to passcode");

        let session = self.relay.registry().lookup(&passcode);
        dispatch::deliver(dispatch::route_to_others(
            &session,
            self.handle.id(),
            ServerMessage::NewUserConnected {
                passcode: passcode.clone(),
            },
        ));

        self.state = SessionState::Bound { passcode };
    }

    async fn on_transfer_file(
        &mut self,
        target_passcode: Passcode,
        file_name: String,
        file_size: u64,
        total_chunks: u32,
        file_type: Option<String>,
    ) {
        let known = match self.relay.ledger().passcode_exists(&target_passcode).await {
            Ok(known) => known,
            Err(e) => {
                tracing::error!(%target_passcode, "passcode check failed: {}", e);
                self.reply_error("internal error");
                return;
            }
        };
        if !known {
            self.reply_error("unknown passcode");
            return;
        }

        let transfer_id = TransferId::new();
        let transfer = NewTransfer {
            id: transfer_id,
            file_name: file_name.clone(),
            file_size,
            total_chunks,
            file_type: file_type.clone(),
            passcode: target_passcode.clone(),
        };
        if let Err(e) = self.relay.ledger().create_transfer(transfer).await {
            tracing::error!(%transfer_id, "failed to record transfer: {}", e);
            self.reply_error("internal error");
            return;
        }
        self.relay
            .metrics()
            .transfers_started
            .fetch_add(1, Ordering::Relaxed);

        let session = self.relay.registry().lookup(&target_passcode);
        if session.is_empty() {
            self.reply_error("target not connected");
            if let Err(e) = self
                .relay
                .ledger()
                .update_status(&transfer_id, TransferStatus::Failed)
                .await
            {
                tracing::error!(%transfer_id, "failed to mark transfer failed: {}", e);
            }
            self.relay
                .metrics()
                .transfers_failed
                .fetch_add(1, Ordering::Relaxed);
            return;
        }

        tracing::info!(
            %transfer_id,
            %target_passcode,
            file_name,
            file_size,
            total_chunks,
            "transfer initiated"
        );

        let init = ServerMessage::FileTransferInit {
            transfer_id,
            file_name: file_name.clone(),
            file_size,
            file_type,
            total_chunks,
        };
        let receipt = ServerMessage::FileTransferInitReceived {
            transfer_id,
            file_name,
            file_size,
            total_chunks,
        };
        dispatch::deliver(dispatch::route_init(
            &session,
            self.handle.id(),
            init,
            receipt,
        ));
    }

    async fn on_file_chunk(
        &mut self,
        target_passcode: Passcode,
        transfer_id: TransferId,
        chunk_number: u32,
        chunk_data: String,
    ) {
        let payload_len = match decode_chunk_data(&chunk_data) {
            Ok(payload) => payload.len() as u64,
            Err(e) => {
                tracing::debug!(%transfer_id, chunk_number, "undecodable chunk: {}", e);
                self.reply_error("invalid chunk data");
                return;
            }
        };

        let session = self.relay.registry().lookup(&target_passcode);
        if session.is_empty() {
            self.reply_error("target not connected");
            return;
        }

        dispatch::deliver(dispatch::route_to_others(
            &session,
            self.handle.id(),
            ServerMessage::FileChunkReceived {
                transfer_id,
                chunk_number,
                chunk_data,
            },
        ));

        let metrics = self.relay.metrics();
        metrics.chunks_relayed.fetch_add(1, Ordering::Relaxed);
        metrics.bytes_relayed.fetch_add(payload_len, Ordering::Relaxed);

        // The chunk carries no total count; completion is decided against the
        // ledger record.
        match self.relay.ledger().read_transfer(&transfer_id).await {
            Ok(Some(transfer)) => {
                if transfer.status == TransferStatus::InProgress
                    && chunk_number.checked_add(1) == Some(transfer.total_chunks)
                {
                    if let Err(e) = self
                        .relay
                        .ledger()
                        .update_status(&transfer_id, TransferStatus::Completed)
                        .await
                    {
                        tracing::error!(%transfer_id, "failed to mark transfer completed: {}", e);
                        self.reply_error("internal error");
                        return;
                    }
                    metrics.transfers_completed.fetch_add(1, Ordering::Relaxed);
                    tracing::info!(%transfer_id, "transfer completed");
                }
            }
            Ok(None) => {
                tracing::debug!(%transfer_id, "chunk for unknown transfer forwarded as-is");
            }
            Err(e) => {
                tracing::error!(%transfer_id, "transfer lookup failed: {}", e);
                self.reply_error("internal error");
            }
        }
    }

    fn reply_error(&self, message: &str) {
        self.relay
            .metrics()
            .errors_total
            .fetch_add(1, Ordering::Relaxed);
        self.handle.send(ServerMessage::Error {
            message: message.to_owned(),
        });
    }
}
