//! # passdrop-types
//!
//! Wire format types for the PassDrop passcode file relay protocol.
//!
//! This crate provides the foundational types used by the relay server and
//! any client implementation:
//! - [`Passcode`], [`ConnectionId`], [`TransferId`] - Identity types
//! - [`ClientMessage`] - Inbound protocol messages (SET_PASSCODE, TRANSFER_FILE, FILE_CHUNK)
//! - [`ServerMessage`] - Outbound protocol messages (FILE_TRANSFER_INIT, FILE_CHUNK_RECEIVED, ...)
//! - [`WireError`] - Wire-level error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;

pub use error::WireError;
pub use ids::{ConnectionId, Passcode, TransferId};
pub use messages::{decode_chunk_data, decode_client_message, ClientMessage, Inbound, ServerMessage};
