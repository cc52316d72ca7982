//! # passdrop-relay
//!
//! Passcode rendezvous and file chunk relay server for PassDrop.
//!
//! This crate implements a relay server that:
//! - Accepts WebSocket connections from peers holding a shared passcode
//! - Groups live connections by passcode and fans messages out between them
//! - Relays file transfers chunk by chunk without touching payload content
//! - Tracks each transfer's lifecycle (in_progress/completed/failed) in SQLite
//!
//! ## Architecture
//!
//! ```text
//! Peer A ──┐                      ┌── Peer B
//!          │   WebSocket (JSON)   │
//!          ├─────────────────────►│
//!          │                      │
//!      ┌───┴──────────────────────┴───┐
//!      │        passdrop-relay        │
//!      │  ┌────────────────────────┐  │
//!      │  │  SQLite (transfers,    │  │
//!      │  │  passcode records)     │  │
//!      │  └────────────────────────┘  │
//!      └──────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! Peers exchange JSON messages with a `type` discriminator:
//! - SET_PASSCODE → NEW_USER_CONNECTED broadcast to existing peers
//! - TRANSFER_FILE → FILE_TRANSFER_INIT to peers, FILE_TRANSFER_INIT_RECEIVED to sender
//! - FILE_CHUNK → FILE_CHUNK_RECEIVED to peers (completion tracked server-side)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod ledger;
pub mod registry;
pub mod server;
pub mod session;
pub mod ws;
