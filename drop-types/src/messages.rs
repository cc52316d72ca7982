//! Protocol messages for the PassDrop relay.
//!
//! Both directions use JSON objects with a string `type` discriminator in
//! SCREAMING_SNAKE_CASE and camelCase fields.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::{Passcode, TransferId, WireError};

/// Messages a peer sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Announce the passcode this connection belongs to.
    #[serde(rename = "SET_PASSCODE", rename_all = "camelCase")]
    SetPasscode {
        /// The rendezvous passcode.
        passcode: Passcode,
    },
    /// Initiate a file transfer toward the peers on a passcode.
    #[serde(rename = "TRANSFER_FILE", rename_all = "camelCase")]
    TransferFile {
        /// Passcode whose session receives the transfer.
        target_passcode: Passcode,
        /// Name of the file being sent.
        file_name: String,
        /// Total file size in bytes.
        file_size: u64,
        /// Number of chunks the sender will transmit.
        total_chunks: u32,
        /// MIME type, if the sender knows it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_type: Option<String>,
    },
    /// One base64-encoded fragment of an in-progress transfer.
    #[serde(rename = "FILE_CHUNK", rename_all = "camelCase")]
    FileChunk {
        /// Passcode whose session receives the chunk.
        target_passcode: Passcode,
        /// Transfer this chunk belongs to.
        transfer_id: TransferId,
        /// Zero-based chunk index.
        chunk_number: u32,
        /// Base64-encoded chunk payload.
        chunk_data: String,
    },
}

impl ClientMessage {
    /// The `type` discriminators this relay understands.
    pub const KNOWN_KINDS: [&'static str; 3] = ["SET_PASSCODE", "TRANSFER_FILE", "FILE_CHUNK"];
}

/// Messages the relay sends to a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// A new peer joined the session this connection is bound to.
    #[serde(rename = "NEW_USER_CONNECTED", rename_all = "camelCase")]
    NewUserConnected {
        /// The shared passcode.
        passcode: Passcode,
    },
    /// A peer wants to send a file to this connection.
    #[serde(rename = "FILE_TRANSFER_INIT", rename_all = "camelCase")]
    FileTransferInit {
        /// Identifier assigned to this transfer.
        transfer_id: TransferId,
        /// Name of the incoming file.
        file_name: String,
        /// Total file size in bytes.
        file_size: u64,
        /// MIME type, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_type: Option<String>,
        /// Number of chunks to expect.
        total_chunks: u32,
    },
    /// Receipt sent back to the initiator of a transfer.
    #[serde(rename = "FILE_TRANSFER_INIT_RECEIVED", rename_all = "camelCase")]
    FileTransferInitReceived {
        /// Identifier assigned to this transfer.
        transfer_id: TransferId,
        /// Name of the file being sent.
        file_name: String,
        /// Total file size in bytes.
        file_size: u64,
        /// Number of chunks the sender declared.
        total_chunks: u32,
    },
    /// A forwarded chunk of an in-progress transfer.
    #[serde(rename = "FILE_CHUNK_RECEIVED", rename_all = "camelCase")]
    FileChunkReceived {
        /// Transfer this chunk belongs to.
        transfer_id: TransferId,
        /// Zero-based chunk index.
        chunk_number: u32,
        /// Base64-encoded chunk payload.
        chunk_data: String,
    },
    /// Something went wrong handling the sender's last message.
    #[serde(rename = "ERROR", rename_all = "camelCase")]
    Error {
        /// Human-readable description.
        message: String,
    },
}

impl ServerMessage {
    /// Serialize to a JSON wire string.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Json)
    }
}

/// Result of decoding one inbound wire payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A recognized, well-formed protocol message.
    Message(ClientMessage),
    /// Valid JSON carrying an unrecognized `type` discriminator.
    ///
    /// Unrecognized kinds are ignored rather than rejected so that older
    /// relays tolerate newer clients.
    Unrecognized(String),
}

/// Decode one inbound wire payload.
///
/// Decoding is two-stage so that an unknown `type` can be told apart from a
/// malformed payload: the former is [`Inbound::Unrecognized`], the latter an
/// error the caller answers with an `ERROR` reply.
pub fn decode_client_message(text: &str) -> Result<Inbound, WireError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(WireError::MissingType)?;

    if !ClientMessage::KNOWN_KINDS.contains(&kind) {
        return Ok(Inbound::Unrecognized(kind.to_owned()));
    }

    let message: ClientMessage = serde_json::from_value(value)?;
    Ok(Inbound::Message(message))
}

/// Decode a chunk payload from its base64 wire form.
///
/// Used both to validate decodability before forwarding and to size the
/// relayed payload.
pub fn decode_chunk_data(chunk_data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(chunk_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_passcode_decodes() {
        let decoded =
            decode_client_message(r#"{"type":"SET_PASSCODE","passcode":"ABCD"}"#).unwrap();
        match decoded {
            Inbound::Message(ClientMessage::SetPasscode { passcode }) => {
                assert_eq!(passcode.as_str(), "ABCD");
            }
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn transfer_file_decodes_camel_case_fields() {
        let text = r#"{
            "type": "TRANSFER_FILE",
            "targetPasscode": "ABCD",
            "fileName": "x.txt",
            "fileSize": 10,
            "totalChunks": 1
        }"#;
        let decoded = decode_client_message(text).unwrap();
        match decoded {
            Inbound::Message(ClientMessage::TransferFile {
                target_passcode,
                file_name,
                file_size,
                total_chunks,
                file_type,
            }) => {
                assert_eq!(target_passcode.as_str(), "ABCD");
                assert_eq!(file_name, "x.txt");
                assert_eq!(file_size, 10);
                assert_eq!(total_chunks, 1);
                assert!(file_type.is_none());
            }
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn file_chunk_decodes() {
        let id = TransferId::new();
        let text = format!(
            r#"{{"type":"FILE_CHUNK","targetPasscode":"ABCD","transferId":"{id}","chunkNumber":0,"chunkData":"QUJD"}}"#
        );
        let decoded = decode_client_message(&text).unwrap();
        match decoded {
            Inbound::Message(ClientMessage::FileChunk {
                transfer_id,
                chunk_number,
                chunk_data,
                ..
            }) => {
                assert_eq!(transfer_id, id);
                assert_eq!(chunk_number, 0);
                assert_eq!(chunk_data, "QUJD");
            }
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_kind_is_not_an_error() {
        let decoded = decode_client_message(r#"{"type":"PING"}"#).unwrap();
        assert_eq!(decoded, Inbound::Unrecognized("PING".to_owned()));
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            decode_client_message("not json"),
            Err(WireError::Json(_))
        ));
    }

    #[test]
    fn missing_type_is_malformed() {
        assert!(matches!(
            decode_client_message(r#"{"passcode":"ABCD"}"#),
            Err(WireError::MissingType)
        ));
    }

    #[test]
    fn known_kind_with_missing_fields_is_malformed() {
        assert!(matches!(
            decode_client_message(r#"{"type":"SET_PASSCODE"}"#),
            Err(WireError::Json(_))
        ));
    }

    #[test]
    fn empty_passcode_is_malformed() {
        assert!(matches!(
            decode_client_message(r#"{"type":"SET_PASSCODE","passcode":""}"#),
            Err(WireError::Json(_))
        ));
    }

    #[test]
    fn server_messages_use_wire_discriminators() {
        let json = ServerMessage::NewUserConnected {
            passcode: Passcode::new("ABCD").unwrap(),
        }
        .to_json()
        .unwrap();
        assert!(json.contains(r#""type":"NEW_USER_CONNECTED""#));
        assert!(json.contains(r#""passcode":"ABCD""#));

        let json = ServerMessage::FileChunkReceived {
            transfer_id: TransferId::new(),
            chunk_number: 3,
            chunk_data: "QUJD".to_owned(),
        }
        .to_json()
        .unwrap();
        assert!(json.contains(r#""type":"FILE_CHUNK_RECEIVED""#));
        assert!(json.contains(r#""chunkNumber":3"#));
        assert!(json.contains(r#""chunkData":"QUJD""#));
    }

    #[test]
    fn init_omits_absent_file_type() {
        let json = ServerMessage::FileTransferInit {
            transfer_id: TransferId::new(),
            file_name: "x.txt".to_owned(),
            file_size: 10,
            file_type: None,
            total_chunks: 1,
        }
        .to_json()
        .unwrap();
        assert!(!json.contains("fileType"));

        let json = ServerMessage::FileTransferInit {
            transfer_id: TransferId::new(),
            file_name: "x.png".to_owned(),
            file_size: 10,
            file_type: Some("image/png".to_owned()),
            total_chunks: 1,
        }
        .to_json()
        .unwrap();
        assert!(json.contains(r#""fileType":"image/png""#));
    }

    #[test]
    fn chunk_data_base64_validation() {
        assert_eq!(decode_chunk_data("QUJD").unwrap(), b"ABC");
        assert!(decode_chunk_data("!!!not-base64!!!").is_err());
    }
}
