use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use serde::Serialize;

use super::clients::ClientRegistry;
use crate::analytics::Command;
use crate::buffer::Frame;
use crate::codec::{self, EncodeError};

#[derive(Debug, Serialize)]
struct ResultMessage {
    frame: String,
    command: Command,
}

/// Publishes processed frames to every connected client.
#[derive(Clone)]
pub struct ResultDispatcher {
    clients: Arc<ClientRegistry>,
    jpeg_quality: u8,
}

impl ResultDispatcher {
    pub fn new(clients: Arc<ClientRegistry>, jpeg_quality: u8) -> Self {
        Self {
            clients,
            jpeg_quality,
        }
    }

    fn encode(&self, annotated: &Frame, command: Command) -> Result<Utf8Bytes, EncodeError> {
        let jpeg = codec::encode_jpeg(annotated.image(), self.jpeg_quality)?;
        let message = ResultMessage {
            frame: codec::jpeg_data_uri(&jpeg),
            command,
        };
        Ok(serde_json::to_string(&message)?.into())
    }

    /// Fire-and-forget broadcast. Returns the number of clients reached.
    pub fn dispatch(&self, annotated: &Frame, command: Command) -> usize {
        if self.clients.is_empty() {
            tracing::trace!(command = %command, "no clients connected, result dropped");
            return 0;
        }

        match self.encode(annotated, command) {
            Ok(message) => self.clients.broadcast(message),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode result, skipping broadcast");
                0
            }
        }
    }
}
