//! In-memory registry grouping live connections by passcode.

use dashmap::DashMap;
use drop_types::{ConnectionId, Passcode, ServerMessage};
use tokio::sync::mpsc;

/// A non-owning routing handle to one live connection.
///
/// The transport owns the socket; the registry holds only the connection's
/// identifier and the send half of its outbound channel. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<ServerMessage>,
}

impl ConnectionHandle {
    /// Create a handle around a connection's outbound channel.
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self { id, outbound }
    }

    /// The connection's process-local identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a message for delivery to this connection.
    ///
    /// Best-effort: returns `false` if the outbound buffer is full or the
    /// connection's forwarder has gone away. The message is dropped in that
    /// case, never retried.
    pub fn send(&self, message: ServerMessage) -> bool {
        match self.outbound.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(connection = %self.id, "dropping outbound message: {}", e);
                false
            }
        }
    }
}

/// Maps each passcode to the ordered set of connections bound to it.
///
/// Invariant: a passcode key exists only while it has at least one bound
/// connection; sessions that become empty are removed, not left behind.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: DashMap<Passcode, Vec<ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to a passcode, creating the session if absent.
    ///
    /// Idempotent per (passcode, connection id): re-announcing the same
    /// passcode does not create a duplicate relay target.
    pub fn register(&self, passcode: &Passcode, handle: ConnectionHandle) {
        let mut session = self.sessions.entry(passcode.clone()).or_default();
        if !session.iter().any(|c| c.id() == handle.id()) {
            session.push(handle);
        }
        tracing::debug!(
            %passcode,
            members = session.len(),
            "registered connection"
        );
    }

    /// Remove a connection from a passcode's session.
    ///
    /// No-op if the passcode or connection is absent; close can race with a
    /// connection that never announced a passcode. Deletes the passcode key
    /// when the session becomes empty.
    pub fn unregister(&self, passcode: &Passcode, id: ConnectionId) {
        let became_empty = match self.sessions.get_mut(passcode) {
            Some(mut session) => {
                session.retain(|c| c.id() != id);
                session.is_empty()
            }
            None => false,
        };

        if became_empty {
            self.sessions.remove_if(passcode, |_, session| session.is_empty());
        }

        tracing::debug!(%passcode, connection = %id, "unregistered connection");
    }

    /// The connections currently bound to a passcode, in registration order.
    pub fn lookup(&self, passcode: &Passcode) -> Vec<ConnectionHandle> {
        self.sessions
            .get(passcode)
            .map(|session| session.clone())
            .unwrap_or_default()
    }

    /// Whether any connection is bound to the passcode.
    pub fn has_members(&self, passcode: &Passcode) -> bool {
        self.sessions.contains_key(passcode)
    }

    /// Number of active sessions (distinct passcodes with members).
    pub fn total_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Number of bound connections across all sessions.
    pub fn total_connections(&self) -> usize {
        self.sessions.iter().map(|entry| entry.value().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passcode(value: &str) -> Passcode {
        Passcode::new(value).unwrap()
    }

    fn handle() -> ConnectionHandle {
        let (tx, _rx) = mpsc::channel(4);
        ConnectionHandle::new(ConnectionId::new(), tx)
    }

    #[test]
    fn lookup_on_unknown_passcode_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.lookup(&passcode("ABCD")).is_empty());
        assert!(!registry.has_members(&passcode("ABCD")));
    }

    #[test]
    fn register_then_unregister_in_order() {
        let registry = ConnectionRegistry::new();
        let p = passcode("ABCD");
        let c1 = handle();
        let c2 = handle();

        registry.register(&p, c1.clone());
        registry.register(&p, c2.clone());

        let session = registry.lookup(&p);
        assert_eq!(session.len(), 2);
        assert_eq!(session[0].id(), c1.id());
        assert_eq!(session[1].id(), c2.id());

        registry.unregister(&p, c1.id());
        let session = registry.lookup(&p);
        assert_eq!(session.len(), 1);
        assert_eq!(session[0].id(), c2.id());

        registry.unregister(&p, c2.id());
        assert!(registry.lookup(&p).is_empty());
        assert_eq!(registry.total_sessions(), 0);
    }

    #[test]
    fn empty_sessions_do_not_linger() {
        let registry = ConnectionRegistry::new();
        let p = passcode("ABCD");
        let c = handle();

        registry.register(&p, c.clone());
        assert_eq!(registry.total_sessions(), 1);

        registry.unregister(&p, c.id());
        assert!(!registry.has_members(&p));
        assert_eq!(registry.total_sessions(), 0);
    }

    #[test]
    fn register_is_idempotent_per_connection() {
        let registry = ConnectionRegistry::new();
        let p = passcode("ABCD");
        let c = handle();

        registry.register(&p, c.clone());
        registry.register(&p, c.clone());

        assert_eq!(registry.lookup(&p).len(), 1);
    }

    #[test]
    fn unregister_unknown_is_a_noop() {
        let registry = ConnectionRegistry::new();
        let p = passcode("ABCD");
        let c = handle();

        // Neither the passcode nor the connection exists yet.
        registry.unregister(&p, c.id());

        registry.register(&p, c.clone());
        registry.unregister(&p, ConnectionId::new());
        assert_eq!(registry.lookup(&p).len(), 1);
    }

    #[test]
    fn sessions_isolated_per_passcode() {
        let registry = ConnectionRegistry::new();
        let c1 = handle();
        let c2 = handle();

        registry.register(&passcode("AAAA"), c1);
        registry.register(&passcode("BBBB"), c2);

        assert_eq!(registry.total_sessions(), 2);
        assert_eq!(registry.total_connections(), 2);
        assert_eq!(registry.lookup(&passcode("AAAA")).len(), 1);
        assert_eq!(registry.lookup(&passcode("BBBB")).len(), 1);
    }

    #[test]
    fn handle_send_reports_full_buffer() {
        let (tx, mut rx) = mpsc::channel(1);
        let c = ConnectionHandle::new(ConnectionId::new(), tx);

        let message = ServerMessage::Error {
            message: "test".to_owned(),
        };
        assert!(c.send(message.clone()));
        assert!(!c.send(message.clone()), "full buffer should drop");

        assert_eq!(rx.try_recv().unwrap(), message);
    }
}
