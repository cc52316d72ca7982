//! Relay dispatcher: pure routing of outbound messages within a session.
//!
//! Given a resolved session (the ordered connections bound to one passcode)
//! and the originating connection, these functions produce the
//! (target, message) pairs to deliver. Two addressing modes exist:
//! "all others" (exclude the sender) and "everyone, with a per-recipient
//! variant" for transfer initiation.

use crate::registry::ConnectionHandle;
use drop_types::{ConnectionId, ServerMessage};

/// Address a message to every session member except the sender.
///
/// Used for `NEW_USER_CONNECTED` and `FILE_CHUNK_RECEIVED`. Targets keep
/// their registration order.
pub fn route_to_others(
    session: &[ConnectionHandle],
    sender: ConnectionId,
    message: ServerMessage,
) -> Vec<(ConnectionHandle, ServerMessage)> {
    session
        .iter()
        .filter(|c| c.id() != sender)
        .map(|c| (c.clone(), message.clone()))
        .collect()
}

/// Address a transfer initiation to the whole session.
///
/// The sender receives `receipt` (`FILE_TRANSFER_INIT_RECEIVED`); every other
/// member receives `init` (`FILE_TRANSFER_INIT`).
pub fn route_init(
    session: &[ConnectionHandle],
    sender: ConnectionId,
    init: ServerMessage,
    receipt: ServerMessage,
) -> Vec<(ConnectionHandle, ServerMessage)> {
    session
        .iter()
        .map(|c| {
            let message = if c.id() == sender {
                receipt.clone()
            } else {
                init.clone()
            };
            (c.clone(), message)
        })
        .collect()
}

/// Deliver routed messages, best-effort and in order.
pub fn deliver(routes: Vec<(ConnectionHandle, ServerMessage)>) {
    for (target, message) in routes {
        target.send(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drop_types::Passcode;
    use tokio::sync::mpsc;

    fn peer() -> (ConnectionHandle, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(8);
        (ConnectionHandle::new(ConnectionId::new(), tx), rx)
    }

    fn notice() -> ServerMessage {
        ServerMessage::NewUserConnected {
            passcode: Passcode::new("ABCD").unwrap(),
        }
    }

    #[test]
    fn route_to_others_excludes_sender() {
        let (a, _) = peer();
        let (b, _) = peer();
        let (c, _) = peer();
        let session = vec![a.clone(), b.clone(), c.clone()];

        let routes = route_to_others(&session, a.id(), notice());

        let targets: Vec<_> = routes.iter().map(|(t, _)| t.id()).collect();
        assert_eq!(targets, vec![b.id(), c.id()]);
    }

    #[test]
    fn route_to_others_with_lone_sender_is_empty() {
        let (a, _) = peer();
        let session = vec![a.clone()];
        assert!(route_to_others(&session, a.id(), notice()).is_empty());
    }

    #[test]
    fn route_init_gives_sender_the_receipt() {
        let (a, _) = peer();
        let (b, _) = peer();
        let session = vec![a.clone(), b.clone()];

        let init = ServerMessage::Error {
            message: "init".to_owned(),
        };
        let receipt = ServerMessage::Error {
            message: "receipt".to_owned(),
        };

        let routes = route_init(&session, a.id(), init.clone(), receipt.clone());
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].0.id(), a.id());
        assert_eq!(routes[0].1, receipt);
        assert_eq!(routes[1].0.id(), b.id());
        assert_eq!(routes[1].1, init);
    }

    #[test]
    fn route_init_without_sender_in_session_sends_init_to_all() {
        // The sender may relay toward a passcode it never bound to.
        let (a, _) = peer();
        let (b, _) = peer();
        let outsider = ConnectionId::new();
        let session = vec![a.clone(), b.clone()];

        let init = ServerMessage::Error {
            message: "init".to_owned(),
        };
        let receipt = ServerMessage::Error {
            message: "receipt".to_owned(),
        };

        let routes = route_init(&session, outsider, init.clone(), receipt);
        assert!(routes.iter().all(|(_, m)| *m == init));
    }

    #[test]
    fn deliver_queues_in_registration_order() {
        let (a, mut a_rx) = peer();
        let (b, mut b_rx) = peer();
        let session = vec![a.clone(), b.clone()];

        deliver(route_to_others(&session, ConnectionId::new(), notice()));

        assert!(a_rx.try_recv().is_ok());
        assert!(b_rx.try_recv().is_ok());
    }
}
