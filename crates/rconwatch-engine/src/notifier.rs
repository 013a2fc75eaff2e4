//! The outbound seam: where state changes go once the engine has made them.

use chrono::NaiveDateTime;
use rconwatch_protocol::RosterSnapshot;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::ServerState;

/// One published change.
///
/// `roster` is `Some` only for `Online` updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub state: ServerState,
    pub roster: Option<RosterSnapshot>,
    pub at: NaiveDateTime,
}

/// Receives status updates from the engine.
///
/// Called from inside the engine task, so implementations must not
/// block. Delivery is best effort.
pub trait Notifier: Send + Sync + 'static {
    fn publish(&self, update: StatusUpdate);
}

/// Forwards updates into an unbounded channel.
///
/// Updates are silently dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<StatusUpdate>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiver its updates arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn publish(&self, update: StatusUpdate) {
        let _ = self.sender.send(update);
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rconwatch_protocol::PlayerRecord;

    use super::*;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 59, 0)
            .unwrap()
    }

    #[test]
    fn test_channel_notifier_delivers_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.publish(StatusUpdate {
            state: ServerState::Restarting,
            roster: None,
            at: at(),
        });
        notifier.publish(StatusUpdate {
            state: ServerState::Online,
            roster: Some(RosterSnapshot::empty()),
            at: at(),
        });

        assert_eq!(rx.try_recv().unwrap().state, ServerState::Restarting);
        assert_eq!(rx.try_recv().unwrap().state, ServerState::Online);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_after_receiver_dropped_is_noop() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.publish(StatusUpdate {
            state: ServerState::Offline,
            roster: None,
            at: at(),
        });
    }

    #[test]
    fn test_status_update_serializes_to_json() {
        let roster = RosterSnapshot::from_records([PlayerRecord::new("76561", "Ann", "Utahraptor")]);
        let update = StatusUpdate {
            state: ServerState::Online,
            roster: Some(roster),
            at: at(),
        };

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["state"], "online");
        assert_eq!(json["roster"]["players"][0]["name"], "Ann");
        assert_eq!(json["at"], "2024-03-09T07:59:00");
    }

    #[test]
    fn test_offline_update_serializes_null_roster() {
        let update = StatusUpdate {
            state: ServerState::Offline,
            roster: None,
            at: at(),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["state"], "offline");
        assert!(json["roster"].is_null());
    }
}
