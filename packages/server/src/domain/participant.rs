//! Per-connection participant state.

use std::sync::{
    PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::value_object::ParticipantId;

/// Outcome of handing a fragment to a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The fragment was queued for the connection writer
    Queued,
    /// The queue was full; the participant's disconnect action has fired
    Overloaded,
    /// The connection writer is gone
    Disconnected,
}

/// One live connection's session state inside a room.
///
/// The room's event loop is the only producer of `outbound` fragments; the
/// connection writer is the only consumer.
#[derive(Debug)]
pub struct Participant {
    id: ParticipantId,
    display_name: RwLock<String>,
    outbound: mpsc::Sender<String>,
    overloaded: AtomicBool,
    on_overload: CancellationToken,
}

impl Participant {
    /// Create a participant whose connection is closed through `on_overload`
    /// when it cannot keep up with `outbound`.
    pub fn new(outbound: mpsc::Sender<String>, on_overload: CancellationToken) -> Self {
        Self {
            id: ParticipantId::generate(),
            display_name: RwLock::new(String::new()),
            outbound,
            overloaded: AtomicBool::new(false),
            on_overload,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// Current display name (empty until a room assigns one)
    pub fn display_name(&self) -> String {
        self.display_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the display name, returning the previous one.
    ///
    /// Callers must hold the owning room's member lock.
    pub(crate) fn rename(&self, name: String) -> String {
        let mut guard = self
            .display_name
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, name)
    }

    /// Queue a rendered fragment without waiting.
    ///
    /// A full queue fires the disconnect action instead of blocking the
    /// caller. The action fires at most once per participant.
    pub fn forward(&self, fragment: String) -> Delivery {
        match self.outbound.try_send(fragment) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => {
                if !self.overloaded.swap(true, Ordering::AcqRel) {
                    tracing::warn!(
                        "Participant '{}' ({}) is too slow, closing its connection",
                        self.display_name(),
                        self.id
                    );
                    self.on_overload.cancel();
                }
                Delivery::Overloaded
            }
            Err(TrySendError::Closed(_)) => Delivery::Disconnected,
        }
    }

    /// Whether the disconnect action has fired
    pub fn is_overloaded(&self) -> bool {
        self.overloaded.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forward_queues_fragment() {
        // テスト項目: キューに空きがあればフラグメントが送信キューに入る
        // given (前提条件):
        let (tx, mut rx) = mpsc::channel(2);
        let participant = Participant::new(tx, CancellationToken::new());

        // when (操作):
        let result = participant.forward("<p>hi</p>".to_string());

        // then (期待する結果):
        assert_eq!(result, Delivery::Queued);
        assert_eq!(rx.recv().await, Some("<p>hi</p>".to_string()));
        assert!(!participant.is_overloaded());
    }

    #[tokio::test]
    async fn test_forward_fires_disconnect_once_when_full() {
        // テスト項目: キューが満杯になると切断アクションが一度だけ発火する
        // given (前提条件):
        let (tx, _rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let participant = Participant::new(tx, token.clone());
        participant.forward("first".to_string());

        // when (操作):
        let second = participant.forward("second".to_string());
        let third = participant.forward("third".to_string());

        // then (期待する結果):
        assert_eq!(second, Delivery::Overloaded);
        assert_eq!(third, Delivery::Overloaded);
        assert!(participant.is_overloaded());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_forward_reports_disconnected_writer() {
        // テスト項目: 受信側が閉じている場合は Disconnected を返し、切断アクションは発火しない
        // given (前提条件):
        let (tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let participant = Participant::new(tx, token.clone());
        drop(rx);

        // when (操作):
        let result = participant.forward("late".to_string());

        // then (期待する結果):
        assert_eq!(result, Delivery::Disconnected);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_rename_returns_previous_name() {
        // テスト項目: rename は以前の表示名を返す
        // given (前提条件):
        let (tx, _rx) = mpsc::channel(1);
        let participant = Participant::new(tx, CancellationToken::new());
        participant.rename("BraveOtter".to_string());

        // when (操作):
        let previous = participant.rename("Bob".to_string());

        // then (期待する結果):
        assert_eq!(previous, "BraveOtter");
        assert_eq!(participant.display_name(), "Bob");
    }
}
