//! Room: a broadcast group for one origin key.
//!
//! Each room owns a single event loop that is the only writer of rendered
//! output to its members. Join and leave notices are rendered while the member
//! lock is held and go through the same inbound queue as chat, so every
//! notice's roster matches membership at the moment it was enqueued.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use doorstep_shared::time::Clock;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::pipeline::{
    Command, NoticeKind, parse_command, render_chat_bubble, render_notice, render_roster,
    sanitize_display_name, sanitize_message_text,
};

use super::{
    error::RoomError,
    message::{Message, MessageKind},
    nickname::NicknameSource,
    participant::Participant,
    rate_limiter::{RateLimit, TokenBucket},
    value_object::{OriginKey, ParticipantId},
};

/// Tunables for a room's inbound queue and rate limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSettings {
    /// Events that may wait for the event loop
    pub inbound_capacity: usize,
    /// One rate-limiter token is earned per interval
    pub rate_interval: Duration,
    /// Tokens available in a burst
    pub rate_burst: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            inbound_capacity: 20,
            rate_interval: Duration::from_millis(100),
            rate_burst: 8,
        }
    }
}

impl RoomSettings {
    pub fn limiter(&self) -> TokenBucket {
        TokenBucket::new(self.rate_interval, self.rate_burst)
    }
}

/// A reserved place in a room's inbound queue.
///
/// Reserving first lets callers enqueue a notice while holding locks without
/// ever waiting for queue capacity inside them.
#[derive(Debug)]
pub struct InboundSlot(mpsc::OwnedPermit<Message>);

impl InboundSlot {
    fn send(self, message: Message) {
        self.0.send(message);
    }
}

type Members = HashMap<ParticipantId, Arc<Participant>>;

pub struct Room {
    key: OriginKey,
    inbound: mpsc::Sender<Message>,
    members: Mutex<Members>,
    last_message_at: std::sync::Mutex<Option<DateTime<Utc>>>,
    quit: CancellationToken,
    nicknames: Arc<dyn NicknameSource>,
    clock: Arc<dyn Clock>,
}

impl Room {
    /// Create a room and start its event loop with a token-bucket limiter
    pub fn spawn(
        key: OriginKey,
        settings: RoomSettings,
        nicknames: Arc<dyn NicknameSource>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let limiter = Arc::new(settings.limiter());
        Self::spawn_with_limiter(key, settings.inbound_capacity, limiter, nicknames, clock)
    }

    /// Create a room and start its event loop with the given limiter
    pub fn spawn_with_limiter(
        key: OriginKey,
        inbound_capacity: usize,
        limiter: Arc<dyn RateLimit>,
        nicknames: Arc<dyn NicknameSource>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let (inbound, receiver) = mpsc::channel(inbound_capacity.max(1));
        let room = Arc::new(Self {
            key,
            inbound,
            members: Mutex::new(HashMap::new()),
            last_message_at: std::sync::Mutex::new(None),
            quit: CancellationToken::new(),
            nicknames,
            clock,
        });
        tokio::spawn(room.clone().run(receiver, limiter));
        room
    }

    /// Wait for a free place in the inbound queue
    pub async fn reserve_slot(&self) -> Result<InboundSlot, RoomError> {
        self.inbound
            .clone()
            .reserve_owned()
            .await
            .map(InboundSlot)
            .map_err(|_| self.closed_error())
    }

    /// Take a free place in the inbound queue if one is available right now.
    ///
    /// Returns `None` when the queue is full or the room is closed.
    pub fn try_reserve_slot(&self) -> Option<InboundSlot> {
        self.inbound.clone().try_reserve_owned().ok().map(InboundSlot)
    }

    /// Submit an event, waiting for queue capacity
    pub async fn submit(&self, message: Message) -> Result<(), RoomError> {
        self.inbound
            .send(message)
            .await
            .map_err(|_| self.closed_error())
    }

    /// Add a participant, assign its display name and announce it.
    ///
    /// The join notice shows the roster including the new member. Returns the
    /// assigned name.
    pub async fn add_member(&self, participant: Arc<Participant>, slot: InboundSlot) -> String {
        let mut members = self.members.lock().await;

        let name = resolve_unique_name(&members, &self.nicknames.generate());
        participant.rename(name.clone());
        members.insert(participant.id(), participant);

        let now = self.clock.now();
        let html = render_notice(&format!("{name} has joined"), NoticeKind::Notification, now)
            + &render_roster(&sorted_names(&members));
        slot.send(Message::rendered(html, now));

        tracing::info!(
            "'{}' joined room '{}' ({} members)",
            name,
            self.key,
            members.len()
        );
        name
    }

    /// Remove a participant, announcing the departure to whoever remains.
    ///
    /// Nothing is broadcast when the room becomes empty. Returns the number of
    /// remaining members.
    pub async fn remove_member(
        &self,
        participant: &Participant,
        slot: Option<InboundSlot>,
    ) -> usize {
        let mut members = self.members.lock().await;

        if members.remove(&participant.id()).is_none() {
            tracing::warn!(
                "Participant {} is not a member of room '{}'",
                participant.id(),
                self.key
            );
            return members.len();
        }

        let name = participant.display_name();
        let remaining = members.len();
        tracing::info!(
            "'{}' left room '{}' ({} members)",
            name,
            self.key,
            remaining
        );

        if remaining > 0 {
            match slot {
                Some(slot) => {
                    let now = self.clock.now();
                    let html =
                        render_notice(&format!("{name} has left"), NoticeKind::Notification, now)
                            + &render_roster(&sorted_names(&members));
                    slot.send(Message::rendered(html, now));
                }
                None => tracing::warn!(
                    "No inbound slot for the leave notice of '{}' in room '{}'",
                    name,
                    self.key
                ),
            }
        }
        remaining
    }

    pub async fn member_count(&self) -> usize {
        self.members.lock().await.len()
    }

    /// Display names of the current members, sorted alphabetically
    pub async fn names(&self) -> Vec<String> {
        sorted_names(&*self.members.lock().await)
    }

    /// When the most recent chat message was accepted
    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        *self
            .last_message_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the event loop to stop. Idempotent.
    pub fn shutdown(&self) {
        self.quit.cancel();
    }

    /// Resolves once the event loop has stopped
    pub async fn closed(&self) {
        self.inbound.closed().await;
    }

    pub fn is_closed(&self) -> bool {
        self.inbound.is_closed()
    }

    fn closed_error(&self) -> RoomError {
        RoomError::Closed(self.key.to_string())
    }

    async fn run(
        self: Arc<Self>,
        mut inbound: mpsc::Receiver<Message>,
        limiter: Arc<dyn RateLimit>,
    ) {
        tracing::debug!("Room '{}' event loop started", self.key);

        loop {
            let message = tokio::select! {
                biased;
                _ = self.quit.cancelled() => break,
                received = inbound.recv() => match received {
                    Some(message) => message,
                    None => break,
                },
            };

            let acquired = tokio::select! {
                biased;
                _ = self.quit.cancelled() => break,
                acquired = limiter.acquire() => acquired,
            };
            if let Err(e) = acquired {
                tracing::warn!("Rate limiter failed in room '{}': {}", self.key, e);
                continue;
            }

            self.dispatch(message).await;
        }

        tracing::debug!("Room '{}' event loop stopped", self.key);
    }

    async fn dispatch(&self, message: Message) {
        let sent_at = message.sent_at;
        match message.kind {
            MessageKind::Rendered(html) => {
                let members = self.members.lock().await;
                for member in members.values() {
                    member.forward(html.clone());
                }
            }
            MessageKind::Chat {
                sender,
                author_name,
                text,
            } => match parse_command(&text) {
                Command::Rename(target) => self.rename(&sender, target).await,
                Command::Say(raw) => self.say(&sender, &author_name, raw, sent_at).await,
            },
        }
    }

    async fn rename(&self, sender: &Participant, target: &str) {
        let requested = sanitize_display_name(target);
        let members = self.members.lock().await;
        let now = self.clock.now();

        if !members.contains_key(&sender.id()) {
            tracing::debug!("Ignoring rename from a former member of room '{}'", self.key);
            return;
        }
        if requested.is_empty() {
            sender.forward(render_notice(
                "Nickname cannot be empty",
                NoticeKind::Error,
                now,
            ));
            return;
        }
        if name_in_use(&members, &requested) {
            sender.forward(render_notice(
                "That nickname is already in use",
                NoticeKind::Error,
                now,
            ));
            return;
        }

        let previous = sender.rename(requested.clone());
        let html = render_notice(
            &format!("{previous} is now known as {requested}"),
            NoticeKind::Notification,
            now,
        ) + &render_roster(&sorted_names(&members));
        for member in members.values() {
            member.forward(html.clone());
        }
        tracing::info!(
            "'{}' is now known as '{}' in room '{}'",
            previous,
            requested,
            self.key
        );
    }

    async fn say(&self, sender: &Participant, name: &str, raw: &str, sent_at: DateTime<Utc>) {
        let text = sanitize_message_text(raw);
        if text.is_empty() {
            tracing::debug!("Dropping empty message in room '{}'", self.key);
            return;
        }

        *self
            .last_message_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sent_at);

        let members = self.members.lock().await;
        let author_html = render_chat_bubble(name, &text, sent_at, true);
        let other_html = render_chat_bubble(name, &text, sent_at, false);
        for member in members.values() {
            if member.id() == sender.id() {
                member.forward(author_html.clone());
            } else {
                member.forward(other_html.clone());
            }
        }
    }
}

fn name_in_use(members: &Members, name: &str) -> bool {
    members.values().any(|m| m.display_name() == name)
}

/// First of `base`, `base2`, `base3`, ... not held by any member
fn resolve_unique_name(members: &Members, base: &str) -> String {
    if !name_in_use(members, base) {
        return base.to_string();
    }
    (2..)
        .map(|suffix| format!("{base}{suffix}"))
        .find(|candidate| !name_in_use(members, candidate))
        .unwrap_or_else(|| base.to_string())
}

fn sorted_names(members: &Members) -> Vec<String> {
    let mut names: Vec<String> = members.values().map(|m| m.display_name()).collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RateLimitError, rate_limiter::MockRateLimit};
    use doorstep_shared::time::FixedClock;
    use mockall::Sequence;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(1);

    struct FixedNickname(&'static str);

    impl NicknameSource for FixedNickname {
        fn generate(&self) -> String {
            self.0.to_string()
        }
    }

    fn unlimited() -> Arc<dyn RateLimit> {
        Arc::new(TokenBucket::new(Duration::ZERO, 1))
    }

    fn create_room(nickname: &'static str) -> Arc<Room> {
        create_room_with_limiter(nickname, unlimited())
    }

    fn create_room_with_limiter(nickname: &'static str, limiter: Arc<dyn RateLimit>) -> Arc<Room> {
        Room::spawn_with_limiter(
            OriginKey::new("1.2.3.4").unwrap(),
            20,
            limiter,
            Arc::new(FixedNickname(nickname)),
            Arc::new(FixedClock::from_millis(1_672_576_496_000)),
        )
    }

    fn create_participant(
        capacity: usize,
    ) -> (Arc<Participant>, mpsc::Receiver<String>, CancellationToken) {
        let (tx, rx) = mpsc::channel(capacity);
        let token = CancellationToken::new();
        (Arc::new(Participant::new(tx, token.clone())), rx, token)
    }

    async fn join(room: &Room, participant: &Arc<Participant>) -> String {
        let slot = room.reserve_slot().await.unwrap();
        room.add_member(participant.clone(), slot).await
    }

    async fn next(rx: &mut mpsc::Receiver<String>) -> String {
        timeout(WAIT, rx.recv()).await.unwrap().unwrap()
    }

    /// Join and wait until the joiner has seen its own join notice, so every
    /// earlier event has been dispatched too.
    async fn join_settled(
        room: &Room,
        participant: &Arc<Participant>,
        rx: &mut mpsc::Receiver<String>,
    ) -> String {
        let name = join(room, participant).await;
        let marker = format!("{name} has joined");
        while !next(rx).await.contains(&marker) {}
        name
    }

    fn drain(rx: &mut mpsc::Receiver<String>) {
        while rx.try_recv().is_ok() {}
    }

    fn chat(sender: &Arc<Participant>, text: &str) -> Message {
        Message::chat(sender.clone(), text, FixedClock::from_millis(1_672_576_496_000).now())
    }

    #[tokio::test]
    async fn test_join_notice_contains_roster_with_joiner() {
        // テスト項目: 参加時の通知には参加者自身を含むロスターが含まれる
        // given (前提条件):
        let room = create_room("Alice");
        let (alice, mut alice_rx, _) = create_participant(16);

        // when (操作):
        let name = join(&room, &alice).await;

        // then (期待する結果):
        assert_eq!(name, "Alice");
        let notice = next(&mut alice_rx).await;
        assert!(notice.contains("Alice has joined"));
        assert!(notice.contains(&render_roster(&["Alice"])));
    }

    #[tokio::test]
    async fn test_colliding_names_get_numeric_suffixes() {
        // テスト項目: 同じ候補名はサフィックス 2, 3 ... で一意になる
        // given (前提条件):
        let room = create_room("Alice");
        let (a, _a_rx, _) = create_participant(16);
        let (b, _b_rx, _) = create_participant(16);
        let (c, _c_rx, _) = create_participant(16);

        // when (操作):
        let names = vec![join(&room, &a).await, join(&room, &b).await, join(&room, &c).await];

        // then (期待する結果):
        assert_eq!(names, vec!["Alice", "Alice2", "Alice3"]);
        assert_eq!(room.names().await, vec!["Alice", "Alice2", "Alice3"]);
    }

    #[tokio::test]
    async fn test_chat_sends_author_and_other_variants() {
        // テスト項目: 送信者には入力欄クリア付き、他の参加者には通常のバブルが届く
        // given (前提条件):
        let room = create_room("Alice");
        let (a, mut a_rx, _) = create_participant(16);
        let (b, mut b_rx, _) = create_participant(16);
        join_settled(&room, &a, &mut a_rx).await;
        join_settled(&room, &b, &mut b_rx).await;
        drain(&mut a_rx);

        // when (操作):
        room.submit(chat(&a, "hello <script>")).await.unwrap();

        // then (期待する結果):
        let author = next(&mut a_rx).await;
        let other = next(&mut b_rx).await;
        assert!(author.contains("hello &lt;script&gt;"));
        assert!(other.contains("hello &lt;script&gt;"));
        assert!(author.contains(crate::pipeline::CLEAR_INPUT_FIELD));
        assert!(!other.contains(crate::pipeline::CLEAR_INPUT_FIELD));
        assert!(room.last_message_at().is_some());
    }

    #[tokio::test]
    async fn test_chat_uses_name_at_submission() {
        // テスト項目: 送信後に名前が変わっても、メッセージは送信時の名前で表示される
        // given (前提条件):
        let room = create_room("Alice");
        let (a, mut a_rx, _) = create_participant(16);
        join_settled(&room, &a, &mut a_rx).await;
        let queued = chat(&a, "sent before rename");

        // when (操作):
        a.rename("Zed".to_string());
        room.submit(queued).await.unwrap();

        // then (期待する結果):
        let bubble = next(&mut a_rx).await;
        assert!(bubble.contains("sent before rename"));
        assert!(bubble.contains(r#"<span class="font-bold nickname">Alice</span>"#));
        assert!(!bubble.contains("Zed"));
    }

    #[tokio::test]
    async fn test_rename_broadcasts_notice_and_roster() {
        // テスト項目: 名前変更は全員（本人を含む）に通知と新しいロスターが届く
        // given (前提条件):
        let room = create_room("Alice");
        let (a, mut a_rx, _) = create_participant(16);
        let (b, mut b_rx, _) = create_participant(16);
        join_settled(&room, &a, &mut a_rx).await;
        join_settled(&room, &b, &mut b_rx).await;
        drain(&mut a_rx);

        // when (操作):
        room.submit(chat(&b, "/nickname Bob")).await.unwrap();

        // then (期待する結果):
        let expected_roster = render_roster(&["Alice", "Bob"]);
        for rx in [&mut a_rx, &mut b_rx] {
            let notice = next(rx).await;
            assert!(notice.contains("Alice2 is now known as Bob"));
            assert!(notice.contains(&expected_roster));
        }
        assert_eq!(b.display_name(), "Bob");
    }

    #[tokio::test]
    async fn test_empty_rename_is_rejected_privately() {
        // テスト項目: 空の名前への変更は本人にのみエラーが届き、ブロードキャストされない
        // given (前提条件):
        let room = create_room("Alice");
        let (a, mut a_rx, _) = create_participant(16);
        let (b, mut b_rx, _) = create_participant(16);
        join_settled(&room, &a, &mut a_rx).await;
        join_settled(&room, &b, &mut b_rx).await;
        drain(&mut a_rx);

        // when (操作):
        room.submit(chat(&a, "/nickname ")).await.unwrap();
        room.submit(chat(&a, "still here")).await.unwrap();

        // then (期待する結果):
        let error = next(&mut a_rx).await;
        assert!(error.contains("Nickname cannot be empty"));
        assert!(error.contains(r#"class="error""#));
        // b の次のメッセージは後続のチャット（エラーは届いていない）
        assert!(next(&mut b_rx).await.contains("still here"));
        assert_eq!(a.display_name(), "Alice");
    }

    #[tokio::test]
    async fn test_duplicate_rename_is_rejected_privately() {
        // テスト項目: 使用中の名前への変更は本人にのみエラーが届く
        // given (前提条件):
        let room = create_room("Alice");
        let (a, mut a_rx, _) = create_participant(16);
        let (b, mut b_rx, _) = create_participant(16);
        join_settled(&room, &a, &mut a_rx).await;
        join_settled(&room, &b, &mut b_rx).await;
        drain(&mut a_rx);

        // when (操作):
        room.submit(chat(&b, "/nickname Alice")).await.unwrap();
        room.submit(chat(&b, "ok")).await.unwrap();

        // then (期待する結果):
        assert!(next(&mut b_rx).await.contains("That nickname is already in use"));
        assert!(next(&mut a_rx).await.contains("ok"));
        assert_eq!(b.display_name(), "Alice2");
    }

    #[tokio::test]
    async fn test_whitespace_message_is_dropped_silently() {
        // テスト項目: 空白のみのメッセージは誰にも送られない
        // given (前提条件):
        let room = create_room("Alice");
        let (a, mut a_rx, _) = create_participant(16);
        join(&room, &a).await;
        next(&mut a_rx).await;

        // when (操作):
        room.submit(chat(&a, "   \t ")).await.unwrap();
        room.submit(chat(&a, "after")).await.unwrap();

        // then (期待する結果):
        assert!(next(&mut a_rx).await.contains("after"));
        assert!(room.last_message_at().is_some());
    }

    #[tokio::test]
    async fn test_rate_limiter_error_skips_event() {
        // テスト項目: レートリミッターのエラー時はそのイベントだけが破棄され、ループは継続する
        // given (前提条件):
        let mut limiter = MockRateLimit::new();
        let mut seq = Sequence::new();
        limiter
            .expect_acquire()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        limiter
            .expect_acquire()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(RateLimitError::ZeroBurst));
        limiter.expect_acquire().returning(|| Ok(()));
        let room = create_room_with_limiter("Alice", Arc::new(limiter));
        let (a, mut a_rx, _) = create_participant(16);
        join(&room, &a).await;

        // when (操作):
        room.submit(chat(&a, "dropped")).await.unwrap();
        room.submit(chat(&a, "kept")).await.unwrap();

        // then (期待する結果):
        assert!(next(&mut a_rx).await.contains("Alice has joined"));
        let delivered = next(&mut a_rx).await;
        assert!(delivered.contains("kept"));
        assert!(!delivered.contains("dropped"));
    }

    #[tokio::test]
    async fn test_slow_member_is_disconnected_without_stalling_others() {
        // テスト項目: 送信キューが溢れた参加者は一度だけ切断され、他の参加者への配信は止まらない
        // given (前提条件):
        let room = create_room("Alice");
        let (fast, mut fast_rx, _) = create_participant(64);
        let (slow, mut slow_rx, slow_token) = create_participant(1);
        join_settled(&room, &fast, &mut fast_rx).await;
        join_settled(&room, &slow, &mut slow_rx).await;
        drain(&mut fast_rx);

        // when (操作): slow は受信キューを一切読まない
        for i in 0..10 {
            room.submit(chat(&fast, &format!("message {i}"))).await.unwrap();
        }

        // then (期待する結果):
        for i in 0..10 {
            assert!(next(&mut fast_rx).await.contains(&format!("message {i}")));
        }
        assert!(slow.is_overloaded());
        assert!(slow_token.is_cancelled());

        // 切断処理によりルームから除外される
        let slot = room.reserve_slot().await.unwrap();
        assert_eq!(room.remove_member(&slow, Some(slot)).await, 1);
        assert!(next(&mut fast_rx).await.contains("has left"));
    }

    #[tokio::test]
    async fn test_leave_notice_reflects_remaining_members() {
        // テスト項目: 退出通知のロスターは退出後のメンバーを反映する
        // given (前提条件):
        let room = create_room("Alice");
        let (a, mut a_rx, _) = create_participant(16);
        let (b, mut b_rx, _) = create_participant(16);
        join_settled(&room, &a, &mut a_rx).await;
        join_settled(&room, &b, &mut b_rx).await;
        drain(&mut a_rx);

        // when (操作):
        let slot = room.reserve_slot().await.unwrap();
        let remaining = room.remove_member(&b, Some(slot)).await;

        // then (期待する結果):
        assert_eq!(remaining, 1);
        let notice = next(&mut a_rx).await;
        assert!(notice.contains("Alice2 has left"));
        assert!(notice.contains(&render_roster(&["Alice"])));
    }

    #[tokio::test]
    async fn test_removing_last_member_broadcasts_nothing() {
        // テスト項目: 最後のメンバーが退出しても通知は送られない
        // given (前提条件):
        let room = create_room("Alice");
        let (a, mut a_rx, _) = create_participant(16);
        join(&room, &a).await;
        next(&mut a_rx).await;

        // when (操作):
        let slot = room.reserve_slot().await.unwrap();
        let remaining = room.remove_member(&a, Some(slot)).await;

        // then (期待する結果):
        assert_eq!(remaining, 0);
        assert_eq!(room.member_count().await, 0);
        assert!(a_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_stops_event_loop() {
        // テスト項目: shutdown 後はイベントループが停止し、イベントを受け付けない
        // given (前提条件):
        let room = create_room("Alice");
        let (a, _a_rx, _) = create_participant(16);

        // when (操作):
        room.shutdown();
        timeout(WAIT, room.closed()).await.unwrap();

        // then (期待する結果):
        assert!(room.is_closed());
        assert_eq!(
            room.submit(chat(&a, "late")).await,
            Err(RoomError::Closed("1.2.3.4".to_string()))
        );
        assert!(room.try_reserve_slot().is_none());
    }
}
