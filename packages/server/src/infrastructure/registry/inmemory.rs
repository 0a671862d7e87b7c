//! InMemory Room Registry 実装
//!
//! ドメイン層が定義する RoomRegistry trait の具体的な実装。
//! HashMap をインメモリのルーム表として使用します。
//!
//! ## ロックの二層構造
//!
//! - レジストリのロック: ルームの検索・作成・削除の間だけ保持する
//! - ルームのメンバーロック: 各 Room が個別に保持する
//!
//! 参加と退出は「ルームの受信キューの枠を確保してから」レジストリのロックを取り直すため、
//! 混雑したルームのキュー待ちで他のルームの作成・削除が止まることはありません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use doorstep_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    InboundSlot, NicknameSource, OriginKey, Participant, Room, RoomRegistry, RoomSettings,
};

/// インメモリ Room Registry 実装
pub struct InMemoryRoomRegistry {
    /// origin key → Room
    rooms: Mutex<HashMap<OriginKey, Arc<Room>>>,
    /// 新しいルームの設定
    settings: RoomSettings,
    nicknames: Arc<dyn NicknameSource>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRoomRegistry {
    /// 新しい InMemoryRoomRegistry を作成
    pub fn new(
        settings: RoomSettings,
        nicknames: Arc<dyn NicknameSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            settings,
            nicknames,
            clock,
        }
    }

    /// 全ルームのイベントループを停止し、ルーム表を空にする
    pub async fn close_all(&self) {
        let mut rooms = self.rooms.lock().await;
        for (key, room) in rooms.drain() {
            tracing::info!("Room '{}' closed", key);
            room.shutdown();
        }
    }
}

#[async_trait]
impl RoomRegistry for InMemoryRoomRegistry {
    async fn join(&self, key: &OriginKey, participant: Arc<Participant>) -> Arc<Room> {
        let mut reserved: Option<(Arc<Room>, InboundSlot)> = None;

        loop {
            let mut rooms = self.rooms.lock().await;

            let room = match rooms.get(key) {
                Some(room) => room.clone(),
                None => {
                    let room = Room::spawn(
                        key.clone(),
                        self.settings,
                        self.nicknames.clone(),
                        self.clock.clone(),
                    );
                    rooms.insert(key.clone(), room.clone());
                    tracing::info!("Room '{}' created", key);
                    room
                }
            };

            // 以前に確保した枠が同じルームのものなら使う（別のルームに差し替わっていたら破棄）
            let slot = match reserved.take() {
                Some((reserved_room, slot)) if Arc::ptr_eq(&reserved_room, &room) => Some(slot),
                _ => room.try_reserve_slot(),
            };

            match slot {
                Some(slot) => {
                    room.add_member(participant, slot).await;
                    return room;
                }
                None => {
                    // キューが満杯: レジストリのロックを離してから枠を待つ
                    drop(rooms);
                    match room.reserve_slot().await {
                        Ok(slot) => reserved = Some((room, slot)),
                        Err(e) => tracing::warn!("Retrying join for '{}': {}", key, e),
                    }
                }
            }
        }
    }

    async fn leave(&self, key: &OriginKey, participant: &Participant) {
        let mut reserved: Option<(Arc<Room>, InboundSlot)> = None;

        loop {
            let mut rooms = self.rooms.lock().await;

            let Some(room) = rooms.get(key).cloned() else {
                tracing::warn!(
                    "Tried to remove participant {} from non-existent room '{}'",
                    participant.id(),
                    key
                );
                return;
            };

            let slot = match reserved.take() {
                Some((reserved_room, slot)) if Arc::ptr_eq(&reserved_room, &room) => Some(slot),
                _ => room.try_reserve_slot(),
            };

            if slot.is_none() && room.member_count().await > 1 {
                // 残るメンバーへの退出通知の枠がない: ロックを離して待つ
                drop(rooms);
                match room.reserve_slot().await {
                    Ok(slot) => reserved = Some((room, slot)),
                    Err(e) => tracing::warn!("Retrying leave for '{}': {}", key, e),
                }
                continue;
            }

            let remaining = room.remove_member(participant, slot).await;
            if remaining == 0 {
                rooms.remove(key);
                room.shutdown();
                tracing::info!("Room '{}' destroyed", key);
            }
            return;
        }
    }

    async fn has_room(&self, key: &OriginKey) -> bool {
        self.rooms.lock().await.contains_key(key)
    }

    async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}
