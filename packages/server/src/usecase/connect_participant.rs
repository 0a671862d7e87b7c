//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - 参加者の生成とルームへの登録
//!
//! ### なぜこのテストが必要か
//! - 接続ごとに送信キューと切断トークンが正しく結び付くことを保証
//! - ルームで表示名が割り当てられることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新しいキーでの接続（ルーム作成）
//! - 正常系：既存のルームへの接続（ルーム再利用）

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::{OriginKey, Participant, Room, RoomRegistry};

/// 接続一本分のセッション
///
/// `outbound` は接続の書き込みループだけが読み出す。`overload` は送信キューが
/// 溢れたときにルーム側から発火される。
pub struct ChatSession {
    pub key: OriginKey,
    pub participant: Arc<Participant>,
    pub room: Arc<Room>,
    pub outbound: mpsc::Receiver<String>,
    pub overload: CancellationToken,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Registry（ルーム管理の抽象化）
    registry: Arc<dyn RoomRegistry>,
    /// 参加者ごとの送信キューの容量
    outbound_capacity: usize,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(registry: Arc<dyn RoomRegistry>, outbound_capacity: usize) -> Self {
        Self {
            registry,
            outbound_capacity: outbound_capacity.max(1),
        }
    }

    /// 参加者接続を実行
    ///
    /// # Arguments
    ///
    /// * `key` - 接続元から導出したルームのキー
    ///
    /// # Returns
    ///
    /// ルームに登録済みの参加者を含むセッション
    pub async fn execute(&self, key: OriginKey) -> ChatSession {
        let (tx, outbound) = mpsc::channel(self.outbound_capacity);
        let overload = CancellationToken::new();
        let participant = Arc::new(Participant::new(tx, overload.clone()));

        let room = self.registry.join(&key, participant.clone()).await;

        ChatSession {
            key,
            participant,
            room,
            outbound,
            overload,
        }
    }
}
