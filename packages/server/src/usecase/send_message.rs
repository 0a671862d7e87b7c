//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 受信したテキストがルームの受信キューに渡されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージがルーム経由で全員に届く
//! - 異常系：停止済みのルームへの送信

use std::sync::Arc;

use doorstep_shared::time::Clock;

use crate::domain::{Message, Participant, Room, RoomError};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// 送信時刻の取得元
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// メッセージ送信を実行
    ///
    /// ルームの受信キューに空きができるまで待つ。レンダリングと配信は
    /// ルームのイベントループが行う。
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 受信キューに追加された
    /// * `Err(RoomError::Closed)` - ルームが停止済み
    pub async fn execute(
        &self,
        room: &Room,
        sender: &Arc<Participant>,
        text: String,
    ) -> Result<(), RoomError> {
        room.submit(Message::chat(sender.clone(), text, self.clock.now()))
            .await
    }
}
