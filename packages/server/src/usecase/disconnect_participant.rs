//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 切断時に残りの参加者へ通知されることを確認
//! - 最後の参加者が切断した場合にルームが削除されることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の切断と通知
//! - エッジケース：最後の参加者の切断（通知対象なし、ルーム削除）

use std::sync::Arc;

use crate::domain::{OriginKey, Participant, RoomRegistry};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// Registry（ルーム管理の抽象化）
    registry: Arc<dyn RoomRegistry>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    /// 参加者切断を実行
    ///
    /// 参加者をルームから外し、空になったルームは削除される。
    pub async fn execute(&self, key: &OriginKey, participant: &Participant) {
        self.registry.leave(key, participant).await;
        tracing::debug!(
            "Participant {} disconnected from room '{}'",
            participant.id(),
            key
        );
    }
}
