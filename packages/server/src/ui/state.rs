//! Server state shared by all handlers.

use std::sync::Arc;

use crate::{
    config::ChatConfig,
    domain::RoomRegistry,
    usecase::{ConnectParticipantUseCase, DisconnectParticipantUseCase, SendMessageUseCase},
};

use super::shutdown::ConnectionDrain;

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// Registry（ルーム管理の抽象化）
    pub registry: Arc<dyn RoomRegistry>,
    pub config: ChatConfig,
    /// 接続タスクの追跡と停止通知
    pub drain: ConnectionDrain,
}
