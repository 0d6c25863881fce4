//! 服务器主逻辑
//!
//! 所有状态由单个服务任务持有，连接事件、定时器事件和查询都通过同一个
//! 事件队列串行处理，每个事件（包括随后的机器人落子）完整处理完才处理下一个。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use connect4_ai::MoveAdvisor;
use protocol::{Board, ClientMessage, LeaderboardSnapshot, Seat, ServerMessage};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::Timeouts;
use crate::connection::{ConnectionId, ConnectionManager};
use crate::game::{Match, MatchId, MoveOutcome, Outcome, Participant};
use crate::leaderboard::Leaderboard;
use crate::registry::{PendingPlayer, SessionRegistry};
use crate::timer::Scheduler;

/// 服务事件
#[derive(Debug)]
pub enum Event {
    /// 新连接
    Connected {
        conn: ConnectionId,
        tx: mpsc::UnboundedSender<ServerMessage>,
    },
    /// 收到客户端消息
    Message {
        conn: ConnectionId,
        msg: ClientMessage,
    },
    /// 连接断开
    Disconnected { conn: ConnectionId },
    /// 匹配等待超时
    MatchmakingTimeout { token: u64 },
    /// 断线宽限到期
    GraceExpired {
        match_id: MatchId,
        seat: Seat,
        token: u64,
    },
    /// 查询排行榜
    Leaderboard {
        reply: oneshot::Sender<LeaderboardSnapshot>,
    },
    /// 查询某玩家所在对局
    MatchSnapshot {
        username: String,
        reply: oneshot::Sender<Option<MatchSnapshot>>,
    },
    /// 查询服务统计
    Stats { reply: oneshot::Sender<ServerStats> },
}

/// 对局只读快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSnapshot {
    pub id: MatchId,
    pub board: Board,
    pub current_turn: Seat,
    pub is_bot_match: bool,
    pub player_order: [String; 2],
    /// 各座位是否在线（机器人视为不在线）
    pub connected: [bool; 2],
}

impl From<&Match> for MatchSnapshot {
    fn from(m: &Match) -> Self {
        Self {
            id: m.id,
            board: m.board.clone(),
            current_turn: m.current_turn,
            is_bot_match: m.is_bot_match,
            player_order: [
                m.participant(Seat::PlayerOne).name().to_string(),
                m.participant(Seat::PlayerTwo).name().to_string(),
            ],
            connected: [
                m.connection(Seat::PlayerOne).is_some(),
                m.connection(Seat::PlayerTwo).is_some(),
            ],
        }
    }
}

/// 服务统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerStats {
    pub connections: usize,
    pub active_matches: usize,
    pub pending: bool,
}

/// 服务器状态
pub struct ServerState {
    pub connections: ConnectionManager,
    pub registry: SessionRegistry,
    pub leaderboard: Leaderboard,
    scheduler: Scheduler,
    timeouts: Timeouts,
}

impl ServerState {
    pub fn new(timeouts: Timeouts, events: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            connections: ConnectionManager::new(),
            registry: SessionRegistry::new(),
            leaderboard: Leaderboard::new(),
            scheduler: Scheduler::new(events),
            timeouts,
        }
    }
}

/// 待发送的消息
///
/// 处理过程中先收集，事件处理结束后统一发出。
struct PendingMessages {
    messages: Vec<(ConnectionId, ServerMessage)>,
}

impl PendingMessages {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    fn send(&mut self, conn: ConnectionId, msg: ServerMessage) {
        self.messages.push((conn, msg));
    }

    /// 发给对局中所有在线的参与者
    fn broadcast(&mut self, m: &Match, msg: ServerMessage) {
        for conn in m.connections() {
            self.messages.push((conn, msg.clone()));
        }
    }

    fn flush(self, connections: &ConnectionManager) {
        for (conn, msg) in self.messages {
            if !connections.send(conn, msg) {
                debug!(conn, "连接已关闭，丢弃消息");
            }
        }
    }
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理一个事件
    pub fn handle(state: &mut ServerState, event: Event) {
        let mut pending = PendingMessages::new();

        match event {
            Event::Connected { conn, tx } => {
                debug!(conn, "新连接");
                state.connections.register(conn, tx);
            }
            Event::Message { conn, msg } => match msg {
                ClientMessage::Join { username } => {
                    Self::handle_join(state, &mut pending, conn, username)
                }
                ClientMessage::Move { column } => {
                    Self::handle_move(state, &mut pending, conn, column)
                }
            },
            Event::Disconnected { conn } => Self::handle_disconnect(state, conn),
            Event::MatchmakingTimeout { token } => {
                Self::handle_matchmaking_timeout(state, &mut pending, token)
            }
            Event::GraceExpired {
                match_id,
                seat,
                token,
            } => Self::handle_grace_expired(state, &mut pending, match_id, seat, token),
            Event::Leaderboard { reply } => {
                let _ = reply.send(state.leaderboard.snapshot());
            }
            Event::MatchSnapshot { username, reply } => {
                let snapshot = state
                    .registry
                    .find_by_username(&username)
                    .and_then(|(id, _)| state.registry.get(id))
                    .map(MatchSnapshot::from);
                let _ = reply.send(snapshot);
            }
            Event::Stats { reply } => {
                let _ = reply.send(ServerStats {
                    connections: state.connections.count(),
                    active_matches: state.registry.match_count(),
                    pending: state.registry.pending().is_some(),
                });
            }
        }

        pending.flush(&state.connections);
    }

    /// 处理 join：先尝试重连，否则进入匹配
    fn handle_join(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        conn: ConnectionId,
        username: String,
    ) {
        if !state.connections.exists(conn) {
            return;
        }

        // 重连：在所有对局中按用户名查找
        if let Some((match_id, seat)) = state.registry.find_by_username(&username) {
            Self::detach_connection(state, conn, (match_id, seat));
            let Some(m) = state.registry.get_mut(match_id) else {
                return;
            };
            if let Some(timer) = m.bind_connection(seat, conn) {
                timer.cancel();
            }
            state.connections.set_username(conn, &username);
            state.connections.bind(conn, match_id, seat);
            pending.send(
                conn,
                ServerMessage::Reconnected {
                    board: m.board.clone(),
                },
            );
            info!(%match_id, username = %username, ?seat, "玩家重连");
            return;
        }

        if state.registry.pending().is_some_and(|p| p.conn == conn) {
            debug!(conn, "已在等待匹配，忽略重复 join");
            return;
        }
        if let Some((match_id, _)) = state.connections.get(conn).and_then(|c| c.binding) {
            if state.registry.get(match_id).is_some() {
                debug!(conn, %match_id, "连接已在对局中，忽略 join");
                return;
            }
        }

        state.connections.set_username(conn, &username);

        // 等待位有人则立即配对
        if let Some(waiting) = state.registry.take_pending() {
            waiting.timer.cancel();
            info!(first = %waiting.username, second = %username, "匹配成功");
            let m = Match::new_pvp((waiting.username, waiting.conn), (username, conn));
            Self::start_match(state, pending, m);
            return;
        }

        let timer = state
            .scheduler
            .schedule(state.timeouts.matchmaking, |token| Event::MatchmakingTimeout { token });
        let player = PendingPlayer {
            conn,
            username,
            timer,
        };
        info!(username = %player.username, "玩家进入匹配等待");
        if let Err(player) = state.registry.set_pending(player) {
            warn!(username = %player.username, "等待位已被占用");
            player.timer.cancel();
        }
    }

    /// 匹配超时：仍在等待则与机器人对战
    fn handle_matchmaking_timeout(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        token: u64,
    ) {
        let Some(waiting) = state.registry.take_pending_if(token) else {
            debug!(token, "匹配计时器已过期");
            return;
        };

        info!(username = %waiting.username, "匹配超时，开始人机对局");
        let m = Match::new_bot(waiting.username, waiting.conn);
        Self::start_match(state, pending, m);
    }

    /// 注册对局并通知双方
    fn start_match(state: &mut ServerState, pending: &mut PendingMessages, m: Match) {
        for seat in [Seat::PlayerOne, Seat::PlayerTwo] {
            if let Some(conn) = m.connection(seat) {
                state.connections.bind(conn, m.id, seat);
            }
        }
        pending.broadcast(
            &m,
            ServerMessage::Start {
                board: m.board.clone(),
            },
        );
        info!(
            match_id = %m.id,
            player_one = %m.participant(Seat::PlayerOne).name(),
            player_two = %m.participant(Seat::PlayerTwo).name(),
            bot = m.is_bot_match,
            "对局开始"
        );
        state.registry.insert(m);
    }

    /// 处理落子
    fn handle_move(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        conn: ConnectionId,
        column: usize,
    ) {
        let Some((match_id, seat)) = state.connections.get(conn).and_then(|c| c.binding) else {
            debug!(conn, "连接不在对局中，忽略落子");
            return;
        };
        let Some(m) = state.registry.get_mut(match_id) else {
            return;
        };

        let outcome = match m.apply_move(seat, column) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(%match_id, ?seat, column, "落子被拒绝: {}", e);
                return;
            }
        };
        debug!(%match_id, ?seat, column, "落子");

        if Self::settle_move(state, pending, match_id, seat, outcome) {
            Self::play_bot_turn(state, pending, match_id);
        }
    }

    /// 落子后的结算，返回对局是否继续
    fn settle_move(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        match_id: MatchId,
        seat: Seat,
        outcome: MoveOutcome,
    ) -> bool {
        match outcome {
            MoveOutcome::Won(_) => {
                Self::finish_match(state, pending, match_id, Outcome::Win(seat));
                false
            }
            MoveOutcome::Draw => {
                Self::finish_match(state, pending, match_id, Outcome::Draw);
                false
            }
            MoveOutcome::Continue => {
                if let Some(m) = state.registry.get(match_id) {
                    pending.broadcast(
                        m,
                        ServerMessage::Update {
                            board: m.board.clone(),
                        },
                    );
                }
                true
            }
        }
    }

    /// 人机对局中轮到机器人时立即落子
    fn play_bot_turn(state: &mut ServerState, pending: &mut PendingMessages, match_id: MatchId) {
        let Some(m) = state.registry.get_mut(match_id) else {
            return;
        };
        if !m.is_bot_turn() {
            return;
        }
        let bot_seat = m.current_turn;

        let Some(column) = MoveAdvisor::new(bot_seat).choose_column(&m.board) else {
            info!(%match_id, "机器人无子可下");
            Self::finish_match(state, pending, match_id, Outcome::Draw);
            return;
        };

        match m.apply_move(bot_seat, column) {
            Ok(outcome) => {
                debug!(%match_id, column, "机器人落子");
                Self::settle_move(state, pending, match_id, bot_seat, outcome);
            }
            Err(e) => warn!(%match_id, column, "机器人落子失败: {}", e),
        }
    }

    /// 重连前让连接离开原先的等待位或座位，一个连接只属于一个对局
    fn detach_connection(state: &mut ServerState, conn: ConnectionId, target: (MatchId, Seat)) {
        if let Some(waiting) = state.registry.take_pending_for(conn) {
            debug!(conn, username = %waiting.username, "连接改为重连，离开匹配等待");
            waiting.timer.cancel();
        }

        let Some(binding) = state.connections.get(conn).and_then(|c| c.binding) else {
            return;
        };
        if binding == target {
            return;
        }
        let (match_id, seat) = binding;
        debug!(conn, %match_id, ?seat, "连接改为重连，离开原对局");
        Self::release_seat(state, conn, match_id, seat);
    }

    /// 处理连接断开
    fn handle_disconnect(state: &mut ServerState, conn: ConnectionId) {
        let Some(client) = state.connections.remove(conn) else {
            return;
        };

        if let Some(waiting) = state.registry.take_pending_for(conn) {
            info!(username = %waiting.username, "等待匹配的玩家断开");
            waiting.timer.cancel();
            return;
        }

        match client.binding {
            Some((match_id, seat)) => Self::release_seat(state, conn, match_id, seat),
            None => debug!(conn, "连接断开"),
        }
    }

    /// 座位失去连接，开始断线宽限计时
    fn release_seat(state: &mut ServerState, conn: ConnectionId, match_id: MatchId, seat: Seat) {
        let Some(m) = state.registry.get_mut(match_id) else {
            return;
        };
        if !m.unbind_connection(seat, conn) {
            // 该座位已由新连接接管
            return;
        }

        let timer = state
            .scheduler
            .schedule(state.timeouts.reconnect, |token| Event::GraceExpired {
                match_id,
                seat,
                token,
            });
        m.arm_grace_timer(seat, timer);
        info!(
            %match_id,
            username = %m.participant(seat).name(),
            timeout_secs = state.timeouts.reconnect.as_secs(),
            "玩家断线，等待重连"
        );
    }

    /// 断线宽限到期：对手判胜
    fn handle_grace_expired(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        match_id: MatchId,
        seat: Seat,
        token: u64,
    ) {
        let current = state.registry.get(match_id).and_then(|m| m.grace_token(seat));
        if current != Some(token) {
            debug!(%match_id, ?seat, "断线计时器已过期");
            return;
        }

        Self::finish_match(state, pending, match_id, Outcome::Forfeit(seat.opponent()));
    }

    /// 结束对局：移除、广播结果、记录胜场
    fn finish_match(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        match_id: MatchId,
        outcome: Outcome,
    ) {
        let Some(mut m) = state.registry.remove(match_id) else {
            return;
        };
        m.cancel_timers();
        state.connections.unbind_match(match_id);

        let result = m.result(outcome);
        pending.broadcast(
            &m,
            ServerMessage::GameOver {
                board: m.board.clone(),
                result: result.to_string(),
            },
        );

        if let Some(Participant::Human(winner)) = outcome.winner().map(|seat| m.participant(seat)) {
            let wins = state.leaderboard.record_win(winner);
            debug!(winner = %winner, wins, "记录胜场");
        }

        let duration = Utc::now() - m.created_at;
        info!(
            %match_id,
            result = %result,
            duration_secs = duration.num_seconds(),
            "对局结束"
        );
    }
}

/// 对局服务：持有全部状态并串行处理事件
pub struct GameService {
    state: ServerState,
    events: mpsc::UnboundedReceiver<Event>,
}

impl GameService {
    /// 创建服务及其句柄
    pub fn new(timeouts: Timeouts) -> (Self, ServiceHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            state: ServerState::new(timeouts, tx.clone()),
            events: rx,
        };
        let handle = ServiceHandle {
            events: tx,
            next_conn_id: Arc::new(AtomicU64::new(1)),
        };
        (service, handle)
    }

    /// 在后台任务中运行服务
    pub fn spawn(timeouts: Timeouts) -> ServiceHandle {
        let (service, handle) = Self::new(timeouts);
        tokio::spawn(service.run());
        handle
    }

    /// 事件循环
    pub async fn run(mut self) {
        info!("对局服务已启动");
        while let Some(event) = self.events.recv().await {
            MessageHandler::handle(&mut self.state, event);
        }
        info!("对局服务已停止");
    }
}

/// 服务句柄，可在各连接任务之间克隆共享
#[derive(Clone)]
pub struct ServiceHandle {
    events: mpsc::UnboundedSender<Event>,
    next_conn_id: Arc<AtomicU64>,
}

impl ServiceHandle {
    fn submit(&self, event: Event) {
        if self.events.send(event).is_err() {
            warn!("对局服务已停止，丢弃事件");
        }
    }

    /// 注册新连接，返回连接 ID 和发往该连接的消息接收端
    pub fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let conn = self.next_conn_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.submit(Event::Connected { conn, tx });
        (conn, rx)
    }

    /// 转交客户端消息
    pub fn message(&self, conn: ConnectionId, msg: ClientMessage) {
        self.submit(Event::Message { conn, msg });
    }

    /// 连接断开
    pub fn disconnect(&self, conn: ConnectionId) {
        self.submit(Event::Disconnected { conn });
    }

    /// 排行榜快照
    pub async fn leaderboard(&self) -> Result<LeaderboardSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.submit(Event::Leaderboard { reply });
        rx.await.context("对局服务未响应")
    }

    /// 某玩家所在对局的快照
    pub async fn match_snapshot(&self, username: &str) -> Result<Option<MatchSnapshot>> {
        let (reply, rx) = oneshot::channel();
        self.submit(Event::MatchSnapshot {
            username: username.to_string(),
            reply,
        });
        rx.await.context("对局服务未响应")
    }

    /// 服务统计
    pub async fn stats(&self) -> Result<ServerStats> {
        let (reply, rx) = oneshot::channel();
        self.submit(Event::Stats { reply });
        rx.await.context("对局服务未响应")
    }
}
