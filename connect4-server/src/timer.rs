//! 定时器
//!
//! 定时器到期后把事件投递回服务的事件队列，与普通消息串行处理。
//! 取消只是尽力而为：事件可能已经在队列中，处理时需要用令牌检查是否过期。

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::server::Event;

/// 已安排的定时器
#[derive(Debug)]
pub struct TimerHandle {
    token: u64,
    abort: AbortHandle,
}

impl TimerHandle {
    /// 定时器令牌，与到期事件中携带的令牌一致
    pub fn token(&self) -> u64 {
        self.token
    }

    /// 取消定时器
    pub fn cancel(self) {
        self.abort.abort();
    }
}

/// 定时器调度器
#[derive(Debug)]
pub struct Scheduler {
    events: mpsc::UnboundedSender<Event>,
    next_token: u64,
}

impl Scheduler {
    pub fn new(events: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            events,
            next_token: 1,
        }
    }

    /// 在 `delay` 之后投递 `make_event(token)` 生成的事件
    pub fn schedule<F>(&mut self, delay: Duration, make_event: F) -> TimerHandle
    where
        F: FnOnce(u64) -> Event,
    {
        let token = self.next_token;
        self.next_token += 1;

        let event = make_event(token);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        });

        TimerHandle {
            token,
            abort: task.abort_handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        let handle = scheduler.schedule(Duration::from_secs(10), |token| Event::MatchmakingTimeout { token });
        let token = handle.token();

        match rx.recv().await {
            Some(Event::MatchmakingTimeout { token: fired }) => assert_eq!(fired, token),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_does_not_fire() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        let first = scheduler.schedule(Duration::from_secs(5), |token| Event::MatchmakingTimeout { token });
        let second = scheduler.schedule(Duration::from_secs(10), |token| Event::MatchmakingTimeout { token });
        assert_ne!(first.token(), second.token());
        let expected = second.token();
        first.cancel();

        match rx.recv().await {
            Some(Event::MatchmakingTimeout { token }) => assert_eq!(token, expected),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
