//! 双通道通知器 - 编排层
//!
//! ## 职责
//!
//! 把任务事件推送给所有订阅了该任务的在线连接；拉取查询由 `JobOrchestrator::get_status`
//! 负责。两条通道读写的是同一份任务记录：
//!
//! - 编排层在持有队列锁时先修改任务、再调用 [`Notifier::publish`]
//! - 订阅时的补发事件也在同一把锁内生成
//!
//! 因此客户端拉到的状态永远不会比它最后收到的推送更旧。
//!
//! 关联关系一律以 `JobId` 为准；连接令牌在重连后会变化，不做任何持久化。

use crate::error::NotifierError;
use crate::models::{JobId, JobKind, JobSnapshot, JobStatus, ScoreMap};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// 在线连接的临时令牌
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionToken(String);

impl ConnectionToken {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Display for ConnectionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 推送给客户端的任务事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum JobEvent {
    /// 仍在排队，前面还有 `position` 个任务
    Queued { position: usize },
    StartedProcessing,
    Progress { percent: u8 },
    Complete {
        #[serde(rename = "type")]
        kind: JobKind,
        results: Arc<ScoreMap>,
    },
    Failed { reason: String },
}

impl JobEvent {
    /// 事件所描述的任务状态
    pub fn status(&self) -> JobStatus {
        match self {
            JobEvent::Queued { .. } => JobStatus::Queued,
            JobEvent::StartedProcessing | JobEvent::Progress { .. } => JobStatus::Processing,
            JobEvent::Complete { .. } => JobStatus::Complete,
            JobEvent::Failed { .. } => JobStatus::Failed,
        }
    }

    /// 由快照生成"当前状态"事件，用于订阅时补发
    pub fn from_snapshot(snapshot: &JobSnapshot) -> Self {
        match snapshot.state {
            JobStatus::Queued => JobEvent::Queued {
                position: snapshot.queue_position.unwrap_or(0),
            },
            JobStatus::Processing => JobEvent::Progress {
                percent: snapshot.progress_percent.unwrap_or(0),
            },
            JobStatus::Complete => JobEvent::Complete {
                kind: snapshot.kind,
                results: snapshot.results.clone().unwrap_or_default(),
            },
            JobStatus::Failed => JobEvent::Failed {
                reason: snapshot.error_reason.clone().unwrap_or_default(),
            },
        }
    }
}

/// 一条推送消息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub job_id: JobId,
    #[serde(flatten)]
    pub event: JobEvent,
}

struct Connection {
    sender: mpsc::UnboundedSender<PushMessage>,
    jobs: HashSet<JobId>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionToken, Connection>,
    subscribers: HashMap<JobId, HashSet<ConnectionToken>>,
}

impl Registry {
    fn detach(&mut self, token: &ConnectionToken, job_id: &JobId) {
        if let Some(tokens) = self.subscribers.get_mut(job_id) {
            tokens.remove(token);
            if tokens.is_empty() {
                self.subscribers.remove(job_id);
            }
        }
    }

    fn remove_connection(&mut self, token: &ConnectionToken) -> bool {
        let Some(connection) = self.connections.remove(token) else {
            return false;
        };
        for job_id in &connection.jobs {
            self.detach(token, job_id);
        }
        true
    }
}

/// 在线连接注册表 + 事件分发
#[derive(Default)]
pub struct Notifier {
    registry: Mutex<Registry>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个新的在线连接
    pub fn connect(&self) -> (ConnectionToken, mpsc::UnboundedReceiver<PushMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let token = ConnectionToken::generate();
        self.registry.lock().connections.insert(
            token.clone(),
            Connection {
                sender,
                jobs: HashSet::new(),
            },
        );
        debug!("连接 {} 已建立", token);
        (token, receiver)
    }

    /// 连接断开：移除该连接及其全部订阅
    pub fn disconnect(&self, token: &ConnectionToken) {
        if self.registry.lock().remove_connection(token) {
            debug!("连接 {} 已断开", token);
        }
    }

    #[cfg(test)]
    fn is_connected(&self, token: &ConnectionToken) -> bool {
        self.registry.lock().connections.contains_key(token)
    }

    pub fn subscriber_count(&self, job_id: &JobId) -> usize {
        self.registry
            .lock()
            .subscribers
            .get(job_id)
            .map_or(0, HashSet::len)
    }

    /// 订阅任务并立即补发 `current` 事件
    ///
    /// 调用方必须持有队列锁，并且 `current` 来自同一把锁内的快照。
    /// 任务已结束时只补发结果，不再保留订阅。
    pub(crate) fn attach(
        &self,
        token: &ConnectionToken,
        job_id: &JobId,
        current: JobEvent,
    ) -> Result<(), NotifierError> {
        let mut registry = self.registry.lock();
        let terminal = current.status().is_terminal();

        let connection =
            registry
                .connections
                .get_mut(token)
                .ok_or_else(|| NotifierError::UnknownConnection {
                    token: token.to_string(),
                })?;

        let message = PushMessage {
            job_id: job_id.clone(),
            event: current,
        };
        if connection.sender.send(message).is_err() {
            registry.remove_connection(token);
            return Err(NotifierError::UnknownConnection {
                token: token.to_string(),
            });
        }

        if !terminal {
            connection.jobs.insert(job_id.clone());
            registry
                .subscribers
                .entry(job_id.clone())
                .or_default()
                .insert(token.clone());
        }
        Ok(())
    }

    /// 向该任务的所有订阅者推送事件，返回成功送达的连接数
    ///
    /// 接收端已关闭的连接会被顺手清理；终态事件送达后该任务的订阅全部解除。
    pub(crate) fn publish(&self, job_id: &JobId, event: JobEvent) -> usize {
        let mut registry = self.registry.lock();
        let Some(tokens) = registry.subscribers.get(job_id).cloned() else {
            return 0;
        };

        let terminal = event.status().is_terminal();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for token in &tokens {
            let Some(connection) = registry.connections.get(token) else {
                continue;
            };
            let message = PushMessage {
                job_id: job_id.clone(),
                event: event.clone(),
            };
            if connection.sender.send(message).is_ok() {
                delivered += 1;
            } else {
                closed.push(token.clone());
            }
        }

        for token in &closed {
            registry.remove_connection(token);
        }

        if terminal {
            registry.subscribers.remove(job_id);
            for token in &tokens {
                if let Some(connection) = registry.connections.get_mut(token) {
                    connection.jobs.remove(job_id);
                }
            }
        }

        delivered
    }

    /// 任务被清理时解除所有相关订阅
    pub(crate) fn forget_job(&self, job_id: &JobId) {
        let mut registry = self.registry.lock();
        if let Some(tokens) = registry.subscribers.remove(job_id) {
            for token in tokens {
                if let Some(connection) = registry.connections.get_mut(&token) {
                    connection.jobs.remove(job_id);
                }
            }
        }
    }
}
