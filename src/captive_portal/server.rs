//! SoftAP 生命周期和连接循环

use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};

use crate::boards::{Board, Channels, Notification};
use crate::config::PortalConfig;
use crate::settings::{SettingsStore, Storage, AUDIO_NOTIFICATIONS, VISUAL_NOTIFICATIONS};

use super::protocol;

/// 提供 SoftAP 和网络扫描的无线模块
pub trait AccessPoint {
    /// 启动 AP，返回分配到的网关 IP
    fn start(&mut self, ssid: &str, password: &str) -> anyhow::Result<Option<Ipv4Addr>>;

    /// 当前可见的网络名称
    fn scan(&mut self) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalState {
    Idle,
    Listening,
    AwaitingClient,
    Rendering,
    SubmissionReceived,
    NoSubmission,
}

/// 一次 `poll` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// 没有待处理的连接
    Idle,
    /// 客户端连接后没有发送请求行（超时、断开或读取出错）
    NoRequest,
    /// 已返回配置页面
    Served,
    /// 已保存提交的配置并触发重启
    Restarting,
}

pub struct CaptivePortal<S: Storage, A: AccessPoint, B: Board> {
    pub(super) config: PortalConfig,
    pub(super) store: SettingsStore<S>,
    pub(super) ap: A,
    pub(super) board: B,
    listener: Option<TcpListener>,
    ap_ip: Option<Ipv4Addr>,
    state: PortalState,
}

impl<S: Storage, A: AccessPoint, B: Board> CaptivePortal<S, A, B> {
    pub fn new(config: PortalConfig, store: SettingsStore<S>, ap: A, board: B) -> Self {
        Self {
            config,
            store,
            ap,
            board,
            listener: None,
            ap_ip: None,
            state: PortalState::Idle,
        }
    }

    /// 启动 SoftAP 并开始监听
    pub fn start(&mut self) -> anyhow::Result<()> {
        self.ap_ip = self.ap.start(&self.config.ap_ssid, &self.config.ap_pass)?;
        std::thread::sleep(self.config.settle);

        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, self.config.port))?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();
        self.listener = Some(listener);

        log::info!("SoftAP started: {}", or_null(&self.config.ap_ssid));
        log::info!("SoftAP password: {}", or_null(&self.config.ap_pass));
        log::info!(
            "Portal listening on {}:{}",
            self.ap_ip.unwrap_or(Ipv4Addr::UNSPECIFIED),
            port
        );

        let channels = Channels {
            audio: self.store.get_bool(AUDIO_NOTIFICATIONS),
            visual: self.store.get_bool(VISUAL_NOTIFICATIONS),
        };
        self.board.notify(Notification::PortalStarted, channels);

        self.transition(PortalState::Listening);
        Ok(())
    }

    pub fn state(&self) -> PortalState {
        self.state
    }

    pub fn ap_ip(&self) -> Option<Ipv4Addr> {
        self.ap_ip
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn store(&self) -> &SettingsStore<S> {
        &self.store
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    /// 处理至多一个客户端，没有连接时立即返回
    ///
    /// 只有监听套接字本身出错时才返回错误；单个客户端的错误记录日志后丢弃。
    pub fn poll(&mut self) -> anyhow::Result<PollOutcome> {
        let accepted = match self.listener.as_ref() {
            Some(listener) => listener.accept(),
            None => anyhow::bail!("captive portal is not started"),
        };
        self.transition(PortalState::Listening);

        let (stream, peer) = match accepted {
            Ok(client) => client,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Ok(PollOutcome::Idle);
            }
            Err(e) => {
                self.transition(PortalState::Idle);
                return Err(e.into());
            }
        };

        log::info!("Client connected: {}", peer);
        self.transition(PortalState::AwaitingClient);

        let request = match protocol::read_request_line(&stream, self.config.client_timeout) {
            Ok(Some(request)) => request,
            Ok(None) => {
                log::info!("Client {} closed without sending a request", peer);
                self.transition(PortalState::Idle);
                return Ok(PollOutcome::NoRequest);
            }
            Err(e) if protocol::is_timeout(&e) => {
                log::warn!(
                    "Client {} sent nothing within {:?}",
                    peer,
                    self.config.client_timeout
                );
                self.transition(PortalState::Idle);
                return Ok(PollOutcome::NoRequest);
            }
            Err(e) => {
                log::warn!("Failed to read request from {}: {}", peer, e);
                self.transition(PortalState::Idle);
                return Ok(PollOutcome::NoRequest);
            }
        };

        log::info!("Request: {}", request.path());
        let outcome = self.handle_request(stream, &request);
        self.transition(PortalState::Idle);
        Ok(outcome)
    }

    pub(super) fn transition(&mut self, next: PortalState) {
        if self.state != next {
            log::debug!("Portal state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

fn or_null(value: &str) -> &str {
    if value.is_empty() {
        "NULL"
    } else {
        value
    }
}
