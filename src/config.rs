//! 配网门户的编译期配置
//!
//! 所有常量都可以在编译时通过环境变量覆盖，例如：
//! `SMAF_AP_SSID=MyDevice SMAF_PORTAL_PORT=8080 cargo build`

use std::time::Duration;

static AP_SSID: Option<&str> = std::option_env!("SMAF_AP_SSID");
static AP_PASS: Option<&str> = std::option_env!("SMAF_AP_PASS");
static PORTAL_PORT: Option<&str> = std::option_env!("SMAF_PORTAL_PORT");
static NVS_NAMESPACE: Option<&str> = std::option_env!("SMAF_NVS_NAMESPACE");

pub const DEFAULT_AP_SSID: &str = "SMAF-Config";
pub const DEFAULT_AP_PASS: &str = "smafconfig";
pub const DEFAULT_PORTAL_PORT: u16 = 80;
pub const DEFAULT_NAMESPACE: &str = "smaf";

/// SoftAP 启动后等待网络接口就绪的时间
pub const AP_SETTLE: Duration = Duration::from_millis(800);
/// 等待客户端发送请求行的最长时间
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);
/// 保存配置后、重启前的延迟，给响应留出发送时间
pub const RESTART_DELAY: Duration = Duration::from_secs(2);
/// 一次 `poll` 最长会阻塞：读请求行、排空连接、扫描网络和重启延迟
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub ap_ssid: String,
    pub ap_pass: String,
    pub port: u16,
    /// NVS 命名空间（最长 15 字节）
    pub namespace: String,
    pub settle: Duration,
    pub client_timeout: Duration,
    pub restart_delay: Duration,
    pub watchdog_timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        let port = PORTAL_PORT
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORTAL_PORT);

        Self {
            ap_ssid: AP_SSID.unwrap_or(DEFAULT_AP_SSID).to_string(),
            ap_pass: AP_PASS.unwrap_or(DEFAULT_AP_PASS).to_string(),
            port,
            namespace: NVS_NAMESPACE.unwrap_or(DEFAULT_NAMESPACE).to_string(),
            settle: AP_SETTLE,
            client_timeout: CLIENT_TIMEOUT,
            restart_delay: RESTART_DELAY,
            watchdog_timeout: WATCHDOG_TIMEOUT,
        }
    }
}
