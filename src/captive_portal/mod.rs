//! SoftAP + Web 配网模块
//!
//! 设备开启自己的无线热点，浏览器连接后访问任意地址都会得到同一个配置页面；
//! 提交表单后配置写入 NVS，设备随即重启。

mod handlers;
mod html;
pub mod protocol;
mod server;

pub use server::{AccessPoint, CaptivePortal, PollOutcome, PortalState};
