//! SMAF 设备配置门户
//!
//! 平台无关的部分（配置存储、表单解析、页面渲染、连接循环）可以在主机上测试；
//! `platform` 模块提供 ESP-IDF 上的 NVS、SoftAP 和看门狗实现。

pub mod boards;
pub mod captive_portal;
pub mod config;
pub mod form;
pub mod settings;
pub mod validator;

#[cfg(target_os = "espidf")]
pub mod platform;
