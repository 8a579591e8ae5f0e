//! 开发板相关的外部协作者：声光提示与重启

use crate::settings::ConfigurationSet;

#[cfg(target_os = "espidf")]
pub mod devkit;
#[cfg(target_os = "espidf")]
pub use devkit::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// 进入配网模式
    PortalStarted,
    /// 配置已保存，即将重启
    ConfigurationSaved,
}

/// 用户启用的提示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    pub audio: bool,
    pub visual: bool,
}

impl From<&ConfigurationSet> for Channels {
    fn from(config: &ConfigurationSet) -> Self {
        Self {
            audio: config.audio_notifications,
            visual: config.visual_notifications,
        }
    }
}

pub trait Board {
    /// 发出提示，只调用一次，不等待结果
    fn notify(&mut self, notification: Notification, channels: Channels);

    /// 重启设备；在真实硬件上不会返回
    fn restart(&mut self);
}
