//! 配置完整性检查
//!
//! 只决定设备启动时是否需要进入配网模式，不会阻止保存不完整的表单。

use crate::settings::{ConfigurationSet, MQTT_SERVER_PORT, TEXT_SENTINEL};

/// 所有文本字段非空且不是 `"Unknown"`，并且端口非 0
pub fn is_valid(config: &ConfigurationSet) -> bool {
    missing_fields(config).is_empty()
}

/// 未配置的键名，仅用于日志
pub fn missing_fields(config: &ConfigurationSet) -> Vec<&'static str> {
    let mut missing: Vec<&'static str> = config
        .text_fields()
        .into_iter()
        .filter(|(_, value)| value.is_empty() || *value == TEXT_SENTINEL)
        .map(|(key, _)| key)
        .collect();

    if config.mqtt_server_port == 0 {
        missing.push(MQTT_SERVER_PORT);
    }

    missing
}
