//! 表单字段解析
//!
//! 浏览器以 GET 查询参数提交表单，所有数据都在请求行里：
//! `GET /configuration?netName=Home+Wifi&mqttSrvPort=1883 HTTP/1.1`

use crate::settings::{
    ConfigurationSet, AUDIO_NOTIFICATIONS, MQTT_CLIENT_ID, MQTT_PASS, MQTT_SERVER_ADDRESS,
    MQTT_SERVER_PORT, MQTT_TOPIC, MQTT_USERNAME, NETWORK_NAME, NETWORK_PASS,
    VISUAL_NOTIFICATIONS,
};

/// 取出字段值并解码；字段不存在时返回空字符串
///
/// 值从 `=` 之后开始，到 `&`、`" HTTP"` 或行尾中最先出现的位置结束。
pub fn extract_field(line: &str, name: &str) -> String {
    let Some(start) = value_start(line, name) else {
        return String::new();
    };

    let rest = &line[start..];
    let end = [rest.find('&'), rest.find(" HTTP")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len());

    let raw = &rest[..end];
    if raw.is_empty() {
        return String::new();
    }

    blank_to_empty(url_decode(raw))
}

/// 复选框字段：出现即为选中
pub fn has_field(line: &str, name: &str) -> bool {
    value_start(line, name).is_some()
}

/// `name=` 之后第一个字节的位置；字段名必须位于参数边界上
fn value_start(line: &str, name: &str) -> Option<usize> {
    let pattern = format!("{}=", name);
    let bytes = line.as_bytes();
    let mut from = 0;

    while let Some(pos) = line[from..].find(&pattern) {
        let at = from + pos;
        if at == 0 || matches!(bytes[at - 1], b'?' | b'&') {
            return Some(at + pattern.len());
        }
        from = at + pattern.len();
    }

    None
}

/// URL 解码：`+` 转为空格，`%XY` 转为对应字节
///
/// 末尾不完整的 `%` 序列会终止解码，之后的内容全部丢弃。
pub fn url_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let (Some(&hi), Some(&lo)) = (bytes.get(i + 1), bytes.get(i + 2)) else {
                    break;
                };
                decoded.push(hex_value(hi) * 16 + hex_value(lo));
                i += 3;
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            b => {
                decoded.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

// 非十六进制字符按 0 处理
fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

/// 全部由空格组成时返回空字符串，否则原样返回
///
/// 注意这不是首尾裁剪：`" a "` 会保持不变。
pub fn blank_to_empty(value: String) -> String {
    if !value.is_empty() && value.bytes().all(|b| b == b' ') {
        String::new()
    } else {
        value
    }
}

/// 解析端口号，无法解析或超出 `u16` 范围时返回 0
///
/// 与 `atol` 一致：跳过前导空白，接受可选符号，读到第一个非数字字符为止。
pub fn parse_port(text: &str) -> u16 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: u32 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value * 10 + u32::from(b - b'0');
        if value > u32::from(u16::MAX) {
            return 0;
        }
    }

    if negative && value != 0 {
        return 0;
    }

    // value 已经限制在 u16 范围内
    value as u16
}

/// 从提交的请求行构造完整配置
///
/// 缺失的文本字段为空字符串，缺失的端口为 0，缺失的复选框为 false。
pub fn parse_submission(line: &str) -> ConfigurationSet {
    ConfigurationSet {
        network_name: extract_field(line, NETWORK_NAME),
        network_pass: extract_field(line, NETWORK_PASS),
        mqtt_server_address: extract_field(line, MQTT_SERVER_ADDRESS),
        mqtt_server_port: parse_port(&extract_field(line, MQTT_SERVER_PORT)),
        mqtt_username: extract_field(line, MQTT_USERNAME),
        mqtt_pass: extract_field(line, MQTT_PASS),
        mqtt_client_id: extract_field(line, MQTT_CLIENT_ID),
        mqtt_topic: extract_field(line, MQTT_TOPIC),
        audio_notifications: has_field(line, AUDIO_NOTIFICATIONS),
        visual_notifications: has_field(line, VISUAL_NOTIFICATIONS),
    }
}
