//! 配置页面渲染

use crate::settings::{
    ConfigurationSet, AUDIO_NOTIFICATIONS, MQTT_CLIENT_ID, MQTT_PASS, MQTT_SERVER_ADDRESS,
    MQTT_SERVER_PORT, MQTT_TOPIC, MQTT_USERNAME, NETWORK_NAME, NETWORK_PASS, TEXT_SENTINEL,
    VISUAL_NOTIFICATIONS,
};

use super::protocol::SUBMISSION_MARKER;

const STYLE: &str = r#"<style>
* { font-family: system-ui, sans-serif; font-size: 14px; line-height: 1.5; color: #202326; margin: 0; padding: 0; box-sizing: border-box; outline: none; list-style: none; word-wrap: anywhere; }
body { display: flex; flex-direction: column; align-items: center; }
header, section, .frame-primary, .frame-secondary, form { display: flex; flex-direction: column; gap: 20px; }
.frame-secondary { gap: 4px; }
.frame-horizontal { gap: 20px; display: flex; flex-direction: row; justify-content: space-between; flex-wrap: wrap; }
form { margin: 40px 24px 120px; max-width: 440px; }
h1 { font-size: 2.074rem; font-weight: 700; line-height: 1.15; }
h2 { font-size: 1.44rem; font-weight: 630; margin-top: 28px; line-height: 1.15; }
span { font-weight: 550; }
input[type='text'] { font-family: monospace, sans-serif; padding: 12px; border: none; box-shadow: 0 0 0 1px #D7DFE8; }
input[type='text']:focus { box-shadow: 0 0 0 2px #0180FF; }
input[type='submit'] { border: none; padding: 12px 24px; background: #00CC22; font-weight: 550; color: #FFFFFF; cursor: pointer; flex-grow: 2; }
input[type='reset'] { border: 1px solid #D7DFE8; padding: 12px 24px; background: none; font-weight: 550; cursor: pointer; flex-grow: 1; }
section { border-left: 3px solid #D7DFE8; padding: 16px 20px; }
section.success { border-color: #00CC22; background: #F2FFF4; color: #004D0D; }
section.info { border-color: #0180FF; background: #F2F9FF; color: #003366; }
</style>"#;

pub struct PageContext<'a> {
    /// 本次提交的配置，存在时显示保存成功提示
    pub saved: Option<&'a ConfigurationSet>,
    /// 用于预填表单的当前配置
    pub current: &'a ConfigurationSet,
    /// 扫描到的网络名称
    pub networks: &'a [String],
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// 未配置的默认值显示为空输入框
fn prefill(value: &str) -> &str {
    if value == TEXT_SENTINEL {
        ""
    } else {
        value
    }
}

fn text_input(key: &str, label: &str, value: &str, extra: &str) -> String {
    format!(
        "<div class='frame-secondary'><label for='{key}'>{label}</label><input id='{key}' type='text' name='{key}' value='{value}' placeholder='Not configured'{extra}></div>",
        key = key,
        label = label,
        value = escape(prefill(value)),
        extra = extra,
    )
}

fn checkbox(key: &str, label: &str, checked: bool) -> String {
    format!(
        "<div class='frame-horizontal'><label for='{key}'>{label}</label><input id='{key}' type='checkbox' name='{key}' value='on'{checked}></div>",
        key = key,
        label = label,
        checked = if checked { " checked" } else { "" },
    )
}

fn success_banner(saved: &ConfigurationSet) -> String {
    let shown = saved.redacted();
    let mut html = String::new();

    html.push_str("<section class='success'>");
    html.push_str("<p>Configuration successfully saved to device. Data saved in device memory is shown below.</p><ul>");
    let rows = [
        ("SSID Name", shown.network_name.clone()),
        ("SSID Password", shown.network_pass.clone()),
        ("MQTT Server", shown.mqtt_server_address.clone()),
        ("MQTT Port", shown.mqtt_server_port.to_string()),
        ("MQTT Username", shown.mqtt_username.clone()),
        ("MQTT Password", shown.mqtt_pass.clone()),
        ("MQTT Client ID", shown.mqtt_client_id.clone()),
        ("MQTT Topic", shown.mqtt_topic.clone()),
        ("Audio notifications", on_off(shown.audio_notifications).to_string()),
        ("Visual notifications", on_off(shown.visual_notifications).to_string()),
    ];
    for (label, value) in rows {
        html.push_str(&format!("<li><span>{}: </span>{}</li>", label, escape(&value)));
    }
    html.push_str("</ul>");
    html.push_str("<p>Device will now reboot and try to connect to the configured SSID and connection with this page will be lost.</p>");
    html.push_str("</section>");
    html.push_str("<section class='info'><p>To start the configuration again, restart the device while holding the quick config button on the development board.</p></section>");

    html
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

pub fn render_page(ctx: &PageContext<'_>) -> String {
    let current = ctx.current;
    let mut html = String::with_capacity(8 * 1024);

    html.push_str("<!DOCTYPE html><html lang='en'><head>");
    html.push_str("<meta charset='UTF-8'><meta name='viewport' content='width=device-width, initial-scale=1.0, user-scalable=no'>");
    html.push_str("<title>Device configuration</title>");
    html.push_str(STYLE);
    html.push_str("</head><body>");
    html.push_str(&format!("<form action='{}' method='get'>", SUBMISSION_MARKER));
    html.push_str("<header><h1>Device<br>configuration</h1></header>");

    if let Some(saved) = ctx.saved {
        html.push_str(&success_banner(saved));
    }

    html.push_str("<h2>WiFi router<br>configuration</h2>");
    html.push_str("<p>Select the wireless network (SSID) the device should join and enter its password.</p>");
    html.push_str("<div class='frame-primary'>");
    html.push_str(&text_input(
        NETWORK_NAME,
        "SSID Name:",
        &current.network_name,
        " list='networks'",
    ));
    html.push_str("<datalist id='networks'>");
    for name in ctx.networks {
        html.push_str(&format!("<option value='{}'></option>", escape(name)));
    }
    html.push_str("</datalist>");
    html.push_str(&text_input(NETWORK_PASS, "SSID Password:", &current.network_pass, ""));
    html.push_str("</div>");

    let port = if current.mqtt_server_port == 0 {
        String::new()
    } else {
        current.mqtt_server_port.to_string()
    };

    html.push_str("<h2>MQTT server<br>configuration</h2>");
    html.push_str("<p>Broker address, port and authentication details.</p>");
    html.push_str("<div class='frame-primary'>");
    html.push_str(&text_input(
        MQTT_SERVER_ADDRESS,
        "MQTT Server:",
        &current.mqtt_server_address,
        "",
    ));
    html.push_str(&text_input(
        MQTT_SERVER_PORT,
        "MQTT Port:",
        &port,
        " inputmode='numeric' pattern='[0-9]*'",
    ));
    html.push_str(&text_input(MQTT_USERNAME, "MQTT Username:", &current.mqtt_username, ""));
    html.push_str(&text_input(MQTT_PASS, "MQTT Password:", &current.mqtt_pass, ""));
    html.push_str("</div>");

    html.push_str("<h2>MQTT client & topic<br>configuration</h2>");
    html.push_str("<div class='frame-primary'>");
    html.push_str(&text_input(MQTT_CLIENT_ID, "MQTT Client ID:", &current.mqtt_client_id, ""));
    html.push_str(&text_input(MQTT_TOPIC, "MQTT Topic:", &current.mqtt_topic, ""));
    html.push_str("</div>");

    html.push_str("<h2>Notifications</h2>");
    html.push_str("<div class='frame-primary'>");
    html.push_str(&checkbox(
        AUDIO_NOTIFICATIONS,
        "Audio notifications",
        current.audio_notifications,
    ));
    html.push_str(&checkbox(
        VISUAL_NOTIFICATIONS,
        "Visual notifications",
        current.visual_notifications,
    ));
    html.push_str("</div>");

    html.push_str("<h2>Finish<br>configuration</h2>");
    html.push_str("<section class='info'><p>Fields are not mandatory, but the device will not leave configuration mode if any essential data is missing.</p></section>");
    html.push_str("<div class='frame-horizontal'><input type='reset' value='Reset form'><input type='submit' value='Upload configuration'></div>");
    html.push_str("</form></body></html>");

    html
}
