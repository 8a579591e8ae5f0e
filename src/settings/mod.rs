//! 设备配置的持久化读写
//!
//! 每个键在第一次读取时如果不存在，会先写入该类型的默认值（文本 `"Unknown"`、
//! 整数 `0`、布尔 `true`），因此读取永远不会失败。

#[cfg(test)]
pub(crate) mod memory;
mod storage;

use serde::Serialize;

pub use storage::{Namespace, Storage, StorageError};

// NVS 中的键名，与已有设备上的数据兼容，不要修改
pub const NETWORK_NAME: &str = "netName";
pub const NETWORK_PASS: &str = "netPass";
pub const MQTT_SERVER_ADDRESS: &str = "mqttSrvAdr";
pub const MQTT_SERVER_PORT: &str = "mqttSrvPort";
pub const MQTT_USERNAME: &str = "mqttUser";
pub const MQTT_PASS: &str = "mqttPass";
pub const MQTT_CLIENT_ID: &str = "mqttClient";
pub const MQTT_TOPIC: &str = "mqttTopic";
pub const AUDIO_NOTIFICATIONS: &str = "audioNotif";
pub const VISUAL_NOTIFICATIONS: &str = "visualNotif";

pub const TEXT_SENTINEL: &str = "Unknown";
pub const INT_SENTINEL: u16 = 0;
pub const BOOL_SENTINEL: bool = true;

/// 可以存入命名空间的值类型
trait Stored: Sized {
    fn sentinel() -> Self;
    fn read<N: Namespace>(ns: &N, key: &str) -> Result<Option<Self>, StorageError>;
    fn write<N: Namespace>(&self, ns: &mut N, key: &str) -> Result<(), StorageError>;
}

impl Stored for String {
    fn sentinel() -> Self {
        TEXT_SENTINEL.to_string()
    }

    fn read<N: Namespace>(ns: &N, key: &str) -> Result<Option<Self>, StorageError> {
        ns.get_str(key)
    }

    fn write<N: Namespace>(&self, ns: &mut N, key: &str) -> Result<(), StorageError> {
        ns.set_str(key, self)
    }
}

impl Stored for u16 {
    fn sentinel() -> Self {
        INT_SENTINEL
    }

    fn read<N: Namespace>(ns: &N, key: &str) -> Result<Option<Self>, StorageError> {
        ns.get_u16(key)
    }

    fn write<N: Namespace>(&self, ns: &mut N, key: &str) -> Result<(), StorageError> {
        ns.set_u16(key, *self)
    }
}

impl Stored for bool {
    fn sentinel() -> Self {
        BOOL_SENTINEL
    }

    fn read<N: Namespace>(ns: &N, key: &str) -> Result<Option<Self>, StorageError> {
        ns.get_bool(key)
    }

    fn write<N: Namespace>(&self, ns: &mut N, key: &str) -> Result<(), StorageError> {
        ns.set_bool(key, *self)
    }
}

/// 门户管理的全部配置项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationSet {
    #[serde(rename = "netName")]
    pub network_name: String,
    #[serde(rename = "netPass")]
    pub network_pass: String,
    #[serde(rename = "mqttSrvAdr")]
    pub mqtt_server_address: String,
    #[serde(rename = "mqttSrvPort")]
    pub mqtt_server_port: u16,
    #[serde(rename = "mqttUser")]
    pub mqtt_username: String,
    #[serde(rename = "mqttPass")]
    pub mqtt_pass: String,
    #[serde(rename = "mqttClient")]
    pub mqtt_client_id: String,
    #[serde(rename = "mqttTopic")]
    pub mqtt_topic: String,
    #[serde(rename = "audioNotif")]
    pub audio_notifications: bool,
    #[serde(rename = "visualNotif")]
    pub visual_notifications: bool,
}

impl Default for ConfigurationSet {
    /// 全部为默认值，即首次启动时的状态
    fn default() -> Self {
        Self {
            network_name: String::sentinel(),
            network_pass: String::sentinel(),
            mqtt_server_address: String::sentinel(),
            mqtt_server_port: INT_SENTINEL,
            mqtt_username: String::sentinel(),
            mqtt_pass: String::sentinel(),
            mqtt_client_id: String::sentinel(),
            mqtt_topic: String::sentinel(),
            audio_notifications: BOOL_SENTINEL,
            visual_notifications: BOOL_SENTINEL,
        }
    }
}

impl ConfigurationSet {
    /// 文本字段及其键名，按写入顺序排列
    pub fn text_fields(&self) -> [(&'static str, &str); 7] {
        [
            (NETWORK_NAME, &self.network_name),
            (NETWORK_PASS, &self.network_pass),
            (MQTT_SERVER_ADDRESS, &self.mqtt_server_address),
            (MQTT_USERNAME, &self.mqtt_username),
            (MQTT_PASS, &self.mqtt_pass),
            (MQTT_CLIENT_ID, &self.mqtt_client_id),
            (MQTT_TOPIC, &self.mqtt_topic),
        ]
    }

    /// 密码脱敏后的副本，用于日志和页面展示
    pub fn redacted(&self) -> Self {
        Self {
            network_pass: mask_secret(&self.network_pass),
            mqtt_pass: mask_secret(&self.mqtt_pass),
            ..self.clone()
        }
    }

    pub fn to_log_json(&self) -> String {
        serde_json::to_string(&self.redacted()).unwrap_or_else(|e| format!("<{}>", e))
    }
}

/// 密码脱敏显示
pub fn mask_secret(secret: &str) -> String {
    "*".repeat(secret.chars().count().min(8))
}

/// 一个命名空间上的类型化读写
///
/// 单键操作每次都会打开并关闭命名空间；`load`/`save` 在一次打开内完成整组配置。
pub struct SettingsStore<S: Storage> {
    storage: S,
    namespace: String,
}

impl<S: Storage> SettingsStore<S> {
    pub fn new(storage: S, namespace: impl Into<String>) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get_text(&self, key: &str) -> String {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> u16 {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
    }

    pub fn set_text(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set(key, &value.to_string())
    }

    pub fn set_int(&self, key: &str, value: u16) -> Result<(), StorageError> {
        self.set(key, &value)
    }

    pub fn set_bool(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.set(key, &value)
    }

    /// 键是否存在；不会触发默认值写入
    pub fn contains(&self, key: &str) -> bool {
        let ns = match self.open(key) {
            Ok(ns) => ns,
            Err(_) => return false,
        };
        ns.contains(key)
            .map_err(|e| log::error!("[{}] {}", self.namespace, e))
            .unwrap_or(false)
    }

    /// 清空整个命名空间
    pub fn erase(&self) -> Result<(), StorageError> {
        let mut ns = self.open("all keys")?;
        ns.erase_all()
            .inspect_err(|e| log::error!("[{}] {}", self.namespace, e))?;
        log::info!("[{}] namespace erased", self.namespace);
        Ok(())
    }

    /// 一次性读取全部配置，缺失的键会被初始化为默认值
    pub fn load(&self) -> ConfigurationSet {
        let mut ns = match self.open("all keys") {
            Ok(ns) => ns,
            Err(_) => return ConfigurationSet::default(),
        };

        ConfigurationSet {
            network_name: self.read_or_init(&mut ns, NETWORK_NAME),
            network_pass: self.read_or_init(&mut ns, NETWORK_PASS),
            mqtt_server_address: self.read_or_init(&mut ns, MQTT_SERVER_ADDRESS),
            mqtt_server_port: self.read_or_init(&mut ns, MQTT_SERVER_PORT),
            mqtt_username: self.read_or_init(&mut ns, MQTT_USERNAME),
            mqtt_pass: self.read_or_init(&mut ns, MQTT_PASS),
            mqtt_client_id: self.read_or_init(&mut ns, MQTT_CLIENT_ID),
            mqtt_topic: self.read_or_init(&mut ns, MQTT_TOPIC),
            audio_notifications: self.read_or_init(&mut ns, AUDIO_NOTIFICATIONS),
            visual_notifications: self.read_or_init(&mut ns, VISUAL_NOTIFICATIONS),
        }
    }

    /// 在一次打开内按固定顺序写入全部配置
    ///
    /// 某个键写入失败不影响其余键；全部写完后返回第一个错误。
    pub fn save(&self, config: &ConfigurationSet) -> Result<(), StorageError> {
        let mut ns = self.open("all keys")?;

        let mut first_error = None;
        let mut keep_first = |result: Result<(), StorageError>| {
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        };

        let fields = config.text_fields();
        let (head, tail) = fields.split_at(3);
        for (key, value) in head {
            keep_first(self.write(&mut ns, key, &value.to_string()));
        }
        keep_first(self.write(&mut ns, MQTT_SERVER_PORT, &config.mqtt_server_port));
        for (key, value) in tail {
            keep_first(self.write(&mut ns, key, &value.to_string()));
        }
        keep_first(self.write(&mut ns, AUDIO_NOTIFICATIONS, &config.audio_notifications));
        keep_first(self.write(&mut ns, VISUAL_NOTIFICATIONS, &config.visual_notifications));

        match first_error {
            Some(e) => {
                log::warn!("[{}] configuration partially saved", self.namespace);
                Err(e)
            }
            None => {
                log::info!("[{}] configuration saved: {}", self.namespace, config.to_log_json());
                Ok(())
            }
        }
    }

    fn open(&self, key: &str) -> Result<S::Handle, StorageError> {
        self.storage.open(&self.namespace).inspect_err(|e| {
            log::error!("[{}] open failed while accessing {}: {}", self.namespace, key, e)
        })
    }

    fn get<T: Stored>(&self, key: &str) -> T {
        match self.open(key) {
            Ok(mut ns) => self.read_or_init(&mut ns, key),
            Err(_) => T::sentinel(),
        }
    }

    fn set<T: Stored>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let mut ns = self.open(key)?;
        self.write(&mut ns, key, value)
    }

    fn read_or_init<T: Stored>(&self, ns: &mut S::Handle, key: &str) -> T {
        match T::read(&*ns, key) {
            Ok(Some(value)) => value,
            Ok(None) => {
                let value = T::sentinel();
                if self.write(ns, key, &value).is_ok() {
                    log::debug!("[{}] {} initialized to default", self.namespace, key);
                }
                value
            }
            Err(e) => {
                log::error!("[{}] {}", self.namespace, e);
                T::sentinel()
            }
        }
    }

    fn write<T: Stored>(
        &self,
        ns: &mut S::Handle,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        value
            .write(ns, key)
            .inspect_err(|e| log::error!("[{}] {}", self.namespace, e))?;
        log::debug!("[{}] {} written", self.namespace, key);
        Ok(())
    }
}
