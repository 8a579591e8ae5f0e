//! 持久化键值存储接口
//!
//! 设备上由 NVS 实现（见 `platform::nvs`），测试中由内存实现替代。
//! 句柄在 drop 时关闭命名空间，因此每次 `open` 都是一次独立的访问。

/// 存储错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// 命名空间无法以读写方式打开
    Open { namespace: String, reason: String },
    /// 读取键失败
    Read { key: String, reason: String },
    /// 写入键失败
    Write { key: String, reason: String },
    /// 清空命名空间失败
    Erase { namespace: String, reason: String },
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Open { namespace, reason } => {
                write!(f, "failed to open namespace {}: {}", namespace, reason)
            }
            StorageError::Read { key, reason } => write!(f, "failed to read {}: {}", key, reason),
            StorageError::Write { key, reason } => {
                write!(f, "failed to write {}: {}", key, reason)
            }
            StorageError::Erase { namespace, reason } => {
                write!(f, "failed to erase namespace {}: {}", namespace, reason)
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// 已打开的命名空间
pub trait Namespace {
    fn contains(&self, key: &str) -> Result<bool, StorageError>;

    fn get_str(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_str(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn get_u16(&self, key: &str) -> Result<Option<u16>, StorageError>;
    fn set_u16(&mut self, key: &str, value: u16) -> Result<(), StorageError>;

    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError>;
    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError>;

    /// 删除命名空间内的所有键
    fn erase_all(&mut self) -> Result<(), StorageError>;
}

/// 可以按名称打开命名空间的存储分区
pub trait Storage {
    type Handle: Namespace;

    fn open(&self, namespace: &str) -> Result<Self::Handle, StorageError>;
}
