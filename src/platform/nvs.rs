//! NVS 存储后端
//!
//! 布尔值以 u8 存储，与 Arduino `Preferences::putBool` 写入的数据兼容。

use std::ffi::CString;

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::sys::{
    esp, nvs_close, nvs_commit, nvs_erase_all, nvs_handle_t, nvs_open,
    nvs_open_mode_t_NVS_READWRITE, EspError,
};

use crate::settings::{Namespace, Storage, StorageError};

#[derive(Clone)]
pub struct NvsStorage {
    partition: EspDefaultNvsPartition,
}

impl NvsStorage {
    pub fn new(partition: EspDefaultNvsPartition) -> Self {
        Self { partition }
    }
}

impl Storage for NvsStorage {
    type Handle = NvsNamespace;

    fn open(&self, namespace: &str) -> Result<Self::Handle, StorageError> {
        let nvs = EspNvs::new(self.partition.clone(), namespace, true).map_err(|e| {
            StorageError::Open {
                namespace: namespace.to_string(),
                reason: format!("{:?}", e),
            }
        })?;

        Ok(NvsNamespace {
            nvs,
            name: namespace.to_string(),
        })
    }
}

/// 打开的 NVS 命名空间，drop 时关闭
pub struct NvsNamespace {
    nvs: EspNvs<NvsDefault>,
    name: String,
}

fn read_err(key: &str) -> impl FnOnce(EspError) -> StorageError + '_ {
    move |e| StorageError::Read {
        key: key.to_string(),
        reason: format!("{:?}", e),
    }
}

fn write_err(key: &str) -> impl FnOnce(EspError) -> StorageError + '_ {
    move |e| StorageError::Write {
        key: key.to_string(),
        reason: format!("{:?}", e),
    }
}

impl Namespace for NvsNamespace {
    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        self.nvs.contains(key).map_err(read_err(key))
    }

    fn get_str(&self, key: &str) -> Result<Option<String>, StorageError> {
        let Some(len) = self.nvs.str_len(key).map_err(read_err(key))? else {
            return Ok(None);
        };

        let mut buf = vec![0u8; len.max(1)];
        let value = self.nvs.get_str(key, &mut buf).map_err(read_err(key))?;
        Ok(value.map(str::to_string))
    }

    fn set_str(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.nvs.set_str(key, value).map_err(write_err(key))
    }

    fn get_u16(&self, key: &str) -> Result<Option<u16>, StorageError> {
        self.nvs.get_u16(key).map_err(read_err(key))
    }

    fn set_u16(&mut self, key: &str, value: u16) -> Result<(), StorageError> {
        self.nvs.set_u16(key, value).map_err(write_err(key))
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        let value = self.nvs.get_u8(key).map_err(read_err(key))?;
        Ok(value.map(|v| v != 0))
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError> {
        self.nvs.set_u8(key, u8::from(value)).map_err(write_err(key))
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        let erase_err = |reason: String| StorageError::Erase {
            namespace: self.name.clone(),
            reason,
        };

        let name = CString::new(self.name.as_str()).map_err(|e| erase_err(e.to_string()))?;
        let mut handle: nvs_handle_t = 0;

        // EspNvs 不提供整体清空，这里用独立的句柄完成
        unsafe {
            esp!(nvs_open(name.as_ptr(), nvs_open_mode_t_NVS_READWRITE, &mut handle))
                .map_err(|e| erase_err(format!("{:?}", e)))?;
            let result = esp!(nvs_erase_all(handle)).and_then(|_| esp!(nvs_commit(handle)));
            nvs_close(handle);
            result.map_err(|e| erase_err(format!("{:?}", e)))
        }
    }
}
