//! 内存中的存储实现，仅用于测试

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::storage::{Namespace, Storage, StorageError};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    U16(u16),
    Bool(bool),
}

type Partition = HashMap<String, HashMap<String, Value>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    partition: Arc<Mutex<Partition>>,
    fail_open: Arc<AtomicBool>,
    fail_write: Arc<Mutex<Option<String>>>,
    opens: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让后续的 `open` 全部失败
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// 让该键的写入失败，`None` 恢复正常
    pub fn set_fail_write(&self, key: Option<&str>) {
        *self.fail_write.lock().unwrap() = key.map(str::to_string);
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn raw(&self, namespace: &str, key: &str) -> Option<Value> {
        let partition = self.partition.lock().unwrap();
        partition.get(namespace).and_then(|ns| ns.get(key)).cloned()
    }

    pub fn key_count(&self, namespace: &str) -> usize {
        let partition = self.partition.lock().unwrap();
        partition.get(namespace).map(|ns| ns.len()).unwrap_or(0)
    }
}

impl Storage for MemoryStorage {
    type Handle = MemoryNamespace;

    fn open(&self, namespace: &str) -> Result<Self::Handle, StorageError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(StorageError::Open {
                namespace: namespace.to_string(),
                reason: "partition unavailable".to_string(),
            });
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryNamespace {
            partition: self.partition.clone(),
            fail_write: self.fail_write.clone(),
            name: namespace.to_string(),
        })
    }
}

pub struct MemoryNamespace {
    partition: Arc<Mutex<Partition>>,
    fail_write: Arc<Mutex<Option<String>>>,
    name: String,
}

impl MemoryNamespace {
    fn get(&self, key: &str) -> Option<Value> {
        let partition = self.partition.lock().unwrap();
        partition.get(&self.name).and_then(|ns| ns.get(key)).cloned()
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        if self.fail_write.lock().unwrap().as_deref() == Some(key) {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: "no free pages".to_string(),
            });
        }

        let mut partition = self.partition.lock().unwrap();
        partition
            .entry(self.name.clone())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn type_mismatch(key: &str) -> StorageError {
        StorageError::Read {
            key: key.to_string(),
            reason: "type mismatch".to_string(),
        }
    }
}

impl Namespace for MemoryNamespace {
    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).is_some())
    }

    fn get_str(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s)),
            Some(_) => Err(Self::type_mismatch(key)),
        }
    }

    fn set_str(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.put(key, Value::Str(value.to_string()))
    }

    fn get_u16(&self, key: &str) -> Result<Option<u16>, StorageError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::U16(v)) => Ok(Some(v)),
            Some(_) => Err(Self::type_mismatch(key)),
        }
    }

    fn set_u16(&mut self, key: &str, value: u16) -> Result<(), StorageError> {
        self.put(key, Value::U16(value))
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(v)) => Ok(Some(v)),
            Some(_) => Err(Self::type_mismatch(key)),
        }
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError> {
        self.put(key, Value::Bool(value))
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        let mut partition = self.partition.lock().unwrap();
        partition.remove(&self.name);
        Ok(())
    }
}
