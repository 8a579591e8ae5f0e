//! ESP-IDF 平台实现

pub mod nvs;
pub mod softap;
pub mod watchdog;

pub use nvs::NvsStorage;
pub use softap::SoftAp;
