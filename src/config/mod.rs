// ==========================================
// 月度电量分配系统 - 配置层
// ==========================================
// 职责: 分配引擎配置, 支持 JSON / key-value 覆写
// ==========================================

pub mod allocation_config;
pub mod error;

pub use allocation_config::{config_keys, AllocationConfig};
pub use error::{ConfigError, ConfigResult};
