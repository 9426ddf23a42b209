// ==========================================
// 月度电量分配系统 - 分配引擎配置
// ==========================================
// 职责: 隐式默认值显式化、可注入
// 来源: 代码默认值 / JSON / key-value 覆写
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// AllocationConfig - 分配配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllocationConfig {
    pub default_generator_company_id: String, // 发电公司缺失时的归属: "1"
    pub percentage_tolerance: f64,            // 比例合计偏离 100 的容差: 0.01
    pub default_month: Option<String>,        // 调用方未给月份时的兜底 (MMYYYY)
    pub banking_month_must_match: bool,       // 结转单元是否必须与目标月份一致: true
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            default_generator_company_id: "1".to_string(),
            percentage_tolerance: 0.01,
            default_month: None,
            banking_month_must_match: true,
        }
    }
}

impl AllocationConfig {
    /// 从 JSON 字符串加载（缺失字段取默认值）
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let config: AllocationConfig = serde_json::from_str(raw)?;
        config.validated()
    }

    /// 从 key-value 配置覆写默认值
    ///
    /// # 参数
    /// - `kv`: 配置键 → 字符串值（键见 `config_keys`）
    ///
    /// # 返回
    /// - Ok: 合并后的配置
    /// - Err: 某个值无法解析
    pub fn from_kv(kv: &HashMap<String, String>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(value) = kv.get(config_keys::DEFAULT_GENERATOR_COMPANY_ID) {
            config.default_generator_company_id = value.trim().to_string();
        }

        if let Some(value) = kv.get(config_keys::PERCENTAGE_TOLERANCE) {
            config.percentage_tolerance =
                value
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| ConfigError::ConfigValueError {
                        key: config_keys::PERCENTAGE_TOLERANCE.to_string(),
                        value: value.clone(),
                        message: e.to_string(),
                    })?;
        }

        if let Some(value) = kv.get(config_keys::DEFAULT_MONTH) {
            let trimmed = value.trim();
            config.default_month = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }

        if let Some(value) = kv.get(config_keys::BANKING_MONTH_MUST_MATCH) {
            config.banking_month_must_match = match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::ConfigValueError {
                        key: config_keys::BANKING_MONTH_MUST_MATCH.to_string(),
                        value: value.clone(),
                        message: "期望布尔值".to_string(),
                    })
                }
            };
        }

        config.validated()
    }

    fn validated(self) -> ConfigResult<Self> {
        if self.default_generator_company_id.trim().is_empty() {
            return Err(ConfigError::ConfigValueError {
                key: config_keys::DEFAULT_GENERATOR_COMPANY_ID.to_string(),
                value: self.default_generator_company_id,
                message: "不能为空".to_string(),
            });
        }
        if !self.percentage_tolerance.is_finite() || self.percentage_tolerance < 0.0 {
            return Err(ConfigError::ConfigValueError {
                key: config_keys::PERCENTAGE_TOLERANCE.to_string(),
                value: self.percentage_tolerance.to_string(),
                message: "必须为非负有限数".to_string(),
            });
        }
        Ok(self)
    }
}

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const DEFAULT_GENERATOR_COMPANY_ID: &str = "default_generator_company_id";
    pub const PERCENTAGE_TOLERANCE: &str = "percentage_tolerance";
    pub const DEFAULT_MONTH: &str = "default_month";
    pub const BANKING_MONTH_MUST_MATCH: &str = "banking_month_must_match";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = AllocationConfig::default();
        assert_eq!(config.default_generator_company_id, "1");
        assert_eq!(config.percentage_tolerance, 0.01);
        assert!(config.default_month.is_none());
        assert!(config.banking_month_must_match);
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            AllocationConfig::from_json_str(r#"{"defaultGeneratorCompanyId":"GEN-X"}"#).unwrap();
        assert_eq!(config.default_generator_company_id, "GEN-X");
        assert_eq!(config.percentage_tolerance, 0.01);
    }

    #[test]
    fn test_from_kv_overrides() {
        let mut kv = HashMap::new();
        kv.insert(config_keys::PERCENTAGE_TOLERANCE.to_string(), "0.5".to_string());
        kv.insert(config_keys::DEFAULT_MONTH.to_string(), "012025".to_string());
        kv.insert(config_keys::BANKING_MONTH_MUST_MATCH.to_string(), "false".to_string());

        let config = AllocationConfig::from_kv(&kv).unwrap();
        assert_eq!(config.percentage_tolerance, 0.5);
        assert_eq!(config.default_month.as_deref(), Some("012025"));
        assert!(!config.banking_month_must_match);
    }

    #[test]
    fn test_from_kv_rejects_bad_value() {
        let mut kv = HashMap::new();
        kv.insert(config_keys::PERCENTAGE_TOLERANCE.to_string(), "abc".to_string());
        let err = AllocationConfig::from_kv(&kv).unwrap_err();
        assert!(err.to_string().contains(config_keys::PERCENTAGE_TOLERANCE));
    }

    #[test]
    fn test_empty_generator_id_rejected() {
        let mut kv = HashMap::new();
        kv.insert(config_keys::DEFAULT_GENERATOR_COMPANY_ID.to_string(), "  ".to_string());
        assert!(AllocationConfig::from_kv(&kv).is_err());
    }
}
