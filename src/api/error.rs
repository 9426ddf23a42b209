// ==========================================
// 月度电量分配系统 - API层错误类型
// ==========================================
// 职责: 请求结构错误、配置错误、序列化错误
// 说明: 引擎本身不失败, 只有请求外层结构不合法时才返回错误
// ==========================================

use crate::config::ConfigError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("无效输入: field={field}, {message}")]
    InvalidInput { field: String, message: String },

    #[error("配置错误: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        ApiError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message() {
        let err = ApiError::invalid_input("productionUnits", "必须是数组");
        let msg = err.to_string();
        assert!(msg.contains("productionUnits"));
        assert!(msg.contains("必须是数组"));
    }

    #[test]
    fn test_config_error_conversion() {
        let config_err = ConfigError::ConfigValueError {
            key: "percentage_tolerance".to_string(),
            value: "-1".to_string(),
            message: "不能为负".to_string(),
        };
        let api_err: ApiError = config_err.into();
        assert!(matches!(api_err, ApiError::InvalidConfig(_)));
    }
}
