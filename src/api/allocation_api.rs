// ==========================================
// 月度电量分配系统 - 分配计算 API
// ==========================================
// 职责: JSON 请求 → 引擎输入 → JSON 响应
// 红线: 只校验请求外层结构, 单条记录的问题交给引擎跳过
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::AllocationConfig;
use crate::engine::events::AllocationEventSink;
use crate::engine::orchestrator::{AllocationEngine, AllocationInputs, AllocationOutcome};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// 请求字段
const PRODUCTION_UNITS: &str = "productionUnits";
const CONSUMPTION_UNITS: &str = "consumptionUnits";
const BANKING_UNITS: &str = "bankingUnits";
const CAPTIVE_DATA: &str = "captiveData";
const MONTH: &str = "month";
const PRODUCTION_SITES: &str = "productionSites";
const PRIORITY_MAP: &str = "consumptionSitePriorityMap";

// ==========================================
// AllocationApi - 分配计算 API
// ==========================================

/// 分配计算API
///
/// 职责：
/// 1. 请求结构校验（列表字段必须为数组, 优先级必须为对象）
/// 2. 调用分配引擎
/// 3. 响应序列化（camelCase）
pub struct AllocationApi {
    engine: AllocationEngine,
}

impl AllocationApi {
    pub fn new(config: AllocationConfig) -> Self {
        Self {
            engine: AllocationEngine::new(config),
        }
    }

    /// 从 JSON 配置创建
    pub fn from_config_json(raw: &str) -> ApiResult<Self> {
        let config = AllocationConfig::from_json_str(raw)?;
        Ok(Self::new(config))
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn AllocationEventSink>) -> Self {
        self.engine = self.engine.with_event_sink(sink);
        self
    }

    /// 解析请求
    ///
    /// # 返回
    /// - Ok(AllocationInputs): 缺失的字段视为空
    /// - Err(ApiError::InvalidInput): 请求不是对象 / 列表字段为 null 或不是数组 / 优先级不是对象
    pub fn parse_request(&self, request: &Value) -> ApiResult<AllocationInputs> {
        let body = request
            .as_object()
            .ok_or_else(|| ApiError::invalid_input("request", "请求体必须是 JSON 对象"))?;

        Ok(AllocationInputs {
            production_units: list_field(body, PRODUCTION_UNITS)?,
            consumption_units: list_field(body, CONSUMPTION_UNITS)?,
            banking_units: list_field(body, BANKING_UNITS)?,
            captive_data: list_field(body, CAPTIVE_DATA)?,
            month: month_field(body)?,
            production_sites: list_field(body, PRODUCTION_SITES)?,
            consumption_site_priority: priority_field(body)?,
        })
    }

    /// 计算分配
    pub fn calculate(&self, request: &Value) -> ApiResult<AllocationOutcome> {
        self.calculate_at(request, Utc::now())
    }

    /// 计算分配（指定时间戳）
    #[instrument(skip(self, request))]
    pub fn calculate_at(
        &self,
        request: &Value,
        computed_at: DateTime<Utc>,
    ) -> ApiResult<AllocationOutcome> {
        let inputs = self.parse_request(request)?;
        let outcome = self.engine.calculate_at(&inputs, computed_at);
        info!(
            month = %outcome.month,
            allocations = outcome.allocations.len(),
            "分配请求处理完成"
        );
        Ok(outcome)
    }

    /// 字符串请求 → 字符串响应
    pub fn calculate_json(&self, body: &str) -> ApiResult<String> {
        let request: Value = serde_json::from_str(body)?;
        let outcome = self.calculate(&request)?;
        Ok(serde_json::to_string(&outcome)?)
    }
}

impl Default for AllocationApi {
    fn default() -> Self {
        Self::new(AllocationConfig::default())
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 列表字段: 缺省视为空; 显式 null 或非数组一律拒绝
fn list_field(body: &Map<String, Value>, field: &str) -> ApiResult<Vec<Value>> {
    match body.get(field) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(ApiError::invalid_input(
            field,
            format!("必须是数组, 实际为 {}", json_type(other)),
        )),
    }
}

/// 月份: 字符串原样; 整数补齐 6 位 (82025 → "082025")
fn month_field(body: &Map<String, Value>) -> ApiResult<String> {
    match body.get(MONTH) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|v| format!("{:06}", v))
            .ok_or_else(|| ApiError::invalid_input(MONTH, "数值月份必须是非负整数")),
        Some(other) => Err(ApiError::invalid_input(
            MONTH,
            format!("必须是字符串, 实际为 {}", json_type(other)),
        )),
    }
}

fn priority_field(body: &Map<String, Value>) -> ApiResult<HashMap<String, i64>> {
    let map = match body.get(PRIORITY_MAP) {
        None => return Ok(HashMap::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ApiError::invalid_input(
                PRIORITY_MAP,
                format!("必须是对象, 实际为 {}", json_type(other)),
            ))
        }
    };

    let mut priorities = HashMap::with_capacity(map.len());
    for (site_id, value) in map {
        let priority = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match priority {
            Some(p) => {
                priorities.insert(site_id.clone(), p);
            }
            None => warn!(site_id = %site_id, value = %value, "优先级不是整数, 忽略"),
        }
    }
    Ok(priorities)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_are_empty() {
        let api = AllocationApi::default();
        let inputs = api.parse_request(&json!({})).unwrap();
        assert!(inputs.production_units.is_empty());
        assert!(inputs.consumption_site_priority.is_empty());
        assert_eq!(inputs.month, "");
    }

    #[test]
    fn test_non_array_list_rejected() {
        let api = AllocationApi::default();
        let err = api
            .parse_request(&json!({"productionUnits": {"c1": 1}}))
            .unwrap_err();
        match err {
            ApiError::InvalidInput { field, .. } => assert_eq!(field, "productionUnits"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_null_list_rejected() {
        let api = AllocationApi::default();
        let err = api
            .parse_request(&json!({"bankingUnits": null}))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput { ref field, .. } if field == "bankingUnits"));
    }

    #[test]
    fn test_priority_map_parsing() {
        let api = AllocationApi::default();
        let inputs = api
            .parse_request(&json!({
                "consumptionSitePriorityMap": {"C1": 2, "C2": "1", "C3": true}
            }))
            .unwrap();
        assert_eq!(inputs.consumption_site_priority.get("C1"), Some(&2));
        assert_eq!(inputs.consumption_site_priority.get("C2"), Some(&1));
        assert!(!inputs.consumption_site_priority.contains_key("C3"));
    }

    #[test]
    fn test_priority_map_must_be_object() {
        let api = AllocationApi::default();
        assert!(api
            .parse_request(&json!({"consumptionSitePriorityMap": [1, 2]}))
            .is_err());
    }

    #[test]
    fn test_numeric_month_padded() {
        let api = AllocationApi::default();
        let inputs = api.parse_request(&json!({"month": 82025})).unwrap();
        assert_eq!(inputs.month, "082025");
    }

    #[test]
    fn test_request_must_be_object() {
        let api = AllocationApi::default();
        assert!(api.parse_request(&json!([1, 2, 3])).is_err());
    }
}
