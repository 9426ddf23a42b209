// ==========================================
// 月度电量分配系统 - 原始值清洗器
// ==========================================
// 职责: TRIM / NULL 标准化 / 字符串与数值互转 / 布尔与日期解析
// 红线: 任何数值都不得以 NaN 进入计算
// ==========================================

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

pub struct ValueCleaner;

impl ValueCleaner {
    /// 文本字段: 字符串去空白, 数值/布尔转字符串, 其余为空串
    pub fn text(&self, value: Option<&Value>) -> String {
        match value {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    /// 数值字段: 无法解析或非有限值一律为 0
    pub fn number(&self, value: Option<&Value>) -> f64 {
        let parsed = match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                cleaned.parse::<f64>().ok()
            }
            _ => None,
        };

        match parsed {
            Some(v) if v.is_finite() => v,
            _ => 0.0,
        }
    }

    /// 电量字段: 在 number 基础上截断负值
    pub fn amount(&self, value: Option<&Value>) -> f64 {
        self.number(value).max(0.0)
    }

    /// 布尔标志（"1"/"Y"/"TRUE"/"YES" 等）, 无法识别返回 None
    pub fn flag(&self, value: Option<&Value>) -> Option<bool> {
        match value {
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0),
            Some(Value::String(s)) => match s.trim().to_uppercase().as_str() {
                "1" | "Y" | "YES" | "TRUE" | "ON" => Some(true),
                "0" | "N" | "NO" | "FALSE" | "OFF" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// 日期字段: 兼容 YYYY-MM-DD / YYYYMMDD / DD/MM/YYYY / RFC3339 / 毫秒时间戳
    pub fn date(&self, value: Option<&Value>) -> Option<NaiveDate> {
        match value {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                DateTime::parse_from_rfc3339(trimmed)
                    .map(|dt| dt.date_naive())
                    .ok()
                    .or_else(|| {
                        ["%Y-%m-%d", "%Y%m%d", "%d/%m/%Y", "%d-%m-%Y"]
                            .iter()
                            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                    })
            }
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.date_naive()),
            _ => None,
        }
    }
}
