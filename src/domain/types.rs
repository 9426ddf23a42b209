// ==========================================
// 月度电量分配系统 - 领域类型定义
// ==========================================
// 时段: 每月固定 5 个电价时段 c1..c5
// 记录类型: ALLOCATION / BANKING / LAPSE
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 时段 (Period)
// ==========================================
// 红线: 时段键固定,不可扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    C1,
    C2,
    C3,
    C4,
    C5,
}

impl Period {
    /// 全部时段（固定顺序）
    pub const ALL: [Period; 5] = [Period::C1, Period::C2, Period::C3, Period::C4, Period::C5];

    /// 原始记录中的字段键
    pub fn key(&self) -> &'static str {
        match self {
            Period::C1 => "c1",
            Period::C2 => "c2",
            Period::C3 => "c3",
            Period::C4 => "c4",
            Period::C5 => "c5",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

// ==========================================
// 分配记录类型 (Allocation Type)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与下游落库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationType {
    Allocation, // 发电 → 用电
    Banking,    // 结转下月
    Lapse,      // 作废
}

impl fmt::Display for AllocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationType::Allocation => write!(f, "ALLOCATION"),
            AllocationType::Banking => write!(f, "BANKING"),
            AllocationType::Lapse => write!(f, "LAPSE"),
        }
    }
}

// ==========================================
// 自备协议状态 (Captive Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptiveStatus {
    Active,
    Inactive,
}

impl CaptiveStatus {
    /// 从原始字符串解析（大小写不敏感，缺省视为 active）
    pub fn from_raw(value: &str) -> Self {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() || normalized == "active" {
            CaptiveStatus::Active
        } else {
            CaptiveStatus::Inactive
        }
    }
}

impl fmt::Display for CaptiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptiveStatus::Active => write!(f, "active"),
            CaptiveStatus::Inactive => write!(f, "inactive"),
        }
    }
}

// ==========================================
// 单元类别 (Unit Kind)
// ==========================================
// 决定字段别名表与归属公司语义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitKind {
    Production,  // 发电站点（归属发电公司）
    Consumption, // 用电站点（归属股东公司）
    Banking,     // 上月结转电量（归属发电公司）
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Production => write!(f, "PRODUCTION"),
            UnitKind::Consumption => write!(f, "CONSUMPTION"),
            UnitKind::Banking => write!(f, "BANKING"),
        }
    }
}
