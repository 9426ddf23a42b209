// ==========================================
// 月度电量分配系统 - 自备协议领域模型
// ==========================================
// 职责: 发电公司 → 股东公司 的持股/消纳比例
// 红线: 归一化后活跃股东比例合计恰为 100
// ==========================================

use crate::domain::types::CaptiveStatus;
use serde::{Deserialize, Serialize};

/// 股东份额（累加后、取整前）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptiveShare {
    pub shareholder_id: String,
    pub percentage: f64,
    pub status: CaptiveStatus,
    pub name: String,
}

/// 单个发电公司的自备协议汇总
///
/// 股东按首次出现顺序保存，保证后续排序的稳定性
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorCaptive {
    pub shareholders: Vec<CaptiveShare>,
    pub total_percentage: f64,
}

impl GeneratorCaptive {
    pub fn get(&self, shareholder_id: &str) -> Option<&CaptiveShare> {
        self.shareholders.iter().find(|s| s.shareholder_id == shareholder_id)
    }

    pub(crate) fn get_mut(&mut self, shareholder_id: &str) -> Option<&mut CaptiveShare> {
        self.shareholders.iter_mut().find(|s| s.shareholder_id == shareholder_id)
    }
}

/// 参与分配的活跃股东（整数比例）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveShareholder {
    pub shareholder_id: String,
    pub name: String,
    pub percentage: u32,
}
