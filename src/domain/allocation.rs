// ==========================================
// 月度电量分配系统 - 分配记录领域模型
// ==========================================
// 唯一键:
// - ALLOCATION: (production_site_id, consumption_site_id, month)
// - BANKING / LAPSE: (production_site_id, month), 用电侧为空
// 红线: allocated 只增不减
// ==========================================

use crate::domain::types::{AllocationType, Period};
use crate::domain::unit::{IrAdjustment, PeriodMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// AllocationKey - 记录唯一键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AllocationKey {
    pub record_type: AllocationType,
    pub production_site_id: String,
    pub consumption_site_id: Option<String>,
    pub month: String,
}

// ==========================================
// AllocationRecord - 分配记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRecord {
    #[serde(rename = "type")]
    pub record_type: AllocationType,

    // ===== 发电侧 =====
    pub production_site_id: String,
    pub production_site_name: String,
    pub generator_company_id: String,

    // ===== 用电侧 (BANKING / LAPSE 为空) =====
    pub consumption_site_id: Option<String>,
    pub consumption_site_name: Option<String>,
    pub shareholder_company_id: Option<String>,

    pub month: String,
    pub allocated: PeriodMap,           // 各时段累计电量
    pub allocation_percentage: Option<f64>, // 应用的分配比例

    // ===== IR 展示信息 =====
    pub ir: Option<IrAdjustment>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AllocationRecord {
    pub fn key(&self) -> AllocationKey {
        AllocationKey {
            record_type: self.record_type,
            production_site_id: self.production_site_id.clone(),
            consumption_site_id: self.consumption_site_id.clone(),
            month: self.month.clone(),
        }
    }

    /// 累加某时段电量（非正值忽略）
    pub fn accumulate(&mut self, period: Period, amount: f64, at: DateTime<Utc>) {
        if amount > 0.0 {
            self.allocated.add(period, amount);
            self.updated_at = at;
        }
    }

    pub fn total_allocated(&self) -> f64 {
        self.allocated.total()
    }
}
