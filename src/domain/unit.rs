// ==========================================
// 月度电量分配系统 - 站点单元领域模型
// ==========================================
// 职责: 发电/用电/结转单元的规范形态
// 红线: 引擎只接触规范形态,原始字段差异由导入层消化
// ==========================================

use crate::domain::types::{Period, UnitKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// PeriodMap - 分时段电量
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodMap {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub c4: f64,
    pub c5: f64,
}

impl PeriodMap {
    /// 全零
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, period: Period) -> f64 {
        match period {
            Period::C1 => self.c1,
            Period::C2 => self.c2,
            Period::C3 => self.c3,
            Period::C4 => self.c4,
            Period::C5 => self.c5,
        }
    }

    fn slot_mut(&mut self, period: Period) -> &mut f64 {
        match period {
            Period::C1 => &mut self.c1,
            Period::C2 => &mut self.c2,
            Period::C3 => &mut self.c3,
            Period::C4 => &mut self.c4,
            Period::C5 => &mut self.c5,
        }
    }

    pub fn set(&mut self, period: Period, value: f64) {
        *self.slot_mut(period) = value;
    }

    pub fn add(&mut self, period: Period, value: f64) {
        *self.slot_mut(period) += value;
    }

    /// 扣减（结果不低于 0）
    pub fn subtract(&mut self, period: Period, value: f64) {
        let slot = self.slot_mut(period);
        *slot = (*slot - value).max(0.0);
    }

    /// 5 个时段合计
    pub fn total(&self) -> f64 {
        Period::ALL.iter().map(|p| self.get(*p)).sum()
    }

    /// 是否存在正值时段
    pub fn has_positive(&self) -> bool {
        Period::ALL.iter().any(|p| self.get(*p) > 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Period, f64)> + '_ {
        Period::ALL.iter().map(move |p| (*p, self.get(*p)))
    }
}

// ==========================================
// IrAdjustment - 注入/削减调整
// ==========================================
// 来源: 计量对账数据,按时段调整用电需求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrAdjustment {
    pub ir_type: String,
    pub injection: PeriodMap,
    pub reduction: PeriodMap,
}

impl IrAdjustment {
    pub fn is_empty(&self) -> bool {
        self.ir_type.is_empty() && !self.injection.has_positive() && !self.reduction.has_positive()
    }
}

// ==========================================
// Unit - 站点单元（单月）
// ==========================================
// 生命周期: 每次引擎调用新建,仅在调用内被修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    // ===== 标识 =====
    pub kind: UnitKind,
    pub site_id: String,
    pub company_id: String, // 发电公司 (发电/结转) 或 股东公司 (用电)
    pub site_name: String,
    pub site_type: String,
    pub month: String,

    // ===== 电量 =====
    pub remaining: PeriodMap, // 剩余可分配 (发电) / 剩余需求 (用电)

    // ===== 可选属性 =====
    pub banking_enabled: bool,
    pub commission_date: Option<NaiveDate>,
    pub ir: Option<IrAdjustment>,
    pub annual_consumption: f64,
}

impl Unit {
    /// 创建空单元（所有数值为 0）
    pub fn new(kind: UnitKind, site_id: &str, company_id: &str, month: &str) -> Self {
        Self {
            kind,
            site_id: site_id.to_string(),
            company_id: company_id.to_string(),
            site_name: String::new(),
            site_type: String::new(),
            month: month.to_string(),
            remaining: PeriodMap::zero(),
            banking_enabled: false,
            commission_date: None,
            ir: None,
            annual_consumption: 0.0,
        }
    }

    pub fn remaining_at(&self, period: Period) -> f64 {
        self.remaining.get(period)
    }

    pub fn total_remaining(&self) -> f64 {
        self.remaining.total()
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining.has_positive()
    }

    /// 注入量（无 IR 时为 0）
    pub fn injection_at(&self, period: Period) -> f64 {
        self.ir.as_ref().map(|ir| ir.injection.get(period)).unwrap_or(0.0)
    }

    /// 削减量（无 IR 时为 0）
    pub fn reduction_at(&self, period: Period) -> f64 {
        self.ir.as_ref().map(|ir| ir.reduction.get(period)).unwrap_or(0.0)
    }

    /// 清零剩余量
    pub fn clear_remaining(&mut self) {
        self.remaining = PeriodMap::zero();
    }
}
