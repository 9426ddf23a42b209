// ==========================================
// 月度电量分配系统 - 单元归一化器
// ==========================================
// 职责: 原始记录 → 规范 Unit (字段别名 + 类型转换)
// 红线: 纯函数, 永不失败; 缺失/非法数值一律为 0
// ==========================================

use crate::domain::types::{Period, UnitKind};
use crate::domain::unit::{IrAdjustment, PeriodMap, Unit};
use crate::importer::value_cleaner::ValueCleaner;
use chrono::NaiveDate;
use serde_json::Value;

/// 发电站点元数据（用于回填发电公司与投运日期）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteMeta {
    pub site_id: String,
    pub generator_company_id: String,
    pub commission_date: Option<NaiveDate>,
    pub banking_enabled: Option<bool>,
}

pub struct UnitNormalizer {
    cleaner: ValueCleaner,
}

impl UnitNormalizer {
    pub fn new() -> Self {
        Self {
            cleaner: ValueCleaner,
        }
    }

    /// 归一化单条原始记录
    ///
    /// # 参数
    /// - `raw`: 原始记录（任意 JSON, 非对象时所有字段取默认值）
    /// - `kind`: 单元类别, 决定字段别名表
    /// - `default_month`: 记录自身无月份时使用的月份
    pub fn normalize(&self, raw: &Value, kind: UnitKind, default_month: &str) -> Unit {
        let site_id = self.text(raw, site_id_aliases(kind));
        let company_id = self.text(raw, company_id_aliases(kind));

        let mut month = self.text(raw, &["month"]);
        if month.is_empty() {
            month = default_month.to_string();
        }

        let mut unit = Unit::new(kind, &site_id, &company_id, &month);
        unit.site_name = self.text(raw, site_name_aliases(kind));
        unit.site_type = self.text(raw, &["type", "siteType"]);
        unit.remaining = self.period_map(Some(raw));
        unit.banking_enabled = self.banking_flag(raw).unwrap_or(false);
        unit.commission_date = self
            .cleaner
            .date(lookup(raw, &["commissionDate", "dateOfCommission"]));
        unit.annual_consumption = self
            .cleaner
            .amount(lookup(raw, &["annualConsumption", "annualConsumption_L"]));

        if kind == UnitKind::Consumption {
            unit.ir = self.ir_adjustment(raw);
        }

        unit
    }

    /// 记录自身的结转标志; 未给出或无法识别时为 None
    pub fn banking_flag(&self, raw: &Value) -> Option<bool> {
        self.cleaner
            .flag(lookup(raw, &["bankingEnabled", "banking", "isBanking"]))
    }

    /// 解析发电站点元数据
    pub fn site_meta(&self, raw: &Value) -> SiteMeta {
        SiteMeta {
            site_id: self.text(raw, &["productionSiteId", "siteId", "id"]),
            generator_company_id: self.text(raw, &["generatorCompanyId", "companyId"]),
            commission_date: self
                .cleaner
                .date(lookup(raw, &["commissionDate", "dateOfCommission"])),
            banking_enabled: self.banking_flag(raw),
        }
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn text(&self, raw: &Value, aliases: &[&str]) -> String {
        aliases
            .iter()
            .map(|alias| self.cleaner.text(raw.get(alias)))
            .find(|v| !v.is_empty())
            .unwrap_or_default()
    }

    /// 读取 c1..c5（兼容大写键 C1..C5）
    fn period_map(&self, raw: Option<&Value>) -> PeriodMap {
        let mut map = PeriodMap::zero();
        let Some(raw) = raw else {
            return map;
        };
        for period in Period::ALL {
            let upper = period.key().to_uppercase();
            let value = raw.get(period.key()).or_else(|| raw.get(upper.as_str()));
            map.set(period, self.cleaner.amount(value));
        }
        map
    }

    fn ir_adjustment(&self, raw: &Value) -> Option<IrAdjustment> {
        let ir = IrAdjustment {
            ir_type: self.text(raw, &["irType"]),
            injection: self.period_map(raw.get("injection")),
            reduction: self.period_map(raw.get("reduction")),
        };
        if ir.is_empty() {
            None
        } else {
            Some(ir)
        }
    }
}

impl Default for UnitNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(raw: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| raw.get(alias))
        .find(|v| !v.is_null())
}

fn site_id_aliases(kind: UnitKind) -> &'static [&'static str] {
    match kind {
        UnitKind::Production | UnitKind::Banking => &["productionSiteId", "siteId", "id"],
        UnitKind::Consumption => &["consumptionSiteId", "siteId", "id"],
    }
}

fn company_id_aliases(kind: UnitKind) -> &'static [&'static str] {
    match kind {
        UnitKind::Production | UnitKind::Banking => &["generatorCompanyId", "companyId"],
        UnitKind::Consumption => &["shareholderCompanyId", "companyId"],
    }
}

fn site_name_aliases(kind: UnitKind) -> &'static [&'static str] {
    match kind {
        UnitKind::Production | UnitKind::Banking => &["productionSiteName", "siteName", "name"],
        UnitKind::Consumption => &["consumptionSiteName", "siteName", "name"],
    }
}
