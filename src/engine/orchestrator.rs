// ==========================================
// 月度电量分配系统 - 分配编排器
// ==========================================
// 职责: 串联 归一化 → 自备汇总 → 分组/排序 → 自备分配 → 结转 → 终态
// 输入: 原始发电/用电/结转/自备记录 + 目标月份 + 站点元数据 + 用电优先级
// 输出: ALLOCATION / BANKING / LAPSE 记录 + 剩余量 + 诊断计数
// 红线: 单条坏记录只跳过; 不做 I/O; 每次调用独占工作副本
// ==========================================

use crate::config::AllocationConfig;
use crate::domain::allocation::AllocationRecord;
use crate::domain::types::UnitKind;
use crate::domain::unit::Unit;
use crate::engine::allocator::CaptiveAllocator;
use crate::engine::banking::BankingProcessor;
use crate::engine::captive_map::CaptiveMapBuilder;
use crate::engine::events::{
    AllocationEvent, AllocationEventSink, OptionalEventSink, SkippedKind,
};
use crate::engine::grouping::{ConsumerOrderer, ProducerGrouper};
use crate::engine::lapse::LapseProcessor;
use crate::engine::state::AllocationState;
use crate::importer::{SiteMeta, UnitNormalizer};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// AllocationInputs - 引擎输入
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct AllocationInputs {
    pub production_units: Vec<Value>,
    pub consumption_units: Vec<Value>,
    pub banking_units: Vec<Value>,
    pub captive_data: Vec<Value>,
    pub month: String, // MMYYYY, 例如 "082025"
    pub production_sites: Vec<Value>,
    pub consumption_site_priority: HashMap<String, i64>,
}

// ==========================================
// AllocationDebug - 诊断计数
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDebug {
    pub total_allocations: usize,
    pub total_lapse_allocations: usize,
    pub total_banking_allocations: usize,
    pub remaining_production: usize,
    pub remaining_consumption: usize,
    pub total_allocated: f64,

    // ===== 扩展诊断 =====
    pub total_banked_allocated: f64, // 其中来自结转电量
    pub total_carried_forward: f64,
    pub total_lapsed: f64,
    pub skipped_production: usize,
    pub skipped_consumption: usize,
    pub skipped_banking: usize,
    pub ineligible_banking: usize,
    pub skipped_captive: usize,
    pub inactive_captive: usize,
    pub month_defaulted: bool,
}

// ==========================================
// AllocationOutcome - 引擎输出
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationOutcome {
    pub month: String,
    pub allocations: Vec<AllocationRecord>,
    pub banking_allocations: Vec<AllocationRecord>,
    pub lapse_allocations: Vec<AllocationRecord>,
    pub remaining_production: Vec<Unit>,
    pub remaining_consumption: Vec<Unit>,
    pub debug: AllocationDebug,
}

// ==========================================
// AllocationEngine - 分配编排器
// ==========================================
pub struct AllocationEngine {
    config: AllocationConfig,
    events: OptionalEventSink,
    normalizer: UnitNormalizer,
    captive_builder: CaptiveMapBuilder,
    grouper: ProducerGrouper,
    allocator: CaptiveAllocator,
}

impl AllocationEngine {
    pub fn new(config: AllocationConfig) -> Self {
        Self {
            captive_builder: CaptiveMapBuilder::new(config.percentage_tolerance),
            grouper: ProducerGrouper::new(&config.default_generator_company_id),
            normalizer: UnitNormalizer::new(),
            allocator: CaptiveAllocator::new(),
            events: OptionalEventSink::none(),
            config,
        }
    }

    /// 挂接事件接收者
    pub fn with_event_sink(mut self, sink: Arc<dyn AllocationEventSink>) -> Self {
        self.events = OptionalEventSink::with_sink(sink);
        self
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// 计算分配（时间戳取当前时间）
    pub fn calculate(&self, inputs: &AllocationInputs) -> AllocationOutcome {
        self.calculate_at(inputs, Utc::now())
    }

    /// 计算分配（指定时间戳, 相同输入得到相同输出）
    #[instrument(skip(self, inputs), fields(
        month = %inputs.month,
        production = inputs.production_units.len(),
        consumption = inputs.consumption_units.len(),
        banking = inputs.banking_units.len(),
        captive = inputs.captive_data.len()
    ))]
    pub fn calculate_at(
        &self,
        inputs: &AllocationInputs,
        computed_at: DateTime<Utc>,
    ) -> AllocationOutcome {
        let mut debug_info = AllocationDebug::default();

        // 1. 月份
        let month = self.resolve_month(&inputs.month, computed_at, &mut debug_info);

        // 2. 归一化
        let site_meta = self.index_site_meta(&inputs.production_sites);
        let mut production =
            self.normalize_production(&inputs.production_units, &month, &site_meta, &mut debug_info);
        let consumption =
            self.normalize_consumption(&inputs.consumption_units, &month, &mut debug_info);
        let mut banked =
            self.normalize_banking(&inputs.banking_units, &month, &site_meta, &mut debug_info);

        // 3. 自备协议
        let captive_map = self.captive_builder.build(&inputs.captive_data, &self.events);
        debug_info.skipped_captive = captive_map.skipped;
        debug_info.inactive_captive = captive_map.inactive;

        // 4. 分组 / 排序
        self.grouper.sort_by_commission(&mut production);
        let groups = self.grouper.group(&production);
        let consumer_order = ConsumerOrderer.order(&consumption, &inputs.consumption_site_priority);

        let mut state =
            AllocationState::new(&month, computed_at, production, consumption, consumer_order);

        // 5. 自备分配
        for group in &groups {
            let shareholders = captive_map.active_shareholders(&group.generator_company_id);
            if shareholders.is_empty() {
                debug!(
                    generator_company_id = %group.generator_company_id,
                    "发电公司无活跃自备协议, 发电量留待结转/作废"
                );
                continue;
            }
            self.allocator
                .allocate_group(&mut state, group, &shareholders, &self.events);
        }

        // 6. 结转电量
        let banking_outcome = BankingProcessor.apply(&mut state, &mut banked, &self.events);

        // 7. 终态
        let lapse_outcome = LapseProcessor.settle(&mut state, &self.events);

        // 8. 汇总
        let remaining_production: Vec<Unit> = state
            .production
            .iter()
            .filter(|u| u.has_remaining())
            .cloned()
            .collect();
        let remaining_consumption: Vec<Unit> = state
            .consumption
            .iter()
            .filter(|u| u.has_remaining())
            .cloned()
            .collect();
        let (allocations, banking_allocations, lapse_allocations) =
            state.ledger.into_partitioned();

        debug_info.total_allocations = allocations.len();
        debug_info.total_banking_allocations = banking_allocations.len();
        debug_info.total_lapse_allocations = lapse_allocations.len();
        debug_info.remaining_production = remaining_production.len();
        debug_info.remaining_consumption = remaining_consumption.len();
        debug_info.total_allocated = allocations.iter().map(|r| r.total_allocated()).sum();
        debug_info.total_banked_allocated = banking_outcome.allocated;
        debug_info.total_carried_forward = banking_outcome.carried_forward + lapse_outcome.banked;
        debug_info.total_lapsed = lapse_outcome.lapsed;

        info!(
            month = %month,
            allocations = debug_info.total_allocations,
            banking = debug_info.total_banking_allocations,
            lapse = debug_info.total_lapse_allocations,
            total_allocated = debug_info.total_allocated,
            remaining_consumption = debug_info.remaining_consumption,
            "月度分配计算完成"
        );

        AllocationOutcome {
            month,
            allocations,
            banking_allocations,
            lapse_allocations,
            remaining_production,
            remaining_consumption,
            debug: debug_info,
        }
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn resolve_month(
        &self,
        raw: &str,
        computed_at: DateTime<Utc>,
        debug_info: &mut AllocationDebug,
    ) -> String {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            if !is_valid_month_key(trimmed) {
                warn!(month = %trimmed, "月份格式不是 MMYYYY, 按原值使用");
            }
            return trimmed.to_string();
        }

        let month = self
            .config
            .default_month
            .clone()
            .unwrap_or_else(|| computed_at.format("%m%Y").to_string());
        warn!(month = %month, "调用方未提供月份, 使用兜底月份");
        self.events.emit(AllocationEvent::MonthDefaulted {
            month: month.clone(),
        });
        debug_info.month_defaulted = true;
        month
    }

    fn index_site_meta(&self, sites: &[Value]) -> HashMap<String, SiteMeta> {
        sites
            .iter()
            .map(|raw| self.normalizer.site_meta(raw))
            .filter(|meta| !meta.site_id.is_empty())
            .map(|meta| (meta.site_id.clone(), meta))
            .collect()
    }

    fn normalize_production(
        &self,
        raws: &[Value],
        month: &str,
        site_meta: &HashMap<String, SiteMeta>,
        debug_info: &mut AllocationDebug,
    ) -> Vec<Unit> {
        let mut units = Vec::with_capacity(raws.len());
        for (index, raw) in raws.iter().enumerate() {
            let mut unit = self.normalizer.normalize(raw, UnitKind::Production, month);
            if unit.site_id.is_empty() {
                self.skip(SkippedKind::Production, index, "missing production site id");
                debug_info.skipped_production += 1;
                continue;
            }

            if let Some(meta) = site_meta.get(&unit.site_id) {
                let declared_banking = self.normalizer.banking_flag(raw);
                self.backfill(&mut unit, meta, declared_banking);
            }
            self.default_generator(&mut unit);
            units.push(unit);
        }
        units
    }

    fn normalize_consumption(
        &self,
        raws: &[Value],
        month: &str,
        debug_info: &mut AllocationDebug,
    ) -> Vec<Unit> {
        let mut units = Vec::with_capacity(raws.len());
        for (index, raw) in raws.iter().enumerate() {
            let unit = self.normalizer.normalize(raw, UnitKind::Consumption, month);
            if unit.site_id.is_empty() {
                self.skip(SkippedKind::Consumption, index, "missing consumption site id");
                debug_info.skipped_consumption += 1;
                continue;
            }
            if unit.company_id.is_empty() {
                debug!(site_id = %unit.site_id, "用电站点无股东公司, 仅参与结转分配");
            }
            units.push(unit);
        }
        units
    }

    fn normalize_banking(
        &self,
        raws: &[Value],
        month: &str,
        site_meta: &HashMap<String, SiteMeta>,
        debug_info: &mut AllocationDebug,
    ) -> Vec<Unit> {
        let mut units = Vec::new();
        for (index, raw) in raws.iter().enumerate() {
            let mut unit = self.normalizer.normalize(raw, UnitKind::Banking, month);
            if unit.site_id.is_empty() {
                self.skip(SkippedKind::Banking, index, "missing banking site id");
                debug_info.skipped_banking += 1;
                continue;
            }

            if self.config.banking_month_must_match && unit.month != month {
                debug!(
                    site_id = %unit.site_id,
                    unit_month = %unit.month,
                    target_month = %month,
                    "结转单元月份不匹配, 不参与本月分配"
                );
                debug_info.ineligible_banking += 1;
                continue;
            }

            if let Some(meta) = site_meta.get(&unit.site_id) {
                if unit.company_id.is_empty() {
                    unit.company_id = meta.generator_company_id.clone();
                }
            }
            self.default_generator(&mut unit);
            units.push(unit);
        }
        units
    }

    /// 用站点元数据回填发电公司 / 投运日期 / 结转标志
    ///
    /// 结转标志只在记录自身未声明时回填, 显式 false 保持不变
    fn backfill(&self, unit: &mut Unit, meta: &SiteMeta, declared_banking: Option<bool>) {
        if unit.company_id.is_empty() {
            unit.company_id = meta.generator_company_id.clone();
        }
        if unit.commission_date.is_none() {
            unit.commission_date = meta.commission_date;
        }
        if declared_banking.is_none() {
            if let Some(banking_enabled) = meta.banking_enabled {
                unit.banking_enabled = banking_enabled;
            }
        }
    }

    fn default_generator(&self, unit: &mut Unit) {
        if unit.company_id.is_empty() {
            warn!(
                site_id = %unit.site_id,
                default_generator_company_id = %self.config.default_generator_company_id,
                "发电公司缺失, 使用默认发电公司"
            );
            unit.company_id = self.config.default_generator_company_id.clone();
        }
    }

    fn skip(&self, kind: SkippedKind, index: usize, reason: &str) {
        warn!(kind = ?kind, index, reason, "跳过格式错误的原始记录");
        self.events.emit(AllocationEvent::RecordSkipped {
            kind,
            reason: format!("record #{}: {}", index, reason),
        });
    }
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new(AllocationConfig::default())
    }
}

/// 月份键是否为合法 MMYYYY
pub fn is_valid_month_key(month: &str) -> bool {
    month.len() == 6
        && month.chars().all(|c| c.is_ascii_digit())
        && NaiveDate::parse_from_str(&format!("01{}", month), "%d%m%Y").is_ok()
}

/// 单次分配计算（默认配置）
///
/// # 参数
/// - `production_units` / `consumption_units` / `banking_units`: 原始单元记录
/// - `captive_data`: 原始自备协议
/// - `month`: 目标月份 (MMYYYY)
/// - `production_sites`: 发电站点元数据, 仅用于回填
/// - `priority_map`: 用电站点 ID → 优先级 (越小越先)
pub fn calculate_allocations(
    production_units: &[Value],
    consumption_units: &[Value],
    banking_units: &[Value],
    captive_data: &[Value],
    month: &str,
    production_sites: &[Value],
    priority_map: &HashMap<String, i64>,
) -> AllocationOutcome {
    let inputs = AllocationInputs {
        production_units: production_units.to_vec(),
        consumption_units: consumption_units.to_vec(),
        banking_units: banking_units.to_vec(),
        captive_data: captive_data.to_vec(),
        month: month.to_string(),
        production_sites: production_sites.to_vec(),
        consumption_site_priority: priority_map.clone(),
    };
    AllocationEngine::default().calculate(&inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::RecordingEventSink;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_month_key_validation() {
        assert!(is_valid_month_key("082025"));
        assert!(!is_valid_month_key("132025"));
        assert!(!is_valid_month_key("82025"));
        assert!(!is_valid_month_key("08-2025"));
    }

    #[test]
    fn test_missing_month_defaults_to_run_month() {
        let sink = Arc::new(RecordingEventSink::new());
        let engine = AllocationEngine::default().with_event_sink(sink.clone());

        let outcome = engine.calculate_at(&AllocationInputs::default(), fixed_time());
        assert_eq!(outcome.month, "092025");
        assert!(outcome.debug.month_defaulted);
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, AllocationEvent::MonthDefaulted { month } if month == "092025")));
    }

    #[test]
    fn test_missing_month_uses_configured_default() {
        let config = AllocationConfig {
            default_month: Some("012024".to_string()),
            ..AllocationConfig::default()
        };
        let outcome = AllocationEngine::new(config).calculate_at(&AllocationInputs::default(), fixed_time());
        assert_eq!(outcome.month, "012024");
    }

    #[test]
    fn test_backfill_from_site_meta() {
        let inputs = AllocationInputs {
            production_units: vec![json!({"productionSiteId": "P1", "c1": 50})],
            consumption_units: vec![json!({"consumptionSiteId": "C1", "shareholderCompanyId": "S1", "c1": 50})],
            captive_data: vec![json!({"generatorCompanyId": "G7", "shareholderCompanyId": "S1", "percentage": 100})],
            production_sites: vec![json!({"productionSiteId": "P1", "generatorCompanyId": "G7"})],
            month: "082025".to_string(),
            ..AllocationInputs::default()
        };

        let outcome = AllocationEngine::default().calculate_at(&inputs, fixed_time());
        assert_eq!(outcome.allocations.len(), 1);
        assert_eq!(outcome.allocations[0].generator_company_id, "G7");
        assert_eq!(outcome.allocations[0].allocated.c1, 50.0);
    }

    #[test]
    fn test_explicit_banking_flag_survives_site_meta() {
        let inputs = AllocationInputs {
            production_units: vec![
                json!({"productionSiteId": "P1", "generatorCompanyId": "G1", "c1": 50, "bankingEnabled": false}),
                json!({"productionSiteId": "P2", "generatorCompanyId": "G1", "c1": 30}),
            ],
            production_sites: vec![
                json!({"productionSiteId": "P1", "bankingEnabled": true}),
                json!({"productionSiteId": "P2", "bankingEnabled": true}),
            ],
            month: "082025".to_string(),
            ..AllocationInputs::default()
        };

        let outcome = AllocationEngine::default().calculate_at(&inputs, fixed_time());
        assert_eq!(outcome.lapse_allocations.len(), 1);
        assert_eq!(outcome.lapse_allocations[0].production_site_id, "P1");
        assert_eq!(outcome.lapse_allocations[0].allocated.c1, 50.0);
        assert_eq!(outcome.banking_allocations.len(), 1);
        assert_eq!(outcome.banking_allocations[0].production_site_id, "P2");
    }

    #[test]
    fn test_default_generator_applies_when_missing() {
        let inputs = AllocationInputs {
            production_units: vec![json!({"productionSiteId": "P1", "c1": 10})],
            consumption_units: vec![json!({"consumptionSiteId": "C1", "shareholderCompanyId": "S1", "c1": 10})],
            captive_data: vec![json!({"generatorCompanyId": "1", "shareholderCompanyId": "S1", "percentage": 100})],
            month: "082025".to_string(),
            ..AllocationInputs::default()
        };

        let outcome = AllocationEngine::default().calculate_at(&inputs, fixed_time());
        assert_eq!(outcome.allocations.len(), 1);
        assert_eq!(outcome.allocations[0].generator_company_id, "1");
    }

    #[test]
    fn test_skipped_records_counted() {
        let inputs = AllocationInputs {
            production_units: vec![json!(null), json!({"c1": 5})],
            consumption_units: vec![json!("garbage")],
            banking_units: vec![
                json!({"productionSiteId": "P1", "month": "072025", "c1": 5}),
                json!({}),
            ],
            month: "082025".to_string(),
            ..AllocationInputs::default()
        };

        let outcome = AllocationEngine::default().calculate_at(&inputs, fixed_time());
        assert_eq!(outcome.debug.skipped_production, 2);
        assert_eq!(outcome.debug.skipped_consumption, 1);
        assert_eq!(outcome.debug.skipped_banking, 1);
        assert_eq!(outcome.debug.ineligible_banking, 1);
        assert!(outcome.banking_allocations.is_empty());
    }
}
