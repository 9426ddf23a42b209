// ==========================================
// 月度电量分配系统 - 自备协议汇总
// ==========================================
// 职责: 原始自备协议 → 发电公司 × 活跃股东 比例表
// 输入: 原始协议记录（可能含 null / 缺字段）
// 输出: generator_id → { shareholders, total_percentage }
// 红线: 单条坏记录只跳过, 不影响整批
// ==========================================

use crate::domain::captive::{ActiveShareholder, CaptiveShare, GeneratorCaptive};
use crate::domain::types::CaptiveStatus;
use crate::engine::events::{AllocationEvent, OptionalEventSink, SkippedKind};
use crate::engine::percentage::{to_whole_percentages, FULL_PERCENTAGE};
use crate::importer::ValueCleaner;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// 汇总结果
#[derive(Debug, Clone, Default)]
pub struct CaptiveMap {
    generators: BTreeMap<String, GeneratorCaptive>,
    pub skipped: usize,  // 格式错误被丢弃
    pub inactive: usize, // 非活跃或比例为 0
}

impl CaptiveMap {
    pub fn get(&self, generator_id: &str) -> Option<&GeneratorCaptive> {
        self.generators.get(generator_id)
    }

    pub fn generators(&self) -> impl Iterator<Item = (&String, &GeneratorCaptive)> {
        self.generators.iter()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// 取某发电公司的活跃股东（整数比例, 降序）
    ///
    /// 整数比例由最大余数法得到, 合计恰为 100; 比例为 0 的股东不参与分配。
    /// 比例相同时保持协议首次出现顺序。
    pub fn active_shareholders(&self, generator_id: &str) -> Vec<ActiveShareholder> {
        let Some(captive) = self.generators.get(generator_id) else {
            return Vec::new();
        };

        let active: Vec<&CaptiveShare> = captive
            .shareholders
            .iter()
            .filter(|s| s.status == CaptiveStatus::Active)
            .collect();
        let raw: Vec<f64> = active.iter().map(|s| s.percentage).collect();
        let whole = to_whole_percentages(&raw);

        let mut result: Vec<ActiveShareholder> = active
            .into_iter()
            .zip(whole)
            .filter(|(_, pct)| *pct > 0)
            .map(|(share, pct)| ActiveShareholder {
                shareholder_id: share.shareholder_id.clone(),
                name: share.name.clone(),
                percentage: pct,
            })
            .collect();

        result.sort_by(|a, b| b.percentage.cmp(&a.percentage));
        result
    }
}

// ==========================================
// CaptiveMapBuilder - 自备协议汇总器
// ==========================================
pub struct CaptiveMapBuilder {
    tolerance: f64,
    cleaner: ValueCleaner,
}

impl CaptiveMapBuilder {
    /// # 参数
    /// - `tolerance`: 合计偏离 100 超过该值时整体缩放
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            cleaner: ValueCleaner,
        }
    }

    /// 汇总自备协议
    ///
    /// 步骤:
    /// 1) 丢弃 null / 发电或股东 ID 为空的记录（告警后继续）
    /// 2) 比例截断到 [0, 100], 状态转小写; 非 active 或比例 <= 0 忽略
    /// 3) 同一 (发电, 股东) 的比例累加, 同时累计发电公司合计
    /// 4) 合计偏离 100 超过容差的发电公司, 按 100 / 合计 等比缩放
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub fn build(&self, entries: &[Value], events: &OptionalEventSink) -> CaptiveMap {
        let mut map = CaptiveMap::default();

        for (index, entry) in entries.iter().enumerate() {
            if !entry.is_object() {
                self.skip(&mut map, events, format!("entry #{} is not an object", index));
                continue;
            }

            let generator_id = self.text(entry, &["generatorCompanyId", "generatorId"]);
            let shareholder_id = self.text(entry, &["shareholderCompanyId", "shareholderId"]);
            if generator_id.is_empty() || shareholder_id.is_empty() {
                self.skip(
                    &mut map,
                    events,
                    format!(
                        "entry #{} missing ids: generator='{}', shareholder='{}'",
                        index, generator_id, shareholder_id
                    ),
                );
                continue;
            }

            let percentage = self
                .cleaner
                .number(lookup(
                    entry,
                    &["effectiveAllocationPercentage", "allocationPercentage", "percentage"],
                ))
                .clamp(0.0, FULL_PERCENTAGE as f64);
            let status = CaptiveStatus::from_raw(&self.text(entry, &["allocationStatus", "status"]));

            if status != CaptiveStatus::Active || percentage <= 0.0 {
                debug!(
                    generator_id = %generator_id,
                    shareholder_id = %shareholder_id,
                    status = %status,
                    percentage,
                    "忽略非活跃或零比例自备协议"
                );
                map.inactive += 1;
                continue;
            }

            let name = self.text(
                entry,
                &["shareholderCompanyName", "shareholderName", "companyName"],
            );

            let captive = map.generators.entry(generator_id).or_default();
            match captive.get_mut(&shareholder_id) {
                Some(share) => {
                    share.percentage += percentage;
                    if share.name.is_empty() {
                        share.name = name;
                    }
                }
                None => captive.shareholders.push(CaptiveShare {
                    shareholder_id,
                    percentage,
                    status,
                    name,
                }),
            }
            captive.total_percentage += percentage;
        }

        for (generator_id, captive) in map.generators.iter_mut() {
            self.rescale(generator_id, captive);
        }

        map
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn rescale(&self, generator_id: &str, captive: &mut GeneratorCaptive) {
        let total = captive.total_percentage;
        let target = FULL_PERCENTAGE as f64;
        if total <= 0.0 || (total - target).abs() <= self.tolerance {
            return;
        }

        let factor = target / total;
        debug!(generator_id, total, factor, "自备比例合计偏离 100, 等比缩放");
        for share in captive.shareholders.iter_mut() {
            share.percentage *= factor;
        }
        captive.total_percentage = captive.shareholders.iter().map(|s| s.percentage).sum();
    }

    fn skip(&self, map: &mut CaptiveMap, events: &OptionalEventSink, reason: String) {
        warn!(reason = %reason, "跳过格式错误的自备协议");
        map.skipped += 1;
        events.emit(AllocationEvent::RecordSkipped {
            kind: SkippedKind::Captive,
            reason,
        });
    }

    fn text(&self, entry: &Value, aliases: &[&str]) -> String {
        self.cleaner.text(lookup(entry, aliases))
    }
}

impl Default for CaptiveMapBuilder {
    fn default() -> Self {
        Self::new(0.01)
    }
}

fn lookup<'a>(entry: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| entry.get(alias))
        .find(|v| !v.is_null())
}
