// ==========================================
// CaptiveMapBuilder 集成测试
// ==========================================
// 测试目标: 自备协议汇总与比例归一化
// 覆盖范围: 别名、状态过滤、累加、缩放、整数比例
// ==========================================

use energy_allocation::engine::{CaptiveMapBuilder, OptionalEventSink};
use serde_json::{json, Value};

fn build(entries: &[Value]) -> energy_allocation::engine::CaptiveMap {
    CaptiveMapBuilder::default().build(entries, &OptionalEventSink::none())
}

#[test]
fn test_percentage_aliases_in_priority_order() {
    let map = build(&[json!({
        "generatorCompanyId": "G1",
        "shareholderCompanyId": "S1",
        "effectiveAllocationPercentage": "100",
        "allocationPercentage": 20,
        "percentage": 10
    })]);

    let captive = map.get("G1").unwrap();
    assert_eq!(captive.get("S1").unwrap().percentage, 100.0);
}

#[test]
fn test_duplicate_pairs_accumulate() {
    let map = build(&[
        json!({"generatorCompanyId": "G1", "shareholderCompanyId": "S1", "percentage": 30}),
        json!({"generatorCompanyId": "G1", "shareholderCompanyId": "S1", "percentage": 20}),
        json!({"generatorCompanyId": "G1", "shareholderCompanyId": "S2", "percentage": 50}),
    ]);

    let captive = map.get("G1").unwrap();
    assert_eq!(captive.shareholders.len(), 2);
    assert_eq!(captive.get("S1").unwrap().percentage, 50.0);
    assert!((captive.total_percentage - 100.0).abs() < 1e-9);
}

#[test]
fn test_partial_claims_rescaled_to_hundred() {
    let map = build(&[
        json!({"generatorCompanyId": "G1", "shareholderCompanyId": "S1", "percentage": 30}),
        json!({"generatorCompanyId": "G1", "shareholderCompanyId": "S2", "percentage": 10}),
    ]);

    let active = map.active_shareholders("G1");
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].shareholder_id, "S1");
    assert_eq!(active[0].percentage, 75);
    assert_eq!(active[1].percentage, 25);
}

#[test]
fn test_inactive_and_malformed_entries_excluded() {
    let map = build(&[
        json!(null),
        json!({"generatorCompanyId": "", "shareholderCompanyId": "S1", "percentage": 50}),
        json!({"generatorCompanyId": "G1", "shareholderCompanyId": "S1", "percentage": 50, "status": "Inactive"}),
        json!({"generatorCompanyId": "G1", "shareholderCompanyId": "S2", "percentage": 0}),
        json!({"generatorCompanyId": "G1", "shareholderCompanyId": "S3", "percentage": 100, "status": "ACTIVE"}),
    ]);

    assert_eq!(map.skipped, 2);
    assert_eq!(map.inactive, 2);
    let active = map.active_shareholders("G1");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].shareholder_id, "S3");
    assert_eq!(active[0].percentage, 100);
}

#[test]
fn test_whole_percentages_always_sum_to_hundred() {
    let map = build(&[
        json!({"generatorCompanyId": "G1", "shareholderCompanyId": "S1", "percentage": 1}),
        json!({"generatorCompanyId": "G1", "shareholderCompanyId": "S2", "percentage": 1}),
        json!({"generatorCompanyId": "G1", "shareholderCompanyId": "S3", "percentage": 1}),
    ]);

    let active = map.active_shareholders("G1");
    let total: u32 = active.iter().map(|s| s.percentage).sum();
    assert_eq!(total, 100);
    assert_eq!(active[0].percentage, 34);
}

#[test]
fn test_unknown_generator_has_no_shareholders() {
    let map = build(&[]);
    assert!(map.is_empty());
    assert!(map.active_shareholders("G404").is_empty());
}
