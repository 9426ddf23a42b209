// ==========================================
// 月度电量分配系统 - 比例取整 (最大余数法)
// ==========================================
// 职责: 小数比例 → 整数比例, 合计恰为 100
// 红线: 余数相同时按输入顺序, 结果可复现
// ==========================================

use std::cmp::Ordering;

/// 目标合计
pub const FULL_PERCENTAGE: i64 = 100;

/// 最大余数法取整
///
/// 规则:
/// 1) 每项取 floor
/// 2) 缺口 = 100 - Σfloor, 按小数部分降序逐项 +1（缺口超过项数时循环分配）
/// 3) 合计超过 100 时, 按小数部分升序逐项 -1（不低于 0）
///
/// 非有限值与负值按 0 处理。输入为空时返回空。
///
/// # 参数
/// - `values`: 小数比例列表
///
/// # 返回
/// 与输入等长的整数比例, 非空时合计恰为 100
pub fn to_whole_percentages(values: &[f64]) -> Vec<u32> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let sanitized: Vec<f64> = values
        .iter()
        .map(|v| if v.is_finite() && *v > 0.0 { *v } else { 0.0 })
        .collect();

    let mut whole: Vec<i64> = sanitized.iter().map(|v| v.floor() as i64).collect();
    let mut shortfall = FULL_PERCENTAGE - whole.iter().sum::<i64>();

    // 小数部分降序; sort_by 稳定, 相同余数保持输入顺序
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let rem_a = sanitized[a] - sanitized[a].floor();
        let rem_b = sanitized[b] - sanitized[b].floor();
        rem_b.partial_cmp(&rem_a).unwrap_or(Ordering::Equal)
    });

    let mut cursor = 0usize;
    while shortfall > 0 {
        whole[order[cursor % n]] += 1;
        shortfall -= 1;
        cursor += 1;
    }

    cursor = 0;
    while shortfall < 0 {
        let idx = order[n - 1 - (cursor % n)];
        if whole[idx] > 0 {
            whole[idx] -= 1;
            shortfall += 1;
        }
        cursor += 1;
    }

    whole.into_iter().map(|v| v.max(0) as u32).collect()
}
