//! 点包含性判定.
//!
//! 两个谓词的上界语义不同: [`region_contains`] 把区域当作实区间,
//! 上界取闭; [`array_contains`] 检查数组索引合法性, 上界取开.
//! 调用处依赖这一差别, 不要 "统一" 它们.

use crate::{Idx3d, Pt3d};

/// 判断 `point` 是否落在 `bounds` 描述的区域中.
///
/// `bounds` 逐轴给出 `(lower, upper)`, 按 **闭区间** `[lower, upper]`
/// 理解 — 点恰好落在上界上也算包含.
#[inline]
pub fn region_contains(bounds: [(i64, i64); 3], point: Pt3d) -> bool {
    let [b0, b1, b2] = bounds;
    let (p0, p1, p2) = point;
    axis_in(b0, p0) && axis_in(b1, p1) && axis_in(b2, p2)
}

#[inline]
fn axis_in((lower, upper): (i64, i64), p: i64) -> bool {
    lower <= p && p <= upper
}

/// 判断 `point` 是否是形状为 `shape` 的数组的合法索引.
///
/// 逐轴按半开区间 `[0, len)` 理解, 与 [`region_contains`] 的闭上界
/// 有意不同.
#[inline]
pub fn array_contains(shape: Idx3d, point: Pt3d) -> bool {
    let (s0, s1, s2) = shape;
    let (p0, p1, p2) = point;
    axis_indexable(s0, p0) && axis_indexable(s1, p1) && axis_indexable(s2, p2)
}

#[inline]
fn axis_indexable(len: usize, p: i64) -> bool {
    0 <= p && (p as u64) < (len as u64)
}
