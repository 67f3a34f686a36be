//! 对比度拉伸.

use ndarray::Array3;
use ordered_float::OrderedFloat;

use crate::consts::{STRETCH_LOWER_PERCENTILE, STRETCH_UPPER_PERCENTILE};

/// 求已排序数据的 `q` 分位数 (线性插值), `0 <= q <= 100`.
///
/// `sorted` 必须非空且已升序排列.
fn percentile(sorted: &[OrderedFloat<f32>], q: f64) -> f32 {
    debug_assert!(!sorted.is_empty());
    debug_assert!((0.0..=100.0).contains(&q));

    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    let (a, b) = (sorted[lo].0 as f64, sorted[hi].0 as f64);
    (a + (b - a) * frac) as f32
}

/// 把数据的灰度分布在 2% 和 98% 分位点之间线性拉伸到 `[0, 1]`.
///
/// 分位窗之外的值被钳到区间端点; 分位窗退化 (两个分位点相等) 时所有
/// 值映射为 0. 空数组是 no-op.
///
/// 每个体积在加载时默认应用一次该滤波; 它与采样逻辑完全无关.
pub fn stretch_contrast(data: &mut Array3<f32>) {
    if data.is_empty() {
        return;
    }

    let mut sorted: Vec<OrderedFloat<f32>> = data.iter().copied().map(OrderedFloat).collect();
    sorted.sort_unstable();

    let p_lo = percentile(&sorted, STRETCH_LOWER_PERCENTILE);
    let p_hi = percentile(&sorted, STRETCH_UPPER_PERCENTILE);
    let width = p_hi - p_lo;
    if width <= 0.0 {
        data.fill(0.0);
        return;
    }

    data.mapv_inplace(|v| ((v - p_lo) / width).clamp(0.0, 1.0));
}

#[cfg(test)]
mod tests {
    use super::stretch_contrast;
    use ndarray::Array3;

    fn float_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    /// 0..=100 的线性数据: 分位点恰为 2 和 98.
    #[test]
    fn test_stretch_linear_ramp() {
        let mut data = Array3::from_shape_fn((101, 1, 1), |(z, _, _)| z as f32);
        stretch_contrast(&mut data);

        // 窗下端与窗上端.
        assert!(float_eq(data[(2, 0, 0)], 0.0));
        assert!(float_eq(data[(98, 0, 0)], 1.0));
        // 窗中点.
        assert!(float_eq(data[(50, 0, 0)], 0.5));
        // 窗外的值被钳制.
        assert!(float_eq(data[(0, 0, 0)], 0.0));
        assert!(float_eq(data[(100, 0, 0)], 1.0));

        for v in data.iter() {
            assert!((0.0..=1.0).contains(v));
        }
    }

    #[test]
    fn test_stretch_constant_data() {
        let mut data = Array3::from_elem((4, 4, 4), 7.5);
        stretch_contrast(&mut data);
        assert!(data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_stretch_changes_contrast() {
        // 一个远离主体分布的离群值不应支配拉伸窗口.
        let mut data = Array3::from_shape_fn((10, 10, 10), |(z, x, y)| (z + x + y) as f32);
        data[(0, 0, 0)] = -1e6;
        let orig = data.clone();

        stretch_contrast(&mut data);
        assert_eq!(data.dim(), orig.dim());
        assert!(data != orig);
        assert!(float_eq(data[(0, 0, 0)], 0.0));
        // 主体分布仍然有梯度.
        assert!(data[(9, 9, 9)] > data[(5, 5, 5)]);
    }
}
