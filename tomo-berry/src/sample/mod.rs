//! subtomogram 正/负采样.
//!
//! 正采样: 在保证目标点落入裁剪结果、且距各面不少于给定边距的前提下,
//! 均匀随机选择裁剪原点. 负采样: 拒绝采样 — 反复随机选择原点,
//! 直到候选区域不含任何标注点或预算耗尽.

mod error;

pub use error::{SampleError, SampleResult};

use itertools::izip;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bounds::region_contains;
use crate::consts::{DEFAULT_MAX_ATTEMPTS, DEFAULT_PADS, DEFAULT_VOL_SHAPE};
use crate::data::{Subtomogram, Tomogram};
use crate::{Idx3d, Pt3d};

#[inline]
fn arr((a, b, c): Idx3d) -> [usize; 3] {
    [a, b, c]
}

#[inline]
fn pt_arr((a, b, c): Pt3d) -> [i64; 3] {
    [a, b, c]
}

/// subtomogram 采样器.
///
/// 持有母体积引用、目标体积形状、正采样边距与随机数生成器.
/// 生成器被采样器独占, 并在每次采样调用中显式消耗 — 需要可复现
/// 序列时用 [`with_rng`](Self::with_rng) 传入已播种的生成器,
/// 相同种子与调用顺序给出完全相同的采样序列.
#[derive(Debug)]
pub struct SubtomogramGenerator<'a, R = StdRng> {
    tomogram: &'a Tomogram,
    vol_shape: Idx3d,
    pads: Idx3d,
    rng: R,
}

impl<'a> SubtomogramGenerator<'a, StdRng> {
    /// 以熵源播种的默认生成器构建采样器.
    pub fn new(tomogram: &'a Tomogram) -> Self {
        Self::with_rng(tomogram, StdRng::from_entropy())
    }
}

impl<'a, R: Rng> SubtomogramGenerator<'a, R> {
    /// 用调用者提供的生成器构建采样器.
    /// 目标体积形状与边距取默认值 (64, 256, 256) / (8, 32, 32).
    pub fn with_rng(tomogram: &'a Tomogram, rng: R) -> Self {
        Self {
            tomogram,
            vol_shape: DEFAULT_VOL_SHAPE,
            pads: DEFAULT_PADS,
            rng,
        }
    }

    /// 替换目标体积形状.
    pub fn set_vol_shape(&mut self, vol_shape: Idx3d) {
        self.vol_shape = vol_shape;
    }

    /// 替换正采样边距.
    pub fn set_pads(&mut self, pads: Idx3d) {
        self.pads = pads;
    }

    /// 母体积.
    #[inline]
    pub fn tomogram(&self) -> &'a Tomogram {
        self.tomogram
    }

    /// 随机选一个标注点做正采样.
    ///
    /// 分两层抽取: 先均匀抽一个标注, 再从该标注中均匀抽一个点 —
    /// 点多的标注 **不会** 因此获得更高权重. 母体积没有任何标注时
    /// 返回 [`SampleError::NoAnnotations`].
    pub fn positive_sample(&mut self) -> SampleResult<Subtomogram<'a>> {
        let annotations = self.tomogram.annotations();
        if annotations.is_empty() {
            return Err(SampleError::NoAnnotations);
        }
        let annotation = &annotations[self.rng.gen_range(0..annotations.len())];
        // 空标注不会被挂到体积上.
        let point = annotation.points()[self.rng.gen_range(0..annotation.len())];
        self.positive_sample_at(point)
    }

    /// 对给定目标点做正采样.
    ///
    /// 逐轴独立计算可行裁剪原点的半开区间
    /// `[max(0, pt - vs + pad), min(ts - vs, pt - pad))` 并均匀抽取;
    /// 这样目标点在裁剪结果中距两侧面都不少于 `pads` 体素.
    /// 区间为空 (`high < low`) 时返回 [`SampleError::InfeasibleAxis`],
    /// 不会退而求其次; 区间退化成单点时直接取该点.
    pub fn positive_sample_at(&mut self, point: Pt3d) -> SampleResult<Subtomogram<'a>> {
        let mut lowers = [0usize; 3];
        let per_axis = izip!(
            arr(self.tomogram.shape()),
            arr(self.vol_shape),
            pt_arr(point),
            arr(self.pads)
        );
        for (axis, (ts, vs, pt, pad)) in per_axis.enumerate() {
            let (ts, vs, pad) = (ts as i64, vs as i64, pad as i64);
            let low = (pt - vs + pad).max(0);
            let high = (ts - vs).min(pt - pad);
            if high < low {
                return Err(SampleError::InfeasibleAxis { axis, low, high });
            }
            let lower = if high == low {
                low
            } else {
                self.rng.gen_range(low..high)
            };
            lowers[axis] = lower as usize;
        }

        let lower_bounds = (lowers[0], lowers[1], lowers[2]);
        // 所选区域必然覆盖目标点.
        debug_assert!({
            let (v0, v1, v2) = self.vol_shape;
            region_contains(
                [
                    (lowers[0] as i64, (lowers[0] + v0) as i64),
                    (lowers[1] as i64, (lowers[1] + v1) as i64),
                    (lowers[2] as i64, (lowers[2] + v2) as i64),
                ],
                point,
            )
        });

        Ok(Subtomogram::extract(
            self.tomogram,
            lower_bounds,
            self.vol_shape,
        )?)
    }

    /// 以默认预算 (1000 次) 做负采样.
    #[inline]
    pub fn negative_sample(&mut self) -> SampleResult<Subtomogram<'a>> {
        self.negative_sample_within(DEFAULT_MAX_ATTEMPTS)
    }

    /// 拒绝采样: 均匀随机选择原点, 直到候选区域不含任何标注点.
    ///
    /// 原点逐轴从 `[0, ts - vs)` 均匀抽取 (两者相等时只有 0 一个候选);
    /// 候选区域按闭区间 `[lb, lb + vs]` 逐轴检查全部标注点 —
    /// 点恰好压在区域上表面也算命中, 从而被拒绝. 连续 `max_attempts`
    /// 次都被拒绝时返回 [`SampleError::Exhausted`]: 这是 "预算内
    /// 找不到" 的显式报告, 不是输入错误.
    pub fn negative_sample_within(&mut self, max_attempts: u32) -> SampleResult<Subtomogram<'a>> {
        let ts = arr(self.tomogram.shape());
        let vs = arr(self.vol_shape);

        // 目标体积在某轴上放不下时, 重试再多次也没有意义.
        for axis in 0..3 {
            if ts[axis] < vs[axis] {
                return Err(SampleError::InfeasibleAxis {
                    axis,
                    low: 0,
                    high: ts[axis] as i64 - vs[axis] as i64,
                });
            }
        }

        for attempt in 0..max_attempts {
            let mut lowers = [0usize; 3];
            let mut bounds = [(0i64, 0i64); 3];
            for axis in 0..3 {
                let span = ts[axis] - vs[axis];
                let lower = if span == 0 {
                    0
                } else {
                    self.rng.gen_range(0..span)
                };
                lowers[axis] = lower;
                bounds[axis] = (lower as i64, (lower + vs[axis]) as i64);
            }

            if self.tomogram.iter_points().any(|p| region_contains(bounds, p)) {
                continue;
            }

            if attempt > 0 {
                debug!("负采样在第 {} 次尝试找到候选区域", attempt + 1);
            }
            let lower_bounds = (lowers[0], lowers[1], lowers[2]);
            return Ok(Subtomogram::extract(
                self.tomogram,
                lower_bounds,
                self.vol_shape,
            )?);
        }

        Err(SampleError::Exhausted {
            attempts: max_attempts,
        })
    }
}
