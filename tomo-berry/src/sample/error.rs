//! 采样运行时错误.

use crate::data::ExtractError;

/// 采样运行时错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    /// 约束下某轴不存在可行的裁剪原点.
    ///
    /// 携带该轴编号与计算出的可行半开区间端点; `high < low` 即为空.
    /// 通常意味着 tomogram 相对目标体积 (或边距) 太小 —
    /// 这是输入几何不可行, 与 [`Exhausted`](Self::Exhausted) 无关.
    InfeasibleAxis {
        /// 不可行的轴.
        axis: usize,
        /// 可行区间下端.
        low: i64,
        /// 可行区间上端 (不含).
        high: i64,
    },

    /// 体积上没有任何标注, 无法默认抽取目标点.
    NoAnnotations,

    /// 负采样在预算内没有找到不含标注点的区域.
    ///
    /// 语义是 "预算内不存在这样的区域", 而不是输入非法 —
    /// 标注过密或过多的 tomogram 会触发它.
    Exhausted {
        /// 用掉的尝试次数.
        attempts: u32,
    },

    /// 裁剪越界. 采样自身会先验证边界, 正常流程不应出现.
    Extract(ExtractError),
}

impl From<ExtractError> for SampleError {
    fn from(e: ExtractError) -> Self {
        Self::Extract(e)
    }
}

/// 采样结果.
pub type SampleResult<T> = Result<T, SampleError>;
