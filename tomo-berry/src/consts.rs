//! 通用常量.

use crate::Idx3d;

/// 默认采样体积形状.
pub const DEFAULT_VOL_SHAPE: Idx3d = (64, 256, 256);

/// 默认正采样边距: 目标点在裁剪结果中距各面不少于该体素数.
pub const DEFAULT_PADS: Idx3d = (8, 32, 32);

/// 负采样的默认重试预算.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// 对比度拉伸窗口的下分位点 (%).
pub const STRETCH_LOWER_PERCENTILE: f64 = 2.0;

/// 对比度拉伸窗口的上分位点 (%).
pub const STRETCH_UPPER_PERCENTILE: f64 = 98.0;
