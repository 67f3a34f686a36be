#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 为冷冻电镜断层扫描 (cryo-ET) 体数据提供机器学习训练样本的
//! 采样功能: 从大 tomogram 中裁出固定大小的 subtomogram, 正样本保证
//! 包含目标标注点 (且距各面不少于给定边距), 负样本保证不含任何已知
//! 标注点.
//!
//! 该 crate 仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 全部坐标按固定轴序组织: 轴 0 为 z (切片方向). 轴序只在加载时由
//!   各 loader 归一化一次, 之后不再推断.
//! 2. 在非期望情况下 (违反调用契约), 程序会直接 panic, 而不会导致
//!   内存错误. As what Rust promises. 运行时可恢复的失败一律以
//!   `Result` 上报.
//!
//! # 功能概览
//!
//! ### 点包含性判定 ✅
//!
//! 区域闭区间包含与数组索引合法性两种谓词, 上界语义有意不同.
//!
//! 实现位于 `tomo-berry/src/bounds.rs`.
//!
//! ### tomogram / 标注数据模型 ✅
//!
//! [`Tomogram`] 独占体数据与其上的全部 [`Annotation`];
//! [`TomogramFile`] 提供文件后备的延迟加载 (含对比度拉伸) 与重载.
//!
//! 实现位于 `tomo-berry/src/data`.
//!
//! ### subtomogram 裁剪 ✅
//!
//! 从母体积裁出子块, 并把标注点重投影到新坐标系, 滤掉越界点,
//! 丢弃点集被滤空的标注.
//!
//! 实现位于 `tomo-berry/src/data/subtomo.rs`.
//!
//! ### 正/负采样 ✅
//!
//! 带边距约束的均匀随机正采样与拒绝式负采样. 随机数生成器由采样器
//! 独占, 可传入已播种的生成器获得完全可复现的采样序列.
//!
//! 实现位于 `tomo-berry/src/sample`.
//!
//! ### 体数据与标注文件加载 ✅
//!
//! MRC2014 (`.mrc`/`.rec`) 与 numpy (`.npy`) 体数据;
//! IMOD 模型 (`.mod`) 与 CryoET Data Portal (`.ndjson`) 标注.
//!
//! 实现位于 `tomo-berry/src/data` 与 `tomo-berry/src/annot`.
//!
//! ### 数据集发现 ✅
//!
//! 用声明式规则在目录树中配对 tomogram 与标注文件.
//!
//! 实现位于 `tomo-berry/src/dataset`.

/// 三维索引 (轴 0 为 z). 也用作形状与非负偏移向量.
pub type Idx3d = (usize, usize, usize);

/// 三维标注点. 取有符号类型, 因为重投影减去偏移后坐标可能暂时为负,
/// 这些中间值要能被越界检查看到, 而不是在无符号类型上回绕.
pub type Pt3d = (i64, i64, i64);

pub mod annot;
pub mod bounds;
pub mod consts;

/// 体数据基础结构.
mod data;

pub use data::{
    read_mrc, read_volume, stretch_contrast, Annotation, ExtractError, MrcError,
    OpenTomogramError, OpenTomogramResult, Subtomogram, Tomogram, TomogramFile,
    VOLUME_EXTENSIONS,
};

pub mod dataset;
pub mod prelude;
pub mod sample;
