use std::ops::Index;

use ndarray::{Array3, ArrayView, Ix3};

use crate::{Idx3d, Pt3d};

mod contrast;
mod file;
mod mrc;
mod subtomo;

pub use contrast::stretch_contrast;
pub use file::{read_volume, OpenTomogramError, OpenTomogramResult, TomogramFile, VOLUME_EXTENSIONS};
pub use mrc::{read_mrc, MrcError};
pub use subtomo::{ExtractError, Subtomogram};

/// 一组同类目标的标注点, 以及其显示名.
///
/// 构建后不可修改. 点集可以为空 (例如裁剪把点全部滤掉之后),
/// 但空标注绝不会被挂到 [`Tomogram`] 上 — 裁剪例程会直接丢弃它.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    points: Vec<Pt3d>,
    name: String,
}

impl Annotation {
    /// 由点集和显示名构建标注.
    pub fn new<S: Into<String>>(points: Vec<Pt3d>, name: S) -> Self {
        Self {
            points,
            name: name.into(),
        }
    }

    /// 标注点集.
    #[inline]
    pub fn points(&self) -> &[Pt3d] {
        &self.points
    }

    /// 显示名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 点的个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 点集是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// 3D 断层扫描体数据, 以及挂在其上的全部标注. 体素值以 `f32` 保存.
///
/// 该结构独占自己的数据与标注; 形状总是从数据本身导出, 两者不会失配.
/// 数据一经构建即固定 — 想替换数据只能经由文件后备结构
/// [`TomogramFile`] 的显式 `reload`.
#[derive(Debug, Clone)]
pub struct Tomogram {
    data: Array3<f32>,
    annotations: Vec<Annotation>,
}

impl Tomogram {
    /// 由体数据和初始标注构建.
    pub fn new(data: Array3<f32>, annotations: Vec<Annotation>) -> Self {
        Self { data, annotations }
    }

    /// 数据形状, 即各轴体素个数.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 体素总数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 追加一个标注. 这是 [`Tomogram`] 唯一的变更入口,
    /// 插入顺序即保存顺序.
    ///
    /// 这里信任调用方给出的坐标, 不对点做越界检查.
    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    /// 全部标注, 按插入顺序.
    #[inline]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// 第 `index` 个标注的点集.
    ///
    /// `index` 越界时 panic.
    #[inline]
    pub fn annotation_points_of(&self, index: usize) -> &[Pt3d] {
        self.annotations[index].points()
    }

    /// 按标注顺序拼接所有标注点, 返回一份新副本.
    /// 调用方可以随意改动返回值, 不会影响标注本身.
    pub fn annotation_points(&self) -> Vec<Pt3d> {
        self.iter_points().collect()
    }

    /// 按标注顺序迭代所有标注点. 不分配中间存储.
    pub fn iter_points(&self) -> impl Iterator<Item = Pt3d> + '_ {
        self.annotations
            .iter()
            .flat_map(|a| a.points().iter().copied())
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 拆出全部标注, 消耗自身.
    #[inline]
    pub fn into_annotations(self) -> Vec<Annotation> {
        self.annotations
    }
}

impl Index<Idx3d> for Tomogram {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}
