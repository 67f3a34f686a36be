//! 从母体积裁剪 subtomogram, 并把标注重投影到新坐标系.

use ndarray::s;

use super::{Annotation, Tomogram};
use crate::bounds::array_contains;
use crate::{Idx3d, Pt3d};

/// 裁剪越界错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// 请求的区域在某轴上超出了母体积范围.
    OutOfRange {
        /// 越界的轴.
        axis: usize,
        /// 该轴请求的下界.
        lower: usize,
        /// 该轴请求的长度.
        len: usize,
        /// 母体积在该轴的长度.
        parent_len: usize,
    },
}

/// 母体积的一个裁剪结果.
///
/// 由裁剪出的 [`Tomogram`] 本体与派生信息组成: 母体积的只读引用,
/// 以及裁剪原点 `lower_bounds` (本体积原点在母体积坐标系下的位置).
/// 标注是从母体积重新派生的副本, 与母体积不共享存储.
#[derive(Debug, Clone)]
pub struct Subtomogram<'a> {
    tomo: Tomogram,
    parent: &'a Tomogram,
    lower_bounds: Idx3d,
}

impl<'a> Subtomogram<'a> {
    /// 从 `parent` 裁剪出原点为 `lower_bounds`, 形状为 `shape` 的子体积.
    ///
    /// 标注点按 `point - lower_bounds` 重投影; 落到新范围之外
    /// (逐轴半开区间 `[0, len)`) 的点被滤掉, 点集被滤空的标注整个丢弃
    /// — 不会留下空壳标注. 裁剪区域必须完全位于母体积内, 否则返回
    /// [`ExtractError::OutOfRange`], 绝不静默钳制或回绕.
    pub fn extract(
        parent: &'a Tomogram,
        lower_bounds: Idx3d,
        shape: Idx3d,
    ) -> Result<Self, ExtractError> {
        let lowers = [lower_bounds.0, lower_bounds.1, lower_bounds.2];
        let lens = [shape.0, shape.1, shape.2];
        let parent_shape = parent.shape();
        let parent_lens = [parent_shape.0, parent_shape.1, parent_shape.2];
        for axis in 0..3 {
            let end = lowers[axis].checked_add(lens[axis]);
            if end.map_or(true, |e| e > parent_lens[axis]) {
                return Err(ExtractError::OutOfRange {
                    axis,
                    lower: lowers[axis],
                    len: lens[axis],
                    parent_len: parent_lens[axis],
                });
            }
        }

        let (l0, l1, l2) = lower_bounds;
        let (s0, s1, s2) = shape;
        let data = parent
            .data()
            .slice(s![l0..l0 + s0, l1..l1 + s1, l2..l2 + s2])
            .to_owned();

        let offset: Pt3d = (l0 as i64, l1 as i64, l2 as i64);
        let mut annotations = Vec::with_capacity(parent.annotations().len());
        for parent_annotation in parent.annotations() {
            let new_points: Vec<Pt3d> = parent_annotation
                .points()
                .iter()
                .map(|&(p0, p1, p2)| (p0 - offset.0, p1 - offset.1, p2 - offset.2))
                .filter(|&p| array_contains(shape, p))
                .collect();
            if !new_points.is_empty() {
                annotations.push(Annotation::new(new_points, parent_annotation.name()));
            }
        }

        Ok(Self {
            tomo: Tomogram::new(data, annotations),
            parent,
            lower_bounds,
        })
    }

    /// 裁剪结果本体.
    #[inline]
    pub fn tomogram(&self) -> &Tomogram {
        &self.tomo
    }

    /// 母体积.
    #[inline]
    pub fn parent(&self) -> &'a Tomogram {
        self.parent
    }

    /// 本体积原点在母体积坐标系下的位置.
    #[inline]
    pub fn lower_bounds(&self) -> Idx3d {
        self.lower_bounds
    }

    /// 形状. 转发到 [`Tomogram::shape`].
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.tomo.shape()
    }

    /// 所有标注点 (新坐标系). 转发到 [`Tomogram::annotation_points`].
    #[inline]
    pub fn annotation_points(&self) -> Vec<Pt3d> {
        self.tomo.annotation_points()
    }

    /// 丢弃派生信息, 取出裁剪出的 [`Tomogram`].
    #[inline]
    pub fn into_tomogram(self) -> Tomogram {
        self.tomo
    }
}

#[cfg(test)]
mod tests {
    use super::{ExtractError, Subtomogram};
    use crate::bounds::array_contains;
    use crate::data::{Annotation, Tomogram};
    use ndarray::Array3;

    /// (50, 100, 200) 体积, 单标注 `"1"` 含点 `(1, 2, 3)`.
    fn sample_tomogram() -> Tomogram {
        let data = Array3::from_shape_fn((50, 100, 200), |(z, x, y)| (z * 100_000 + x * 200 + y) as f32);
        Tomogram::new(data, vec![Annotation::new(vec![(1, 2, 3)], "1")])
    }

    #[test]
    fn test_extract_keeps_in_range_point() {
        let tomo = sample_tomogram();
        let sub = Subtomogram::extract(&tomo, (0, 0, 0), (2, 3, 4)).unwrap();

        assert_eq!(sub.shape(), (2, 3, 4));
        assert_eq!(sub.lower_bounds(), (0, 0, 0));
        // 原点不变的裁剪下, 点坐标保持不变.
        assert_eq!(sub.annotation_points(), vec![(1, 2, 3)]);
        assert_eq!(sub.tomogram().annotations()[0].name(), "1");
    }

    #[test]
    fn test_extract_reprojects_to_origin() {
        let tomo = sample_tomogram();
        let sub = Subtomogram::extract(&tomo, (1, 2, 3), (2, 3, 4)).unwrap();
        assert_eq!(sub.annotation_points(), vec![(0, 0, 0)]);
    }

    /// 点被重投影到 `(-1, -1, -1)`, 标注整个消失.
    #[test]
    fn test_extract_drops_out_of_range_annotation() {
        let tomo = sample_tomogram();
        let sub = Subtomogram::extract(&tomo, (2, 3, 4), (2, 3, 4)).unwrap();
        assert!(sub.tomogram().annotations().is_empty());
    }

    /// 上界取开: 点恰好超出新形状一个体素时同样被丢弃.
    #[test]
    fn test_extract_upper_bound_is_exclusive() {
        let data = Array3::zeros((10, 10, 10));
        let tomo = Tomogram::new(data, vec![Annotation::new(vec![(5, 2, 2)], "edge")]);

        // 点重投影为 (5, 2, 2), 但新形状轴 0 只有 [0, 5).
        let sub = Subtomogram::extract(&tomo, (0, 0, 0), (5, 5, 5)).unwrap();
        assert!(sub.tomogram().annotations().is_empty());

        // 形状大一个体素时点就能存活.
        let sub = Subtomogram::extract(&tomo, (0, 0, 0), (6, 5, 5)).unwrap();
        assert_eq!(sub.annotation_points(), vec![(5, 2, 2)]);
    }

    /// 全量裁剪完全复现母体积.
    #[test]
    fn test_extract_identity_round_trip() {
        let tomo = sample_tomogram();
        let sub = Subtomogram::extract(&tomo, (0, 0, 0), tomo.shape()).unwrap();

        assert_eq!(sub.tomogram().data(), tomo.data());
        assert_eq!(sub.annotation_points(), tomo.annotation_points());
    }

    #[test]
    fn test_extract_copies_data_block() {
        let tomo = sample_tomogram();
        let sub = Subtomogram::extract(&tomo, (3, 4, 5), (2, 2, 2)).unwrap();
        // 子块体素与母体积对应位置一致.
        assert_eq!(sub.tomogram()[(0, 0, 0)], tomo[(3, 4, 5)]);
        assert_eq!(sub.tomogram()[(1, 1, 1)], tomo[(4, 5, 6)]);
    }

    #[test]
    fn test_extract_out_of_range() {
        let tomo = sample_tomogram();
        let err = Subtomogram::extract(&tomo, (49, 0, 0), (2, 3, 4)).unwrap_err();
        assert_eq!(
            err,
            ExtractError::OutOfRange {
                axis: 0,
                lower: 49,
                len: 2,
                parent_len: 50,
            }
        );
    }

    /// 裁剪后不变式: 存活点都落在新形状内.
    #[test]
    fn test_extract_invariant_points_in_shape() {
        let tomo = Tomogram::new(
            Array3::zeros((20, 20, 20)),
            vec![
                Annotation::new(vec![(0, 0, 0), (5, 5, 5), (19, 19, 19)], "a"),
                Annotation::new(vec![(10, 3, 18)], "b"),
            ],
        );
        let shape = (8, 8, 8);
        let sub = Subtomogram::extract(&tomo, (4, 2, 12), shape).unwrap();
        for p in sub.annotation_points() {
            assert!(array_contains(shape, p));
        }
    }
}
