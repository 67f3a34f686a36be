//! 文件后备的标注: 格式分发与 tomogram 形状推断.

use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::data::Annotation;
use crate::{Idx3d, Pt3d};

mod imod;
mod ndjson;

pub use imod::{read_imod, ImodError, ImodModel};
pub use ndjson::read_ndjson_points;

/// 标注文件的受支持扩展名.
pub const ANNOTATION_EXTENSIONS: [&str; 2] = ["mod", "ndjson"];

/// 打开标注文件错误.
#[derive(Debug)]
pub enum OpenAnnotationError {
    /// 扩展名不受支持. 携带实际扩展名与受支持集合.
    UnsupportedFormat {
        /// 实际扩展名 (无扩展名时为空串).
        extension: String,
        /// 受支持的扩展名集合.
        accepted: &'static [&'static str],
    },

    /// IMOD 模型解析错误.
    Imod(ImodError),

    /// ndjson 行解析错误.
    Json(serde_json::Error),

    /// 底层 I/O 错误.
    Io(io::Error),
}

/// 从文件加载的标注.
///
/// 在普通 [`Annotation`] 之外记住来源路径, 以及 (仅 `.mod` 来源)
/// 模型头声明的所属 tomogram 形状.
#[derive(Debug, Clone)]
pub struct AnnotationFile {
    path: PathBuf,
    annotation: Annotation,
    implied_shape: Option<Idx3d>,
}

impl AnnotationFile {
    /// 按扩展名分发打开标注文件, 标注显示名取 `name`.
    pub fn open<P, S>(path: P, name: S) -> Result<Self, OpenAnnotationError>
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        let path = path.into();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let (points, implied_shape): (Vec<Pt3d>, Option<Idx3d>) = match extension {
            "mod" => {
                let model = read_imod(&path).map_err(OpenAnnotationError::Imod)?;
                (model.points, Some(model.implied_shape))
            }
            "ndjson" => (read_ndjson_points(&path)?, None),
            other => {
                return Err(OpenAnnotationError::UnsupportedFormat {
                    extension: other.to_owned(),
                    accepted: &ANNOTATION_EXTENSIONS,
                })
            }
        };
        debug!("已加载标注 {:?}: {} 个点", path, points.len());

        Ok(Self {
            path,
            annotation: Annotation::new(points, name),
            implied_shape,
        })
    }

    /// 来源路径.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 标注内容.
    #[inline]
    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    /// `.mod` 模型头声明的所属 tomogram 形状 (zmax, xmax, ymax).
    /// 非 `.mod` 来源时为 `None`.
    #[inline]
    pub fn implied_shape(&self) -> Option<Idx3d> {
        self.implied_shape
    }

    /// 丢弃文件信息, 转为普通 [`Annotation`].
    #[inline]
    pub fn into_annotation(self) -> Annotation {
        self.annotation
    }
}

/// tomogram 形状推断错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeInferenceError {
    /// 没有任何带形状信息的 (`.mod`) 标注来源.
    NoModAnnotations,

    /// 多个来源声明的形状互相矛盾. 携带两个冲突值.
    Inconsistent(Idx3d, Idx3d),
}

/// 不加载体数据, 从一组标注文件推断所属 tomogram 的形状.
///
/// 只有 `.mod` 来源带形状信息. 没有任何此类来源, 或者两个来源声明的
/// 形状不一致时, 返回对应错误.
pub fn implied_tomogram_shape(files: &[AnnotationFile]) -> Result<Idx3d, ShapeInferenceError> {
    let mut shapes = files.iter().filter_map(AnnotationFile::implied_shape);
    let first = shapes.next().ok_or(ShapeInferenceError::NoModAnnotations)?;
    for shape in shapes {
        if shape != first {
            return Err(ShapeInferenceError::Inconsistent(first, shape));
        }
    }
    Ok(first)
}
