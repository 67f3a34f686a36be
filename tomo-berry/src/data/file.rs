//! 文件后备的 tomogram: 延迟加载、重载与格式分发.

use std::mem;
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::Array3;
use ndarray_npy::{read_npy, ReadNpyError};

use super::contrast::stretch_contrast;
use super::mrc::{read_mrc, MrcError};
use super::{Annotation, Tomogram};

/// 体数据文件的受支持扩展名.
pub const VOLUME_EXTENSIONS: [&str; 3] = ["mrc", "rec", "npy"];

/// 打开体数据文件错误.
#[derive(Debug)]
pub enum OpenTomogramError {
    /// 扩展名不受支持. 携带实际扩展名与受支持集合.
    UnsupportedFormat {
        /// 实际扩展名 (无扩展名时为空串).
        extension: String,
        /// 受支持的扩展名集合.
        accepted: &'static [&'static str],
    },

    /// MRC 解析错误.
    Mrc(MrcError),

    /// npy 读取错误.
    Npy(ReadNpyError),
}

/// 打开体数据文件结果.
pub type OpenTomogramResult<T> = Result<T, OpenTomogramError>;

/// 按扩展名分发读取 3D 体数据.
///
/// `.mrc`/`.rec` 按 MRC2014 解析; `.npy` 按 numpy 裸数组格式解析
/// (`f32`, 或 `f64` 窄化为 `f32`), 且被认为已按本 crate 的轴序存储.
/// 其余扩展名返回 [`OpenTomogramError::UnsupportedFormat`].
pub fn read_volume<P: AsRef<Path>>(path: P) -> OpenTomogramResult<Array3<f32>> {
    let path = path.as_ref();
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match extension {
        "mrc" | "rec" => read_mrc(path).map_err(OpenTomogramError::Mrc),
        "npy" => read_npy_volume(path),
        other => Err(OpenTomogramError::UnsupportedFormat {
            extension: other.to_owned(),
            accepted: &VOLUME_EXTENSIONS,
        }),
    }
}

/// 读 `.npy`. 优先按 `f32` 解释, 失败时再按 `f64` 读并窄化.
fn read_npy_volume(path: &Path) -> OpenTomogramResult<Array3<f32>> {
    match read_npy::<_, Array3<f32>>(path) {
        Ok(data) => Ok(data),
        Err(first) => read_npy::<_, Array3<f64>>(path)
            .map(|data| data.mapv(|v| v as f32))
            .map_err(|_| OpenTomogramError::Npy(first)),
    }
}

/// 文件后备的 tomogram.
///
/// 构建时只登记路径和标注, 第一次 [`load`](Self::load) 才真正读文件.
/// 加载后数据即固定; 只有显式 [`reload`](Self::reload) 会整体替换.
#[derive(Debug)]
pub struct TomogramFile {
    path: PathBuf,
    /// 数据物化前暂存的标注.
    pending: Vec<Annotation>,
    tomo: Option<Tomogram>,
}

impl TomogramFile {
    /// 登记路径和标注, 不读文件.
    pub fn new<P: Into<PathBuf>>(path: P, annotations: Vec<Annotation>) -> Self {
        Self {
            path: path.into(),
            pending: annotations,
            tomo: None,
        }
    }

    /// 登记并立即加载 (默认做对比度拉伸).
    pub fn open<P: Into<PathBuf>>(
        path: P,
        annotations: Vec<Annotation>,
    ) -> OpenTomogramResult<Self> {
        let mut this = Self::new(path, annotations);
        this.load()?;
        Ok(this)
    }

    /// 后备文件路径.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 数据是否已物化.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.tomo.is_some()
    }

    /// 已物化的 tomogram.
    #[inline]
    pub fn tomogram(&self) -> Option<&Tomogram> {
        self.tomo.as_ref()
    }

    /// 加载数据, 并默认应用一次对比度拉伸.
    ///
    /// 幂等: 数据已物化时是 no-op, 直接返回现有数据 —
    /// 不会重复读文件, 也不会再做一次拉伸.
    pub fn load(&mut self) -> OpenTomogramResult<&Tomogram> {
        self.load_impl(true)
    }

    /// 同 [`load`](Self::load), 但不做对比度拉伸, 保留文件原始灰度.
    pub fn load_raw(&mut self) -> OpenTomogramResult<&Tomogram> {
        self.load_impl(false)
    }

    fn load_impl(&mut self, preprocess: bool) -> OpenTomogramResult<&Tomogram> {
        if self.tomo.is_none() {
            let mut data = read_volume(&self.path)?;
            if preprocess {
                stretch_contrast(&mut data);
            }
            debug!("已加载体数据 {:?}, 形状 {:?}", self.path, data.dim());
            let annotations = mem::take(&mut self.pending);
            self.tomo = Some(Tomogram::new(data, annotations));
        }
        // 上面刚保证过 Some, 可直接 unwrap.
        Ok(self.tomo.as_ref().unwrap())
    }

    /// 无条件重新读后备文件, 整体替换现有数据.
    ///
    /// 与 [`load`](Self::load) 不同, 这里 **不会** 应用对比度拉伸:
    /// 重载的意义就是拿回文件里的原始值, 先前的处理状态一并作废.
    /// 标注保持不变.
    pub fn reload(&mut self) -> OpenTomogramResult<&Tomogram> {
        let data = read_volume(&self.path)?;
        let annotations = match self.tomo.take() {
            Some(tomo) => tomo.into_annotations(),
            None => mem::take(&mut self.pending),
        };
        self.tomo = Some(Tomogram::new(data, annotations));
        // 上面刚赋值过 Some, 可直接 unwrap.
        Ok(self.tomo.as_ref().unwrap())
    }

    /// 当前挂在该文件上的标注 (无论数据是否已物化).
    #[inline]
    pub fn annotations(&self) -> &[Annotation] {
        match &self.tomo {
            Some(tomo) => tomo.annotations(),
            None => &self.pending,
        }
    }

    /// 追加标注. 数据未物化时暂存, 物化后直接挂到数据上.
    pub fn add_annotation(&mut self, annotation: Annotation) {
        match self.tomo.as_mut() {
            Some(tomo) => tomo.add_annotation(annotation),
            None => self.pending.push(annotation),
        }
    }

    /// 丢弃文件信息, 取出已物化的 tomogram.
    /// 数据从未加载过时返回 `None`.
    #[inline]
    pub fn into_tomogram(self) -> Option<Tomogram> {
        self.tomo
    }
}
