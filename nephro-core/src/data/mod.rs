use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::{AnalysisError, AnalysisResult};
use crate::Idx3d;

mod mesh;

pub use mesh::{Mesh, OrientationReport};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::parallel::prelude::*;
    }
}

/// 3D 标量体数据 (通常是分割掩膜或其概率/强度图), 以及体素物理间距.
///
/// 数据按 `(z, y, x)` 存储, `x` 变化最快. 间距按 `[sx, sy, sz]` 存储, 以毫米为单位.
/// 对象创建后只读.
#[derive(Debug, Clone)]
pub struct ScalarVolume {
    data: Array3<f32>,
    spacing: [f64; 3],
}

/// nifti header 中的 `[x, y, z]` 体素个数 -> `(z, y, x)`.
#[inline]
fn shape_from_header(h: &NiftiHeader) -> Idx3d {
    let [_, x, y, z, ..] = h.dim;
    (z.max(1) as usize, y.max(1) as usize, x.max(1) as usize)
}

/// nifti header 中的体素间距. 缺失或非正的分量按 1 毫米处理.
#[inline]
fn spacing_from_header(h: &NiftiHeader) -> [f64; 3] {
    let [_, sx, sy, sz, ..] = h.pixdim;
    [sx, sy, sz].map(|s| {
        let s = s as f64;
        if s.is_finite() && s > 0.0 {
            s
        } else {
            1.0
        }
    })
}

impl Index<Idx3d> for ScalarVolume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl ScalarVolume {
    /// 由 `(z, y, x)` 排列的数据和 `[sx, sy, sz]` 间距创建体数据.
    ///
    /// 数据为空, 或者间距不是有限正数时返回 [`AnalysisError::InvalidParameter`].
    pub fn new(data: Array3<f32>, spacing: [f64; 3]) -> AnalysisResult<Self> {
        if data.is_empty() {
            return Err(AnalysisError::invalid("volume", "体数据为空"));
        }
        if let Some(s) = spacing.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(AnalysisError::invalid(
                "spacing",
                format!("体素间距必须为有限正数, 实际为 {s}"),
            ));
        }
        Ok(Self { data, spacing })
    }

    /// 打开 nii / nii.gz 格式的 3D 体数据. `path` 为本地路径.
    ///
    /// 体素间距取自 header 的 `pixdim`, 不可用时按 1 毫米处理.
    /// 第四维及以后的维度必须为 1.
    pub fn open<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = obj.header().clone();
        let shape = shape_from_header(&header);
        let spacing = spacing_from_header(&header);

        // [x, y, z, ..] -> [.., z, y, x].
        // hint: nifti 数据域本身就是 x 变化最快.
        let data = obj.into_volume().into_ndarray::<f32>()?.reversed_axes();
        let raw = data.as_standard_layout().into_owned().into_raw_vec();
        let data = Array3::from_shape_vec(shape, raw)
            .map_err(|e| AnalysisError::invalid("volume", format!("体数据形状与 header 不符: {e}")))?;

        log::debug!("载入 {:?}: 形状 {:?}, 间距 {:?}", path.as_ref(), shape, spacing);
        Self::new(data, spacing)
    }

    /// 打开 `(z, y, x)` 排列的 `.npy` 浮点数组, 并指定 `[sx, sy, sz]` 间距.
    pub fn open_npy<P: AsRef<Path>>(path: P, spacing: [f64; 3]) -> AnalysisResult<Self> {
        let data: Array3<f32> = ndarray_npy::read_npy(path.as_ref())?;
        Self::new(data, spacing)
    }

    /// 数据形状 `(z, y, x)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 体素间距 `[sx, sy, sz]`, 以毫米为单位.
    #[inline]
    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// 单个体素的实际体积, 以立方毫米为单位.
    #[inline]
    pub fn voxel(&self) -> f64 {
        self.spacing.iter().product()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 最大值. NaN 被忽略; 全为 NaN 时返回 `f32::NEG_INFINITY`.
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// 最小值. NaN 被忽略; 全为 NaN 时返回 `f32::INFINITY`.
    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// 严格大于 `threshold` 的体素个数.
    pub fn count_above(&self, threshold: f32) -> usize {
        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                self.data.par_iter().filter(|v| **v > threshold).count()
            } else {
                self.data.iter().filter(|v| **v > threshold).count()
            }
        }
    }
}
