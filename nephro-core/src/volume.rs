//! 体积计算: 封闭表面的散度定理积分, 以及退化时的体素计数回退.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::consts::{threshold as level, MM3_PER_CM3};
use crate::error::{AnalysisError, AnalysisResult, AtStage, Degenerate, EmptyInput, Failure, Stage};
use crate::geom::{compensated_sum, cross, dot, sub};
use crate::isosurface::MarchingCubes;
use crate::{Mesh, Point3, ScalarVolume};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;
    }
}

/// 体积的计算方式.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMethod {
    /// 对 marching cubes 表面做散度定理积分.
    MarchingCubes,

    /// 统计阈值之上的体素个数. 丢失亚体素精度.
    VoxelCounting,
}

impl fmt::Display for VolumeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeMethod::MarchingCubes => f.write_str("marching_cubes"),
            VolumeMethod::VoxelCounting => f.write_str("voxel_counting"),
        }
    }
}

/// 等值面阈值的选取策略.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum ThresholdPolicy {
    /// 根据体数据最大值自动选取, 见 [`auto_threshold`].
    #[default]
    Auto,

    /// 固定阈值.
    Fixed(f32),
}

impl ThresholdPolicy {
    /// 对最大值为 `max` 的体数据选取阈值.
    ///
    /// 固定阈值不是有限数时返回 [`AnalysisError::InvalidParameter`].
    pub fn select(&self, max: f32) -> AnalysisResult<f32> {
        match *self {
            ThresholdPolicy::Auto => Ok(auto_threshold(max)),
            ThresholdPolicy::Fixed(v) if v.is_finite() => Ok(v),
            ThresholdPolicy::Fixed(v) => Err(AnalysisError::invalid(
                "threshold",
                format!("固定阈值必须为有限数, 实际为 {v}"),
            )),
        }
    }
}

impl FromStr for ThresholdPolicy {
    type Err = AnalysisError;

    /// `auto` (不区分大小写) 或一个数值.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ThresholdPolicy::Auto);
        }
        let v: f32 = s
            .parse()
            .map_err(|_| AnalysisError::invalid("threshold", format!("无法解析阈值 `{s}`")))?;
        if !v.is_finite() {
            return Err(AnalysisError::invalid(
                "threshold",
                format!("固定阈值必须为有限数, 实际为 {v}"),
            ));
        }
        Ok(ThresholdPolicy::Fixed(v))
    }
}

/// 自动阈值:
///
/// 1. 最大值不超过 1: 视为二值掩膜, 取 0.5;
/// 2. 最大值超过 100: 视为按强度缩放的掩膜, 取最大值的一半;
/// 3. 其他情况取 0.5.
#[inline]
pub fn auto_threshold(max: f32) -> f32 {
    if max <= level::BINARY_MAX {
        level::BINARY_LEVEL
    } else if max > level::INTENSITY_MAX {
        max / 2.0
    } else {
        level::BINARY_LEVEL
    }
}

/// 网格的有向体积, 以立方毫米为单位. 外向绕序时为正.
///
/// 以包围盒中心为参考点累加每个面片与参考点构成的四面体体积, 并做补偿求和,
/// 远离原点的网格也不会因抵消而损失精度. 求和顺序固定, 结果与线程数无关.
pub fn signed_volume_mm3(mesh: &Mesh) -> f64 {
    let center = mesh.bbox_center();
    let tet = |[a, b, c]: [Point3; 3]| {
        dot(sub(a, center), cross(sub(b, center), sub(c, center))) / 6.0
    };

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            let vertices = mesh.vertices();
            let parts: Vec<f64> = mesh
                .faces()
                .par_iter()
                .map(|f| tet(f.map(|i| vertices[i])))
                .collect();
        } else {
            let parts: Vec<f64> = mesh.triangles().map(tet).collect();
        }
    }
    compensated_sum(parts)
}

/// 网格所围体积, 以立方厘米为单位.
///
/// 整体绕序方向不可信, 因此取绝对值. 网格应当封闭, 此处不做检查.
#[inline]
pub fn mesh_volume_cm3(mesh: &Mesh) -> f64 {
    signed_volume_mm3(mesh).abs() / MM3_PER_CM3
}

/// 体素计数得到的体积, 以立方厘米为单位.
#[inline]
pub fn voxel_volume_cm3(volume: &ScalarVolume, threshold: f32) -> (usize, f64) {
    let count = volume.count_above(threshold);
    (count, count as f64 * volume.voxel() / MM3_PER_CM3)
}

/// 体积测量结果.
#[derive(Debug, Clone)]
pub struct VolumeMeasurement {
    /// 体积, 立方厘米.
    pub volume_cm3: f64,

    /// 计算方式.
    pub method: VolumeMethod,

    /// 使用的阈值.
    pub threshold: f32,

    /// 提取出的表面. 回退到体素计数时为 `None`.
    pub mesh: Option<Mesh>,

    /// 回退到体素计数的原因.
    pub degenerate: Option<Degenerate>,
}

/// 测量分割体数据中前景的体积.
///
/// 1. 最大值恰好为 0 时以 [`EmptyInput::Segmentation`] 失败;
/// 2. 按 `config.threshold` 选取阈值;
/// 3. marching cubes 提取表面并积分;
/// 4. 表面退化 (找不到等值面, 或所围体积为零) 时回退到体素计数; 阈值之上没有体素时同样以
///   [`EmptyInput::Segmentation`] 失败.
pub fn measure(volume: &ScalarVolume, config: &PipelineConfig) -> Result<VolumeMeasurement, Failure> {
    let max = volume.max();
    if max == 0.0 {
        return Err(Failure::new(
            Stage::Threshold,
            AnalysisError::EmptyInput(EmptyInput::Segmentation),
        ));
    }
    let threshold = config.threshold.select(max).at(Stage::Threshold)?;
    log::info!("体数据最大值 {max}, 阈值 {threshold}");

    let extracted = MarchingCubes::new(threshold, config.step_size)
        .close_boundary(config.close_boundary)
        .extract(volume);

    let degenerate = match extracted {
        Ok(mesh) => {
            let report = mesh.orientation();
            if !report.is_closed_and_consistent() {
                log::warn!("等值面不封闭或绕序不一致: {report:?}");
            }
            let signed = signed_volume_mm3(&mesh);
            if signed < 0.0 {
                log::warn!("等值面有向体积为负 ({signed} mm^3), 绕序与预期相反");
            }
            let volume_cm3 = signed.abs() / MM3_PER_CM3;
            if volume_cm3 > 0.0 && volume_cm3.is_finite() {
                log::debug!("marching cubes 体积 {volume_cm3} cm^3");
                return Ok(VolumeMeasurement {
                    volume_cm3,
                    method: VolumeMethod::MarchingCubes,
                    threshold,
                    mesh: Some(mesh),
                    degenerate: None,
                });
            }
            Degenerate::ZeroVolume
        }
        Err(AnalysisError::DegenerateSurface(d)) => d,
        Err(e) => return Err(Failure::new(Stage::Extraction, e)),
    };

    log::warn!("表面退化 ({degenerate}), 回退到体素计数");
    let (count, volume_cm3) = voxel_volume_cm3(volume, threshold);
    if count == 0 {
        return Err(Failure::new(
            Stage::Integration,
            AnalysisError::EmptyInput(EmptyInput::Segmentation),
        )
        .with_method(VolumeMethod::VoxelCounting));
    }
    log::debug!("体素计数: {count} 个体素, {volume_cm3} cm^3");
    Ok(VolumeMeasurement {
        volume_cm3,
        method: VolumeMethod::VoxelCounting,
        threshold,
        mesh: None,
        degenerate: Some(degenerate),
    })
}
