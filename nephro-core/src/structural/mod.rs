//! 表面结构分析: 粗糙度与曲率变异.
//!
//! 分档标签只用于分诊提示, 不是诊断.

mod curvature;
mod roughness;

use serde::Serialize;

use crate::consts::bands;
use crate::error::AnalysisResult;
use crate::Mesh;

pub use curvature::{curvature_stats, vertex_mean_curvature, CurvatureStats};
pub use roughness::{roughness, sphere_area_for_volume};

/// 粗糙度分档. 区间左闭右开.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum RoughnessBand {
    /// `< 1.2`.
    Low,

    /// `[1.2, 1.5)`.
    Moderate,

    /// `>= 1.5`.
    High,
}

impl RoughnessBand {
    /// 粗糙度所在的档.
    pub fn of(roughness: f64) -> Self {
        if roughness < bands::ROUGHNESS_MODERATE {
            Self::Low
        } else if roughness < bands::ROUGHNESS_HIGH {
            Self::Moderate
        } else {
            Self::High
        }
    }

    /// 标签文字.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low irregularity",
            Self::Moderate => "moderate irregularity, potential concern",
            Self::High => "high irregularity, likely abnormal growth",
        }
    }
}

impl From<RoughnessBand> for &'static str {
    #[inline]
    fn from(band: RoughnessBand) -> Self {
        band.label()
    }
}

/// 曲率变异指数分档. 区间左闭右开.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum VariabilityBand {
    /// `< 0.15`.
    Low,

    /// `[0.15, 0.30)`.
    Moderate,

    /// `>= 0.30`.
    High,
}

impl VariabilityBand {
    /// 曲率变异指数所在的档.
    pub fn of(cvi: f64) -> Self {
        if cvi < bands::CVI_MODERATE {
            Self::Low
        } else if cvi < bands::CVI_HIGH {
            Self::Moderate
        } else {
            Self::High
        }
    }

    /// 标签文字.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low variability, smooth surface",
            Self::Moderate => "moderate variability",
            Self::High => "high variability, abnormal surface features",
        }
    }
}

impl From<VariabilityBand> for &'static str {
    #[inline]
    fn from(band: VariabilityBand) -> Self {
        band.label()
    }
}

/// 结构分析结果.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct StructuralResult {
    /// 粗糙度, 不小于 1.
    pub roughness: f64,

    /// 粗糙度分档.
    #[serde(rename = "structural_category")]
    pub roughness_label: RoughnessBand,

    /// 曲率变异指数, 非负.
    #[serde(rename = "cvi")]
    pub curvature_variability_index: f64,

    /// 曲率变异分档.
    pub curvature_label: VariabilityBand,

    /// 平均曲率的均值, 1/毫米.
    pub mean_curvature: f64,
}

/// 分析网格的表面结构.
///
/// 先焊接重合顶点 (marching cubes 及外部网格中常见), 再计算粗糙度与曲率.
/// 表面退化时返回 [`crate::error::AnalysisError::DegenerateSurface`], 不会编造指标.
pub fn analyze(mesh: &Mesh) -> AnalysisResult<StructuralResult> {
    let welded = mesh.welded();
    log::debug!(
        "结构分析: {} 个顶点 (焊接前 {}), {} 个面片",
        welded.vertices().len(),
        mesh.vertices().len(),
        welded.faces().len()
    );

    let roughness = roughness(&welded)?;
    let stats = curvature_stats(&welded)?;
    let result = StructuralResult {
        roughness,
        roughness_label: RoughnessBand::of(roughness),
        curvature_variability_index: stats.variability,
        curvature_label: VariabilityBand::of(stats.variability),
        mean_curvature: stats.mean,
    };
    log::info!(
        "粗糙度 {:.4} ({}), 曲率变异 {:.4} ({})",
        result.roughness,
        result.roughness_label.label(),
        result.curvature_variability_index,
        result.curvature_label.label()
    );
    Ok(result)
}
