//! 端到端分析流程.
//!
//! 体数据路径: 阈值 -> 等值面提取 -> 体积积分 (或体素计数) -> 临床指标 -> 可选的结构分析.
//! 网格路径: 校验 -> 结构分析.
//!
//! 流程本身不持有可变状态, 同一个 [`Pipeline`] 可以被多个线程共享.

use std::path::Path;

use crate::clinical::{resolve_creatinine, ClinicalResult};
use crate::config::PipelineConfig;
use crate::error::{AnalysisError, AtStage, Degenerate, Failure, Stage};
use crate::report::{AnalysisRecord, ResultAssembler};
use crate::segment::{Segmenter, StagingDir};
use crate::structural::{self, StructuralResult};
use crate::{Mesh, ScalarVolume};

/// 结构分析的结果.
#[derive(Clone, Debug, PartialEq)]
pub enum StructuralOutcome {
    /// 未要求结构分析.
    NotRequested,

    /// 分析成功.
    Available(StructuralResult),

    /// 表面退化, 指标不可用.
    Unavailable(Degenerate),
}

/// 体数据路径的分析结果.
#[derive(Clone, Debug)]
pub struct VolumeAnalysis {
    /// 体积与临床指标.
    pub clinical: ClinicalResult,

    /// 使用的阈值.
    pub threshold: f32,

    /// 提取出的表面. 回退到体素计数时为 `None`.
    pub mesh: Option<Mesh>,

    /// 结构分析.
    pub structural: StructuralOutcome,
}

impl VolumeAnalysis {
    /// 组装成扁平记录. `include_mesh` 为 `true` 且存在表面时附带网格.
    pub fn record(&self, include_mesh: bool) -> AnalysisRecord {
        let mut assembler = ResultAssembler::new()
            .clinical(&self.clinical)
            .threshold(self.threshold);
        assembler = match &self.structural {
            StructuralOutcome::NotRequested => assembler,
            StructuralOutcome::Available(s) => assembler.structural(s),
            StructuralOutcome::Unavailable(d) => assembler.structural_unavailable(d),
        };
        match (&self.mesh, include_mesh) {
            (Some(mesh), true) => assembler.mesh(mesh).finish(),
            _ => assembler.finish(),
        }
    }
}

/// 分析流程.
#[derive(Copy, Clone, Debug, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// 使用给定配置.
    #[inline]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// 分析一份分割体数据.
    ///
    /// 肌酐在任何几何计算之前校验. 未提供时使用默认值.
    pub fn process_volume(
        &self,
        volume: &ScalarVolume,
        creatinine: Option<f64>,
    ) -> Result<VolumeAnalysis, Failure> {
        let creatinine = resolve_creatinine(creatinine).at(Stage::Validation)?;
        log::info!(
            "分析体数据: 形状 {:?}, 间距 {:?} mm",
            volume.shape(),
            volume.spacing()
        );

        let measured = crate::volume::measure(volume, &self.config)?;
        let clinical = ClinicalResult::new(measured.volume_cm3, creatinine, measured.method);
        log::info!(
            "体积 {:.2} cm^3 ({}), GFR {:.2}, 剂量 {:.2} mg",
            clinical.volume_cm3,
            clinical.method,
            clinical.gfr_final,
            clinical.dose_mg
        );

        let structural = if !self.config.analyze_surface {
            StructuralOutcome::NotRequested
        } else {
            match (&measured.mesh, measured.degenerate) {
                (Some(mesh), _) => match structural::analyze(mesh) {
                    Ok(s) => StructuralOutcome::Available(s),
                    Err(AnalysisError::DegenerateSurface(d)) => {
                        log::warn!("结构指标不可用: {d}");
                        StructuralOutcome::Unavailable(d)
                    }
                    Err(e) => {
                        return Err(Failure::new(Stage::Structural, e).with_method(clinical.method))
                    }
                },
                (None, Some(d)) => StructuralOutcome::Unavailable(d),
                (None, None) => StructuralOutcome::Unavailable(Degenerate::ZeroArea),
            }
        };

        Ok(VolumeAnalysis {
            clinical,
            threshold: measured.threshold,
            mesh: measured.mesh,
            structural,
        })
    }

    /// 分析一份扫描文件: 暂存 -> 分割 -> 读取 -> [`Pipeline::process_volume`].
    ///
    /// 暂存目录建在 `staging_root` 下, 无论成功与否, 返回前都会被删除.
    pub fn process_file<P, Q>(
        &self,
        input: P,
        creatinine: Option<f64>,
        segmenter: &dyn Segmenter,
        staging_root: Q,
    ) -> Result<VolumeAnalysis, Failure>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let input = input.as_ref();
        resolve_creatinine(creatinine).at(Stage::Validation)?;

        let staging = StagingDir::create_in(staging_root).at(Stage::Segmentation)?;
        let mask = segmenter.segment(input, &staging).at(Stage::Segmentation)?;
        log::info!("分割结果 {mask:?}");
        let volume = ScalarVolume::open(&mask).at(Stage::Load)?;
        self.process_volume(&volume, creatinine)
    }

    /// 分析直接给出的扁平网格.
    pub fn analyze_mesh(
        &self,
        vertices: &[f64],
        faces: &[usize],
    ) -> Result<StructuralResult, Failure> {
        let mesh = Mesh::from_flat(vertices, faces).at(Stage::Validation)?;
        log::info!(
            "分析网格: {} 个顶点, {} 个面片",
            mesh.vertices().len(),
            mesh.faces().len()
        );
        structural::analyze(&mesh).at(Stage::Structural)
    }
}
