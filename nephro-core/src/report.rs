//! 结果组装: 把各阶段的输出合并为一条扁平, 可直接编码的记录.
//!
//! 所有数值在编码前统一转为 `f64`. 部分序列化器不接受 `f32`, 库内部的窄浮点数
//! (例如阈值) 必须先经过 [`widen`].

use std::fmt;

use num::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::clinical::ClinicalResult;
use crate::error::{AnalysisError, AnalysisResult, ErrorKind, Failure, Stage};
use crate::structural::{RoughnessBand, StructuralResult, VariabilityBand};
use crate::volume::VolumeMethod;
use crate::Mesh;

/// 临床数值保留的小数位数.
const CLINICAL_DIGITS: i32 = 2;

/// 结构指标保留的小数位数.
const STRUCTURAL_DIGITS: i32 = 4;

/// 转为 `f64`. 无法表示时为 NaN (编码为 `null`).
#[inline]
pub fn widen<T: ToPrimitive>(v: T) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

/// 四舍五入到 `digits` 位小数. 仅用于展示.
#[inline]
pub fn round_to(v: f64, digits: i32) -> f64 {
    let k = 10f64.powi(digits);
    (v * k).round() / k
}

/// 扁平网格: `[x, y, z, x, y, z, ..]` 与 `[i, j, k, i, j, k, ..]`.
///
/// 自描述, 没有隐藏状态, 可以原样回传给结构分析入口.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatMesh {
    /// 顶点坐标.
    pub vertices: Vec<f64>,

    /// 面片索引.
    pub faces: Vec<usize>,
}

impl From<&Mesh> for FlatMesh {
    fn from(mesh: &Mesh) -> Self {
        let (vertices, faces) = mesh.to_flat();
        Self { vertices, faces }
    }
}

impl TryFrom<&FlatMesh> for Mesh {
    type Error = AnalysisError;

    fn try_from(flat: &FlatMesh) -> AnalysisResult<Self> {
        Mesh::from_flat(&flat.vertices, &flat.faces)
    }
}

/// 成功的分析记录. 未运行的分支对应字段为空, 编码时省略.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    /// 恒为 `true`.
    pub success: bool,

    /// 体积, 立方厘米.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_cm3: Option<f64>,

    /// 经肌酐修正后的 GFR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gfr_final: Option<f64>,

    /// 推荐剂量, 毫克.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dose_mg: Option<f64>,

    /// 参与计算的肌酐, mg/dL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creatinine: Option<f64>,

    /// 体积的计算方式.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<VolumeMethod>,

    /// 等值面阈值.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,

    /// 粗糙度.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roughness: Option<f64>,

    /// 粗糙度分档.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural_category: Option<RoughnessBand>,

    /// 曲率变异指数.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvi: Option<f64>,

    /// 曲率变异分档.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curvature_label: Option<VariabilityBand>,

    /// 平均曲率.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_curvature: Option<f64>,

    /// 请求了结构分析但不可用时的原因.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural_status: Option<String>,

    /// 提取出的网格.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<FlatMesh>,
}

impl AnalysisRecord {
    /// 编码为 JSON.
    pub fn to_json(&self) -> AnalysisResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// [`AnalysisRecord`] 的构建器.
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    record: AnalysisRecord,
}

impl Default for ResultAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAssembler {
    /// 空记录.
    pub fn new() -> Self {
        Self {
            record: AnalysisRecord {
                success: true,
                volume_cm3: None,
                gfr_final: None,
                dose_mg: None,
                creatinine: None,
                method: None,
                threshold: None,
                roughness: None,
                structural_category: None,
                cvi: None,
                curvature_label: None,
                mean_curvature: None,
                structural_status: None,
                mesh: None,
            },
        }
    }

    /// 合并临床结果. 体积, GFR, 剂量保留两位小数.
    pub fn clinical(mut self, c: &ClinicalResult) -> Self {
        let r = &mut self.record;
        r.volume_cm3 = Some(round_to(c.volume_cm3, CLINICAL_DIGITS));
        r.gfr_final = Some(round_to(c.gfr_final, CLINICAL_DIGITS));
        r.dose_mg = Some(round_to(c.dose_mg, CLINICAL_DIGITS));
        r.creatinine = Some(c.creatinine);
        r.method = Some(c.method);
        self
    }

    /// 记录使用的阈值.
    pub fn threshold<T: ToPrimitive>(mut self, threshold: T) -> Self {
        self.record.threshold = Some(widen(threshold));
        self
    }

    /// 合并结构分析结果. 指标保留四位小数.
    pub fn structural(mut self, s: &StructuralResult) -> Self {
        let r = &mut self.record;
        r.roughness = Some(round_to(s.roughness, STRUCTURAL_DIGITS));
        r.structural_category = Some(s.roughness_label);
        r.cvi = Some(round_to(s.curvature_variability_index, STRUCTURAL_DIGITS));
        r.curvature_label = Some(s.curvature_label);
        r.mean_curvature = Some(round_to(s.mean_curvature, STRUCTURAL_DIGITS));
        r.structural_status = None;
        self
    }

    /// 标记结构指标不可用.
    pub fn structural_unavailable(mut self, reason: impl fmt::Display) -> Self {
        self.record.structural_status = Some(format!("unavailable: {reason}"));
        self
    }

    /// 附带网格.
    pub fn mesh(mut self, mesh: &Mesh) -> Self {
        self.record.mesh = Some(FlatMesh::from(mesh));
        self
    }

    /// 完成组装.
    #[inline]
    pub fn finish(self) -> AnalysisRecord {
        self.record
    }
}

/// 失败记录.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// 恒为 `false`.
    pub success: bool,

    /// 错误类别.
    pub kind: ErrorKind,

    /// 可读的错误信息.
    pub message: String,

    /// 失败时到达的阶段.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,

    /// 失败前已确定的体积计算方式.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<VolumeMethod>,
}

impl ErrorRecord {
    /// 编码为 JSON.
    pub fn to_json(&self) -> AnalysisResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&AnalysisError> for ErrorRecord {
    fn from(e: &AnalysisError) -> Self {
        Self {
            success: false,
            kind: e.kind(),
            message: e.to_string(),
            stage: None,
            method: None,
        }
    }
}

impl From<&Failure> for ErrorRecord {
    fn from(f: &Failure) -> Self {
        Self {
            success: false,
            kind: f.kind(),
            message: f.error.to_string(),
            stage: Some(f.stage),
            method: f.method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Degenerate, EmptyInput, Malformed, MeshField};
    use crate::testing::cube_mesh;
    use serde_json::{json, Value};

    #[test]
    fn test_round_and_widen() {
        assert_eq!(round_to(525.0049, 2), 525.0);
        assert_eq!(round_to(80.456, 2), 80.46);
        assert_eq!(round_to(1.23456, 4), 1.2346);
        assert_eq!(widen(127.5f32), 127.5);
        assert_eq!(widen(3u8), 3.0);
        // f32 的 0.1 原样展开, 不做十进制修正.
        assert_eq!(widen(0.1f32), 0.1f32 as f64);
    }

    #[test]
    fn test_clinical_record() {
        let c = ClinicalResult::new(100.0, 1.0, VolumeMethod::MarchingCubes);
        let record = ResultAssembler::new()
            .clinical(&c)
            .threshold(0.5f32)
            .mesh(&cube_mesh(1.0))
            .finish();
        let v: Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(v["success"], true);
        assert_eq!(v["volume_cm3"], 100.0);
        assert_eq!(v["gfr_final"], 80.0);
        assert_eq!(v["dose_mg"], 525.0);
        assert_eq!(v["creatinine"], 1.0);
        assert_eq!(v["method"], "marching_cubes");
        assert_eq!(v["threshold"], 0.5);
        assert_eq!(v["mesh"]["vertices"].as_array().unwrap().len(), 24);
        assert_eq!(v["mesh"]["faces"].as_array().unwrap().len(), 36);
        assert!(v.get("roughness").is_none());
        assert!(v.get("structural_status").is_none());
    }

    #[test]
    fn test_structural_record() {
        let s = StructuralResult {
            roughness: 1.234567,
            roughness_label: RoughnessBand::of(1.234567),
            curvature_variability_index: 0.31,
            curvature_label: VariabilityBand::of(0.31),
            mean_curvature: 0.1,
        };
        let v = serde_json::to_value(ResultAssembler::new().structural(&s).finish()).unwrap();
        assert_eq!(
            v,
            json!({
                "success": true,
                "roughness": 1.2346,
                "structural_category": "moderate irregularity, potential concern",
                "cvi": 0.31,
                "curvature_label": "high variability, abnormal surface features",
                "mean_curvature": 0.1,
            })
        );
    }

    #[test]
    fn test_structural_unavailable() {
        let v = serde_json::to_value(
            ResultAssembler::new()
                .structural_unavailable("表面退化")
                .finish(),
        )
        .unwrap();
        assert_eq!(v["structural_status"], "unavailable: 表面退化");
        assert!(v.get("roughness").is_none());
    }

    #[test]
    fn test_flat_mesh_round_trip() {
        let flat = FlatMesh {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            faces: vec![0, 1, 2],
        };
        let text = serde_json::to_string(&flat).unwrap();
        let back: FlatMesh = serde_json::from_str(&text).unwrap();
        let mesh = Mesh::try_from(&back).unwrap();
        assert_eq!(FlatMesh::from(&mesh), flat);
    }

    #[test]
    fn test_error_records() {
        let e = AnalysisError::malformed(MeshField::Faces, Malformed::NotTriples(4));
        let v = serde_json::to_value(ErrorRecord::from(&e)).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["kind"], "malformed_mesh");
        assert!(v["message"].as_str().unwrap().contains("faces"));
        assert!(v.get("stage").is_none());

        let f = Failure::new(
            Stage::Integration,
            AnalysisError::EmptyInput(EmptyInput::Segmentation),
        )
        .with_method(VolumeMethod::VoxelCounting);
        let v: Value =
            serde_json::from_str(&ErrorRecord::from(&f).to_json().unwrap()).unwrap();
        assert_eq!(v["kind"], "empty_input");
        assert_eq!(v["stage"], "integration");
        assert_eq!(v["method"], "voxel_counting");

        let e = AnalysisError::DegenerateSurface(Degenerate::NoCrossing { threshold: 0.5 });
        let v = serde_json::to_value(ErrorRecord::from(&e)).unwrap();
        assert_eq!(v["kind"], "degenerate_surface");
    }
}
