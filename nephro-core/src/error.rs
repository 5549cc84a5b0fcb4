//! 运行时错误.
//!
//! 错误分类:
//!
//! 1. [`AnalysisError::EmptyInput`]: 零前景体素, 或空的顶点/面片序列. 致命.
//! 2. [`AnalysisError::MalformedMesh`]: 索引越界, 长度不是 3 的倍数等. 致命, 指明出错字段.
//! 3. [`AnalysisError::DegenerateSurface`]: 给定阈值下找不到等值面等. 体积计算可回退到体素计数,
//!   但结构指标必须报告为不可用.
//! 4. [`AnalysisError::InvalidParameter`]: 非正的肌酐, 不支持的阈值等. 致命.
//!
//! 核心内部不做重试, 所有失败同步向上传播.

use std::fmt;

use serde::Serialize;

use crate::volume::VolumeMethod;

/// 分析流程的运行时错误结果.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// 网格输入中的字段.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshField {
    /// 顶点序列.
    Vertices,

    /// 面片序列.
    Faces,
}

impl fmt::Display for MeshField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshField::Vertices => f.write_str("vertices"),
            MeshField::Faces => f.write_str("faces"),
        }
    }
}

/// 空输入的来源.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EmptyInput {
    /// 分割体中没有任何前景体素 (未检测到器官, 或上传了空掩膜).
    Segmentation,

    /// 顶点序列为空.
    Vertices,

    /// 面片序列为空.
    Faces,
}

impl fmt::Display for EmptyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyInput::Segmentation => f.write_str("分割结果中没有前景体素"),
            EmptyInput::Vertices => f.write_str("顶点序列为空"),
            EmptyInput::Faces => f.write_str("面片序列为空"),
        }
    }
}

/// 网格数据不合法的具体原因.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Malformed {
    /// 扁平序列长度不是 3 的倍数. 参数为实际长度.
    NotTriples(usize),

    /// 面片引用了不存在的顶点.
    IndexOutOfRange {
        /// 越界的顶点索引.
        index: usize,

        /// 顶点个数.
        len: usize,
    },

    /// 扁平序列中第 `.0` 个数值不是有限数.
    NonFinite(usize),
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Malformed::NotTriples(len) => write!(f, "长度 {len} 不是 3 的倍数"),
            Malformed::IndexOutOfRange { index, len } => {
                write!(f, "顶点索引 {index} 越界 (共 {len} 个顶点)")
            }
            Malformed::NonFinite(pos) => write!(f, "第 {pos} 个数值不是有限数"),
        }
    }
}

/// 表面退化的具体情形.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Degenerate {
    /// 整个体数据中没有任何立方体跨越阈值.
    NoCrossing {
        /// 使用的阈值.
        threshold: f64,
    },

    /// 提取出的表面所围体积为零.
    ZeroVolume,

    /// 网格总面积为零.
    ZeroArea,
}

impl fmt::Display for Degenerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Degenerate::NoCrossing { threshold } => write!(f, "阈值 {threshold} 处不存在等值面"),
            Degenerate::ZeroVolume => f.write_str("表面所围体积为零"),
            Degenerate::ZeroArea => f.write_str("网格总面积为零"),
        }
    }
}

/// 分析流程中的所有错误.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// 空输入.
    #[error("空输入: {0}")]
    EmptyInput(EmptyInput),

    /// 网格数据不合法.
    #[error("网格字段 `{field}` 不合法: {reason}")]
    MalformedMesh {
        /// 出错的字段.
        field: MeshField,

        /// 原因.
        reason: Malformed,
    },

    /// 表面退化.
    #[error("表面退化: {0}")]
    DegenerateSurface(Degenerate),

    /// 参数不合法.
    #[error("参数 `{name}` 不合法: {reason}")]
    InvalidParameter {
        /// 参数名.
        name: &'static str,

        /// 原因.
        reason: String,
    },

    /// 外部分割模型运行失败.
    #[error("分割模型运行失败: {0}")]
    Segmentation(String),

    /// 读取 nifti 文件失败.
    #[error(transparent)]
    Nifti(#[from] nifti::NiftiError),

    /// 读取 npy 文件失败.
    #[error(transparent)]
    Npy(#[from] ndarray_npy::ReadNpyError),

    /// 底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON 编码/解码错误.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    /// 构建 [`AnalysisError::InvalidParameter`].
    #[inline]
    pub fn invalid(name: &'static str, reason: impl fmt::Display) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.to_string(),
        }
    }

    /// 构建 [`AnalysisError::MalformedMesh`].
    #[inline]
    pub fn malformed(field: MeshField, reason: Malformed) -> Self {
        Self::MalformedMesh { field, reason }
    }

    /// 错误类别.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::EmptyInput(_) => ErrorKind::EmptyInput,
            AnalysisError::MalformedMesh { .. } => ErrorKind::MalformedMesh,
            AnalysisError::DegenerateSurface(_) => ErrorKind::DegenerateSurface,
            AnalysisError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            AnalysisError::Segmentation(_) => ErrorKind::Segmentation,
            AnalysisError::Nifti(_) | AnalysisError::Npy(_) | AnalysisError::Io(_) => {
                ErrorKind::Io
            }
            AnalysisError::Json(_) => ErrorKind::Encoding,
        }
    }

    /// 是否可以回退 (体积改用体素计数) 而不是直接失败.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AnalysisError::DegenerateSurface(_))
    }
}

/// 对外编码用的稳定错误类别.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 空输入.
    EmptyInput,

    /// 网格不合法.
    MalformedMesh,

    /// 表面退化.
    DegenerateSurface,

    /// 参数不合法.
    InvalidParameter,

    /// 外部分割模型失败.
    Segmentation,

    /// 文件读写失败.
    Io,

    /// 编码失败.
    Encoding,
}

/// 流程阶段. 用于在失败记录中指明到达的位置.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// 参数校验.
    Validation,

    /// 暂存与分割.
    Segmentation,

    /// 读取体数据.
    Load,

    /// 阈值选取.
    Threshold,

    /// 等值面提取.
    Extraction,

    /// 体积积分 (或体素计数).
    Integration,

    /// 结构分析.
    Structural,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Validation => "validation",
            Stage::Segmentation => "segmentation",
            Stage::Load => "load",
            Stage::Threshold => "threshold",
            Stage::Extraction => "extraction",
            Stage::Integration => "integration",
            Stage::Structural => "structural",
        };
        f.write_str(s)
    }
}

/// 带有诊断上下文的流程失败.
#[derive(Debug, thiserror::Error)]
#[error("{stage} 阶段失败: {error}")]
pub struct Failure {
    /// 底层错误.
    #[source]
    pub error: AnalysisError,

    /// 失败时到达的阶段.
    pub stage: Stage,

    /// 失败前已确定的体积计算方式.
    pub method: Option<VolumeMethod>,
}

impl Failure {
    /// 在 `stage` 阶段以 `error` 失败.
    #[inline]
    pub fn new(stage: Stage, error: AnalysisError) -> Self {
        Self {
            error,
            stage,
            method: None,
        }
    }

    /// 附加体积计算方式.
    #[inline]
    pub fn with_method(mut self, method: VolumeMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// 错误类别.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// 为 `Result<T, AnalysisError>` 附加阶段信息.
pub trait AtStage<T> {
    /// 失败时标记为 `stage` 阶段.
    fn at(self, stage: Stage) -> Result<T, Failure>;
}

impl<T> AtStage<T> for AnalysisResult<T> {
    #[inline]
    fn at(self, stage: Stage) -> Result<T, Failure> {
        self.map_err(|e| Failure::new(stage, e))
    }
}
