//! 运行时配置.

use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::consts::DEFAULT_STEP_SIZE;
use crate::error::{AnalysisError, AnalysisResult};
use crate::volume::ThresholdPolicy;

/// 阈值策略: `auto` 或一个数值.
pub const ENV_THRESHOLD: &str = "NEPHRO_THRESHOLD";

/// marching cubes 采样步长, 正整数.
pub const ENV_STEP_SIZE: &str = "NEPHRO_STEP_SIZE";

/// 是否把体数据之外视为背景.
pub const ENV_CLOSE_BOUNDARY: &str = "NEPHRO_CLOSE_BOUNDARY";

/// 体积流程中是否同时做结构分析.
pub const ENV_ANALYZE_SURFACE: &str = "NEPHRO_ANALYZE_SURFACE";

/// 结果中是否附带网格.
pub const ENV_INCLUDE_MESH: &str = "NEPHRO_INCLUDE_MESH";

/// 分析流程配置.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// 等值面阈值策略.
    pub threshold: ThresholdPolicy,

    /// marching cubes 采样步长. 大于 1 时更快, 但会低估细薄结构.
    pub step_size: NonZeroUsize,

    /// 是否把体数据之外视为背景, 使贴边的前景也能得到封闭表面.
    pub close_boundary: bool,

    /// 体积流程中是否同时对提取出的表面做结构分析.
    pub analyze_surface: bool,

    /// 结果中是否附带扁平网格.
    pub include_mesh: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: ThresholdPolicy::Auto,
            step_size: NonZeroUsize::new(DEFAULT_STEP_SIZE).unwrap_or(NonZeroUsize::MIN),
            close_boundary: true,
            analyze_surface: false,
            include_mesh: true,
        }
    }
}

impl PipelineConfig {
    /// 从环境变量读取配置. 未设置的项使用默认值.
    ///
    /// 1. `$NEPHRO_THRESHOLD`: `auto` 或数值;
    /// 2. `$NEPHRO_STEP_SIZE`: 正整数;
    /// 3. `$NEPHRO_CLOSE_BOUNDARY`, `$NEPHRO_ANALYZE_SURFACE`, `$NEPHRO_INCLUDE_MESH`:
    ///   `1/0`, `true/false`, `yes/no` 或 `on/off`.
    ///
    /// 无法解析时返回 [`AnalysisError::InvalidParameter`], 参数名即环境变量名.
    pub fn from_env() -> AnalysisResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 同 [`Self::from_env`], 但从 `lookup` 取值.
    pub fn from_lookup<F>(lookup: F) -> AnalysisResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_THRESHOLD) {
            cfg.threshold = ThresholdPolicy::from_str(&v)
                .map_err(|e| AnalysisError::invalid(ENV_THRESHOLD, e))?;
        }
        if let Some(v) = get(ENV_STEP_SIZE) {
            cfg.step_size = v.trim().parse().map_err(|_| {
                AnalysisError::invalid(ENV_STEP_SIZE, format!("`{v}` 不是正整数"))
            })?;
        }
        if let Some(v) = get(ENV_CLOSE_BOUNDARY) {
            cfg.close_boundary = parse_flag(ENV_CLOSE_BOUNDARY, &v)?;
        }
        if let Some(v) = get(ENV_ANALYZE_SURFACE) {
            cfg.analyze_surface = parse_flag(ENV_ANALYZE_SURFACE, &v)?;
        }
        if let Some(v) = get(ENV_INCLUDE_MESH) {
            cfg.include_mesh = parse_flag(ENV_INCLUDE_MESH, &v)?;
        }
        log::debug!("配置: {cfg:?}");
        Ok(cfg)
    }
}

fn parse_flag(name: &'static str, v: &str) -> AnalysisResult<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AnalysisError::invalid(name, format!("`{v}` 不是布尔值"))),
    }
}
