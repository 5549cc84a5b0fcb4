//! 从命令行与环境变量读取运行参数.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;
use nephro_core::error::{AnalysisError, AnalysisResult};
use nephro_core::segment::{CommandSegmenter, PassThrough, Segmenter};

/// 输入文件.
pub const ENV_INPUT: &str = "NEPHRO_INPUT";

/// 血清肌酐, mg/dL.
pub const ENV_CREATININE: &str = "NEPHRO_CREATININE";

/// 分割方式.
pub const ENV_SEGMENT: &str = "NEPHRO_SEGMENT";

/// 日志级别.
pub const ENV_LOG: &str = "NEPHRO_LOG";

#[inline]
fn non_blank(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// 获取输入文件路径.
///
/// 1. 若给出了命令行参数, 则返回第一个参数;
/// 2. 若环境变量 `$NEPHRO_INPUT` 非空, 则返回其值;
/// 3. 否则, 返回 `$HOME/nephro/segmentation.nii.gz`.
pub fn input_from_args_env_or_home() -> AnalysisResult<PathBuf> {
    if let Some(arg) = env::args_os().nth(1) {
        return Ok(PathBuf::from(arg));
    }
    if let Some(d) = non_blank(ENV_INPUT) {
        return Ok(PathBuf::from(d));
    }
    dirs::home_dir()
        .map(|h| h.join("nephro").join("segmentation.nii.gz"))
        .ok_or_else(|| AnalysisError::invalid("input", "没有给出输入文件, 也找不到 home 目录"))
}

/// 解析肌酐. 空白视为未提供.
pub fn parse_creatinine(v: &str) -> AnalysisResult<Option<f64>> {
    let v = v.trim();
    if v.is_empty() {
        return Ok(None);
    }
    f64::from_str(v)
        .map(Some)
        .map_err(|e| AnalysisError::invalid("creatinine", format!("`{v}`: {e}")))
}

/// 从 `$NEPHRO_CREATININE` 读取肌酐.
pub fn creatinine_from_env() -> AnalysisResult<Option<f64>> {
    non_blank(ENV_CREATININE).map_or(Ok(None), |v| parse_creatinine(&v))
}

/// 选择分割方式:
///
/// 1. 空白或 `none`: 输入已经是分割掩膜;
/// 2. `default`: 调用 `TotalSegmentator`;
/// 3. 其它: 视为外部分割程序的路径.
pub fn parse_segmenter(v: &str) -> Box<dyn Segmenter> {
    match v.trim() {
        "" | "none" => Box::new(PassThrough),
        "default" => Box::new(CommandSegmenter::default()),
        program => Box::new(CommandSegmenter::new(program)),
    }
}

/// 从 `$NEPHRO_SEGMENT` 选择分割方式.
#[inline]
pub fn segmenter_from_env() -> Box<dyn Segmenter> {
    parse_segmenter(&non_blank(ENV_SEGMENT).unwrap_or_default())
}

/// 从 `$NEPHRO_LOG` 读取日志级别, 默认 `info`.
pub fn log_level_from_env() -> LevelFilter {
    non_blank(ENV_LOG)
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(LevelFilter::Info)
}
