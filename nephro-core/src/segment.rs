//! 分割模型能力接口, 以及单请求暂存目录.
//!
//! 核心库本身不做图像分割. 外部模型通过 [`Segmenter`] 接入, 测试中可以直接使用
//! [`PassThrough`] 把合成掩膜当作分割结果.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use uuid::Uuid;

use crate::error::{AnalysisError, AnalysisResult};

/// 暂存根目录.
pub const ENV_STAGING_DIR: &str = "NEPHRO_STAGING_DIR";

/// 分割结果在暂存目录中的文件名.
pub const SEGMENTATION_FILE: &str = "segmentation.nii.gz";

/// 获取暂存根目录.
///
/// 1. 若环境变量 `$NEPHRO_STAGING_DIR` 非空, 则返回其值;
/// 2. 否则, 返回用户缓存目录下的 `nephro-staging`;
/// 3. 都不可用时, 返回系统临时目录下的 `nephro-staging`.
pub fn default_staging_root() -> PathBuf {
    match env::var(ENV_STAGING_DIR) {
        Ok(d) if !d.trim().is_empty() => PathBuf::from(d),
        _ => dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join("nephro-staging"),
    }
}

/// 单个请求独占的暂存目录 `<root>/req-<uuid>`.
///
/// 对象析构时递归删除整个目录, 因此正常返回, 出错返回以及 panic 展开时都会清理.
/// 不同请求的目录互不相交, 并发请求之间没有共享的可变状态.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// 在 `root` 下创建新的暂存目录. `root` 不存在时一并创建.
    pub fn create_in<P: AsRef<Path>>(root: P) -> AnalysisResult<Self> {
        let path = root
            .as_ref()
            .join(format!("req-{}", Uuid::new_v4().simple()));
        fs::create_dir_all(&path)?;
        log::debug!("创建暂存目录 {path:?}");
        Ok(Self { path })
    }

    /// 目录路径.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 目录下名为 `name` 的文件路径.
    #[inline]
    pub fn join<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => log::debug!("清理暂存目录 {:?}", self.path),
            Err(e) => log::warn!("无法清理暂存目录 {:?}: {e}", self.path),
        }
    }
}

/// 分割模型能力接口.
pub trait Segmenter {
    /// 对 `input` (nifti 扫描) 做分割, 返回分割掩膜的路径.
    /// 输出文件只能写在 `staging` 下.
    fn segment(&self, input: &Path, staging: &StagingDir) -> AnalysisResult<PathBuf>;
}

/// 把输入直接视为已经分割好的掩膜.
#[derive(Copy, Clone, Debug, Default)]
pub struct PassThrough;

impl Segmenter for PassThrough {
    fn segment(&self, input: &Path, _staging: &StagingDir) -> AnalysisResult<PathBuf> {
        if !input.is_file() {
            return Err(AnalysisError::Segmentation(format!(
                "分割掩膜 {input:?} 不存在"
            )));
        }
        Ok(input.to_path_buf())
    }
}

/// 调用外部程序做分割:
///
/// ```text
/// <program> --input <input> --output <staging>/segmentation.nii.gz <args..>
/// ```
///
/// 默认程序为 `TotalSegmentator`, 附加参数 `--roi_subset kidney_right --fast`.
#[derive(Clone, Debug)]
pub struct CommandSegmenter {
    program: OsString,
    args: Vec<OsString>,
}

impl Default for CommandSegmenter {
    fn default() -> Self {
        Self::new("TotalSegmentator").args(["--roi_subset", "kidney_right", "--fast"])
    }
}

impl CommandSegmenter {
    /// 调用 `program`, 不附加额外参数.
    pub fn new<S: Into<OsString>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// 追加参数.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl Segmenter for CommandSegmenter {
    fn segment(&self, input: &Path, staging: &StagingDir) -> AnalysisResult<PathBuf> {
        let output = staging.join(SEGMENTATION_FILE);
        log::info!("运行分割模型 {:?} {input:?}", self.program);

        let out = Command::new(&self.program)
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(&output)
            .args(&self.args)
            .output()
            .map_err(|e| {
                AnalysisError::Segmentation(format!("无法启动 {:?}: {e}", self.program))
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(AnalysisError::Segmentation(format!(
                "{:?} 退出状态 {}: {}",
                self.program,
                out.status,
                stderr.trim()
            )));
        }
        if !output.is_file() {
            return Err(AnalysisError::Segmentation(format!(
                "{:?} 没有生成 {SEGMENTATION_FILE}",
                self.program
            )));
        }
        Ok(output)
    }
}
