//! 程序运行函数.

use std::fs;
use std::path::Path;

use nephro_core::prelude::*;
use nephro_core::segment::default_staging_root;

/// 输入文件的种类.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Input<'a> {
    /// nifti 扫描或分割掩膜.
    Volume(&'a Path),

    /// `{"vertices": [..], "faces": [..]}` 形式的 JSON 网格.
    Mesh(&'a Path),
}

impl<'a> Input<'a> {
    /// 按扩展名区分.
    pub fn from_path(path: &'a Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(e) if e.eq_ignore_ascii_case("json") => Self::Mesh(path),
            _ => Self::Volume(path),
        }
    }
}

/// 分析网格文件.
fn run_mesh(pipeline: &Pipeline, path: &Path) -> Result<AnalysisRecord, ErrorRecord> {
    let text = fs::read_to_string(path).map_err(|e| ErrorRecord::from(&AnalysisError::from(e)))?;
    let flat: FlatMesh =
        serde_json::from_str(&text).map_err(|e| ErrorRecord::from(&AnalysisError::from(e)))?;
    let s = pipeline
        .analyze_mesh(&flat.vertices, &flat.faces)
        .map_err(|f| ErrorRecord::from(&f))?;
    Ok(ResultAssembler::new().structural(&s).finish())
}

/// 实际运行, 返回成功记录或失败记录.
pub fn run(
    input: &Path,
    creatinine: Option<f64>,
    segmenter: &dyn Segmenter,
    config: PipelineConfig,
) -> Result<AnalysisRecord, ErrorRecord> {
    let pipeline = Pipeline::new(config);
    match Input::from_path(input) {
        Input::Mesh(p) => run_mesh(&pipeline, p),
        Input::Volume(p) => {
            let root = default_staging_root();
            log::debug!("暂存根目录 {root:?}");
            let analysis = pipeline
                .process_file(p, creatinine, segmenter, root)
                .map_err(|f| ErrorRecord::from(&f))?;
            Ok(analysis.record(config.include_mesh))
        }
    }
}
