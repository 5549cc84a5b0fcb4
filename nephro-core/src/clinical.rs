//! 肾功能估计与给药剂量.
//!
//! ```text
//! gfr_estimate      = volume_cm3 * 0.8
//! safe_creatinine   = max(creatinine_mg_dl, 0.5)
//! gfr_final         = gfr_estimate / safe_creatinine
//! dose_mg           = 5 * (gfr_final + 25)
//! ```
//!
//! 常数是产品约定的经验参数. 中间结果保留全部精度, 只在展示时保留两位小数.

use serde::Serialize;

use crate::consts::clinical::*;
use crate::error::{AnalysisError, AnalysisResult};
use crate::volume::VolumeMethod;

/// 公式的全部输出.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ClinicalIndex {
    /// 由体积直接得到的 GFR 估计.
    pub gfr_estimate: f64,

    /// 经肌酐修正后的 GFR.
    pub gfr_final: f64,

    /// 推荐剂量, 毫克.
    pub dose_mg: f64,
}

/// 由体积 (立方厘米) 和血清肌酐 (mg/dL) 计算 GFR 与剂量.
///
/// 肌酐低于 0.5 时按 0.5 计算, 防止除零. 调用方应先用 [`resolve_creatinine`] 校验输入.
pub fn clinical_index(volume_cm3: f64, creatinine_mg_dl: f64) -> ClinicalIndex {
    let gfr_estimate = volume_cm3 * GFR_PER_CM3;
    let safe = creatinine_mg_dl.max(CREATININE_FLOOR_MG_DL);
    let gfr_final = gfr_estimate * (1.0 / safe);
    let dose_mg = DOSE_SCALE * (gfr_final + DOSE_OFFSET);
    ClinicalIndex {
        gfr_estimate,
        gfr_final,
        dose_mg,
    }
}

/// 确定参与计算的肌酐值.
///
/// 未提供时显式取 1.0 mg/dL, 绝不当作 0. 提供的值必须是有限正数,
/// 否则返回 [`AnalysisError::InvalidParameter`].
pub fn resolve_creatinine(creatinine_mg_dl: Option<f64>) -> AnalysisResult<f64> {
    match creatinine_mg_dl {
        None => Ok(DEFAULT_CREATININE_MG_DL),
        Some(c) if c.is_finite() && c > 0.0 => Ok(c),
        Some(c) => Err(AnalysisError::invalid(
            "creatinine",
            format!("肌酐必须为有限正数 (mg/dL), 实际为 {c}"),
        )),
    }
}

/// 体积流程的临床结果.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ClinicalResult {
    /// 体积, 立方厘米.
    pub volume_cm3: f64,

    /// 经肌酐修正后的 GFR.
    pub gfr_final: f64,

    /// 推荐剂量, 毫克.
    pub dose_mg: f64,

    /// 参与计算的肌酐, mg/dL (调用方提供的值, 或默认值).
    pub creatinine: f64,

    /// 体积的计算方式.
    pub method: VolumeMethod,
}

impl ClinicalResult {
    /// 由体积测量结果计算. `creatinine_mg_dl` 须已经过 [`resolve_creatinine`].
    pub fn new(volume_cm3: f64, creatinine_mg_dl: f64, method: VolumeMethod) -> Self {
        debug_assert!(volume_cm3 >= 0.0);
        let index = clinical_index(volume_cm3, creatinine_mg_dl);
        log::debug!("临床指标: {index:?}");
        Self {
            volume_cm3,
            gfr_final: index.gfr_final,
            dose_mg: index.dose_mg,
            creatinine: creatinine_mg_dl,
            method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::float_eq;

    #[test]
    fn test_dose_scenario() {
        let r = clinical_index(100.0, 1.0);
        assert!(float_eq(r.gfr_estimate, 80.0, 1e-12));
        assert!(float_eq(r.gfr_final, 80.0, 1e-12));
        assert!(float_eq(r.dose_mg, 525.0, 1e-12));
    }

    #[test]
    fn test_creatinine_floor() {
        // 0.2 按 0.5 计算.
        let low = clinical_index(100.0, 0.2);
        let floor = clinical_index(100.0, 0.5);
        assert_eq!(low, floor);
        assert!(float_eq(floor.gfr_final, 160.0, 1e-12));
        assert!(float_eq(floor.dose_mg, 925.0, 1e-12));

        let high = clinical_index(150.0, 2.0);
        assert!(float_eq(high.gfr_final, 60.0, 1e-12));
        assert!(float_eq(high.dose_mg, 425.0, 1e-12));
    }

    #[test]
    fn test_resolve_creatinine() {
        assert_eq!(resolve_creatinine(None).unwrap(), 1.0);
        assert_eq!(resolve_creatinine(Some(1.3)).unwrap(), 1.3);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let e = resolve_creatinine(Some(bad)).unwrap_err();
            assert!(matches!(e, AnalysisError::InvalidParameter { name: "creatinine", .. }));
        }
    }

    #[test]
    fn test_result_keeps_inputs() {
        let r = ClinicalResult::new(100.0, 1.0, VolumeMethod::VoxelCounting);
        assert_eq!(r.creatinine, 1.0);
        assert_eq!(r.method, VolumeMethod::VoxelCounting);
        assert!(float_eq(r.dose_mg, 525.0, 1e-12));
    }
}
