//! 通用常量.

/// 临床公式常量.
///
/// 这些值是产品约定的经验参数, 保持原样, 不要重新推导.
pub mod clinical {
    /// 每立方厘米肾脏体积对应的 GFR 估计值.
    pub const GFR_PER_CM3: f64 = 0.8;

    /// 参与计算的肌酐下限, 以 mg/dL 为单位.
    pub const CREATININE_FLOOR_MG_DL: f64 = 0.5;

    /// 调用方未提供肌酐时使用的值, 以 mg/dL 为单位.
    pub const DEFAULT_CREATININE_MG_DL: f64 = 1.0;

    /// 剂量公式 `DOSE_SCALE * (gfr + DOSE_OFFSET)` 的倍率.
    pub const DOSE_SCALE: f64 = 5.0;

    /// 剂量公式 `DOSE_SCALE * (gfr + DOSE_OFFSET)` 的偏移.
    pub const DOSE_OFFSET: f64 = 25.0;
}

/// 自动阈值选取的分段边界.
pub mod threshold {
    /// 最大值不超过该值时, 视为二值掩膜.
    pub const BINARY_MAX: f32 = 1.0;

    /// 最大值超过该值时, 视为强度缩放掩膜, 阈值取最大值的一半.
    pub const INTENSITY_MAX: f32 = 100.0;

    /// 二值掩膜 (以及中间区间) 使用的阈值.
    pub const BINARY_LEVEL: f32 = 0.5;
}

/// 结构分析分档边界. 均为左闭右开.
pub mod bands {
    /// 粗糙度达到该值即为 "中等不规则".
    pub const ROUGHNESS_MODERATE: f64 = 1.2;

    /// 粗糙度达到该值即为 "高度不规则".
    pub const ROUGHNESS_HIGH: f64 = 1.5;

    /// 曲率变异指数达到该值即为 "中等变异".
    pub const CVI_MODERATE: f64 = 0.15;

    /// 曲率变异指数达到该值即为 "高度变异".
    pub const CVI_HIGH: f64 = 0.30;
}

/// marching cubes 默认采样步长.
pub const DEFAULT_STEP_SIZE: usize = 2;

/// 立方毫米到立方厘米 (mL).
pub const MM3_PER_CM3: f64 = 1000.0;

/// 曲率估计邻域半径与等面积球半径之比.
pub const CURVATURE_SCALE: f64 = 0.25;

/// 几何计算中视为零的面积/长度.
pub const GEOM_EPS: f64 = 1e-12;
