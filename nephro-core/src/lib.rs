#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 从 3D 肾脏分割体数据 (或直接给出的三角网格) 计算定量指标:
//! 器官体积, 肾小球滤过率 (GFR) 估计, 推荐给药剂量, 以及用于肿瘤风险初筛的表面不规则度.
//!
//! 该 crate 只提供 `safe` 接口. 调用方输入不合法时返回 [`error::AnalysisError`],
//! 不会 panic; 库内部自行建立的不变量由 `debug_assert!` 守护.
//!
//! # 注意
//!
//! 1. 该 crate 不做图像分割, 不管理文件存储, 也不检验输入扫描在医学上是否正确.
//!   分割模型通过 [`segment::Segmenter`] 能力接口接入.
//! 2. 结构分析给出的分档标签是分诊提示, 不是诊断.
//!
//! # 开发计划
//!
//! ### Marching cubes 等值面提取 ✅
//!
//! 256 种立方体构型的三角化表由立方体表面规则生成, 所有构型的绕序一致
//! (法向指向高值前景外侧). 支持采样步长与边界封闭.
//!
//! 实现位于 `nephro-core/src/isosurface`.
//!
//! ### 散度定理体积积分 + 体素计数回退 ✅
//!
//! 三角形四面体有向体积的补偿求和; 等值面退化时回退到体素计数并标记 `method`.
//!
//! 实现位于 `nephro-core/src/volume.rs`.
//!
//! ### 肾功能估计与剂量 ✅
//!
//! 固定的产品经验公式. 实现位于 `nephro-core/src/clinical.rs`.
//!
//! ### 表面粗糙度与曲率变异 ✅
//!
//! 1. 粗糙度: 网格表面积与同体积球面面积 `(36 π V^2)^(1/3)` 之比 (球面为 1.0).
//! 2. 曲率: 顶点邻域片上的离散平均曲率, 按面积加权统计其变异系数.
//!
//! 实现位于 `nephro-core/src/structural`.
//!
//! ### 结果组装 ✅
//!
//! 扁平, 可直接序列化的记录. 实现位于 `nephro-core/src/report.rs`.
//!
//! ### 分割模型能力接口与单请求暂存目录 ✅
//!
//! 实现位于 `nephro-core/src/segment.rs`.

/// 三维索引 `(z, y, x)`, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 物理坐标点 `[x, y, z]`, 以毫米为单位.
pub type Point3 = [f64; 3];

/// 三角面片, 三个顶点索引.
pub type Face = [usize; 3];

/// 标量体数据与三角网格.
mod data;

pub use data::{Mesh, OrientationReport, ScalarVolume};

pub mod clinical;
pub mod config;
pub mod consts;
pub mod error;
pub mod isosurface;
pub mod pipeline;
pub mod prelude;
pub mod report;
pub mod segment;
pub mod structural;
pub mod volume;

mod geom;

#[cfg(test)]
mod testing;
