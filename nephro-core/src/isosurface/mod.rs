//! marching cubes 等值面提取.
//!
//! 输入为 [`ScalarVolume`], 输出为物理坐标 (毫米, `[x, y, z]`) 下的 [`Mesh`].
//!
//! # 采样步长
//!
//! `step` 表示沿每个轴每隔多少个体素取一个采样点. 步长大于 1 时网格更稀疏, 运算更快,
//! 但会系统性地低估细薄结构. 默认值为 [`crate::consts::DEFAULT_STEP_SIZE`].
//!
//! # 方向
//!
//! 构型表中的三角形法向总是背离高值 (前景) 一侧, 因此封闭的提取结果具有正的有向体积.
//!
//! # 顶点
//!
//! 同一条采样棱上的交点只生成一次, 相邻立方体共享顶点. 顶点和面片的顺序只取决于输入,
//! 与线程数无关.

mod table;

use std::collections::HashMap;
use std::num::NonZeroUsize;

use ndarray::ArrayView3;

use crate::error::{AnalysisError, AnalysisResult, Degenerate};
use crate::{Face, Mesh, Point3, ScalarVolume};

use table::{CORNERS, EDGES, TRIANGLES};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;
    }
}

/// 棱两端取值差小于此值时取中点.
const INTERP_EPS: f64 = 1e-10;

/// 采样棱的标识: 低端采样点的格点坐标 `(z, y, x)` 及方向 (0: x, 1: y, 2: z).
type EdgeKey = (usize, usize, usize, u8);

/// 一个三角形的三个交点.
type Patch = [(EdgeKey, Point3); 3];

/// marching cubes 提取器.
#[derive(Copy, Clone, Debug)]
pub struct MarchingCubes {
    threshold: f32,
    step: NonZeroUsize,
    close_boundary: bool,
}

impl MarchingCubes {
    /// 以等值 `threshold` 和采样步长 `step` 创建提取器. 默认封闭边界.
    pub fn new(threshold: f32, step: NonZeroUsize) -> Self {
        Self {
            threshold,
            step,
            close_boundary: true,
        }
    }

    /// 是否把体数据之外视为背景.
    ///
    /// 开启时贴着体数据边界的前景也能得到封闭表面; 关闭时表面在边界处开放.
    pub fn close_boundary(mut self, yes: bool) -> Self {
        self.close_boundary = yes;
        self
    }

    /// 提取等值面.
    ///
    /// 阈值非有限时返回 [`AnalysisError::InvalidParameter`];
    /// 没有任何立方体跨越阈值时返回 [`Degenerate::NoCrossing`], 而不是空网格.
    pub fn extract(&self, volume: &ScalarVolume) -> AnalysisResult<Mesh> {
        if !self.threshold.is_finite() {
            return Err(AnalysisError::invalid(
                "threshold",
                format!("等值必须为有限数, 实际为 {}", self.threshold),
            ));
        }
        let lattice = Lattice::new(volume, self.threshold, self.step.get(), self.close_boundary);
        let (nz, _, _) = lattice.cubes();

        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                let layers: Vec<Vec<Patch>> =
                    (0..nz).into_par_iter().map(|z| lattice.layer(z)).collect();
            } else {
                let layers: Vec<Vec<Patch>> = (0..nz).map(|z| lattice.layer(z)).collect();
            }
        }

        let capacity = layers.iter().map(Vec::len).sum::<usize>();
        let mut lookup: HashMap<EdgeKey, usize> = HashMap::with_capacity(capacity);
        let mut vertices: Vec<Point3> = Vec::with_capacity(capacity / 2 + 1);
        let mut faces: Vec<Face> = Vec::with_capacity(capacity);
        for patch in layers.iter().flatten() {
            faces.push(patch.map(|(key, p)| {
                *lookup.entry(key).or_insert_with(|| {
                    vertices.push(p);
                    vertices.len() - 1
                })
            }));
        }

        if faces.is_empty() {
            return Err(AnalysisError::DegenerateSurface(Degenerate::NoCrossing {
                threshold: self.threshold as f64,
            }));
        }
        log::debug!(
            "marching cubes: 阈值 {}, 步长 {}, {} 个顶点, {} 个面片",
            self.threshold,
            self.step,
            vertices.len(),
            faces.len()
        );
        Ok(Mesh::from_parts(vertices, faces))
    }
}

/// 以默认的封闭边界提取等值面.
#[inline]
pub fn marching_cubes(
    volume: &ScalarVolume,
    threshold: f32,
    step: NonZeroUsize,
) -> AnalysisResult<Mesh> {
    MarchingCubes::new(threshold, step).extract(volume)
}

/// 采样格点. 封闭边界时每个轴两端各多出一层虚拟背景.
struct Lattice<'a> {
    data: ArrayView3<'a, f32>,
    spacing: [f64; 3],
    threshold: f32,
    step: usize,

    /// 虚拟背景层的取值. `None` 表示不封闭边界.
    pad: Option<f32>,

    /// 格点个数 `(z, y, x)`, 含虚拟层.
    dims: [usize; 3],
}

impl<'a> Lattice<'a> {
    fn new(volume: &'a ScalarVolume, threshold: f32, step: usize, close: bool) -> Self {
        let (z, y, x) = volume.shape();
        let samples = |n: usize| (n - 1) / step + 1;
        let pad = close.then(|| {
            let min = volume.min();
            if min < threshold {
                min
            } else {
                threshold - (volume.max() - threshold).max(1.0)
            }
        });
        let extra = if close { 2 } else { 0 };
        Self {
            data: volume.data(),
            spacing: volume.spacing(),
            threshold,
            step,
            pad,
            dims: [samples(z) + extra, samples(y) + extra, samples(x) + extra],
        }
    }

    /// 立方体个数 `(z, y, x)`.
    #[inline]
    fn cubes(&self) -> (usize, usize, usize) {
        let [z, y, x] = self.dims.map(|n| n.saturating_sub(1));
        (z, y, x)
    }

    /// 格点 `(z, y, x)` 处的取值.
    #[inline]
    fn value(&self, z: usize, y: usize, x: usize) -> f32 {
        match self.pad {
            None => self.data[(z * self.step, y * self.step, x * self.step)],
            Some(pad) => {
                let outside = |i: usize, n: usize| i == 0 || i + 1 == n;
                if outside(z, self.dims[0]) || outside(y, self.dims[1]) || outside(x, self.dims[2])
                {
                    pad
                } else {
                    self.data[((z - 1) * self.step, (y - 1) * self.step, (x - 1) * self.step)]
                }
            }
        }
    }

    /// 格点 `(z, y, x)` 的物理坐标 `[x, y, z]`.
    #[inline]
    fn position(&self, z: usize, y: usize, x: usize) -> Point3 {
        let offset = if self.pad.is_some() { 1.0 } else { 0.0 };
        let step = self.step as f64;
        let axis = |i: usize, k: usize| (i as f64 - offset) * step * self.spacing[k];
        [axis(x, 0), axis(y, 1), axis(z, 2)]
    }

    /// 采样棱上的交点. 总是从低端插值到高端, 使同一条棱的结果与观察它的立方体无关.
    fn crossing(&self, (z, y, x, axis): EdgeKey) -> Point3 {
        let (z1, y1, x1) = match axis {
            0 => (z, y, x + 1),
            1 => (z, y + 1, x),
            _ => (z + 1, y, x),
        };
        let v0 = self.value(z, y, x) as f64;
        let v1 = self.value(z1, y1, x1) as f64;
        let t = if (v1 - v0).abs() < INTERP_EPS {
            0.5
        } else {
            (self.threshold as f64 - v0) / (v1 - v0)
        };
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };

        let p0 = self.position(z, y, x);
        let p1 = self.position(z1, y1, x1);
        [0, 1, 2].map(|k| p0[k] + t * (p1[k] - p0[k]))
    }

    /// 处理第 `z` 层立方体.
    fn layer(&self, z: usize) -> Vec<Patch> {
        let (_, ny, nx) = self.cubes();
        let mut out = Vec::new();
        for y in 0..ny {
            for x in 0..nx {
                let mut config = 0u8;
                for (c, [dx, dy, dz]) in CORNERS.iter().enumerate() {
                    // NaN 视为背景.
                    if self.value(z + dz, y + dy, x + dx) > self.threshold {
                        config |= 1 << c;
                    }
                }
                for tri in &TRIANGLES[config as usize] {
                    out.push(tri.map(|e| {
                        let key = edge_key((z, y, x), e as usize);
                        (key, self.crossing(key))
                    }));
                }
            }
        }
        out
    }
}

/// 立方体 `origin` 的第 `edge` 条棱对应的采样棱.
#[inline]
fn edge_key((z, y, x): (usize, usize, usize), edge: usize) -> EdgeKey {
    let [a, b] = EDGES[edge];
    let (ca, cb) = (CORNERS[a], CORNERS[b]);
    let lo = [0, 1, 2].map(|k| ca[k].min(cb[k]));
    let axis = if ca[0] != cb[0] {
        0
    } else if ca[1] != cb[1] {
        1
    } else {
        2
    };
    (z + lo[2], y + lo[1], x + lo[0], axis)
}
