//! 离散平均曲率.
//!
//! 逐点的一环公式 (cotangent 等) 在 marching cubes 输出的狭长三角形上噪声很大,
//! 且噪声不随分辨率减小. 这里在每个顶点周围的一片邻域 `P` 上估计平均曲率:
//!
//! ```text
//! S   = Σ_{t ∈ P} (x_b - x_a) × (x_c - x_a) / 2
//! Φ   = Σ_{t ∈ P} Σ_{(a, b) ∈ t} (x_b - x_a) × n_ab
//! H_P = -<Φ, S> / (2 |S|^2)
//! ```
//!
//! `S` 是邻域的面积向量, `|S|` 即邻域在其平均平面上的投影面积.
//! `n_ab` 取两个端点面积加权法向之和的方向, 只与无向边有关, 因此邻域内部的边两两抵消,
//! `Φ` 只剩下邻域边界的贡献. 对于球面上任意形状的邻域, `H_P` 都等于 `1 / R`.
//!
//! 邻域取从顶点出发, 沿网格边可达且与顶点距离不超过 `ρ` 的顶点 (一环邻域总在其中),
//! 以及全部顶点都在其中的面片. `ρ` 为等面积球半径的 [`CURVATURE_SCALE`] 倍,
//! 因此估计值与网格分辨率无关.
//!
//! 面片外向时, 凸表面的平均曲率为正.

use std::collections::HashSet;

use crate::consts::{CURVATURE_SCALE, GEOM_EPS};
use crate::error::{AnalysisError, AnalysisResult, Degenerate};
use crate::geom::{add, compensated_sum, cross, dot, norm, scale, sub};
use crate::{Face, Mesh, Point3};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;
    }
}

/// 平均曲率分布的统计量. 以顶点面积加权.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CurvatureStats {
    /// 平均曲率的均值.
    pub mean: f64,

    /// 变异指数 `std(H) / mean(|H|)`. 分母为零时为 0.
    pub variability: f64,

    /// 参与统计的顶点个数.
    pub samples: usize,
}

/// 每个顶点所在的面片.
fn incident_faces(vertex_count: usize, faces: &[Face]) -> Vec<Vec<usize>> {
    let mut incident = vec![Vec::new(); vertex_count];
    for (f, face) in faces.iter().enumerate() {
        for &v in face {
            incident[v].push(f);
        }
    }
    incident
}

/// 单位化. 长度过小时返回零向量.
#[inline]
fn unit(v: Point3) -> Point3 {
    let len = norm(v);
    if len < GEOM_EPS {
        [0.0; 3]
    } else {
        scale(v, 1.0 / len)
    }
}

/// 网格上预先算好的量.
struct Surface<'a> {
    vertices: &'a [Point3],
    faces: &'a [Face],
    incident: Vec<Vec<usize>>,

    /// 每个面片的面积向量 `S_t`.
    area: Vec<Point3>,

    /// 每个面片三条有向边的 `(x_b - x_a) × n_ab` 之和.
    flux: Vec<Point3>,

    /// 邻域半径的平方.
    radius2: f64,
}

impl<'a> Surface<'a> {
    fn new(mesh: &'a Mesh) -> Self {
        let (vertices, faces) = (mesh.vertices(), mesh.faces());
        let incident = incident_faces(vertices.len(), faces);
        let area: Vec<Point3> = faces
            .iter()
            .map(|&[a, b, c]| {
                let (xa, xb, xc) = (vertices[a], vertices[b], vertices[c]);
                scale(cross(sub(xb, xa), sub(xc, xa)), 0.5)
            })
            .collect();

        let normals: Vec<Point3> = incident
            .iter()
            .map(|ring| unit(ring.iter().fold([0.0; 3], |n, &f| add(n, area[f]))))
            .collect();
        let flux = faces
            .iter()
            .map(|&[a, b, c]| {
                [(a, b), (b, c), (c, a)].iter().fold([0.0; 3], |acc, &(p, q)| {
                    let n = unit(add(normals[p], normals[q]));
                    add(acc, cross(sub(vertices[q], vertices[p]), n))
                })
            })
            .collect();

        let total = compensated_sum(area.iter().map(|s| norm(*s)));
        let radius = CURVATURE_SCALE * (total / (4.0 * std::f64::consts::PI)).sqrt();
        Self {
            vertices,
            faces,
            incident,
            area,
            flux,
            radius2: radius * radius,
        }
    }

    /// 顶点 `i` 的重心面积: 所在面片面积之和的 1/3.
    fn vertex_area(&self, i: usize) -> f64 {
        self.incident[i].iter().map(|&f| norm(self.area[f])).sum::<f64>() / 3.0
    }

    /// 顶点 `i` 的邻域面片, 按下标排序.
    fn patch(&self, i: usize) -> Vec<usize> {
        let xi = self.vertices[i];
        let mut members = HashSet::from([i]);
        let mut stack = vec![i];
        while let Some(v) = stack.pop() {
            for &f in &self.incident[v] {
                for &u in &self.faces[f] {
                    if members.contains(&u) {
                        continue;
                    }
                    let d = sub(self.vertices[u], xi);
                    if v == i || dot(d, d) <= self.radius2 {
                        members.insert(u);
                        stack.push(u);
                    }
                }
            }
        }

        let mut faces: Vec<usize> = members
            .iter()
            .flat_map(|&v| self.incident[v].iter().copied())
            .filter(|&f| self.faces[f].iter().all(|u| members.contains(u)))
            .collect();
        faces.sort_unstable();
        faces.dedup();
        faces
    }

    /// 顶点 `i` 的平均曲率. 孤立点或邻域投影面积为零时为 `None`.
    fn curvature(&self, i: usize) -> Option<f64> {
        if self.incident[i].is_empty() {
            return None;
        }
        let patch = self.patch(i);
        let s = patch.iter().fold([0.0; 3], |acc, &f| add(acc, self.area[f]));
        let phi = patch.iter().fold([0.0; 3], |acc, &f| add(acc, self.flux[f]));
        let s2 = dot(s, s);
        if s2.sqrt() < GEOM_EPS {
            return None;
        }
        Some(-dot(phi, s) / (2.0 * s2))
    }

    /// 全部顶点的平均曲率.
    fn curvatures(&self) -> Vec<Option<f64>> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                (0..self.vertices.len())
                    .into_par_iter()
                    .map(|i| self.curvature(i))
                    .collect()
            } else {
                (0..self.vertices.len()).map(|i| self.curvature(i)).collect()
            }
        }
    }
}

/// 每个顶点的平均曲率. 退化顶点为 `None`.
///
/// 网格应当已经焊接重合顶点, 否则邻域无法越过重复的顶点.
pub fn vertex_mean_curvature(mesh: &Mesh) -> Vec<Option<f64>> {
    Surface::new(mesh).curvatures()
}

/// 统计平均曲率分布, 每个顶点以其重心面积为权重.
///
/// 没有任何有效顶点时返回 [`AnalysisError::DegenerateSurface`].
pub fn curvature_stats(mesh: &Mesh) -> AnalysisResult<CurvatureStats> {
    let surface = Surface::new(mesh);
    let samples: Vec<(f64, f64)> = surface
        .curvatures()
        .into_iter()
        .enumerate()
        .filter_map(|(i, h)| h.map(|h| (h, surface.vertex_area(i))))
        .collect();

    let total = compensated_sum(samples.iter().map(|(_, w)| *w));
    if samples.is_empty() || total < GEOM_EPS {
        return Err(AnalysisError::DegenerateSurface(Degenerate::ZeroArea));
    }
    let mean = compensated_sum(samples.iter().map(|(h, w)| h * w)) / total;
    let mean_abs = compensated_sum(samples.iter().map(|(h, w)| h.abs() * w)) / total;
    let var = compensated_sum(samples.iter().map(|(h, w)| (h - mean) * (h - mean) * w)) / total;
    let variability = if mean_abs > GEOM_EPS {
        var.sqrt() / mean_abs
    } else {
        0.0
    };
    Ok(CurvatureStats {
        mean,
        variability,
        samples: samples.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bumpy_sphere, cube_mesh, float_eq, icosphere};

    #[test]
    fn test_sphere_curvature() {
        for radius in [1.0, 10.0] {
            let mesh = bumpy_sphere(4, radius, 0.0);
            let stats = curvature_stats(&mesh).unwrap();
            assert_eq!(stats.samples, 2562);
            assert!(float_eq(stats.mean, 1.0 / radius, 0.02), "{stats:?}");
            assert!(stats.variability < 0.05, "{stats:?}");
        }
    }

    #[test]
    fn test_inward_orientation_flips_sign() {
        let (v, f) = icosphere(3);
        let flipped = f.iter().map(|&[a, b, c]| [a, c, b]).collect();
        let mesh = Mesh::new(v, flipped).unwrap();
        let stats = curvature_stats(&mesh).unwrap();
        assert!(float_eq(stats.mean, -1.0, 0.02), "{stats:?}");
    }

    #[test]
    fn test_planar_vertex_has_zero_curvature() {
        let (v, f) = icosphere(0);
        let mesh = Mesh::new(v, f).unwrap();
        assert!(vertex_mean_curvature(&mesh).iter().all(Option::is_some));

        let plane = Mesh::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.5, 0.5, 0.0],
            ],
            vec![[0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]],
        )
        .unwrap();
        let h = vertex_mean_curvature(&plane);
        assert!(h[4].unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_isolated_vertex_is_skipped() {
        let cube = cube_mesh(1.0);
        let mut v = cube.vertices().to_vec();
        v.push([5.0, 5.0, 5.0]);
        let mesh = Mesh::new(v, cube.faces().to_vec()).unwrap();
        let h = vertex_mean_curvature(&mesh);
        assert!(h[8].is_none());
        assert_eq!(curvature_stats(&mesh).unwrap().samples, 8);
    }

    #[test]
    fn test_sliver_does_not_disturb_sphere() {
        // 把一个面片沿一条边劈成一个正常三角形和一个极扁的三角形.
        let (mut v, mut f) = icosphere(3);
        let [a, b, c] = f[0];
        let (xb, xc) = (v[b], v[c]);
        let m = v.len();
        v.push([0, 1, 2].map(|k| xb[k] + 1e-4 * (xc[k] - xb[k])));
        f[0] = [a, b, m];
        f.push([a, m, c]);
        // 对面的面片也要共享新顶点, 保持封闭.
        let twin = f
            .iter()
            .position(|t| t.contains(&b) && t.contains(&c) && !t.contains(&a))
            .unwrap();
        let [p, q, r] = f[twin];
        let rot = if p == c { [p, q, r] } else if q == c { [q, r, p] } else { [r, p, q] };
        // [c, b, o]
        f[twin] = [rot[0], m, rot[2]];
        f.push([m, rot[1], rot[2]]);

        let mesh = Mesh::new(v, f).unwrap();
        assert!(mesh.orientation().is_closed_and_consistent());
        let h = vertex_mean_curvature(&mesh);
        for k in [a, b, c, m] {
            assert!(float_eq(h[k].unwrap(), 1.0, 0.03), "{k}: {:?}", h[k]);
        }
    }
}
