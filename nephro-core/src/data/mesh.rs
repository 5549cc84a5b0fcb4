//! 三角网格.

use std::collections::HashMap;

use ordered_float::OrderedFloat;

use crate::error::{AnalysisError, AnalysisResult, EmptyInput, Malformed, MeshField};
use crate::geom;
use crate::{Face, Point3};

/// 三角网格: 物理坐标 (毫米) 下的顶点序列, 以及顶点索引三元组构成的面片序列.
///
/// 保证每个面片索引都在顶点序列范围内, 且所有坐标为有限数.
/// 不保证流形或封闭: marching cubes 的输出在立方体边界处可能存在重合顶点, 这是合法的.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    vertices: Vec<Point3>,
    faces: Vec<Face>,
}

/// 有向边一致性统计. 以无向边为单位.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct OrientationReport {
    /// 两个方向使用次数相等的边.
    pub consistent: usize,

    /// 两个方向使用次数不等的边 (绕序冲突).
    pub inconsistent: usize,

    /// 只被一个面片使用的边 (开放边界).
    pub boundary: usize,

    /// 被三个及以上面片使用的边. 两个方向次数相等时同时计入 `consistent`, 否则计入 `inconsistent`.
    pub non_manifold: usize,
}

impl OrientationReport {
    /// 网格是否封闭且绕序一致: 每条边两个方向的使用次数相等.
    ///
    /// 允许非流形边, 它们不影响散度定理体积.
    #[inline]
    pub fn is_closed_and_consistent(&self) -> bool {
        self.inconsistent == 0 && self.boundary == 0
    }
}

impl Mesh {
    /// 由顶点和面片创建网格.
    ///
    /// 坐标含非有限数或面片索引越界时返回 [`AnalysisError::MalformedMesh`].
    pub fn new(vertices: Vec<Point3>, faces: Vec<Face>) -> AnalysisResult<Self> {
        if let Some(pos) = vertices
            .iter()
            .flatten()
            .position(|c| !c.is_finite())
        {
            return Err(AnalysisError::malformed(
                MeshField::Vertices,
                Malformed::NonFinite(pos),
            ));
        }
        let len = vertices.len();
        if let Some(&index) = faces.iter().flatten().find(|i| **i >= len) {
            return Err(AnalysisError::malformed(
                MeshField::Faces,
                Malformed::IndexOutOfRange { index, len },
            ));
        }
        Ok(Self { vertices, faces })
    }

    /// 由内部算法直接拼接网格. 调用方保证数据合法.
    #[inline]
    pub(crate) fn from_parts(vertices: Vec<Point3>, faces: Vec<Face>) -> Self {
        debug_assert!(vertices.iter().flatten().all(|c| c.is_finite()));
        debug_assert!(faces.iter().flatten().all(|i| *i < vertices.len()));
        Self { vertices, faces }
    }

    /// 由扁平序列 `[x, y, z, x, y, z, ..]` 和 `[i, j, k, i, j, k, ..]` 创建网格.
    ///
    /// 在任何几何计算之前依次检查: 两个序列均非空, 长度均为 3 的倍数,
    /// 坐标均为有限数, 索引均不越界. 错误会指明出错的序列.
    pub fn from_flat(vertices: &[f64], faces: &[usize]) -> AnalysisResult<Self> {
        check_flat(vertices.len(), MeshField::Vertices)?;
        check_flat(faces.len(), MeshField::Faces)?;

        let vertices = vertices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        let faces = faces.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        Self::new(vertices, faces)
    }

    /// 展开成扁平序列. 与 [`Self::from_flat`] 互逆.
    pub fn to_flat(&self) -> (Vec<f64>, Vec<usize>) {
        (
            self.vertices.iter().flatten().copied().collect(),
            self.faces.iter().flatten().copied().collect(),
        )
    }

    /// 顶点序列.
    #[inline]
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// 面片序列.
    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// 按面片顺序迭代三角形顶点坐标.
    #[inline]
    pub fn triangles(&self) -> impl ExactSizeIterator<Item = [Point3; 3]> + '_ {
        self.faces.iter().map(|f| f.map(|i| self.vertices[i]))
    }

    /// 总表面积, 以平方毫米为单位.
    pub fn surface_area(&self) -> f64 {
        geom::compensated_sum(self.triangles().map(geom::triangle_area))
    }

    /// 包围盒中心. 网格为空时返回原点.
    pub fn bbox_center(&self) -> Point3 {
        if self.vertices.is_empty() {
            return [0.0; 3];
        }
        let mut lo = [f64::INFINITY; 3];
        let mut hi = [f64::NEG_INFINITY; 3];
        for v in &self.vertices {
            for k in 0..3 {
                lo[k] = lo[k].min(v[k]);
                hi[k] = hi[k].max(v[k]);
            }
        }
        [0, 1, 2].map(|k| 0.5 * (lo[k] + hi[k]))
    }

    /// 统计每条无向边被面片使用的方向, 检查绕序是否一致.
    pub fn orientation(&self) -> OrientationReport {
        // (forward, backward), forward 指 `a < b` 的方向.
        let mut book: HashMap<(usize, usize), (u32, u32)> =
            HashMap::with_capacity(self.faces.len() * 3 / 2);
        for &[a, b, c] in &self.faces {
            for (p, q) in [(a, b), (b, c), (c, a)] {
                let entry = book.entry((p.min(q), p.max(q))).or_default();
                if p < q {
                    entry.0 += 1;
                } else {
                    entry.1 += 1;
                }
            }
        }

        let mut report = OrientationReport::default();
        for (forward, backward) in book.into_values() {
            if forward + backward == 1 {
                report.boundary += 1;
                continue;
            }
            if forward + backward > 2 {
                report.non_manifold += 1;
            }
            if forward == backward {
                report.consistent += 1;
            } else {
                report.inconsistent += 1;
            }
        }
        report
    }

    /// 合并坐标完全相同的顶点, 并删除因此退化 (含重复索引) 的面片.
    ///
    /// 顶点按首次出现的顺序重新编号.
    pub fn welded(&self) -> Mesh {
        let mut lookup: HashMap<[OrderedFloat<f64>; 3], usize> =
            HashMap::with_capacity(self.vertices.len());
        let mut vertices = Vec::with_capacity(self.vertices.len());
        let remap: Vec<usize> = self
            .vertices
            .iter()
            .map(|v| {
                *lookup.entry(v.map(OrderedFloat)).or_insert_with(|| {
                    vertices.push(*v);
                    vertices.len() - 1
                })
            })
            .collect();

        let faces = self
            .faces
            .iter()
            .map(|f| f.map(|i| remap[i]))
            .filter(|[a, b, c]| a != b && b != c && c != a)
            .collect();
        Mesh::from_parts(vertices, faces)
    }
}

/// 扁平序列须非空且长度为 3 的倍数.
#[inline]
fn check_flat(len: usize, field: MeshField) -> AnalysisResult<()> {
    if len == 0 {
        let empty = match field {
            MeshField::Vertices => EmptyInput::Vertices,
            MeshField::Faces => EmptyInput::Faces,
        };
        return Err(AnalysisError::EmptyInput(empty));
    }
    if len % 3 != 0 {
        return Err(AnalysisError::malformed(field, Malformed::NotTriples(len)));
    }
    Ok(())
}
