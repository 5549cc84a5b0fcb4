//! 测试用的合成体数据和网格.

use std::collections::HashMap;

use ndarray::Array3;

use crate::{Face, Idx3d, Mesh, Point3, ScalarVolume};

/// 浮点数相对/绝对误差比较.
pub(crate) fn float_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * (1.0 + a.abs().max(b.abs()))
}

/// 边长 `side`, 一个角点在原点的立方体. 8 个顶点, 12 个外向三角形.
pub(crate) fn cube_mesh(side: f64) -> Mesh {
    let vertices: Vec<Point3> = [
        [0, 0, 0],
        [1, 0, 0],
        [1, 1, 0],
        [0, 1, 0],
        [0, 0, 1],
        [1, 0, 1],
        [1, 1, 1],
        [0, 1, 1],
    ]
    .iter()
    .map(|c| c.map(|k| k as f64 * side))
    .collect();

    // 从外侧看为逆时针.
    let quads = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [3, 7, 6, 2],
        [0, 4, 7, 3],
        [1, 2, 6, 5],
    ];
    let faces = quads
        .iter()
        .flat_map(|&[a, b, c, d]| [[a, b, c], [a, c, d]])
        .collect();
    Mesh::new(vertices, faces).unwrap()
}

/// 形状为 `shape` 的二值体数据, 下标在 `[lo, hi)` 内的体素为 1.
pub(crate) fn box_mask(shape: Idx3d, lo: Idx3d, hi: Idx3d, spacing: [f64; 3]) -> ScalarVolume {
    let data = Array3::from_shape_fn(shape, |(z, y, x)| {
        let inside = (lo.0..hi.0).contains(&z) && (lo.1..hi.1).contains(&y) && (lo.2..hi.2).contains(&x);
        if inside {
            1.0
        } else {
            0.0
        }
    });
    ScalarVolume::new(data, spacing).unwrap()
}

/// `n * n * n` 的二值体数据, 以体素下标计到中心距离不超过 `radius` 的体素为 1.
pub(crate) fn ball_mask(n: usize, radius: f64, spacing: [f64; 3]) -> ScalarVolume {
    let c = (n as f64 - 1.0) / 2.0;
    let data = Array3::from_shape_fn((n, n, n), |(z, y, x)| {
        let d2 = [z, y, x].iter().map(|&i| (i as f64 - c).powi(2)).sum::<f64>();
        if d2 <= radius * radius {
            1.0
        } else {
            0.0
        }
    });
    ScalarVolume::new(data, spacing).unwrap()
}

/// `n * n * n` 的光滑体数据: 以物理坐标计到 `center` 距离为 `d` 的体素取
/// `1 / (1 + exp((d - radius) / spacing))`, 即 0.5 等值面为半径 `radius` 毫米的球面.
pub(crate) fn smooth_ball(n: usize, center: Point3, radius: f64, spacing: f64) -> ScalarVolume {
    let data = Array3::from_shape_fn((n, n, n), |(z, y, x)| {
        let d2 = [x, y, z]
            .iter()
            .zip(center)
            .map(|(&i, c)| (i as f64 * spacing - c).powi(2))
            .sum::<f64>();
        (1.0 / (1.0 + ((d2.sqrt() - radius) / spacing).exp())) as f32
    });
    ScalarVolume::new(data, [spacing; 3]).unwrap()
}

/// 安装测试日志. 重复调用无害.
pub(crate) fn init_logger() {
    let _ = simple_logger::init_with_level(log::Level::Debug);
}

/// 伪随机二值体数据. 同一 `seed` 总是得到同样的结果.
pub(crate) fn noise_mask(shape: Idx3d, seed: u64) -> ScalarVolume {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let data = Array3::from_shape_simple_fn(shape, || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        if (state >> 33) & 1 == 1 {
            1.0
        } else {
            0.0
        }
    });
    ScalarVolume::new(data, [1.0; 3]).unwrap()
}

/// 单位球面上的正二十面体细分网格, 三角形外向.
///
/// 细分 `k` 次后有 `10 * 4^k + 2` 个顶点.
pub(crate) fn icosphere(subdivisions: usize) -> (Vec<Point3>, Vec<Face>) {
    let phi = (1.0 + 5.0f64.sqrt()) / 2.0;
    let mut vertices: Vec<Point3> = [
        [-1.0, phi, 0.0],
        [1.0, phi, 0.0],
        [-1.0, -phi, 0.0],
        [1.0, -phi, 0.0],
        [0.0, -1.0, phi],
        [0.0, 1.0, phi],
        [0.0, -1.0, -phi],
        [0.0, 1.0, -phi],
        [phi, 0.0, -1.0],
        [phi, 0.0, 1.0],
        [-phi, 0.0, -1.0],
        [-phi, 0.0, 1.0],
    ]
    .iter()
    .map(|&v| normalized(v))
    .collect();

    let mut faces: Vec<Face> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Point3>| {
            *midpoints.entry((a.min(b), a.max(b))).or_insert_with(|| {
                let (p, q) = (vertices[a], vertices[b]);
                vertices.push(normalized([0, 1, 2].map(|k| 0.5 * (p[k] + q[k]))));
                vertices.len() - 1
            })
        };
        let mut next = Vec::with_capacity(faces.len() * 4);
        for &[a, b, c] in &faces {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            next.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = next;
    }
    (vertices, faces)
}

/// 半径 `radius` 的球面, 沿径向叠加振幅为 `amplitude` 的正弦起伏:
/// `r = radius * (1 + amplitude * sin(5x) sin(5y) sin(5z))`, `(x, y, z)` 为单位球面坐标.
pub(crate) fn bumpy_sphere(subdivisions: usize, radius: f64, amplitude: f64) -> Mesh {
    let (vertices, faces) = icosphere(subdivisions);
    let vertices = vertices
        .into_iter()
        .map(|[x, y, z]| {
            let r = radius * (1.0 + amplitude * (5.0 * x).sin() * (5.0 * y).sin() * (5.0 * z).sin());
            [x * r, y * r, z * r]
        })
        .collect();
    Mesh::new(vertices, faces).unwrap()
}

fn normalized(v: Point3) -> Point3 {
    let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    v.map(|c| c / n)
}

#[test]
fn test_fixtures() {
    let (v, f) = icosphere(2);
    assert_eq!(v.len(), 162);
    assert_eq!(f.len(), 320);
    for p in &v {
        assert!(float_eq(normalized(*p)[0], p[0], 1e-12));
    }

    let sphere = bumpy_sphere(2, 1.0, 0.0);
    assert!(sphere.orientation().is_closed_and_consistent());
    assert_eq!(sphere.orientation().consistent, 480);

    let smooth = smooth_ball(9, [4.0, 4.0, 4.0], 3.0, 1.0);
    assert!(smooth[(4, 4, 4)] > 0.9);
    assert!((smooth[(4, 4, 7)] - 0.5).abs() < 1e-6);

    let ball = ball_mask(9, 3.0, [1.0; 3]);
    assert_eq!(ball[(4, 4, 4)], 1.0);
    assert_eq!(ball[(0, 0, 0)], 0.0);

    let a = noise_mask((3, 4, 5), 9);
    let b = noise_mask((3, 4, 5), 9);
    assert_eq!(a.data(), b.data());
    assert!(a.count_above(0.5) > 0 && a.count_above(0.5) < 60);
}
