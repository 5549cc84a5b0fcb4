//! marching cubes 构型表.
//!
//! 角点与棱的编号沿用经典 256 构型表:
//!
//! ```text
//!        7 -------- 6          . --- 6 --- .
//!       /|         /|         7|          5|
//!      4 -------- 5 |        . --- 4 --- . |
//!      | 3 -------|-2        | . --- 2 --|-.
//!      |/         |/        8|11        9|10
//!      0 -------- 1          . --- 0 --- .      (3 在左后, 1 在右前)
//! ```
//!
//! 每种构型的三角形不是手抄的, 而是由立方体表面规则生成:
//!
//! 1. 在每个面上按外侧视角的逆时针方向遍历四条棱, 记录穿越点;
//!   由外到内的穿越点连向下一个 (由内到外的) 穿越点. 对角歧义面因此总是分开内部角点,
//!   相邻立方体看到同一个面时得到同一组线段, 保证表面封闭.
//! 2. 所有线段首尾相接成环, 每个环做扇形三角化.
//!
//! 按此方向连接时三角形法向背离内部 (高值) 角点.

use once_cell::sync::Lazy;

/// 角点在立方体内的偏移 `[dx, dy, dz]`.
pub(crate) const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// 棱的两个端点角点.
pub(crate) const EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// 六个面的角点, 从立方体外侧看为逆时针.
const FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1], // z = 0
    [4, 5, 6, 7], // z = 1
    [0, 1, 5, 4], // y = 0
    [3, 7, 6, 2], // y = 1
    [0, 4, 7, 3], // x = 0
    [1, 2, 6, 5], // x = 1
];

/// 256 种构型各自的三角形 (以棱编号表示). 构型第 `i` 位为 1 表示角点 `i` 在阈值之上.
pub(crate) static TRIANGLES: Lazy<Vec<Vec<[u8; 3]>>> =
    Lazy::new(|| (0..=u8::MAX).map(triangulate).collect());

/// 连接角点 `a`, `b` 的棱.
fn edge_between(a: usize, b: usize) -> usize {
    let found = EDGES
        .iter()
        .position(|&[p, q]| (p, q) == (a, b) || (p, q) == (b, a));
    debug_assert!(found.is_some(), "角点 {a} 和 {b} 不相邻");
    found.unwrap_or(0)
}

/// 每条被穿越的棱在其 "进入" 面上指向的下一条棱.
///
/// 每条被穿越的棱恰好是一个面上的进入点和另一个面上的离开点, 因此结果构成若干个环.
pub(crate) fn face_segments(config: u8) -> [Option<usize>; 12] {
    let inside = |c: usize| config & (1 << c) != 0;
    let mut next = [None; 12];

    for face in FACES {
        // (棱, 是否由外到内).
        let mut crossings = [(0usize, false); 4];
        let mut len = 0;
        for k in 0..4 {
            let (a, b) = (face[k], face[(k + 1) % 4]);
            if inside(a) != inside(b) {
                crossings[len] = (edge_between(a, b), inside(b));
                len += 1;
            }
        }
        debug_assert!(len % 2 == 0);

        for i in 0..len {
            let (edge, entering) = crossings[i];
            if entering {
                let (exit, leaving) = crossings[(i + 1) % len];
                debug_assert!(!leaving);
                next[edge] = Some(exit);
            }
        }
    }
    next
}

/// 生成构型 `config` 的三角形.
fn triangulate(config: u8) -> Vec<[u8; 3]> {
    let next = face_segments(config);
    let mut visited = [false; 12];
    let mut triangles = Vec::new();

    for start in 0..12 {
        if visited[start] || next[start].is_none() {
            continue;
        }
        let mut ring = Vec::with_capacity(12);
        let mut cur = start;
        while !visited[cur] {
            visited[cur] = true;
            ring.push(cur as u8);
            match next[cur] {
                Some(n) => cur = n,
                None => break,
            }
        }
        debug_assert_eq!(cur, start, "构型 {config} 的环未闭合");

        for k in 1..ring.len().saturating_sub(1) {
            triangles.push([ring[0], ring[k], ring[k + 1]]);
        }
    }
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{cross, dot, sub};
    use std::collections::HashMap;

    fn edge_midpoint(edge: usize) -> [f64; 3] {
        let [a, b] = EDGES[edge];
        [0, 1, 2].map(|k| 0.5 * (CORNERS[a][k] + CORNERS[b][k]) as f64)
    }

    #[test]
    fn test_trivial_configs() {
        assert!(TRIANGLES[0].is_empty());
        assert!(TRIANGLES[255].is_empty());
        assert_eq!(TRIANGLES.len(), 256);
    }

    #[test]
    fn test_single_corner_cases() {
        // 单个角点在内: 一个三角形, 法向背离该角点.
        for c in 0..8 {
            let tris = &TRIANGLES[1 << c];
            assert_eq!(tris.len(), 1, "corner {c}");
            let [a, b, d] = tris[0].map(|e| edge_midpoint(e as usize));
            let n = cross(sub(b, a), sub(d, a));
            let corner = CORNERS[c].map(|x| x as f64);
            assert!(dot(n, sub(a, corner)) > 0.0, "corner {c}");

            // 单个角点在外: 法向指向该角点.
            let tris = &TRIANGLES[(!(1u8 << c)) as usize];
            assert_eq!(tris.len(), 1, "corner {c} outside");
            let [a, b, d] = tris[0].map(|e| edge_midpoint(e as usize));
            let n = cross(sub(b, a), sub(d, a));
            assert!(dot(n, sub(a, corner)) < 0.0, "corner {c} outside");
        }
    }

    #[test]
    fn test_ambiguous_face_separates_inside_corners() {
        // 角点 0 和 2 在内 (z = 0 面对角): 两个独立的三角形.
        let tris = &TRIANGLES[0b0000_0101];
        assert_eq!(tris.len(), 2);
    }

    /// 所有构型: 三角形的有向边界恰好是面上的线段, 内部扇形对角线两两抵消,
    /// 且所有三角形使用的棱恰好是被穿越的棱.
    #[test]
    fn test_all_configs_closed_and_oriented() {
        for config in 0..=u8::MAX {
            let inside = |c: usize| config & (1 << c) != 0;
            let next = face_segments(config);

            for (e, [a, b]) in EDGES.iter().enumerate() {
                assert_eq!(next[e].is_some(), inside(*a) != inside(*b), "config {config}");
            }

            let mut directed: HashMap<(u8, u8), i32> = HashMap::new();
            for &[a, b, c] in &TRIANGLES[config as usize] {
                assert!(a != b && b != c && c != a, "config {config}");
                for (p, q) in [(a, b), (b, c), (c, a)] {
                    *directed.entry((p, q)).or_default() += 1;
                    *directed.entry((q, p)).or_default() -= 1;
                }
            }
            let mut boundary: Vec<(u8, u8)> = directed
                .into_iter()
                .filter(|(_, n)| *n > 0)
                .map(|(k, n)| {
                    assert_eq!(n, 1, "config {config}");
                    k
                })
                .collect();
            boundary.sort_unstable();

            let mut expected: Vec<(u8, u8)> = next
                .iter()
                .enumerate()
                .filter_map(|(e, n)| n.map(|n| (e as u8, n as u8)))
                .collect();
            expected.sort_unstable();
            assert_eq!(boundary, expected, "config {config}");
        }
    }

    /// 共享面从两侧观察得到的线段方向相反, 相邻立方体因此能拼成一致绕序的封闭表面.
    #[test]
    fn test_shared_face_segments_reverse() {
        // z = 1 面 (角点 4, 5, 6, 7) 与上方立方体的 z = 0 面 (角点 0, 1, 2, 3) 重合.
        let edge_up = |e: usize| match e {
            4 => Some(0),
            5 => Some(1),
            6 => Some(2),
            7 => Some(3),
            _ => None,
        };
        for top in 0u8..16 {
            // 下方立方体的角点 4..8 与上方立方体的角点 0..4 取值相同.
            let below = face_segments(top << 4);
            let above = face_segments(top);
            for e in 4..8 {
                if let (Some(n), Some(up)) = (below[e], edge_up(e)) {
                    if let Some(n_up) = edge_up(n) {
                        assert_eq!(above[n_up], Some(up), "top {top:04b}");
                    }
                }
            }
        }
    }
}
