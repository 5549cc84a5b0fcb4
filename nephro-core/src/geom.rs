//! 三维向量小工具. 全部以 `[f64; 3]` 表示.

use crate::Point3;

#[inline]
pub(crate) fn sub(a: Point3, b: Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn add(a: Point3, b: Point3) -> Point3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub(crate) fn scale(a: Point3, k: f64) -> Point3 {
    [a[0] * k, a[1] * k, a[2] * k]
}

#[inline]
pub(crate) fn dot(a: Point3, b: Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub(crate) fn cross(a: Point3, b: Point3) -> Point3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub(crate) fn norm(a: Point3) -> f64 {
    dot(a, a).sqrt()
}

/// 三角形面积.
#[inline]
pub(crate) fn triangle_area([a, b, c]: [Point3; 3]) -> f64 {
    0.5 * norm(cross(sub(b, a), sub(c, a)))
}

/// Neumaier 补偿求和.
///
/// 求和顺序固定为迭代顺序, 因此结果与线程数无关.
pub(crate) fn compensated_sum<I: IntoIterator<Item = f64>>(it: I) -> f64 {
    let mut sum = 0.0f64;
    let mut comp = 0.0f64;
    for x in it {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            comp += (sum - t) + x;
        } else {
            comp += (x - t) + sum;
        }
        sum = t;
    }
    sum + comp
}
