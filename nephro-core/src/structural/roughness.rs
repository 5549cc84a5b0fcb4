//! 表面粗糙度.

use std::f64::consts::PI;

use crate::consts::GEOM_EPS;
use crate::error::{AnalysisError, AnalysisResult, Degenerate};
use crate::volume::signed_volume_mm3;
use crate::Mesh;

/// 同体积球面的表面积 `(36 π V^2)^(1/3)`.
#[inline]
pub fn sphere_area_for_volume(volume_mm3: f64) -> f64 {
    (36.0 * PI * volume_mm3 * volume_mm3).cbrt()
}

/// 粗糙度: 网格总面积与同体积球面面积之比.
///
/// 由等周不等式, 任何封闭曲面的该比值都不小于 1, 球面恰为 1; 表面起伏越多, 比值越大.
/// 非封闭网格的比值没有意义, 结果下限截断为 1.
///
/// 面积或所围体积为零时返回 [`AnalysisError::DegenerateSurface`].
pub fn roughness(mesh: &Mesh) -> AnalysisResult<f64> {
    let area = mesh.surface_area();
    if !(area > GEOM_EPS) {
        return Err(AnalysisError::DegenerateSurface(Degenerate::ZeroArea));
    }
    let volume = signed_volume_mm3(mesh).abs();
    if !(volume > GEOM_EPS) {
        return Err(AnalysisError::DegenerateSurface(Degenerate::ZeroVolume));
    }
    let ratio = area / sphere_area_for_volume(volume);
    if ratio < 1.0 {
        log::debug!("粗糙度 {ratio} < 1, 网格可能不封闭");
    }
    Ok(ratio.max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bumpy_sphere, cube_mesh, float_eq};

    #[test]
    fn test_sphere_area() {
        let r: f64 = 3.0;
        let v = 4.0 / 3.0 * PI * r.powi(3);
        assert!(float_eq(sphere_area_for_volume(v), 4.0 * PI * r * r, 1e-12));
    }

    #[test]
    fn test_cube_roughness() {
        // 6 / (36 π)^(1/3), 与边长无关.
        let expect = 6.0 / (36.0 * PI).cbrt();
        for side in [1.0, 7.0] {
            assert!(float_eq(roughness(&cube_mesh(side)).unwrap(), expect, 1e-12));
        }
    }

    #[test]
    fn test_sphere_is_smooth() {
        let r = roughness(&bumpy_sphere(4, 10.0, 0.0)).unwrap();
        assert!(r < 1.01, "{r}");
    }

    #[test]
    fn test_flat_mesh_is_degenerate() {
        let mesh = Mesh::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2]],
        )
        .unwrap();
        let e = roughness(&mesh).unwrap_err();
        assert!(matches!(e, AnalysisError::DegenerateSurface(Degenerate::ZeroVolume)));

        let collapsed = Mesh::new(vec![[1.0, 1.0, 1.0]; 3], vec![[0, 1, 2]]).unwrap();
        let e = roughness(&collapsed).unwrap_err();
        assert!(matches!(e, AnalysisError::DegenerateSurface(Degenerate::ZeroArea)));
    }
}
