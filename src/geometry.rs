use crate::state::{Osteoblast, Pore};
use osseo_common::{ring_point, MigrationParams, OsseoError, SimResult, Vec3};
use std::f64::consts::PI;

/// Lays out pores on `ring_count` horizontal rings spread evenly up the bone,
/// `density / 3` pores per ring at equal angles.
pub fn layout_pores(params: &MigrationParams) -> Vec<Pore> {
    let per_ring = params.pores_per_ring();

    let mut pores = Vec::with_capacity(params.total_pores());
    for i in 0..params.ring_count {
        let y = params.ring_height(i);
        for j in 0..per_ring {
            let angle = j as f64 * (2.0 * PI / per_ring as f64);
            pores.push(Pore {
                position: ring_point(params.pore_ring_radius, angle, y),
                radius: params.pore_radius,
            });
        }
    }
    pores
}

/// Builds one osteoblast per pore, placed `start_offset` behind its pore
/// along the inward normal. Its target is the implant-axis point level with
/// the pore, which its straight inward path passes through.
///
/// Fails with `DegenerateGeometry` for a pore on the implant axis.
pub fn spawn_osteoblasts(pores: &[Pore], params: &MigrationParams) -> SimResult<Vec<Osteoblast>> {
    pores
        .iter()
        .enumerate()
        .map(|(id, pore)| {
            let inward = inward_normal(pore.position)
                .ok_or(OsseoError::DegenerateGeometry { pore_index: id })?;
            Ok(Osteoblast {
                id,
                position: pore.position - inward * params.start_offset,
                direction: inward,
                target: Vec3::new(0.0, pore.position.y, 0.0),
                docked: false,
            })
        })
        .collect()
}

/// Unit vector pointing from `position` to the implant axis, horizontally.
pub fn inward_normal(position: Vec3) -> Option<Vec3> {
    position.radial().scale(-1.0).try_normalize()
}

/// Projects `position` onto the sphere of `radius` around the origin,
/// along its own direction from the origin. The origin itself is left as is.
pub fn clamp_to_sphere(position: Vec3, radius: f64) -> Vec3 {
    match position.try_normalize() {
        Some(outward) => outward * radius,
        None => position,
    }
}
