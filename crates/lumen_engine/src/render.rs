//! Tile rendering
//!
//! Selected tiles are pulled from a shared counter by a scoped pool of
//! worker threads. Every thread returns the tiles it traced and the pool is
//! joined before the frame is written, so nothing outlives `render_frame`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lumen_math::{consts::PI, Ray, Vec3, Vec4};

use crate::camera::CameraFrame;
use crate::error::{EngineError, EngineResult};
use crate::light::Light;
use crate::scene::{Scene, SurfaceHit};
use crate::tile::TileRect;

const RAY_EPSILON: f32 = 1e-3;
const OPAQUE: f32 = 0.99;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Shading {
    SciVis { shadows: bool },
    Ao { samples: u32, distance: f32 },
}

/// Everything a frame reads, detached from the object graph
#[derive(Debug)]
pub(crate) struct FrameSetup {
    pub scene: Option<Arc<Scene>>,
    pub camera: Option<CameraFrame>,
    pub lights: Vec<Light>,
    pub background: Vec4,
    pub shading: Shading,
}

/// Traced pixels of one tile, row-major within the tile
#[derive(Debug)]
pub(crate) struct TileOutput {
    pub rect: TileRect,
    pub color: Vec<Vec4>,
    pub depth: Vec<f32>,
}

/// Trace `tiles` on up to `threads` threads
pub(crate) fn render_tiles(
    setup: &FrameSetup,
    size: (u32, u32),
    tiles: &[TileRect],
    threads: usize,
    frame: u32,
) -> EngineResult<Vec<TileOutput>> {
    if tiles.is_empty() {
        return Ok(Vec::new());
    }
    let threads = threads.clamp(1, tiles.len());
    let next = AtomicUsize::new(0);

    let per_thread = crossbeam_utils::thread::scope(|s| {
        let mut workers = Vec::with_capacity(threads);
        for _ in 0..threads {
            let next = &next;
            workers.push(s.spawn(move |_| {
                let mut traced = Vec::new();
                while let Some(rect) = tiles.get(next.fetch_add(1, Ordering::Relaxed)) {
                    traced.push(render_tile(setup, size, *rect, frame));
                }
                traced
            }));
        }
        workers
            .into_iter()
            .map(|worker| worker.join())
            .collect::<Vec<_>>()
    })
    .map_err(|_| EngineError::RenderWorker)?;

    let mut outputs = Vec::with_capacity(tiles.len());
    for traced in per_thread {
        outputs.extend(traced.map_err(|_| EngineError::RenderWorker)?);
    }
    Ok(outputs)
}

fn render_tile(setup: &FrameSetup, (width, height): (u32, u32), rect: TileRect, frame: u32) -> TileOutput {
    let mut color = Vec::with_capacity(rect.pixel_count());
    let mut depth = Vec::with_capacity(rect.pixel_count());

    for y in rect.y0..rect.y1 {
        for x in rect.x0..rect.x1 {
            let (c, d) = match (&setup.scene, &setup.camera) {
                (Some(scene), Some(camera)) => {
                    let s = (x as f32 + 0.5) / width as f32;
                    let t = (y as f32 + 0.5) / height as f32;
                    let seed = hash3(x, y, frame);
                    trace(setup, scene, &camera.generate_ray(s, t), seed)
                }
                _ => (setup.background, f32::INFINITY),
            };
            color.push(c);
            depth.push(d);
        }
    }

    TileOutput { rect, color, depth }
}

fn trace(setup: &FrameSetup, scene: &Scene, ray: &Ray, seed: u32) -> (Vec4, f32) {
    let hit = scene.intersect(ray, f32::INFINITY);
    let depth = hit.map_or(f32::INFINITY, |h| h.distance);

    let behind = match &hit {
        Some(hit) => {
            let lit = match setup.shading {
                Shading::SciVis { shadows } => shade_scivis(setup, scene, ray, hit, shadows),
                Shading::Ao { samples, distance } => shade_ao(scene, hit, samples, distance, seed),
            };
            over(lit.extend(hit.albedo.w), setup.background)
        }
        None => setup.background,
    };

    let mut color = behind;
    if matches!(setup.shading, Shading::SciVis { .. }) {
        for volume in scene.volumes().iter().rev() {
            if let Some((t0, t1)) = scene.volume_interval(volume, ray, depth) {
                let step = volume.step();
                let mut acc = Vec4::ZERO;
                let mut t = t0 + step * rand01(seed);
                while t < t1 && acc.w < OPAQUE {
                    let sample = volume.sample(ray.at(t));
                    let alpha = 1.0 - (1.0 - sample.w.clamp(0.0, 1.0)).powf(step);
                    let weight = (1.0 - acc.w) * alpha;
                    acc += (sample.xyz() * weight).extend(weight);
                    t += step;
                }
                color = over(acc, color);
            }
        }
    }

    (color, depth)
}

/// `front` (premultiplied in rgb when it came from compositing) over `back`
fn over(front: Vec4, back: Vec4) -> Vec4 {
    let rest = 1.0 - front.w;
    Vec4::new(
        front.x + back.x * rest,
        front.y + back.y * rest,
        front.z + back.z * rest,
        front.w + back.w * rest,
    )
}

fn shade_scivis(setup: &FrameSetup, scene: &Scene, ray: &Ray, hit: &SurfaceHit, shadows: bool) -> Vec3 {
    let albedo = hit.albedo.xyz();
    let coverage = hit.albedo.w;

    if setup.lights.is_empty() {
        let facing = hit.normal.dot(-ray.direction).abs();
        return albedo * ((0.2 + 0.8 * facing) * coverage);
    }

    let origin = hit.point + hit.normal * RAY_EPSILON;
    let mut radiance = Vec3::ZERO;
    for light in &setup.lights {
        match light.incident(hit.point) {
            None => radiance += albedo.mul_elem(light.radiance()),
            Some((dir, distance)) => {
                let cos = hit.normal.dot(dir);
                if cos <= 0.0 {
                    continue;
                }
                if shadows && scene.occluded(&Ray::new(origin, dir), distance - RAY_EPSILON) {
                    continue;
                }
                radiance += albedo.mul_elem(light.radiance()) * cos;
            }
        }
    }
    radiance * coverage
}

fn shade_ao(scene: &Scene, hit: &SurfaceHit, samples: u32, distance: f32, seed: u32) -> Vec3 {
    let origin = hit.point + hit.normal * RAY_EPSILON;
    let (tangent, bitangent) = orthonormal_basis(hit.normal);

    let mut visible = 0u32;
    for i in 0..samples {
        let u1 = rand01(hash3(seed, i, 0x9e37));
        let u2 = rand01(hash3(seed, i, 0x7f4a));
        // Cosine-weighted hemisphere sample
        let r = u1.sqrt();
        let phi = 2.0 * PI * u2;
        let local = Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u1).max(0.0).sqrt());
        let dir = tangent * local.x + bitangent * local.y + hit.normal * local.z;
        if !scene.occluded(&Ray::new(origin, dir), distance) {
            visible += 1;
        }
    }

    hit.albedo.xyz() * (visible as f32 / samples as f32 * hit.albedo.w)
}

fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let helper = if n.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    let tangent = n.cross(helper).normalize();
    (tangent, n.cross(tangent))
}

fn hash3(a: u32, b: u32, c: u32) -> u32 {
    let mut h = a.wrapping_mul(0x8da6_b343) ^ b.wrapping_mul(0xd816_3841) ^ c.wrapping_mul(0xcb1a_b31f);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^ (h >> 16)
}

fn rand01(h: u32) -> f32 {
    (h >> 8) as f32 / (1u32 << 24) as f32
}
