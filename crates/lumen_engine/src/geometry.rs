//! Geometries
//!
//! A geometry's parameters name data arrays; committing reads those arrays
//! once and keeps a realized copy of the shape, so later edits to the
//! arrays only show up after the next commit.

use lumen_math::{Vec3, Vec4, AABB};

use crate::error::{EngineError, EngineResult};
use crate::object::ObjectRef;
use crate::param::Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Triangles,
    Spheres,
}

/// Indexed triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub colors: Option<Vec<Vec4>>,
    pub texcoords: Option<Vec<[f32; 2]>>,
}

/// Realized shape data
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Shape {
    /// Never committed
    #[default]
    Empty,
    Mesh(TriangleMesh),
    Spheres {
        centers: Vec<Vec3>,
        radius: f32,
        colors: Option<Vec<Vec4>>,
    },
}

/// Realized geometry state
#[derive(Debug)]
pub struct Geometry {
    kind: GeometryKind,
    material: Option<ObjectRef>,
    shape: Shape,
    bounds: AABB,
}

impl Geometry {
    /// Create a new geometry with no shape
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            material: None,
            shape: Shape::Empty,
            bounds: AABB::EMPTY,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Attach a material, replacing any previous one
    pub fn set_material(&mut self, material: Option<ObjectRef>) {
        self.material = material;
    }

    pub fn material(&self) -> Option<&ObjectRef> {
        self.material.as_ref()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn bounds(&self) -> AABB {
        self.bounds
    }

    pub fn primitive_count(&self) -> usize {
        match &self.shape {
            Shape::Empty => 0,
            Shape::Mesh(mesh) => mesh.triangles.len(),
            Shape::Spheres { centers, .. } => centers.len(),
        }
    }

    pub(crate) fn commit(&mut self, params: &Params) -> EngineResult<()> {
        let (shape, bounds) = match self.kind {
            GeometryKind::Triangles => commit_mesh(params)?,
            GeometryKind::Spheres => commit_spheres(params)?,
        };
        self.shape = shape;
        self.bounds = bounds;
        Ok(())
    }
}

fn required<'a>(params: &'a Params, name: &str) -> EngineResult<&'a ObjectRef> {
    params
        .object(name)
        .ok_or_else(|| EngineError::invalid_param(name, "missing data array"))
}

fn per_vertex<T>(values: Vec<T>, expected: usize, name: &str) -> EngineResult<Vec<T>> {
    if values.len() < expected {
        return Err(EngineError::invalid_param(
            name,
            format!("{} entries for {} elements", values.len(), expected),
        ));
    }
    Ok(values)
}

fn commit_mesh(params: &Params) -> EngineResult<(Shape, AABB)> {
    let vertices = required(params, "vertex")?.read().data()?.vec3s()?;
    let indices = required(params, "index")?.read().data()?.ints()?;
    if indices.len() % 3 != 0 {
        return Err(EngineError::invalid_param("index", "index count is not a multiple of 3"));
    }

    let mut triangles = Vec::with_capacity(indices.len() / 3);
    for tri in indices.chunks_exact(3) {
        let mut out = [0u32; 3];
        for (slot, &index) in out.iter_mut().zip(tri) {
            *slot = u32::try_from(index)
                .ok()
                .filter(|i| (*i as usize) < vertices.len())
                .ok_or_else(|| {
                    EngineError::invalid_param("index", format!("vertex index {} out of range", index))
                })?;
        }
        triangles.push(out);
    }

    let colors = match params.object("vertex.color") {
        Some(data) => Some(per_vertex(data.read().data()?.vec4s()?, vertices.len(), "vertex.color")?),
        None => None,
    };
    let texcoords = match params.object("vertex.texcoord") {
        Some(data) => Some(per_vertex(data.read().data()?.vec2s()?, vertices.len(), "vertex.texcoord")?),
        None => None,
    };

    let bounds = triangles
        .iter()
        .flatten()
        .fold(AABB::EMPTY, |acc, &i| acc.expand_to_include(vertices[i as usize]));

    let mesh = TriangleMesh {
        vertices,
        triangles,
        colors,
        texcoords,
    };
    Ok((Shape::Mesh(mesh), bounds))
}

fn commit_spheres(params: &Params) -> EngineResult<(Shape, AABB)> {
    let centers = required(params, "spheres")?.read().data()?.vec3s()?;
    let radius = params.float("radius", 0.01);
    if radius <= 0.0 {
        return Err(EngineError::invalid_param("radius", "radius must be positive"));
    }
    let colors = match params.object("color") {
        Some(data) => Some(per_vertex(data.read().data()?.vec4s()?, centers.len(), "color")?),
        None => None,
    };

    let bounds = centers.iter().fold(AABB::EMPTY, |acc, c| {
        acc.union(&AABB::new(*c - Vec3::splat(radius), *c + Vec3::splat(radius)))
    });
    Ok((
        Shape::Spheres {
            centers,
            radius,
            colors,
        },
        bounds,
    ))
}
