//! Models: ordered geometry and volume lists plus the finalized scene

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EngineResult;
use crate::geometry::Shape;
use crate::material::Material;
use crate::object::ObjectRef;
use crate::param::Params;
use crate::scene::{Primitive, Scene};

/// Realized model state
#[derive(Debug)]
pub struct Model {
    geometry: Vec<ObjectRef>,
    volumes: Vec<ObjectRef>,
    scene: Arc<Scene>,
    generation: u64,
}

impl Model {
    /// Create a new empty model
    pub fn new() -> Self {
        Self {
            geometry: Vec::new(),
            volumes: Vec::new(),
            scene: Arc::new(Scene::empty()),
            generation: 0,
        }
    }

    /// Append a geometry; the same geometry may appear more than once
    pub fn add_geometry(&mut self, geometry: ObjectRef) {
        self.geometry.push(geometry);
    }

    /// Remove the first entry referring to `geometry`
    ///
    /// Returns whether anything was removed.
    pub fn remove_geometry(&mut self, geometry: &ObjectRef) -> bool {
        match self.geometry.iter().position(|g| g.ptr_eq(geometry)) {
            Some(index) => {
                self.geometry.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn add_volume(&mut self, volume: ObjectRef) {
        self.volumes.push(volume);
    }

    pub fn geometry(&self) -> &[ObjectRef] {
        &self.geometry
    }

    pub fn volumes(&self) -> &[ObjectRef] {
        &self.volumes
    }

    /// Scene from the last finalize
    pub fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    /// Number of times the model has been finalized
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn commit(&mut self, _params: &Params) -> EngineResult<()> {
        self.finalize()
    }

    /// Rebuild the scene and its acceleration structure from the current
    /// geometry and volume lists
    pub fn finalize(&mut self) -> EngineResult<()> {
        let mut primitives = Vec::new();
        let mut materials = vec![Material::default()];
        let mut material_slots: HashMap<u64, u32> = HashMap::new();

        for object in &self.geometry {
            let state = object.read();
            let geometry = state.geometry()?;

            let material = match geometry.material() {
                Some(mat) => match material_slots.get(&mat.addr()) {
                    Some(slot) => *slot,
                    None => {
                        let slot = materials.len() as u32;
                        materials.push(mat.read().material()?.clone());
                        material_slots.insert(mat.addr(), slot);
                        slot
                    }
                },
                None => 0,
            };

            match geometry.shape() {
                Shape::Empty => {
                    log::debug!("Skipping uncommitted geometry {:?}", object);
                }
                Shape::Mesh(mesh) => {
                    primitives.extend(mesh.triangles.iter().map(|&[i0, i1, i2]| {
                        let idx = [i0 as usize, i1 as usize, i2 as usize];
                        Primitive::Triangle {
                            vertices: idx.map(|i| mesh.vertices[i]),
                            colors: mesh.colors.as_ref().map(|c| idx.map(|i| c[i])),
                            texcoords: mesh.texcoords.as_ref().map(|t| idx.map(|i| t[i])),
                            material,
                        }
                    }));
                }
                Shape::Spheres {
                    centers,
                    radius,
                    colors,
                } => {
                    primitives.extend(centers.iter().enumerate().map(|(i, center)| {
                        Primitive::Sphere {
                            center: *center,
                            radius: *radius,
                            color: colors.as_ref().map(|c| c[i]),
                            material,
                        }
                    }));
                }
            }
        }

        let mut samplers = Vec::with_capacity(self.volumes.len());
        for object in &self.volumes {
            match object.read().volume()?.sampler() {
                Some(sampler) => samplers.push(Arc::clone(sampler)),
                None => log::debug!("Skipping uncommitted volume {:?}", object),
            }
        }

        self.scene = Arc::new(Scene::new(primitives, materials, samplers));
        self.generation += 1;
        log::debug!(
            "Finalized model: {} primitives, {} volumes",
            self.scene.primitives().len(),
            self.scene.volumes().len()
        );
        Ok(())
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Data;
    use crate::geometry::{Geometry, GeometryKind};
    use crate::object::ObjectKind;
    use crate::param::Param;
    use lumen_core::DataType;
    use lumen_math::Vec3;

    fn spheres(centers: &[f32]) -> ObjectRef {
        let bytes = centers.iter().flat_map(|v| v.to_le_bytes()).collect();
        let data = Data::from_bytes(centers.len() / 3, DataType::Float3, 0, bytes).unwrap();
        let geometry = ObjectRef::new("spheres", ObjectKind::Geometry(Geometry::new(GeometryKind::Spheres)));
        geometry.set_param("spheres", Param::Object(Some(ObjectRef::new("data", ObjectKind::Data(data)))));
        geometry.set_param("radius", Param::Float(0.5));
        geometry.commit().unwrap();
        geometry
    }

    #[test]
    fn test_remove_first_occurrence_only() {
        let g1 = spheres(&[0.0, 0.0, 0.0]);
        let g2 = spheres(&[2.0, 0.0, 0.0]);
        let mut model = Model::new();
        model.add_geometry(g1.clone());
        model.add_geometry(g2.clone());
        model.add_geometry(g1.clone());
        assert_eq!(g1.ref_count(), 3);

        assert!(model.remove_geometry(&g1));
        assert_eq!(model.geometry().len(), 2);
        assert!(model.geometry()[0].ptr_eq(&g2));
        assert!(model.geometry()[1].ptr_eq(&g1));
        assert_eq!(g1.ref_count(), 2);
    }

    #[test]
    fn test_remove_no_match_is_silent() {
        let g1 = spheres(&[0.0, 0.0, 0.0]);
        let stranger = spheres(&[5.0, 0.0, 0.0]);
        let mut model = Model::new();
        model.add_geometry(g1.clone());

        assert!(!model.remove_geometry(&stranger));
        assert_eq!(model.geometry().len(), 1);
        assert!(model.geometry()[0].ptr_eq(&g1));
    }

    #[test]
    fn test_finalize_flattens_geometry() {
        let mut model = Model::new();
        model.add_geometry(spheres(&[0.0, 0.0, 0.0, 3.0, 0.0, 0.0]));
        model.add_geometry(spheres(&[0.0, 3.0, 0.0]));
        assert_eq!(model.scene().primitives().len(), 0);

        model.finalize().unwrap();
        assert_eq!(model.scene().primitives().len(), 3);
        assert_eq!(model.generation(), 1);
        assert_eq!(model.scene().bounds().max, Vec3::new(3.5, 3.5, 0.5));
    }

    #[test]
    fn test_finalize_is_repeatable() {
        let mut model = Model::new();
        model.add_geometry(spheres(&[1.0, 2.0, 3.0]));
        model.finalize().unwrap();
        let first = model.scene().primitives().to_vec();
        model.finalize().unwrap();
        assert_eq!(model.scene().primitives(), first.as_slice());
    }

    #[test]
    fn test_shared_material_slot() {
        let material = ObjectRef::new("OBJMaterial", ObjectKind::Material(Material::new()));
        material.set_param("Kd", Param::Float3([1.0, 0.0, 0.0]));
        material.commit().unwrap();

        let mut model = Model::new();
        for center in [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]] {
            let g = spheres(&center);
            g.write().geometry_mut().unwrap().set_material(Some(material.clone()));
            model.add_geometry(g);
        }
        model.finalize().unwrap();

        for primitive in model.scene().primitives() {
            assert!(matches!(primitive, Primitive::Sphere { material: 1, .. }));
        }
    }
}
