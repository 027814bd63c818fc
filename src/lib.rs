#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geom;
pub mod scene;
pub mod skin;

use std::fmt;

use geom::{NurbsSurface, Point3, Transform};
use scene::Scene;
use scene::node::{NodeId, SceneNode};
use skin::{BindingId, BindingTable, MembershipMode, SkinConfig};
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {}

/// Scene plus skinning bindings, driven from a UI panel.
///
/// Node and binding ids cross the boundary as plain integers. Flat `f64`
/// slices carry points (`x, y, z` triples) and matrices (16 values, row-major).
#[wasm_bindgen]
pub struct Engine {
    initialized: bool,
    scene: Scene,
    bindings: BindingTable,
    config: SkinConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Engine {
        Engine {
            initialized: true,
            scene: Scene::new(),
            bindings: BindingTable::new(),
            config: SkinConfig::default(),
        }
    }

    #[wasm_bindgen]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Add a mesh node; returns its id.
    #[wasm_bindgen]
    pub fn add_mesh(&mut self, name: &str, points: &[f64]) -> Result<u32, JsValue> {
        let points = points_from_flat(points)?;
        self.add_node(SceneNode::mesh(name, points))
    }

    /// Add a curve node from its control vertices.
    #[wasm_bindgen]
    pub fn add_curve(&mut self, name: &str, points: &[f64]) -> Result<u32, JsValue> {
        let points = points_from_flat(points)?;
        self.add_node(SceneNode::curve(name, points))
    }

    /// Add a flat bilinear patch spanning `origin + s * u_axis + t * v_axis`.
    #[wasm_bindgen]
    pub fn add_plane_surface(
        &mut self,
        name: &str,
        origin: &[f64],
        u_axis: &[f64],
        v_axis: &[f64],
    ) -> Result<u32, JsValue> {
        let origin = single_point(origin)?;
        let u = single_point(u_axis)?.sub_point(Point3::ORIGIN);
        let v = single_point(v_axis)?.sub_point(Point3::ORIGIN);
        let surface = NurbsSurface::clamped(
            1,
            1,
            2,
            2,
            vec![origin, origin.add_vec(u), origin.add_vec(v), origin.add_vec(u).add_vec(v)],
        )
        .map_err(to_js_error)?;
        self.add_node(SceneNode::surface(name, surface))
    }

    /// Add a NURBS surface. Control points run U-fastest. Empty knot slices
    /// select clamped uniform knots; an empty weight slice means non-rational.
    #[wasm_bindgen]
    #[allow(clippy::too_many_arguments)]
    pub fn add_nurbs_surface(
        &mut self,
        name: &str,
        degree_u: usize,
        degree_v: usize,
        u_count: usize,
        v_count: usize,
        points: &[f64],
        knots_u: &[f64],
        knots_v: &[f64],
        weights: &[f64],
    ) -> Result<u32, JsValue> {
        let points = points_from_flat(points)?;
        let knots_u = if knots_u.is_empty() {
            geom::clamped_uniform_knots(u_count, degree_u)
        } else {
            knots_u.to_vec()
        };
        let knots_v = if knots_v.is_empty() {
            geom::clamped_uniform_knots(v_count, degree_v)
        } else {
            knots_v.to_vec()
        };
        let weights = (!weights.is_empty()).then(|| weights.to_vec());
        let surface = NurbsSurface::new(
            degree_u, degree_v, u_count, v_count, points, knots_u, knots_v, weights,
        )
        .map_err(to_js_error)?;
        self.add_node(SceneNode::surface(name, surface))
    }

    /// Add a transform node. An empty matrix means identity.
    #[wasm_bindgen]
    pub fn add_transform(&mut self, name: &str, matrix: &[f64]) -> Result<u32, JsValue> {
        let matrix = matrix_from_flat(matrix)?;
        self.add_node(SceneNode::transform(name, matrix))
    }

    #[wasm_bindgen]
    pub fn set_world_matrix(&mut self, node: u32, matrix: &[f64]) -> Result<(), JsValue> {
        let matrix = matrix_from_flat(matrix)?;
        self.scene
            .set_world(node_id(node), matrix)
            .map_err(to_js_error)
    }

    #[wasm_bindgen]
    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<u32> {
        self.scene
            .find_by_name(name)
            .and_then(|id| u32::try_from(id.0).ok())
    }

    /// Replace the defaults used by later calls. Missing fields keep their
    /// default value.
    #[wasm_bindgen]
    pub fn set_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        let config: SkinConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|err| JsValue::from(JsError::new(&err.to_string())))?;
        self.set_skin_config(config);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn create_binding(
        &mut self,
        name: &str,
        geometry: &[u32],
        influences: &[u32],
    ) -> Result<u32, JsValue> {
        let id = self
            .bindings
            .create(
                &mut self.scene,
                &node_ids(geometry),
                &node_ids(influences),
                self.config,
                name,
            )
            .map_err(to_js_error)?;
        Ok(id.0)
    }

    #[wasm_bindgen]
    pub fn delete_binding(&mut self, binding: u32) -> Result<(), JsValue> {
        self.bindings
            .delete(&mut self.scene, BindingId(binding))
            .map(drop)
            .map_err(to_js_error)
    }

    /// Bind surface drivers; returns their influence indices.
    #[wasm_bindgen]
    pub fn add_influence(
        &mut self,
        binding: u32,
        drivers: &[u32],
        use_pre_bind_pose: bool,
    ) -> Result<Vec<u32>, JsValue> {
        let added = self
            .bindings
            .add_influence(
                &mut self.scene,
                BindingId(binding),
                &node_ids(drivers),
                self.config.default_weight,
                self.config.solve_options(use_pre_bind_pose),
            )
            .map_err(to_js_error)?;
        Ok(added.into_iter().map(|i| i.0).collect())
    }

    /// Bind transform drivers; returns their influence indices.
    #[wasm_bindgen]
    pub fn add_transform_influence(
        &mut self,
        binding: u32,
        drivers: &[u32],
    ) -> Result<Vec<u32>, JsValue> {
        let added = self
            .bindings
            .add_transform_influence(
                &mut self.scene,
                BindingId(binding),
                &node_ids(drivers),
                self.config.default_weight,
                self.config.create_prebind_matrix,
            )
            .map_err(to_js_error)?;
        Ok(added.into_iter().map(|i| i.0).collect())
    }

    #[wasm_bindgen]
    pub fn remove_influence(&mut self, binding: u32, driver: u32) -> Result<(), JsValue> {
        self.bindings
            .remove_influence(&mut self.scene, BindingId(binding), node_id(driver))
            .map_err(to_js_error)
    }

    /// Edit one membership record. `mode` is `replace`, `add`, `set` or
    /// `remove` (or the numeric flag `0..=3`).
    #[wasm_bindgen]
    pub fn update_membership(
        &mut self,
        binding: u32,
        geometry: u32,
        driver: u32,
        components: &[u32],
        mode: &str,
        use_pre_bind_pose: bool,
    ) -> Result<(), JsValue> {
        let mode: MembershipMode = mode.parse().map_err(to_js_error)?;
        let components: Vec<usize> = components.iter().map(|&c| c as usize).collect();
        let config = self.config;
        self.bindings
            .get_mut(BindingId(binding))
            .and_then(|b| {
                b.update_membership(
                    &self.scene,
                    node_id(geometry),
                    node_id(driver),
                    &components,
                    config.default_weight,
                    mode,
                    config.solve_options(use_pre_bind_pose),
                )
            })
            .map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn get_index_array(&self, binding: u32, geometry: u32, driver: u32) -> Result<Vec<u32>, JsValue> {
        let indices = self
            .bindings
            .get(BindingId(binding))
            .and_then(|b| b.get_index_array(node_id(geometry), node_id(driver)))
            .map_err(to_js_error)?;
        indices
            .iter()
            .map(|&c| u32::try_from(c).map_err(to_js_error))
            .collect()
    }

    #[wasm_bindgen]
    pub fn get_weight_array(&self, binding: u32, geometry: u32, driver: u32) -> Result<Vec<f64>, JsValue> {
        self.bindings
            .get(BindingId(binding))
            .and_then(|b| b.get_weight_array(node_id(geometry), node_id(driver)))
            .map(<[f64]>::to_vec)
            .map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn get_u_array(&self, binding: u32, geometry: u32, driver: u32) -> Result<Vec<f64>, JsValue> {
        self.bindings
            .get(BindingId(binding))
            .and_then(|b| b.get_u_array(node_id(geometry), node_id(driver)))
            .map(<[f64]>::to_vec)
            .map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn get_v_array(&self, binding: u32, geometry: u32, driver: u32) -> Result<Vec<f64>, JsValue> {
        self.bindings
            .get(BindingId(binding))
            .and_then(|b| b.get_v_array(node_id(geometry), node_id(driver)))
            .map(<[f64]>::to_vec)
            .map_err(to_js_error)
    }

    /// Members of `driver` as component strings (`body.vtx[3]`), or as bare
    /// indices when `index_only` is set.
    #[wasm_bindgen]
    pub fn get_influence_membership(
        &self,
        binding: u32,
        driver: u32,
        geometry: &[u32],
        index_only: bool,
    ) -> Result<Vec<String>, JsValue> {
        let refs = self
            .bindings
            .get(BindingId(binding))
            .and_then(|b| {
                b.get_influence_membership(&self.scene, node_id(driver), &node_ids(geometry), index_only)
            })
            .map_err(to_js_error)?;
        Ok(refs.iter().map(ToString::to_string).collect())
    }

    /// Zero weights below `threshold`; returns how many were zeroed.
    #[wasm_bindgen]
    pub fn prune_small_weights(
        &mut self,
        binding: u32,
        geometry: &[u32],
        influences: &[u32],
        threshold: f64,
    ) -> Result<u32, JsValue> {
        let binding = self.bindings.get_mut(BindingId(binding)).map_err(to_js_error)?;
        let report =
            skin::prune_small_weights(binding, &node_ids(geometry), &node_ids(influences), threshold)
                .map_err(to_js_error)?;
        u32::try_from(report.weights_zeroed).map_err(to_js_error)
    }

    /// Drop members whose weight is below `threshold`; returns how many were
    /// dropped.
    #[wasm_bindgen]
    pub fn prune_membership_by_weights(
        &mut self,
        binding: u32,
        geometry: &[u32],
        influences: &[u32],
        threshold: f64,
    ) -> Result<u32, JsValue> {
        let binding = self.bindings.get_mut(BindingId(binding)).map_err(to_js_error)?;
        let report = skin::prune_membership_by_weights(
            binding,
            &node_ids(geometry),
            &node_ids(influences),
            threshold,
        )
        .map_err(to_js_error)?;
        u32::try_from(report.members_removed).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn get_binding_summary(&self, binding: u32) -> Result<JsValue, JsValue> {
        let summary = self
            .bindings
            .get(BindingId(binding))
            .map_err(to_js_error)?
            .summary();
        serde_wasm_bindgen::to_value(&summary).map_err(|err| JsError::new(&err.to_string()).into())
    }
}

impl Engine {
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[must_use]
    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    #[must_use]
    pub fn config(&self) -> &SkinConfig {
        &self.config
    }

    /// Replace the defaults of the engine and of every existing binding.
    pub fn set_skin_config(&mut self, config: SkinConfig) {
        log::debug!("skin defaults updated: {config:?}");
        self.config = config;
        self.bindings.apply_config(config);
    }

    fn add_node(&mut self, node: SceneNode) -> Result<u32, JsValue> {
        let id = self.scene.add_node(node).map_err(to_js_error)?;
        u32::try_from(id.0).map_err(to_js_error)
    }
}

fn node_id(raw: u32) -> NodeId {
    NodeId::new(raw as usize)
}

fn node_ids(raw: &[u32]) -> Vec<NodeId> {
    raw.iter().copied().map(node_id).collect()
}

fn points_from_flat(values: &[f64]) -> Result<Vec<Point3>, JsValue> {
    if values.len() % 3 != 0 {
        return Err(js_error("point data must be x, y, z triples"));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(js_error("point data must be finite"));
    }
    Ok(values
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

fn single_point(values: &[f64]) -> Result<Point3, JsValue> {
    match points_from_flat(values)?.as_slice() {
        [p] => Ok(*p),
        _ => Err(js_error("expected exactly one x, y, z triple")),
    }
}

fn matrix_from_flat(values: &[f64]) -> Result<Transform, JsValue> {
    if values.is_empty() {
        return Ok(Transform::identity());
    }
    Transform::from_slice(values)
        .ok_or_else(|| js_error("a matrix needs 16 finite values in row-major order"))
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        log::debug!("engine error: {message}");
        JsValue::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec3;

    #[test]
    fn flat_point_parsing() {
        assert_eq!(
            points_from_flat(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(),
            vec![Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)]
        );
        assert!(points_from_flat(&[1.0, 2.0]).is_err());
        assert!(points_from_flat(&[1.0, f64::NAN, 0.0]).is_err());
        assert!(single_point(&[0.0; 6]).is_err());
    }

    #[test]
    fn empty_matrix_is_identity() {
        assert_eq!(matrix_from_flat(&[]).unwrap(), Transform::identity());
        assert!(matrix_from_flat(&[1.0; 4]).is_err());
        let shifted = matrix_from_flat(&Transform::translate(Vec3::new(1.0, 0.0, 0.0)).to_row_major())
            .unwrap();
        assert_eq!(shifted.translation(), Vec3::new(1.0, 0.0, 0.0));
    }
}
