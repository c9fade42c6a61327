//! The growth engine coupling the two vessel systems.
//!
//! One [`Synthesizer`] owns a [`Domain`], the per-system growth state
//! (forest, node index, attraction index, satisfied positions), and the
//! runtime distance parameters. Each simulation step is
//! `sample_attraction → step(arterial) → combine_systems → step(venous) →
//! domain_growth`, and each per-system `step` runs
//! `closest → growth → kill` in that order.

use crate::config::{GrowFunc, Settings, SystemKind, SystemSettings};
use crate::domain::Domain;
use crate::law;
use crate::octree::Octree;
use crate::tree::{Forest, Tree};
use crate::types::{NodeId, NodeRef};
use glam::{Quat, Vec3};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle that can cancel a running synthesis from another thread.
///
/// Cancellation is cooperative: the main loop re-checks the flag at every
/// step boundary, so the engine finishes the step it is in and then exits
/// with all invariants intact.
#[derive(Clone, Debug)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runtime distance parameters of one system.
///
/// These start as a copy of the corresponding [`SystemSettings`] distances
/// and shrink over time as `scaling` advances (settings value divided by the
/// current scaling).
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemParams {
    pub scaling: f32,
    pub birth_attr: f32,
    pub birth_node: f32,
    pub influence_attr: f32,
    pub kill_attr: f32,
    pub growth_distance: f32,
}

impl SystemParams {
    fn rescale(&mut self, sett: &SystemSettings) {
        let inverse = 1.0 / self.scaling;
        self.birth_attr = sett.birth_attr * inverse;
        self.birth_node = sett.birth_node * inverse;
        self.influence_attr = sett.influence_attr * inverse;
        self.kill_attr = sett.kill_attr * inverse;
        self.growth_distance = sett.growth_distance * inverse;
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct RuntimeParams {
    curr_step: u32,
    systems: [SystemParams; SystemKind::COUNT],
}

/// Growth state of one vessel system.
///
/// The forest and the node index form a consistent unit: every entry of the
/// node index addresses a live forest node, and every forest node has an
/// index entry at every step boundary.
struct SystemData {
    forest: Forest,
    node_search: Octree<NodeRef>,
    attr_search: Octree<Vec3>,
    killed_attr: Vec<Vec3>,
}

impl SystemData {
    fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            forest: Forest::new(),
            node_search: Octree::new(min, max),
            attr_search: Octree::new(min, max),
            killed_attr: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.forest.clear();
        self.node_search.clear();
        self.attr_search.clear();
        self.killed_attr.clear();
    }

    fn clear_attr(&mut self) {
        self.attr_search.clear();
        self.killed_attr.clear();
    }
}

/// Attraction points associated to the node they will pull on this step.
type AttrMap = BTreeMap<NodeRef, Vec<Vec3>>;

/// Synthesizes a coupled pair of vascular trees inside a [`Domain`].
pub struct Synthesizer<D: Domain> {
    domain: D,
    settings: Settings,
    params: RuntimeParams,
    systems: [SystemData; SystemKind::COUNT],
    running: Arc<AtomicBool>,
}

impl<D: Domain> Synthesizer<D> {
    pub fn new(domain: D) -> Self {
        let min = domain.min_extends();
        let max = domain.max_extends();
        let mut synth = Self {
            domain,
            settings: Settings::default(),
            params: RuntimeParams::default(),
            systems: [SystemData::new(min, max), SystemData::new(min, max)],
            running: Arc::new(AtomicBool::new(false)),
        };
        synth.init_runtime_params();
        synth
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    /// Mutable access to the domain, e.g. to reseed it between runs.
    pub fn domain_mut(&mut self) -> &mut D {
        &mut self.domain
    }

    pub fn get_settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the settings and resets the runtime parameters to match.
    /// Must not be called while a run is in progress.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.init_runtime_params();
    }

    /// Runtime distance parameters of `sys` (settings over current scaling).
    pub fn parameters(&self, sys: SystemKind) -> &SystemParams {
        &self.params.systems[sys.index()]
    }

    pub fn current_step(&self) -> u32 {
        self.params.curr_step
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Handle through which another thread can request cancellation.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.running.clone())
    }

    /// Requests cancellation at the next step boundary.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Creates a new single-node tree for `sys` at `pos`.
    ///
    /// The root starts at the system's terminal radius and is registered in
    /// the node index immediately.
    pub fn create_root(&mut self, sys: SystemKind, pos: Vec3) -> NodeRef {
        let radius = self.settings.system(sys).term_radius;
        let data = &mut self.systems[sys.index()];
        let nref = data.forest.create_root(pos, radius);
        data.node_search.insert(pos, nref);
        nref
    }

    /// Inserts an attraction point unconditionally.
    pub fn create_attr(&mut self, sys: SystemKind, pos: Vec3) {
        self.systems[sys.index()].attr_search.insert(pos, pos);
    }

    /// Inserts an attraction point unless it violates the birth distances:
    /// a candidate is rejected when any node of `sys` lies within
    /// `birth_node` or any existing attraction lies within `birth_attr`.
    ///
    /// ### Returns
    /// `true` if the point was inserted.
    pub fn try_attr(&mut self, sys: SystemKind, pos: Vec3) -> bool {
        let params = self.params.systems[sys.index()];
        let data = &mut self.systems[sys.index()];

        let mut nodes = Vec::new();
        data.node_search.euclidean_range(pos, params.birth_node, &mut nodes);
        if !nodes.is_empty() {
            return false;
        }

        let mut attrs = Vec::new();
        data.attr_search.euclidean_range(pos, params.birth_attr, &mut attrs);
        if !attrs.is_empty() {
            return false;
        }

        data.attr_search.insert(pos, pos);
        true
    }

    /// Replaces the forest of `sys` and rebuilds its node index by
    /// breadth-first traversal. Attractions and satisfied positions of the
    /// system are discarded.
    pub fn set_forest(&mut self, sys: SystemKind, forest: Forest) {
        let data = &mut self.systems[sys.index()];
        data.clear();
        data.forest = forest;

        let SystemData {
            forest, node_search, ..
        } = data;
        forest.breadth_first(|tid, nid, node| {
            node_search.insert(node.pos, NodeRef::new(tid, nid));
        });
    }

    pub fn get_forest(&self, sys: SystemKind) -> &Forest {
        &self.systems[sys.index()].forest
    }

    /// Snapshot of the live attraction points of `sys`.
    pub fn attractions(&self, sys: SystemKind) -> Vec<Vec3> {
        let mut out = Vec::new();
        self.systems[sys.index()].attr_search.traverse(|p| out.push(*p));
        out
    }

    /// Drops the forest, both indices, and the satisfied list of `sys`.
    pub fn clear_system(&mut self, sys: SystemKind) {
        self.systems[sys.index()].clear();
    }

    /// Drops the attraction index and the satisfied list of `sys`, keeping
    /// the forest and node index.
    pub fn clear_attractions(&mut self, sys: SystemKind) {
        self.systems[sys.index()].clear_attr();
    }

    /// Runs the synthesis for the configured number of steps, or until
    /// [`Self::stop`] is called. A run with an empty arterial forest is a
    /// no-op.
    pub fn run(&mut self) {
        if self.systems[SystemKind::Arterial.index()].forest.is_empty() {
            log::warn!("synthesis requested with an empty arterial forest");
            return;
        }

        self.init_runtime_params();
        self.running.store(true, Ordering::SeqCst);

        log::info!(
            "synthesis started: {} steps, {} attraction samples per step",
            self.settings.steps,
            self.settings.sample_count
        );

        while self.params.curr_step < self.settings.steps && self.running.load(Ordering::SeqCst) {
            self.params.curr_step += 1;

            // Fresh targets for the arterial side.
            self.sample_attraction();
            self.step(SystemKind::Arterial);
            // Targets the arterial side reached become venous targets.
            self.combine_systems();
            self.step(SystemKind::Venous);

            // Advance the scaling schedules.
            self.domain_growth(SystemKind::Arterial);
            self.domain_growth(SystemKind::Venous);
        }

        log::info!("synthesis finished after {} steps", self.params.curr_step);
        self.running.store(false, Ordering::SeqCst);
    }

    fn init_runtime_params(&mut self) {
        self.params.curr_step = 0;
        for sys in SystemKind::ALL {
            let params = &mut self.params.systems[sys.index()];
            params.scaling = 1.0;
            params.rescale(self.settings.system(sys));
        }
    }

    fn sample_attraction(&mut self) {
        let mut points = Vec::new();
        self.domain
            .samples(&mut points, self.settings.sample_count as usize);
        for p in points {
            self.try_attr(SystemKind::Arterial, p);
        }
    }

    fn step(&mut self, sys: SystemKind) {
        if self.systems[sys.index()].forest.is_empty() {
            return;
        }

        let attr_map = self.step_closest(sys);
        log::debug!(
            "{sys:?} step {}: {} nodes under attraction",
            self.params.curr_step,
            attr_map.len()
        );

        self.step_growth(sys, &attr_map);
        self.step_kill(sys, &attr_map);
    }

    /// Associates every attraction point with its nearest eligible node.
    ///
    /// Joints cannot accept further children and are skipped outright; leaf
    /// and intermediate candidates must additionally pass the perception
    /// cone relative to their parent direction.
    fn step_closest(&self, sys: SystemKind) -> AttrMap {
        let data = &self.systems[sys.index()];
        let params = &self.params.systems[sys.index()];
        let sett = self.settings.system(sys);

        let mut attrs = Vec::new();
        data.attr_search.traverse(|p| attrs.push(*p));

        let mut attr_map = AttrMap::new();
        let mut nodes: Vec<NodeRef> = Vec::new();
        for p in attrs {
            nodes.clear();
            data.node_search
                .euclidean_range(p, params.influence_attr, &mut nodes);
            if nodes.is_empty() {
                continue;
            }

            let mut min = f32::MAX;
            let mut min_node = None;
            for &nref in &nodes {
                let node = data.forest.get_node(nref);
                if node.is_joint() {
                    continue;
                }

                let distance = (p - node.pos).length();
                if distance < min {
                    min = distance;
                    min_node = Some(nref);
                }
            }
            let Some(nref) = min_node else { continue };

            let node = data.forest.get_node(nref);
            if !node.is_root() {
                let tree = data.forest.tree(nref.tree);
                let parent = tree.get_node(node.parent.expect("non-root node has a parent"));
                let d_parent = (node.pos - parent.pos).normalize_or_zero();
                let d_attr = (p - node.pos).normalize_or_zero();
                let angle = d_parent.dot(d_attr).clamp(-1.0, 1.0).acos().to_degrees();

                if node.is_leaf() {
                    // A tip only perceives attractions inside its cone.
                    if angle > sett.percept_vol * 0.5 {
                        continue;
                    }
                } else if node.is_inter() {
                    // An internode perceives around the Murray-ideal
                    // direction of its future second branch.
                    let child_0 = tree.get_node(node.children[0]);
                    let parent_radius =
                        law::murray_radius(child_0.radius, sett.term_radius, sett.bif_index);
                    let perfect = law::murray_angles(parent_radius, child_0.radius, sett.term_radius)
                        .1
                        .abs();

                    if (angle - perfect).abs() > sett.percept_vol * 0.5 {
                        continue;
                    }
                }
            }

            attr_map.entry(nref).or_default().push(p);
        }

        attr_map
    }

    /// Grows a sprout or a bifurcation at every associated node.
    fn step_growth(&mut self, sys: SystemKind, attr_map: &AttrMap) {
        let sett = *self.settings.system(sys);
        let params = self.params.systems[sys.index()];
        let SystemData {
            forest, node_search, ..
        } = &mut self.systems[sys.index()];

        for (&nref, attr_list) in attr_map {
            let tree = forest.tree_mut(nref.tree);
            let (node_pos, is_root, is_leaf, is_inter, parent_id, child_0) = {
                let node = tree.get_node(nref.node);
                (
                    node.pos,
                    node.is_root(),
                    node.is_leaf(),
                    node.is_inter(),
                    node.parent,
                    node.children.first().copied(),
                )
            };

            // Average direction toward the associated attraction points.
            let sum = attr_list
                .iter()
                .fold(Vec3::ZERO, |acc, p| acc + (*p - node_pos).normalize_or_zero());
            let Some(mut dir) = sum.try_normalize() else {
                continue;
            };

            // Collect the bias direction and detect whether bifurcation
            // development is preferred over sprouting.
            let mut bifurcation = false;
            if !is_root {
                let parent_pos = tree.get_node(parent_id.expect("non-root node has a parent")).pos;
                let d_parent = (node_pos - parent_pos).normalize_or_zero();

                if is_leaf && attr_list.len() > 1 && sett.bif_thresh >= 0.0 {
                    let angles: Vec<f32> = attr_list
                        .iter()
                        .map(|p| {
                            let dir_vec = (*p - node_pos).normalize_or_zero();
                            d_parent.dot(dir_vec).clamp(-1.0, 1.0).acos().to_degrees()
                        })
                        .collect();

                    let mean = angles.iter().sum::<f32>() / angles.len() as f32;
                    // Root of the summed squared deviations, without 1/N;
                    // the threshold is calibrated against this quantity.
                    let spread = angles
                        .iter()
                        .map(|a| (a - mean) * (a - mean))
                        .sum::<f32>()
                        .sqrt();

                    bifurcation = spread >= sett.bif_thresh;
                }

                let bias = if is_leaf {
                    d_parent
                } else if is_inter {
                    let child = tree.get_node(child_0.expect("intermediate node has a child"));
                    let parent_radius =
                        law::murray_radius(child.radius, sett.term_radius, sett.bif_index);
                    let perfect = law::murray_angles(parent_radius, child.radius, sett.term_radius)
                        .1
                        .abs();

                    let normal = d_parent
                        .cross(dir)
                        .try_normalize()
                        .unwrap_or_else(|| d_parent.any_orthonormal_vector());
                    (Quat::from_axis_angle(normal, perfect.to_radians()) * d_parent)
                        .normalize_or_zero()
                } else {
                    dir
                };

                let blend = (1.0 - sett.parent_inertia) * dir + sett.parent_inertia * bias;
                if let Some(blended) = blend.try_normalize() {
                    dir = blended;
                }
            }

            if is_leaf && bifurcation {
                // Develop a bifurcation: two Murray-angled children around
                // the plane spanned by the attraction cloud.
                let parent_pos = tree.get_node(parent_id.expect("bifurcating node is not a root")).pos;
                let d_parent = (node_pos - parent_pos).normalize_or_zero();

                let radius_l = sett.term_radius;
                let radius_r = sett.term_radius;
                let parent_radius = law::murray_radius(radius_l, radius_r, sett.bif_index);
                let (angle_l, angle_r) = law::murray_angles(parent_radius, radius_l, radius_r);

                let (centroid, axis) = law::best_line_fit(attr_list);
                let up = (centroid - node_pos)
                    .normalize_or_zero()
                    .cross(axis)
                    .try_normalize()
                    .unwrap_or_else(|| d_parent.any_orthonormal_vector());

                let left =
                    (Quat::from_axis_angle(up, angle_l.to_radians()) * d_parent).normalize_or_zero();
                let right =
                    (Quat::from_axis_angle(up, angle_r.to_radians()) * d_parent).normalize_or_zero();

                let end_l =
                    tree.create_node(nref.node, node_pos + params.growth_distance * left, radius_l);
                let end_r =
                    tree.create_node(nref.node, node_pos + params.growth_distance * right, radius_r);

                recalc_radii(tree, nref.node, sett.bif_index);

                node_search.insert(tree.get_node(end_l).pos, NodeRef::new(nref.tree, end_l));
                node_search.insert(tree.get_node(end_r).pos, NodeRef::new(nref.tree, end_r));
            } else if !sett.only_leaf_development || is_leaf || is_inter {
                // Elongate a tip or sprout a side branch. A root that
                // already carries its single child stays as it is; joint
                // roots are forbidden.
                if is_root && is_inter {
                    continue;
                }

                let end = tree.create_node(
                    nref.node,
                    node_pos + params.growth_distance * dir,
                    sett.term_radius,
                );

                recalc_radii(tree, nref.node, sett.bif_index);

                node_search.insert(tree.get_node(end).pos, NodeRef::new(nref.tree, end));
            }
        }
    }

    /// Removes attraction points that a grown node now satisfies and records
    /// their positions for the partner system.
    fn step_kill(&mut self, sys: SystemKind, attr_map: &AttrMap) {
        let params = self.params.systems[sys.index()];
        let data = &mut self.systems[sys.index()];

        let mut nodes: Vec<NodeRef> = Vec::new();
        for attr_list in attr_map.values() {
            for &p in attr_list {
                nodes.clear();
                data.node_search.euclidean_range(p, params.kill_attr, &mut nodes);
                if nodes.is_empty() {
                    continue;
                }

                if data.attr_search.remove(p, &p) {
                    data.killed_attr.push(p);
                }
            }
        }
    }

    /// Feeds satisfied arterial drains to the venous system as sources.
    ///
    /// While the venous forest is still empty the satisfied list is kept, so
    /// a venous root seeded later still receives them.
    fn combine_systems(&mut self) {
        if self.systems[SystemKind::Venous.index()].forest.is_empty() {
            return;
        }

        let killed = std::mem::take(&mut self.systems[SystemKind::Arterial.index()].killed_attr);
        log::debug!("coupling {} satisfied drains into the venous system", killed.len());
        for pos in killed {
            self.try_attr(SystemKind::Venous, pos);
        }
    }

    /// Advances the scaling schedule and rescales the runtime distances.
    fn domain_growth(&mut self, sys: SystemKind) {
        let sett = *self.settings.system(sys);
        let params = &mut self.params.systems[sys.index()];

        match sett.grow_func {
            GrowFunc::None => {}
            GrowFunc::Linear(v) => params.scaling += v,
            GrowFunc::Exponential(v) => params.scaling += params.scaling * v,
        }

        params.rescale(&sett);
    }
}

/// Re-establishes the radius law from a mutated node up to its root.
fn recalc_radii(tree: &mut Tree, from: NodeId, bif_index: f32) {
    for id in tree.path_to_root(from) {
        let new_radius = match *tree.get_node(id).children.as_slice() {
            [child] => tree.get_node(child).radius,
            [child_0, child_1] => law::murray_radius(
                tree.get_node(child_0).radius,
                tree.get_node(child_1).radius,
                bif_index,
            ),
            _ => continue,
        };
        tree.get_node_mut(id).radius = new_radius;
    }
}
