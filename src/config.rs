/// The two coupled vessel systems a synthesis run grows.
///
/// Arterial vessels chase freshly sampled attraction points; venous vessels
/// chase the positions the arterial system has already satisfied.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SystemKind {
    Arterial,
    Venous,
}

impl SystemKind {
    pub const COUNT: usize = 2;
    pub const ALL: [SystemKind; Self::COUNT] = [SystemKind::Arterial, SystemKind::Venous];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// How the domain-growth schedule advances the scaling factor each step.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub enum GrowFunc {
    /// Scaling stays at its current value.
    #[default]
    None,
    /// `scaling += v` per step.
    Linear(f32),
    /// `scaling += scaling * v` per step.
    Exponential(f32),
}

/// Tunables for one vessel system, immutable during a run.
///
/// Distances are in world units; angles in degrees.
///
/// ### Fields
/// - `birth_attr` - Minimum spacing between attraction points at insertion.
/// - `birth_node` - Minimum distance from any tree node for a new attraction.
/// - `influence_attr` - Radius within which a node can be associated with an
///   attraction point.
/// - `kill_attr` - Radius within which an attraction counts as satisfied.
/// - `growth_distance` - Length of one newly grown vessel segment.
/// - `term_radius` - Radius assigned to terminal (leaf) vessels.
/// - `percept_vol` - Full opening angle of the perception cone.
/// - `bif_thresh` - Angular-spread threshold that switches a leaf from
///   sprouting to bifurcating; negative disables bifurcations.
/// - `bif_index` - Murray's-law exponent γ.
/// - `parent_inertia` - Blend in `[0, 1]` between the attraction direction
///   and the bias direction inherited from the parent segment.
/// - `only_leaf_development` - Restrict growth to leaves and intermediates.
/// - `grow_func` - Domain-growth schedule for the runtime distance scaling.
#[derive(Clone, Copy, Debug)]
pub struct SystemSettings {
    pub birth_attr: f32,
    pub birth_node: f32,
    pub influence_attr: f32,
    pub kill_attr: f32,
    pub growth_distance: f32,
    pub term_radius: f32,
    pub percept_vol: f32,
    pub bif_thresh: f32,
    pub bif_index: f32,
    pub parent_inertia: f32,
    pub only_leaf_development: bool,
    pub grow_func: GrowFunc,
}

impl Default for SystemSettings {
    /// Defaults tuned for a domain of roughly unit extent.
    fn default() -> Self {
        Self {
            birth_attr: 0.2,
            birth_node: 0.1,
            influence_attr: 0.5,
            kill_attr: 0.15,
            growth_distance: 0.1,
            term_radius: 0.01,
            percept_vol: 180.0,
            bif_thresh: 10.0,
            bif_index: 3.0,
            parent_inertia: 0.5,
            only_leaf_development: false,
            grow_func: GrowFunc::None,
        }
    }
}

impl SystemSettings {
    /// Multiplies every distance-like field by `s` (unit rescaling).
    /// Angles, exponents, and flags are left untouched.
    pub fn scale(&mut self, s: f32) {
        self.birth_attr *= s;
        self.birth_node *= s;
        self.term_radius *= s;
        self.growth_distance *= s;
        self.influence_attr *= s;
        self.kill_attr *= s;
    }
}

/// Top-level synthesis settings: the step count, the per-step attraction
/// sample count, and one [`SystemSettings`] per vessel system.
#[derive(Clone, Copy, Debug)]
pub struct Settings {
    pub steps: u32,
    pub sample_count: u32,
    systems: [SystemSettings; SystemKind::COUNT],
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            steps: 100,
            sample_count: 100,
            systems: [SystemSettings::default(); SystemKind::COUNT],
        }
    }
}

impl Settings {
    #[inline]
    pub fn system(&self, sys: SystemKind) -> &SystemSettings {
        &self.systems[sys.index()]
    }

    #[inline]
    pub fn system_mut(&mut self, sys: SystemKind) -> &mut SystemSettings {
        &mut self.systems[sys.index()]
    }

    /// Rescales every distance-like setting of both systems by `s`.
    pub fn scale(&mut self, s: f32) {
        for sys in &mut self.systems {
            sys.scale(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_system_settings_have_expected_values() {
        let sett = SystemSettings::default();

        assert_eq!(sett.birth_attr, 0.2);
        assert_eq!(sett.birth_node, 0.1);
        assert_eq!(sett.influence_attr, 0.5);
        assert_eq!(sett.kill_attr, 0.15);
        assert_eq!(sett.growth_distance, 0.1);
        assert_eq!(sett.term_radius, 0.01);
        assert_eq!(sett.percept_vol, 180.0);
        assert_eq!(sett.bif_thresh, 10.0);
        assert_eq!(sett.bif_index, 3.0);
        assert_eq!(sett.parent_inertia, 0.5);
        assert!(!sett.only_leaf_development);
        assert_eq!(sett.grow_func, GrowFunc::None);
    }

    #[test]
    fn influence_radius_is_not_smaller_than_kill_radius_in_default() {
        let sett = SystemSettings::default();
        assert!(sett.influence_attr >= sett.kill_attr);
    }

    #[test]
    fn scale_touches_distances_only() {
        let mut sett = SystemSettings::default();
        sett.scale(10.0);

        assert_eq!(sett.birth_attr, 2.0);
        assert_eq!(sett.birth_node, 1.0);
        assert_eq!(sett.influence_attr, 5.0);
        assert_eq!(sett.kill_attr, 1.5);
        assert_eq!(sett.growth_distance, 1.0);
        assert_eq!(sett.term_radius, 0.1);

        // Angles, exponents, and flags stay put.
        assert_eq!(sett.percept_vol, 180.0);
        assert_eq!(sett.bif_thresh, 10.0);
        assert_eq!(sett.bif_index, 3.0);
        assert_eq!(sett.parent_inertia, 0.5);
    }

    #[test]
    fn settings_address_systems_independently() {
        let mut settings = Settings::default();
        settings.system_mut(SystemKind::Venous).term_radius = 0.5;

        assert_eq!(settings.system(SystemKind::Arterial).term_radius, 0.01);
        assert_eq!(settings.system(SystemKind::Venous).term_radius, 0.5);
    }

    #[test]
    fn grow_func_defaults_to_none() {
        assert_eq!(GrowFunc::default(), GrowFunc::None);
        assert_ne!(GrowFunc::Linear(0.1), GrowFunc::Exponential(0.1));
    }
}
