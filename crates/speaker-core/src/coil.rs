//! Voice-coil winding geometry: wire, layers, and the derived electrical
//! and mass properties a coil contributes to the motor.

use crate::error::SimError;

/// Cross-section shape of a winding wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    Circular,
    Rectangular,
}

/// A single winding wire, as listed in a wire catalog.
///
/// All dimensions in metres; `resistance` in Ω/m, `mass_density` in kg/m.
#[derive(Debug, Clone)]
pub struct Wire {
    pub name: String,
    pub shape: WireShape,
    /// Nominal conductor size (diameter for circular, side for rectangular).
    pub nominal_size: f64,
    /// Average width of one winding, insulation included.
    pub w_avg: f64,
    /// Average height of one winding, insulation included.
    pub h_avg: f64,
    /// Maximum width of one winding.
    pub w_max: f64,
    pub resistance: f64,
    pub mass_density: f64,
}

/// A wound voice coil: a wire stacked in layers on a cylindrical carrier.
#[derive(Debug, Clone)]
pub struct Coil {
    pub carrier_od: f64,
    pub wire: Wire,
    /// Number of windings on each layer, innermost first.
    pub windings: Vec<u32>,
    /// Radial stacking coefficient between layers (1.0 = no nesting).
    pub w_stacking_coef: f64,
    /// Wire-center radius of each layer.
    turn_radii: Vec<f64>,
}

impl Coil {
    pub fn new(
        carrier_od: f64,
        wire: Wire,
        windings: Vec<u32>,
        w_stacking_coef: f64,
    ) -> Result<Self, SimError> {
        if windings.is_empty() || windings.iter().any(|&n| n == 0) {
            return Err(SimError::config("coil has layers with 0 windings"));
        }
        let turn_radii = (0..windings.len())
            .map(|i_layer| {
                carrier_od / 2.0
                    + wire.w_avg / 2.0
                    + w_stacking_coef * i_layer as f64 * wire.w_avg
            })
            .collect();
        Ok(Self {
            carrier_od,
            wire,
            windings,
            w_stacking_coef,
            turn_radii,
        })
    }

    /// Wind a coil to a target winding height, dropping `reduce_per_layer`
    /// windings on each stacked layer.
    pub fn wind(
        wire: Wire,
        n_layers: usize,
        w_stacking_coef: f64,
        carrier_od: f64,
        h_winding_target: f64,
        reduce_per_layer: f64,
    ) -> Result<Self, SimError> {
        let windings: Vec<i64> = (0..n_layers)
            .map(|i_layer| {
                (h_winding_target / wire.h_avg - i_layer as f64 * reduce_per_layer).round() as i64
            })
            .collect();
        if windings.iter().any(|&n| n < 1) {
            return Err(SimError::config(format!(
                "winding height {} m leaves layers with no windings",
                h_winding_target
            )));
        }
        Self::new(
            carrier_od,
            wire,
            windings.into_iter().map(|n| n as u32).collect(),
            w_stacking_coef,
        )
    }

    pub fn n_layers(&self) -> usize {
        self.windings.len()
    }

    /// Total length of wire over all layers.
    pub fn total_wire_length(&self) -> f64 {
        self.turn_radii
            .iter()
            .zip(&self.windings)
            .map(|(&radius, &n)| 2.0 * std::f64::consts::PI * radius * n as f64)
            .sum()
    }

    /// DC resistance of the winding, Ω.
    pub fn resistance(&self) -> f64 {
        self.total_wire_length() * self.wire.resistance
    }

    /// Mass of the winding, kg.
    pub fn mass(&self) -> f64 {
        self.total_wire_length() * self.wire.mass_density
    }

    /// Height of the winding package (set by the innermost layer).
    pub fn winding_height(&self) -> f64 {
        self.wire.h_avg * self.windings[0] as f64
    }

    /// Nominal radial thickness of the winding package.
    pub fn w_nominal(&self) -> f64 {
        self.wire.w_avg * (1.0 + (self.n_layers() as f64 - 1.0) * self.w_stacking_coef)
    }

    /// Maximum radial thickness of the winding package.
    pub fn w_max(&self) -> f64 {
        self.wire.w_max * self.n_layers() as f64
    }

    /// Nominal outer diameter of the wound coil.
    pub fn od_nominal(&self) -> f64 {
        2.0 * self.turn_radii[self.n_layers() - 1] + self.wire.w_avg
    }

    /// Maximum outer diameter of the wound coil.
    pub fn od_max(&self) -> f64 {
        self.carrier_od + 2.0 * self.w_max()
    }

    /// Conductor area over total winding cross-section area.
    pub fn fill_ratio(&self) -> f64 {
        let n_total: u32 = self.windings.iter().sum();
        let section_total = self.w_nominal() * self.winding_height();
        let conductor = match self.wire.shape {
            WireShape::Circular => {
                self.wire.nominal_size.powi(2) * std::f64::consts::PI / 4.0 * n_total as f64
            }
            WireShape::Rectangular => self.wire.nominal_size.powi(2) * n_total as f64,
        };
        conductor / section_total
    }
}
