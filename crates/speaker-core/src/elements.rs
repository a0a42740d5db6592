//! Mechanical and acoustic elements that can load the driver: a sealed
//! enclosure, a mobile parent body, and a passive radiator or vent.

use crate::constants::{air_mass, AirProperties};

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Sealed enclosure behind the diaphragm. All units SI (`vb` in m³).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enclosure {
    /// Net internal volume, m³.
    pub vb: f64,
    /// Absorption quality factor of the box fill.
    pub qa: f64,
}

impl Enclosure {
    /// Stiffness the trapped air presents to a piston of area `sd`, N/m.
    pub fn stiffness(&self, air: &AirProperties, sd: f64) -> f64 {
        sd * sd * air.bulk_modulus() / self.vb
    }

    /// Damping at the boxed resonance due to air absorption, kg/s.
    /// Derived from Qa against the combined suspension + box stiffness.
    pub fn damping(&self, air: &AirProperties, sd: f64, mms: f64, kms: f64) -> f64 {
        ((kms + self.stiffness(air, sd)) * mms).sqrt() / self.qa
    }
}

/// A second mass-spring-damper between the driver and a fixed reference:
/// the mounting structure with its own mobility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentBody {
    /// Mass, kg.
    pub m: f64,
    /// Stiffness to ground, N/m.
    pub k: f64,
    /// Damping to ground, kg/s.
    pub c: f64,
}

impl ParentBody {
    /// Damping ratio, optionally with rigidly coupled child masses added.
    pub fn zeta(&self, coupled_mass: f64) -> f64 {
        self.c / (2.0 * ((self.m + coupled_mass) * self.k).sqrt())
    }

    /// Quality factor; infinite for an undamped mount.
    pub fn q(&self, coupled_mass: f64) -> f64 {
        if self.c > 0.0 {
            1.0 / (2.0 * self.zeta(coupled_mass))
        } else {
            f64::INFINITY
        }
    }

    /// Undamped natural frequency, Hz.
    pub fn natural_frequency(&self, coupled_mass: f64) -> f64 {
        (self.k / (self.m + coupled_mass)).sqrt() / TWO_PI
    }
}

/// A passive radiator or vent: a third moving body sharing the cavity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassiveRadiator {
    /// Moving mass without the coupled air, kg.
    pub m: f64,
    /// Suspension stiffness, N/m.
    pub k: f64,
    /// Suspension quality factor.
    pub q: f64,
    /// Radiating area, m².
    pub s: f64,
}

impl PassiveRadiator {
    /// Moving mass with the coupled air included, kg.
    pub fn moving_mass(&self) -> f64 {
        self.m + air_mass(self.s)
    }

    /// Resonance outside any enclosure, Hz.
    pub fn free_resonance(&self) -> f64 {
        (self.k / self.moving_mass()).sqrt() / TWO_PI
    }

    /// Stiffness from the air trapped in an enclosure of volume `vb`, N/m.
    pub fn box_stiffness(&self, air: &AirProperties, vb: f64) -> f64 {
        self.s * self.s * air.bulk_modulus() / vb
    }

    /// Resonance when mounted on an enclosure of volume `vb`, Hz.
    pub fn housed_resonance(&self, air: &AirProperties, vb: f64) -> f64 {
        ((self.k + self.box_stiffness(air, vb)) / self.moving_mass()).sqrt() / TWO_PI
    }

    /// Suspension damping derived from Q at the operating resonance, kg/s.
    /// `vb` is the enclosure volume when housed.
    pub fn damping(&self, air: &AirProperties, vb: Option<f64>) -> f64 {
        let k_total = self.k + vb.map_or(0.0, |v| self.box_stiffness(air, v));
        (k_total * self.moving_mass()).sqrt() / self.q
    }
}

/// Mounting direction of the passive radiator relative to the driver axis.
///
/// Enters the mechanical projections only (suspension coupling to the
/// parent body and reaction-force transmission); the acoustic
/// volume-displacement coupling always uses the full areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrDirection {
    /// Radiating the same way as the driver.
    #[default]
    Aligned,
    /// Radiating opposite to the driver.
    Opposed,
    /// Mounted at right angles to the driver axis.
    Orthogonal,
}

impl PrDirection {
    /// Direction cosine between the radiator axis and the driver axis.
    pub fn coefficient(self) -> f64 {
        match self {
            PrDirection::Aligned => 1.0,
            PrDirection::Opposed => -1.0,
            PrDirection::Orthogonal => 0.0,
        }
    }
}
