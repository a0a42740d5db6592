/// Environmental properties of the air surrounding the speaker.
///
/// Passed explicitly into every computation that needs them; there is no
/// global default lurking behind the formulas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirProperties {
    /// Density in kg/m³.
    pub rho: f64,
    /// Atmospheric pressure in Pa.
    pub p0: f64,
    /// Adiabatic index (ratio of specific heats).
    pub gamma: f64,
}

impl Default for AirProperties {
    /// Air at 25 °C and sea-level pressure.
    fn default() -> Self {
        Self {
            rho: 1.1839,
            p0: 101_325.0,
            gamma: 1.401,
        }
    }
}

impl AirProperties {
    /// Adiabatic bulk modulus K = P₀·γ, in Pa.
    pub fn bulk_modulus(&self) -> f64 {
        self.p0 * self.gamma
    }

    /// Speed of sound c = √(K/ρ), in m/s.
    pub fn speed_of_sound(&self) -> f64 {
        (self.bulk_modulus() / self.rho).sqrt()
    }
}

/// Air mass carried along by a rigid piston of area `sd` (m² in, kg out).
///
/// This is the difference between the total moving mass Mms and the bare
/// diaphragm assembly mass Mmd: `Mms = Mmd + air_mass(Sd)`.
pub fn air_mass(sd: f64) -> f64 {
    1.13 * sd.powf(1.5)
}

/// Piston radius a = √(S/π) from a radiating area.
pub fn piston_radius(area: f64) -> f64 {
    (area / std::f64::consts::PI).sqrt()
}
