pub mod coil;
pub mod constants;
pub mod driver;
pub mod elements;
pub mod equations;
pub mod error;
pub mod frequency_response;
pub mod model;
pub mod state_space;
pub mod system;

pub use coil::{Coil, Wire, WireShape};
pub use constants::AirProperties;
pub use driver::{Motor, MovingMass, SpeakerDriver};
pub use elements::{Enclosure, ParentBody, PassiveRadiator, PrDirection};
pub use error::SimError;
pub use frequency_response::{Curve, LevelCurve, LevelKind, RealCurve, SystemResponse};
pub use model::NumericModel;
pub use state_space::StateVar;
pub use system::{SpeakerSystem, SystemSummary};

// ---------------------------------------------------------------------------
// Shared interface types — the surrounding application builds against these
// ---------------------------------------------------------------------------

/// Complete physical description of a speaker system: the driver plus its
/// optional loading elements and the external series resistance.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub driver: SpeakerDriver,
    /// Series resistance between the source and the speaker terminals
    /// (amplifier output, cabling), Ω.
    pub rext: f64,
    pub enclosure: Option<Enclosure>,
    pub parent_body: Option<ParentBody>,
    pub passive_radiator: Option<PassiveRadiator>,
    pub pr_direction: PrDirection,
}

impl SystemConfig {
    /// A free-air system: just the driver, no series resistance.
    pub fn new(driver: SpeakerDriver) -> Self {
        Self {
            driver,
            rext: 0.0,
            enclosure: None,
            parent_body: None,
            passive_radiator: None,
            pr_direction: PrDirection::default(),
        }
    }
}

/// Electrical excitation of the system, reduced to an equivalent RMS
/// source voltage before evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Excitation {
    /// Source voltage, V RMS.
    Voltage(f64),
    /// Power into Re, W.
    PowerAtRe(f64),
    /// Power into a nominal impedance, W.
    PowerAtNominal { power: f64, rnom: f64 },
}

impl Excitation {
    /// The equivalent source voltage in V RMS, given the driver's Re.
    pub fn source_voltage(&self, re: f64) -> Result<f64, SimError> {
        match *self {
            Excitation::Voltage(v) => {
                if !v.is_finite() {
                    return Err(SimError::config(format!("voltage must be finite, got {v}")));
                }
                Ok(v)
            }
            Excitation::PowerAtRe(w) => {
                if !w.is_finite() || w < 0.0 {
                    return Err(SimError::config(format!(
                        "power must be non-negative, got {w} W"
                    )));
                }
                Ok((w * re).sqrt())
            }
            Excitation::PowerAtNominal { power, rnom } => {
                if !power.is_finite() || power < 0.0 {
                    return Err(SimError::config(format!(
                        "power must be non-negative, got {power} W"
                    )));
                }
                if !rnom.is_finite() || rnom <= 0.0 {
                    return Err(SimError::config(format!(
                        "nominal impedance must be positive, got {rnom} Ω"
                    )));
                }
                Ok((power * rnom).sqrt())
            }
        }
    }
}

/// Results of a full evaluation — consumed by the front end for plotting
/// and textual display.
#[derive(Debug, Clone)]
pub struct SimResult {
    /// Frequency points in Hz (length N; every curve has N values).
    pub frequencies: Vec<f64>,
    pub summary: SystemSummary,
    pub displacements: Vec<Curve>,
    pub velocities: Vec<Curve>,
    pub accelerations: Vec<Curve>,
    pub impedances: Vec<Curve>,
    pub forces: Vec<Curve>,
    pub phases: Vec<RealCurve>,
    pub level: LevelCurve,
}

/// Run the full pipeline: build the system from its configuration, sweep
/// the response, and collect every curve family.
pub fn compute(
    config: &SystemConfig,
    air: AirProperties,
    freqs: &[f64],
    excitation: Excitation,
) -> Result<SimResult, SimError> {
    let system = SpeakerSystem::new(config.clone(), air)?;
    let response = system.response(freqs, excitation)?;
    Ok(SimResult {
        frequencies: freqs.to_vec(),
        summary: system.summary(),
        displacements: response.displacements(),
        velocities: response.velocities(),
        accelerations: response.accelerations(),
        impedances: response.impedances(),
        forces: response.forces(),
        phases: response.phases(),
        level: response.level(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use driver::MovingMass;

    #[test]
    fn test_excitation_to_voltage() {
        assert_eq!(Excitation::Voltage(2.83).source_voltage(4.0).unwrap(), 2.83);
        assert_relative_eq!(
            Excitation::PowerAtRe(1.0).source_voltage(4.18).unwrap(),
            4.18f64.sqrt(),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            Excitation::PowerAtNominal { power: 1.0, rnom: 8.0 }
                .source_voltage(4.18)
                .unwrap(),
            8.0f64.sqrt(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_excitation_rejects_bad_values() {
        assert!(Excitation::PowerAtRe(-1.0).source_voltage(4.0).is_err());
        assert!(Excitation::PowerAtNominal { power: 1.0, rnom: 0.0 }
            .source_voltage(4.0)
            .is_err());
        assert!(Excitation::Voltage(f64::NAN).source_voltage(4.0).is_err());
    }

    #[test]
    fn test_compute_returns_consistent_lengths() {
        let driver = SpeakerDriver::new(
            111.0,
            53.5e-4,
            6.51,
            4e-3,
            4.78,
            4.18,
            MovingMass::Total(5.09e-3),
        )
        .unwrap();
        let mut config = SystemConfig::new(driver);
        config.rext = 1.0;
        config.enclosure = Some(Enclosure { vb: 1e-3, qa: 200.0 });

        let freqs = frequency_response::log_spaced_frequencies(10.0, 3000.0, 48);
        let result = compute(
            &config,
            AirProperties::default(),
            &freqs,
            Excitation::PowerAtRe(1.0),
        )
        .unwrap();

        let n = freqs.len();
        assert_eq!(result.frequencies.len(), n);
        for curve in result
            .displacements
            .iter()
            .chain(&result.velocities)
            .chain(&result.accelerations)
            .chain(&result.impedances)
            .chain(&result.forces)
        {
            assert_eq!(curve.values.len(), n, "curve {}", curve.label);
        }
        for curve in &result.phases {
            assert_eq!(curve.values.len(), n, "curve {}", curve.label);
        }
        assert_eq!(result.level.values.len(), n);
        assert!(result.summary.enclosure.is_some());
    }
}
