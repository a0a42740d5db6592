//! Frequency-domain evaluation: sweep the state-space model across a set
//! of frequencies and derive every requested physical quantity as a
//! labeled curve.
//!
//! The excitation convention is RMS throughout; "peak" labels are display
//! variants obtained by an explicit ×√2 at curve-building time. Derived
//! quantities are cheap against instantiation and are recomputed on every
//! call rather than cached.

use nalgebra::Vector6;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::error::SimError;
use crate::state_space::{StateMatrices, StateVar};

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;
const SQRT_2: f64 = std::f64::consts::SQRT_2;
/// Reference pressure for SPL, Pa.
const P_REF: f64 = 20e-6;
/// Reference acceleration for acceleration level, m/s².
const ACC_REF: f64 = 1e-6;

/// A labeled complex response curve, one value per requested frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub label: String,
    pub values: Vec<Complex64>,
}

/// A labeled real-valued curve (phase in degrees, levels in dB).
#[derive(Debug, Clone, PartialEq)]
pub struct RealCurve {
    pub label: String,
    pub values: Vec<f64>,
}

/// What the level curve actually reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    /// Sound pressure level in dB re 20 µPa at 1 m, half-space.
    SoundPressure,
    /// Acceleration level in dB re 1 µm/s².
    AccelerationLevel,
}

/// The sound-level curve. When the driver has no diaphragm (Sd = 0) an
/// SPL is physically meaningless; the engine substitutes the acceleration
/// level and flags the substitution instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelCurve {
    pub label: String,
    pub kind: LevelKind,
    /// True when the requested SPL was replaced by the acceleration level.
    pub substituted: bool,
    pub values: Vec<f64>,
}

/// Scalars the curve builders need besides the base state responses.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResponseParams {
    pub bl: f64,
    pub r_total: f64,
    pub rext: f64,
    pub mms: f64,
    pub sd: f64,
    pub rho: f64,
    /// Parent body mass when present.
    pub parent_mass: Option<f64>,
    /// Radiator air-loaded mass and direction cosine when present.
    pub radiator: Option<(f64, f64)>,
}

/// The six base state responses over a frequency sweep, plus everything
/// needed to derive the labeled curves from them.
#[derive(Debug, Clone)]
pub struct SystemResponse {
    frequencies: Vec<f64>,
    v_source: f64,
    /// One solved state vector per frequency, scaled by the source voltage.
    states: Vec<Vector6<Complex64>>,
    params: ResponseParams,
}

/// Evaluate the model at each frequency: one complex LU solve per point
/// yields all six state responses at once. Frequencies must be strictly
/// positive and finite; points are independent and evaluated in parallel.
pub(crate) fn evaluate(
    matrices: &StateMatrices,
    freqs: &[f64],
    v_source: f64,
    params: ResponseParams,
) -> Result<SystemResponse, SimError> {
    for &f in freqs {
        if !f.is_finite() || f <= 0.0 {
            return Err(SimError::config(format!(
                "frequencies must be strictly positive, got {f}"
            )));
        }
    }
    let states = freqs
        .par_iter()
        .map(|&f| {
            matrices
                .response_at(TWO_PI * f)
                .map(|x| x.map(|c| c * v_source))
                .ok_or_else(|| {
                    SimError::degenerate(format!("transfer function singular at {f} Hz"))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SystemResponse {
        frequencies: freqs.to_vec(),
        v_source,
        states,
        params,
    })
}

impl SystemResponse {
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Source voltage the responses are scaled by, V RMS.
    pub fn v_source(&self) -> f64 {
        self.v_source
    }

    /// Raw response of one state variable across the sweep.
    pub fn state(&self, var: StateVar) -> Vec<Complex64> {
        let idx = var.index();
        self.states.iter().map(|x| x[idx]).collect()
    }

    fn difference(&self, a: StateVar, b: StateVar) -> Vec<Complex64> {
        let (ia, ib) = (a.index(), b.index());
        self.states.iter().map(|x| x[ia] - x[ib]).collect()
    }

    /// Relative velocity of the coil against the magnetic gap: the gap
    /// rides on the parent body when one is present.
    fn coil_gap_velocity(&self) -> Vec<Complex64> {
        if self.params.parent_mass.is_some() {
            self.difference(StateVar::DiaphragmVelocity, StateVar::ParentBodyVelocity)
        } else {
            self.state(StateVar::DiaphragmVelocity)
        }
    }

    fn times_jw(&self, values: &[Complex64]) -> Vec<Complex64> {
        values
            .iter()
            .zip(&self.frequencies)
            .map(|(&v, &f)| v * Complex64::new(0.0, TWO_PI * f))
            .collect()
    }

    fn peak(values: &[Complex64]) -> Vec<Complex64> {
        values.iter().map(|&v| v * SQRT_2).collect()
    }

    /// Displacements in m. Primary curve first; relative and peak
    /// variants follow for the bodies that are present.
    pub fn displacements(&self) -> Vec<Curve> {
        let x1 = self.state(StateVar::Diaphragm);
        let mut curves = vec![
            Curve { label: "Diaphragm, RMS".into(), values: x1.clone() },
            Curve { label: "Diaphragm, peak".into(), values: Self::peak(&x1) },
        ];
        if self.params.parent_mass.is_some() {
            let rel = self.difference(StateVar::Diaphragm, StateVar::ParentBody);
            curves.push(Curve {
                label: "Parent body, RMS".into(),
                values: self.state(StateVar::ParentBody),
            });
            curves.push(Curve {
                label: "Diaphragm, peak, relative to parent".into(),
                values: Self::peak(&rel),
            });
            curves.push(Curve {
                label: "Diaphragm, RMS, relative to parent".into(),
                values: rel,
            });
        }
        if self.params.radiator.is_some() {
            let xpr = self.state(StateVar::Radiator);
            curves.push(Curve {
                label: "PR/vent, peak".into(),
                values: Self::peak(&xpr),
            });
            curves.push(Curve { label: "PR/vent, RMS".into(), values: xpr });
            if self.params.parent_mass.is_some() {
                let rel = self.difference(StateVar::Radiator, StateVar::ParentBody);
                curves.push(Curve {
                    label: "PR/vent, peak, relative to parent".into(),
                    values: Self::peak(&rel),
                });
                curves.push(Curve {
                    label: "PR/vent, RMS, relative to parent".into(),
                    values: rel,
                });
            }
        }
        curves
    }

    /// Velocities in m/s.
    pub fn velocities(&self) -> Vec<Curve> {
        let mut curves = vec![Curve {
            label: "Diaphragm, RMS".into(),
            values: self.state(StateVar::DiaphragmVelocity),
        }];
        if self.params.parent_mass.is_some() {
            curves.push(Curve {
                label: "Parent body, RMS".into(),
                values: self.state(StateVar::ParentBodyVelocity),
            });
            curves.push(Curve {
                label: "Diaphragm, RMS, relative to parent".into(),
                values: self
                    .difference(StateVar::DiaphragmVelocity, StateVar::ParentBodyVelocity),
            });
        }
        if self.params.radiator.is_some() {
            curves.push(Curve {
                label: "PR/vent, RMS".into(),
                values: self.state(StateVar::RadiatorVelocity),
            });
            if self.params.parent_mass.is_some() {
                curves.push(Curve {
                    label: "PR/vent, RMS, relative to parent".into(),
                    values: self
                        .difference(StateVar::RadiatorVelocity, StateVar::ParentBodyVelocity),
                });
            }
        }
        curves
    }

    /// Accelerations in m/s²: the velocity curves times jω.
    pub fn accelerations(&self) -> Vec<Curve> {
        self.velocities()
            .into_iter()
            .map(|curve| Curve {
                label: curve.label,
                values: self.times_jw(&curve.values),
            })
            .collect()
    }

    /// Electrical impedance in Ω. The system curve (source to ground,
    /// Rext included) comes first; the speaker-only curve subtracts Rext.
    pub fn impedances(&self) -> Vec<Curve> {
        let system: Vec<Complex64> = self
            .coil_gap_velocity()
            .iter()
            .map(|&v| {
                let back_emf_ratio = v * (self.params.bl / self.v_source);
                self.params.r_total / (Complex64::new(1.0, 0.0) - back_emf_ratio)
            })
            .collect();
        let speaker: Vec<Complex64> = system.iter().map(|&z| z - self.params.rext).collect();
        vec![
            Curve { label: "Impedance, system".into(), values: system },
            Curve { label: "Impedance, speaker only".into(), values: speaker },
        ]
    }

    /// Forces in N: the Lorentz force on the coil, each body's inertial
    /// reaction, and the net force into the reference frame when a parent
    /// body is present.
    pub fn forces(&self) -> Vec<Curve> {
        let lorentz: Vec<Complex64> = self
            .coil_gap_velocity()
            .iter()
            .map(|&v| {
                let current = (self.v_source - v * self.params.bl) / self.params.r_total;
                current * self.params.bl
            })
            .collect();
        let diaphragm_inertial: Vec<Complex64> = self
            .times_jw(&self.state(StateVar::DiaphragmVelocity))
            .iter()
            .map(|&a| a * self.params.mms)
            .collect();

        let mut curves = vec![
            Curve { label: "Lorentz force, RMS".into(), values: lorentz },
            Curve {
                label: "Force from speaker to parent body, RMS".into(),
                values: diaphragm_inertial.clone(),
            },
        ];

        let radiator_inertial: Option<Vec<Complex64>> =
            self.params.radiator.map(|(m_s, dir)| {
                self.times_jw(&self.state(StateVar::RadiatorVelocity))
                    .iter()
                    .map(|&a| a * (dir * m_s))
                    .collect()
            });
        if let Some(pr_force) = &radiator_inertial {
            curves.push(Curve {
                label: "Force from PR/vent to parent body, RMS".into(),
                values: pr_force.clone(),
            });
        }

        if let Some(m2) = self.params.parent_mass {
            let parent_inertial = self.times_jw(&self.state(StateVar::ParentBodyVelocity));
            let net: Vec<Complex64> = (0..self.frequencies.len())
                .map(|i| {
                    parent_inertial[i] * m2
                        + diaphragm_inertial[i]
                        + radiator_inertial
                            .as_ref()
                            .map_or(Complex64::new(0.0, 0.0), |f| f[i])
                })
                .collect();
            curves.push(Curve {
                label: "Force from parent body to reference frame, RMS".into(),
                values: net,
            });
        }
        curves
    }

    /// Phase of each displacement response, degrees.
    pub fn phases(&self) -> Vec<RealCurve> {
        let deg = |values: Vec<Complex64>| -> Vec<f64> {
            values.iter().map(|v| v.arg().to_degrees()).collect()
        };
        let mut curves = vec![RealCurve {
            label: "Diaphragm".into(),
            values: deg(self.state(StateVar::Diaphragm)),
        }];
        if self.params.parent_mass.is_some() {
            curves.push(RealCurve {
                label: "Parent body".into(),
                values: deg(self.state(StateVar::ParentBody)),
            });
        }
        if self.params.radiator.is_some() {
            curves.push(RealCurve {
                label: "PR/vent".into(),
                values: deg(self.state(StateVar::Radiator)),
            });
        }
        curves
    }

    /// Sound pressure level at 1 m, half-space, from the piston-radiation
    /// approximation p(ω) = ½·jω·ρ·a²·v(ω). Falls back to the
    /// acceleration level when there is no diaphragm.
    pub fn level(&self) -> LevelCurve {
        let velocity = self.state(StateVar::DiaphragmVelocity);
        if self.params.sd > 0.0 {
            let a_sq = crate::constants::piston_radius(self.params.sd).powi(2);
            let values = velocity
                .iter()
                .zip(&self.frequencies)
                .map(|(&v, &f)| {
                    let p = 0.5 * TWO_PI * f * self.params.rho * a_sq * v.norm();
                    20.0 * (p / P_REF).log10()
                })
                .collect();
            LevelCurve {
                label: "SPL, 1 m half-space".into(),
                kind: LevelKind::SoundPressure,
                substituted: false,
                values,
            }
        } else {
            log::warn!("no diaphragm area; reporting acceleration level instead of SPL");
            let values = self
                .times_jw(&velocity)
                .iter()
                .map(|a| 20.0 * (a.norm() / ACC_REF).log10())
                .collect();
            LevelCurve {
                label: "Acceleration level".into(),
                kind: LevelKind::AccelerationLevel,
                substituted: true,
                values,
            }
        }
    }
}

/// Log-spaced frequency grid with `ppo` points per octave, anchored so
/// that 1 kHz falls exactly on a grid point. The grid is widened outward
/// to cover both endpoints.
pub fn log_spaced_frequencies(f_min: f64, f_max: f64, ppo: u32) -> Vec<f64> {
    let n_start = ((f_min / 1000.0).log2() * ppo as f64).floor() as i64;
    let n_end = ((f_max / 1000.0).log2() * ppo as f64).ceil() as i64;
    (n_start..=n_end)
        .map(|n| 1000.0 * (n as f64 / ppo as f64).exp2())
        .collect()
}
