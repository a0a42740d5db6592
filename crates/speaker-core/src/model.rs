//! Numeric instantiation: resolve the current topology into a full
//! coefficient set, assemble the matrices, neutralize absent bodies, and
//! derive the reporting-only scalars that ride along with the model.

use crate::constants::AirProperties;
use crate::equations::{self, LumpedCoefficients};
use crate::error::SimError;
use crate::state_space::StateMatrices;
use crate::SystemConfig;

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Boxed-system figures when an enclosure is present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnclosureReport {
    /// Undamped boxed resonance, Hz.
    pub fb: f64,
    /// Damped boxed resonance, Hz. `None` when overdamped.
    pub fb_damped: Option<f64>,
    /// Total Q of the boxed system at Re.
    pub qtc: f64,
}

/// Mount figures when a parent body is present, under both limiting
/// assumptions about the child masses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentBodyReport {
    /// Natural frequency with the children decoupled, Hz.
    pub f_decoupled: f64,
    pub q_decoupled: f64,
    /// Natural frequency with the children rigidly coupled, Hz.
    pub f_coupled: f64,
    pub q_coupled: f64,
}

/// Radiator figures when a passive radiator is present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiatorReport {
    /// Resonance outside any enclosure, Hz.
    pub f_free: f64,
    /// Resonance on the enclosure, Hz. `None` without an enclosure.
    pub f_housed: Option<f64>,
}

/// A numeric model ready for frequency evaluation. The state matrices are
/// shared by all six per-state SISO systems; each state's output selector
/// is the one-hot row at [`crate::StateVar::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct NumericModel {
    pub matrices: StateMatrices,
    /// Total series loop resistance Re + Rext, Ω.
    pub r_total: f64,
    pub enclosure: Option<EnclosureReport>,
    pub parent_body: Option<ParentBodyReport>,
    pub radiator: Option<RadiatorReport>,
}

/// Build a numeric model for the given configuration.
///
/// Every optional body resolves either to its own parameters or to inert
/// values (infinite mass, zero stiffness/damping/area); after assembly the
/// matrix blocks of absent bodies are explicitly zeroed as a second guard
/// against residual cross-terms. Non-finite coefficients are rejected
/// before the model is returned.
pub fn instantiate(config: &SystemConfig, air: &AirProperties) -> Result<NumericModel, SimError> {
    validate(config)?;

    let drv = &config.driver;
    let r_total = drv.re + config.rext;

    let (kappa, rbox) = match &config.enclosure {
        Some(enc) => (
            air.bulk_modulus() / enc.vb,
            enc.damping(air, drv.sd, drv.mms, drv.kms),
        ),
        None => (0.0, 0.0),
    };

    let (m2, k2, r2) = match &config.parent_body {
        Some(pb) => (pb.m, pb.k, pb.c),
        None => (f64::INFINITY, 0.0, 0.0),
    };

    let vb = config.enclosure.as_ref().map(|enc| enc.vb);
    let (m3, k3, r3, spr) = match &config.passive_radiator {
        Some(pr) => (
            pr.moving_mass(),
            pr.k,
            pr.damping(air, vb) + rbox,
            pr.s,
        ),
        None => (f64::INFINITY, 0.0, 0.0, 0.0),
    };

    let coeffs = LumpedCoefficients {
        m1: drv.mms,
        k1: drv.kms,
        r1: drv.rms + rbox,
        m2,
        k2,
        r2,
        m3,
        k3,
        r3,
        sd: drv.sd,
        spr,
        dir: config.pr_direction.coefficient(),
        bl: drv.bl,
        r_total,
        kappa,
    };

    let mut matrices = equations::assemble(&coeffs)?;
    if config.parent_body.is_none() {
        matrices.neutralize_body(2);
    }
    if config.passive_radiator.is_none() {
        matrices.neutralize_body(4);
    }
    check_finite(&matrices)?;

    let enclosure = config.enclosure.as_ref().map(|enc| {
        let k_box = enc.stiffness(air, drv.sd);
        let k_total = drv.kms + k_box;
        let fb = (k_total / drv.mms).sqrt() / TWO_PI;
        let zeta = (rbox + drv.rms + drv.ces()) / (2.0 * (k_total * drv.mms).sqrt());
        let discr = 1.0 - 2.0 * zeta * zeta;
        EnclosureReport {
            fb,
            fb_damped: (discr > 0.0).then(|| fb * discr.sqrt()),
            qtc: if zeta == 0.0 { f64::INFINITY } else { 1.0 / (2.0 * zeta) },
        }
    });

    let parent_body = config.parent_body.as_ref().map(|pb| {
        let coupled = drv.mmd + config.passive_radiator.as_ref().map_or(0.0, |pr| pr.m);
        ParentBodyReport {
            f_decoupled: pb.natural_frequency(0.0),
            q_decoupled: pb.q(0.0),
            f_coupled: pb.natural_frequency(coupled),
            q_coupled: pb.q(coupled),
        }
    });

    let radiator = config.passive_radiator.as_ref().map(|pr| RadiatorReport {
        f_free: pr.free_resonance(),
        f_housed: vb.map(|v| pr.housed_resonance(air, v)),
    });

    if let Some(report) = &enclosure {
        log::debug!("boxed system: fb = {:.2} Hz, Qtc = {:.3}", report.fb, report.qtc);
    }
    if let Some(report) = &parent_body {
        log::debug!(
            "parent body: f = {:.2}/{:.2} Hz (decoupled/coupled)",
            report.f_decoupled,
            report.f_coupled
        );
    }

    Ok(NumericModel {
        matrices,
        r_total,
        enclosure,
        parent_body,
        radiator,
    })
}

fn validate(config: &SystemConfig) -> Result<(), SimError> {
    if !config.rext.is_finite() || config.rext < 0.0 {
        return Err(SimError::config(format!(
            "Rext must be a finite non-negative resistance, got {}",
            config.rext
        )));
    }
    if let Some(enc) = &config.enclosure {
        if !enc.vb.is_finite() || enc.vb <= 0.0 {
            return Err(SimError::config(format!(
                "enclosure volume must be positive, got {} m³",
                enc.vb
            )));
        }
        if !enc.qa.is_finite() || enc.qa <= 0.0 {
            return Err(SimError::config(format!(
                "enclosure Qa must be positive, got {}",
                enc.qa
            )));
        }
    }
    if let Some(pb) = &config.parent_body {
        // an infinite mass is a legitimate inert mount
        if pb.m.is_nan() || pb.m <= 0.0 {
            return Err(SimError::config(format!(
                "parent body mass must be positive, got {} kg",
                pb.m
            )));
        }
        if !pb.k.is_finite() || pb.k < 0.0 || !pb.c.is_finite() || pb.c < 0.0 {
            return Err(SimError::config(format!(
                "parent body stiffness and damping must be finite and non-negative, got k = {}, c = {}",
                pb.k, pb.c
            )));
        }
    }
    if let Some(pr) = &config.passive_radiator {
        if !pr.m.is_finite() || pr.m <= 0.0 {
            return Err(SimError::config(format!(
                "radiator mass must be positive, got {} kg",
                pr.m
            )));
        }
        if !pr.k.is_finite() || pr.k < 0.0 {
            return Err(SimError::config(format!(
                "radiator stiffness must be finite and non-negative, got {}",
                pr.k
            )));
        }
        if !pr.q.is_finite() || pr.q <= 0.0 {
            return Err(SimError::config(format!(
                "radiator Q must be positive, got {}",
                pr.q
            )));
        }
        if !pr.s.is_finite() || pr.s < 0.0 {
            return Err(SimError::config(format!(
                "radiator area cannot be negative, got {} m²",
                pr.s
            )));
        }
    }
    Ok(())
}

fn check_finite(matrices: &StateMatrices) -> Result<(), SimError> {
    if matrices.is_finite() {
        Ok(())
    } else {
        Err(SimError::degenerate(
            "substitution produced non-finite matrix coefficients".to_string(),
        ))
    }
}
