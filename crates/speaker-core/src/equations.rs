//! Equations of motion of the maximal topology: three coupled
//! translational masses, an electrical port, and an acoustic cavity,
//! reduced to the fixed-shape state-space form
//!
//! ```text
//! d/dt [x1, x1', x2, x2', xpr, xpr']ᵗ = A·state + B·Vsource
//! ```
//!
//! The two auxiliary quantities are linearly dependent on the states and
//! are substituted out before solving:
//!
//! ```text
//! i = (Vsource − Bl·(x1' − x2')) / (Re + Rext)     coil current
//! p = −κ·(Sd·x1 + Spr·xpr),  κ = Kair/Vb           cavity pressure
//! ```
//!
//! Displacements are measured along each element's own outward normal, so
//! volume continuity always carries the full areas. The radiator's
//! direction cosine `dir` appears only in the mechanical projections:
//! its suspension sees the parent move as dir·x2, and the parent receives
//! the dir-projected suspension reaction plus the reaction pressure force
//! −p·Sd − dir·p·Spr.
//!
//! The elimination of i and p is carried out ahead of time; what remains
//! at runtime is accumulating force coefficients and solving the 3×3
//! system M·[x1″, x2″, xpr″]ᵗ = Γ·state + f·Vsource for the accelerations.

use nalgebra::{Matrix3, Matrix3x6, Vector3};

use crate::error::SimError;
use crate::state_space::StateMatrices;

/// Fully numeric coefficient set for the maximal three-body topology.
///
/// Absent bodies are represented by inert values (infinite mass, zero
/// stiffness/damping/area); the instantiator additionally zeroes their
/// matrix blocks after assembly.
#[derive(Debug, Clone, Copy)]
pub struct LumpedCoefficients {
    /// Coil + diaphragm moving mass (Mms), kg.
    pub m1: f64,
    /// Suspension stiffness (Kms), N/m.
    pub k1: f64,
    /// Suspension damping including box absorption (Rms + Rbox), kg/s.
    pub r1: f64,
    /// Parent body mass, kg.
    pub m2: f64,
    /// Parent body stiffness to ground, N/m.
    pub k2: f64,
    /// Parent body damping to ground, kg/s.
    pub r2: f64,
    /// Radiator air-loaded moving mass, kg.
    pub m3: f64,
    /// Radiator suspension stiffness, N/m.
    pub k3: f64,
    /// Radiator suspension damping including box absorption, kg/s.
    pub r3: f64,
    /// Diaphragm area, m².
    pub sd: f64,
    /// Radiator area, m².
    pub spr: f64,
    /// Radiator direction cosine against the driver axis.
    pub dir: f64,
    /// Force factor, T·m.
    pub bl: f64,
    /// Total electrical loop resistance Re + Rext, Ω.
    pub r_total: f64,
    /// Cavity stiffness per volume Kair/Vb, Pa/m³ (0 without enclosure).
    pub kappa: f64,
}

/// Assemble the 6-state system and input matrices from a coefficient set.
///
/// Fails with [`SimError::Assembly`] when the mass matrix is singular;
/// that is a structural defect in the equation set, never a data problem.
pub fn assemble(c: &LumpedCoefficients) -> Result<StateMatrices, SimError> {
    // Electrical port folded in: Bl·i = fv·V − ge·(x1' − x2')
    let ge = c.bl * c.bl / c.r_total;
    let fv = c.bl / c.r_total;

    // Reaction area the parent sees from the cavity pressure
    let s2 = c.sd + c.dir * c.spr;

    // Force balance M·acc = Γ·state + f·V over [x1, x1', x2, x2', xpr, xpr']
    let mut gamma = Matrix3x6::zeros();

    // Body 1, coil + diaphragm: Lorentz force, suspension to the parent,
    // cavity pressure over Sd
    gamma[(0, 0)] = -(c.k1 + c.kappa * c.sd * c.sd);
    gamma[(0, 1)] = -(c.r1 + ge);
    gamma[(0, 2)] = c.k1;
    gamma[(0, 3)] = c.r1 + ge;
    gamma[(0, 4)] = -c.kappa * c.sd * c.spr;

    // Body 2, parent: mount to ground, suspension reactions from both
    // children, Lorentz reaction, reaction pressure force
    gamma[(1, 0)] = c.k1 + c.kappa * c.sd * s2;
    gamma[(1, 1)] = c.r1 + ge;
    gamma[(1, 2)] = -(c.k2 + c.k1 + c.dir * c.dir * c.k3);
    gamma[(1, 3)] = -(c.r2 + c.r1 + ge + c.dir * c.dir * c.r3);
    gamma[(1, 4)] = c.dir * c.k3 + c.kappa * c.spr * s2;
    gamma[(1, 5)] = c.dir * c.r3;

    // Body 3, radiator: suspension to the parent (projected), cavity
    // pressure over Spr
    gamma[(2, 0)] = -c.kappa * c.spr * c.sd;
    gamma[(2, 2)] = c.dir * c.k3;
    gamma[(2, 3)] = c.dir * c.r3;
    gamma[(2, 4)] = -(c.k3 + c.kappa * c.spr * c.spr);
    gamma[(2, 5)] = -c.r3;

    let force = Vector3::new(fv, -fv, 0.0);
    let mass = Matrix3::from_diagonal(&Vector3::new(c.m1, c.m2, c.m3));

    let lu = mass.lu();
    if !lu.is_invertible() {
        return Err(SimError::Assembly(format!(
            "singular mass matrix, diag [{}, {}, {}]",
            c.m1, c.m2, c.m3
        )));
    }
    let acc = lu
        .solve(&gamma)
        .ok_or_else(|| SimError::Assembly("mass matrix solve failed".into()))?;
    let acc_input = lu
        .solve(&force)
        .ok_or_else(|| SimError::Assembly("mass matrix solve failed".into()))?;

    Ok(StateMatrices::from_solved(&acc, &acc_input))
}
