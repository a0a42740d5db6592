//! The fixed-shape six-state model and its frequency-domain evaluation.
//!
//! The state vector is always [x1, x1', x2, x2', xpr, xpr'] and there is
//! always exactly one input (source voltage), whichever bodies are
//! physically present; absent bodies are zeroed blocks. Output selection
//! is one-hot per state with no feedforward, so evaluating
//! x(jω) = (jωI − A)⁻¹·B once per frequency yields every state's transfer
//! function at that frequency.

use nalgebra::{Matrix3x6, Matrix6, Vector3, Vector6};
use num_complex::Complex64;

/// The six state variables, in state-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateVar {
    /// Diaphragm position x1.
    Diaphragm,
    /// Diaphragm velocity x1'.
    DiaphragmVelocity,
    /// Parent body position x2.
    ParentBody,
    /// Parent body velocity x2'.
    ParentBodyVelocity,
    /// Passive radiator position xpr.
    Radiator,
    /// Passive radiator velocity xpr'.
    RadiatorVelocity,
}

impl StateVar {
    pub const ALL: [StateVar; 6] = [
        StateVar::Diaphragm,
        StateVar::DiaphragmVelocity,
        StateVar::ParentBody,
        StateVar::ParentBodyVelocity,
        StateVar::Radiator,
        StateVar::RadiatorVelocity,
    ];

    /// Index into the state vector; also the position of the 1 in this
    /// state's one-hot output selector.
    pub fn index(self) -> usize {
        match self {
            StateVar::Diaphragm => 0,
            StateVar::DiaphragmVelocity => 1,
            StateVar::ParentBody => 2,
            StateVar::ParentBodyVelocity => 3,
            StateVar::Radiator => 4,
            StateVar::RadiatorVelocity => 5,
        }
    }
}

/// Numeric system and input matrices, d/dt z = A·z + B·V.
#[derive(Debug, Clone, PartialEq)]
pub struct StateMatrices {
    pub a: Matrix6<f64>,
    pub b: Vector6<f64>,
}

impl StateMatrices {
    /// Build the 6×6 form from the solved accelerations: position rows are
    /// exact selectors onto the matching velocity state, velocity rows are
    /// the acceleration coefficients.
    pub(crate) fn from_solved(acc: &Matrix3x6<f64>, acc_input: &Vector3<f64>) -> Self {
        let mut a = Matrix6::zeros();
        let mut b = Vector6::zeros();
        for body in 0..3 {
            let pos = 2 * body;
            a[(pos, pos + 1)] = 1.0;
            for j in 0..6 {
                a[(pos + 1, j)] = acc[(body, j)];
            }
            b[pos + 1] = acc_input[body];
        }
        Self { a, b }
    }

    /// Zero the two rows and two columns belonging to one body's
    /// position/velocity pair, and the matching input rows.
    pub(crate) fn neutralize_body(&mut self, first_row: usize) {
        for i in first_row..first_row + 2 {
            self.a.row_mut(i).fill(0.0);
            self.a.column_mut(i).fill(0.0);
            self.b[i] = 0.0;
        }
    }

    /// True when every coefficient is finite.
    pub fn is_finite(&self) -> bool {
        self.a.iter().all(|v| v.is_finite()) && self.b.iter().all(|v| v.is_finite())
    }

    /// All six state responses per source volt at angular frequency
    /// `omega`: x(jω) = (jωI − A)⁻¹·B. `None` when jωI − A is singular,
    /// i.e. an undamped pole sits exactly on the evaluation frequency.
    pub fn response_at(&self, omega: f64) -> Option<Vector6<Complex64>> {
        let s = Complex64::new(0.0, omega);
        let mut m = self.a.map(|v| Complex64::new(-v, 0.0));
        for i in 0..6 {
            m[(i, i)] += s;
        }
        let rhs = self.b.map(|v| Complex64::new(v, 0.0));
        m.lu().solve(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Hand-built forced oscillator m·x″ = −k·x − r·x' + f·V in the first
    /// body slot, other bodies neutralized.
    fn oscillator(m: f64, k: f64, r: f64, f: f64) -> StateMatrices {
        let mut acc = Matrix3x6::zeros();
        acc[(0, 0)] = -k / m;
        acc[(0, 1)] = -r / m;
        let mut matrices = StateMatrices::from_solved(&acc, &Vector3::new(f / m, 0.0, 0.0));
        matrices.neutralize_body(2);
        matrices.neutralize_body(4);
        matrices
    }

    #[test]
    fn test_matches_analytic_transfer_function() {
        let (m, k, r, f) = (5e-3, 2.5e3, 0.5, 1.0);
        let ss = oscillator(m, k, r, f);
        for freq in [10.0, 111.0, 400.0, 2000.0] {
            let w = 2.0 * PI * freq;
            let x = ss.response_at(w).unwrap();
            // X(jω) = f / (k − mω² + jωr)
            let expect = Complex64::new(f, 0.0)
                / Complex64::new(k - m * w * w, w * r);
            assert_relative_eq!(x[0].re, expect.re, max_relative = 1e-9);
            assert_relative_eq!(x[0].im, expect.im, max_relative = 1e-9);
            // velocity state is jω times the position state
            let v = Complex64::new(0.0, w) * expect;
            assert_relative_eq!(x[1].re, v.re, max_relative = 1e-9);
            assert_relative_eq!(x[1].im, v.im, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_neutralized_states_stay_zero() {
        let ss = oscillator(5e-3, 2.5e3, 0.5, 1.0);
        let x = ss.response_at(2.0 * PI * 100.0).unwrap();
        for idx in 2..6 {
            assert_eq!(x[idx], Complex64::new(0.0, 0.0), "state {idx}");
        }
    }

    #[test]
    fn test_undamped_pole_on_axis_is_singular() {
        // powers of two keep ω0² = k/m exact in floating point, so the
        // evaluation lands exactly on the undamped pole
        let (m, k) = (1.0, 1048576.0);
        let ss = oscillator(m, k, 0.0, 1.0);
        let w0 = (k / m).sqrt(); // 1024 rad/s
        assert!(ss.response_at(w0).is_none());
        assert!(ss.response_at(w0 * 1.01).is_some());
    }

    #[test]
    fn test_state_var_indices_cover_vector() {
        let indices: Vec<usize> = StateVar::ALL.iter().map(|v| v.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }
}
