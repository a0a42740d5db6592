//! The speaker driver: Thiele-Small parameters and the small derived
//! quantities that hang off them. Carries data and scalar formulas only;
//! frequency-dependent behavior lives in the response engine.

use crate::coil::Coil;
use crate::constants::{air_mass, AirProperties};
use crate::error::SimError;

/// Reference sound power for SPL-style levels, W.
const W_REF: f64 = 1e-12;

/// Moving-mass specification. Exactly one of total (Mms, air load
/// included) or bare diaphragm assembly (Mmd) is given; the other is
/// derived through `air_mass`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovingMass {
    /// Mms, kg: diaphragm + coil + coupled air.
    Total(f64),
    /// Mmd, kg: diaphragm + coil without the coupled air.
    Diaphragm(f64),
}

/// Motor assembly: a wound coil in a magnetic gap. Supplies Bl, Re and
/// the moving mass indirectly, as an alternative to quoting them directly.
#[derive(Debug, Clone)]
pub struct Motor {
    pub coil: Coil,
    /// Average flux density over the coil height at rest position, T.
    pub b_avg: f64,
    /// Mass of all moving parts except the coil windings, kg.
    pub dead_mass: f64,
    /// Series resistance between the terminals and the coil (leadwires), Ω.
    pub rlw: f64,
}

impl Motor {
    /// Force factor Bl = wire length × average flux density, T·m.
    pub fn bl(&self) -> f64 {
        self.coil.total_wire_length() * self.b_avg
    }

    /// Terminal resistance: winding plus leadwires, Ω.
    pub fn re(&self) -> f64 {
        self.coil.resistance() + self.rlw
    }

    /// Bare moving mass Mmd = dead mass + winding mass, kg.
    pub fn moving_mass(&self) -> f64 {
        self.dead_mass + self.coil.mass()
    }
}

/// A speaker driver with its derived small-signal parameters.
///
/// Construction validates the inputs and freezes every derived quantity;
/// a parameter change means building a new value, never mutating one.
#[derive(Debug, Clone)]
pub struct SpeakerDriver {
    /// Undamped free-air resonance, Hz.
    pub fs: f64,
    /// Diaphragm area, m².
    pub sd: f64,
    /// Mechanical quality factor.
    pub qms: f64,
    /// Peak linear excursion, m.
    pub xpeak: f64,
    /// Force factor, T·m.
    pub bl: f64,
    /// Voice-coil DC resistance, Ω.
    pub re: f64,
    /// Total moving mass (air load included), kg.
    pub mms: f64,
    /// Bare moving mass, kg.
    pub mmd: f64,
    /// Suspension stiffness, N/m.
    pub kms: f64,
    /// Suspension mechanical resistance, kg/s.
    pub rms: f64,
    /// Electrical quality factor at Re.
    pub qes: f64,
    /// Total quality factor at Re.
    pub qts: f64,
    fs_damped: Option<f64>,
}

impl SpeakerDriver {
    pub fn new(
        fs: f64,
        sd: f64,
        qms: f64,
        xpeak: f64,
        bl: f64,
        re: f64,
        mass: MovingMass,
    ) -> Result<Self, SimError> {
        if !fs.is_finite() || fs <= 0.0 {
            return Err(SimError::config(format!("fs must be positive, got {fs}")));
        }
        if !sd.is_finite() || sd < 0.0 {
            return Err(SimError::config(format!(
                "surface area cannot be negative, got {sd}"
            )));
        }
        if !qms.is_finite() || qms <= 0.0 {
            return Err(SimError::config(format!("Qms must be positive, got {qms}")));
        }
        if !re.is_finite() || re <= 0.0 {
            return Err(SimError::config(format!("Re must be positive, got {re}")));
        }

        let (mms, mmd) = match mass {
            MovingMass::Total(mms) => (mms, mms - air_mass(sd)),
            MovingMass::Diaphragm(mmd) => (mmd + air_mass(sd), mmd),
        };
        if !mms.is_finite() || mms <= 0.0 || mmd <= 0.0 {
            return Err(SimError::config(format!(
                "moving mass must be positive: Mms = {mms}, Mmd = {mmd}"
            )));
        }

        let kms = mms * (fs * 2.0 * std::f64::consts::PI).powi(2);
        let rms = (mms * kms).sqrt() / qms;
        let ces = bl * bl / re;
        let qes = (mms * kms).sqrt() / ces;
        let qts = (mms * kms).sqrt() / (rms + ces);
        let zeta = 1.0 / (2.0 * qts);
        let discr = 1.0 - 2.0 * zeta * zeta;
        let fs_damped = (discr > 0.0).then(|| fs * discr.sqrt());

        Ok(Self {
            fs,
            sd,
            qms,
            xpeak,
            bl,
            re,
            mms,
            mmd,
            kms,
            rms,
            qes,
            qts,
            fs_damped,
        })
    }

    /// Build a driver from a motor description instead of direct Bl/Re/mass.
    pub fn from_motor(
        fs: f64,
        sd: f64,
        qms: f64,
        xpeak: f64,
        motor: &Motor,
    ) -> Result<Self, SimError> {
        Self::new(
            fs,
            sd,
            qms,
            xpeak,
            motor.bl(),
            motor.re(),
            MovingMass::Diaphragm(motor.moving_mass()),
        )
    }

    /// Damped free-air resonance, Hz. `None` for an overdamped suspension.
    pub fn fs_damped(&self) -> Option<f64> {
        self.fs_damped
    }

    /// Back-EMF damping Bl²/Re, kg/s.
    pub fn ces(&self) -> f64 {
        self.bl * self.bl / self.re
    }

    /// Sensitivity Lm in dB SPL for 1 W at Re, 1 m, half-space.
    ///
    /// Returns −∞ when there is no diaphragm (Sd = 0).
    pub fn sensitivity(&self, air: &AirProperties) -> f64 {
        if self.sd == 0.0 {
            return f64::NEG_INFINITY;
        }
        let c = air.speed_of_sound();
        let intensity_1w = air.rho * self.bl.powi(2) * self.sd.powi(2)
            / c
            / self.re
            / self.mms.powi(2)
            / (2.0 * std::f64::consts::PI);
        let power_over_intensity_half_space = 1.0 / (2.0 * std::f64::consts::PI);
        10.0 * (intensity_1w * power_over_intensity_half_space / W_REF).log10()
    }

    /// Equivalent compliance volume Vas = Kair·Sd²/Kms, m³.
    pub fn vas(&self, air: &AirProperties) -> f64 {
        air.bulk_modulus() / self.kms * self.sd * self.sd
    }

    /// Ratio of RMS motor force to the suspension force at half Xpeak, for
    /// a given voltage at the speaker terminals. Values well above 1 mean
    /// the motor can comfortably drive the suspension through its stroke.
    pub fn motor_to_suspension_force(&self, v_spk: f64) -> f64 {
        self.bl * v_spk / self.re / self.kms / (self.xpeak / 2.0)
    }
}

/// Proposed clearance between coil and bottom plate for a given Xpeak.
pub fn bottom_plate_clearance(xpeak: f64) -> f64 {
    let proposed_clearance = 1e-3 + (xpeak - 3e-3) / 5.0;
    xpeak + proposed_clearance
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // Driver of §8 scenario A: fs 111 Hz, Sd 53.5 cm², Qms 6.51,
    // Bl 4.78 Tm, Re 4.18 Ω, Mms 5.09 g.
    fn scenario_driver() -> SpeakerDriver {
        SpeakerDriver::new(
            111.0,
            53.5e-4,
            6.51,
            4e-3,
            4.78,
            4.18,
            MovingMass::Total(5.09e-3),
        )
        .unwrap()
    }

    #[test]
    fn test_mass_invariant_from_total() {
        let d = scenario_driver();
        assert_relative_eq!(d.mms, d.mmd + air_mass(d.sd), max_relative = 1e-12);
    }

    #[test]
    fn test_mass_invariant_from_diaphragm() {
        let d = scenario_driver();
        let d2 = SpeakerDriver::new(
            111.0,
            53.5e-4,
            6.51,
            4e-3,
            4.78,
            4.18,
            MovingMass::Diaphragm(d.mmd),
        )
        .unwrap();
        assert_relative_eq!(d2.mms, d.mms, max_relative = 1e-12);
        assert_relative_eq!(d2.mms, d2.mmd + air_mass(d2.sd), max_relative = 1e-12);
    }

    #[test]
    fn test_equivalent_mass_inputs_agree_on_qts() {
        let via_mms = scenario_driver();
        let via_mmd = SpeakerDriver::new(
            111.0,
            53.5e-4,
            6.51,
            4e-3,
            4.78,
            4.18,
            MovingMass::Diaphragm(via_mms.mmd),
        )
        .unwrap();
        assert_relative_eq!(via_mms.qts, via_mmd.qts, max_relative = 1e-12);
        assert_relative_eq!(via_mms.qes, via_mmd.qes, max_relative = 1e-12);
    }

    #[test]
    fn test_derived_small_signal_parameters() {
        let d = scenario_driver();
        // Kms = Mms·ωs²
        let ws = 2.0 * std::f64::consts::PI * 111.0;
        assert_relative_eq!(d.kms, 5.09e-3 * ws * ws, max_relative = 1e-12);
        // the catalog quotes Qts ≈ 0.59 for this driver
        assert!((d.qts - 0.59).abs() < 0.01, "Qts = {}", d.qts);
        // Qes > Qts always, Qts below Qms
        assert!(d.qes > d.qts);
        assert!(d.qts < d.qms);
    }

    #[test]
    fn test_sensitivity_matches_catalog() {
        // the catalog quotes Lm ≈ 87.2 dB for this driver
        let lm = scenario_driver().sensitivity(&AirProperties::default());
        assert!((lm - 87.2).abs() < 0.2, "Lm = {lm}");
    }

    #[test]
    fn test_sensitivity_without_diaphragm_is_minus_inf() {
        let shaker = SpeakerDriver::new(
            111.0,
            0.0,
            6.51,
            4e-3,
            4.78,
            4.18,
            MovingMass::Total(5.09e-3),
        )
        .unwrap();
        assert_eq!(
            shaker.sensitivity(&AirProperties::default()),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn test_vas_positive_and_scales_with_area() {
        let air = AirProperties::default();
        let d = scenario_driver();
        let vas = d.vas(&air);
        assert!(vas > 0.0);
        // Vas in the litre range for a small driver
        assert!(vas < 10e-3, "Vas = {vas} m³");
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let mass = MovingMass::Total(5.09e-3);
        assert!(SpeakerDriver::new(0.0, 53.5e-4, 6.51, 4e-3, 4.78, 4.18, mass).is_err());
        assert!(SpeakerDriver::new(111.0, -1e-4, 6.51, 4e-3, 4.78, 4.18, mass).is_err());
        assert!(SpeakerDriver::new(111.0, 53.5e-4, 0.0, 4e-3, 4.78, 4.18, mass).is_err());
        assert!(SpeakerDriver::new(111.0, 53.5e-4, 6.51, 4e-3, 4.78, 0.0, mass).is_err());
        // Mms smaller than the air load leaves a negative diaphragm mass
        assert!(SpeakerDriver::new(
            111.0,
            53.5e-4,
            6.51,
            4e-3,
            4.78,
            4.18,
            MovingMass::Total(0.1e-3)
        )
        .is_err());
    }

    #[test]
    fn test_damped_fs_none_when_heavily_damped() {
        // Qts ≈ 0.59 gives ζ ≈ 0.85, past the 1 − 2ζ² threshold
        assert_eq!(scenario_driver().fs_damped(), None);
    }

    #[test]
    fn test_damped_fs_below_fs_when_lightly_damped() {
        // weaker motor: Qts ≈ 2.4, well underdamped
        let d = SpeakerDriver::new(
            111.0,
            53.5e-4,
            6.51,
            4e-3,
            2.0,
            4.18,
            MovingMass::Total(5.09e-3),
        )
        .unwrap();
        let fsd = d.fs_damped().expect("Qts ≈ 2.4 is underdamped");
        assert!(fsd < d.fs);
        assert!(fsd > 0.9 * d.fs);
    }

    #[test]
    fn test_bottom_plate_clearance() {
        let x = 4e-3;
        assert_relative_eq!(bottom_plate_clearance(x), x + 1.2e-3, max_relative = 1e-12);
    }
}
