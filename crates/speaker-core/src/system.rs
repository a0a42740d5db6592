//! The composition root: one driver plus its optional loading elements,
//! the cached numeric model, and the response entry points.

use crate::constants::AirProperties;
use crate::error::SimError;
use crate::frequency_response::{self, ResponseParams, SystemResponse};
use crate::model::{self, EnclosureReport, NumericModel, ParentBodyReport, RadiatorReport};
use crate::{Excitation, SystemConfig};

/// A speaker system with a valid numeric model.
///
/// Construction instantiates the model from the initial configuration and
/// fails on any invalid parameter combination; a constructed value is
/// always ready for response evaluation. [`SpeakerSystem::update_values`]
/// swaps in a new configuration, keeping the previous model when the new
/// one cannot be built.
#[derive(Debug, Clone)]
pub struct SpeakerSystem {
    config: SystemConfig,
    air: AirProperties,
    model: NumericModel,
}

/// Named scalar quantities for textual display.
#[derive(Debug, Clone)]
pub struct SystemSummary {
    /// Total series loop resistance Re + Rext, Ω.
    pub r_sys: f64,
    /// Free-air resonance, Hz.
    pub fs: f64,
    /// Damped free-air resonance, Hz; `None` when overdamped.
    pub fs_damped: Option<f64>,
    pub qms: f64,
    pub qes: f64,
    pub qts: f64,
    /// Sensitivity for 1 W at Re, 1 m half-space, dB SPL.
    pub sensitivity_db: f64,
    /// Equivalent compliance volume, m³.
    pub vas: f64,
    /// Peak linear excursion, m.
    pub xpeak: f64,
    pub enclosure: Option<EnclosureReport>,
    pub parent_body: Option<ParentBodyReport>,
    pub radiator: Option<RadiatorReport>,
}

impl SpeakerSystem {
    pub fn new(config: SystemConfig, air: AirProperties) -> Result<Self, SimError> {
        let model = model::instantiate(&config, &air)?;
        Ok(Self { config, air, model })
    }

    /// Rebuild the numeric model for a changed configuration.
    ///
    /// On failure the previous configuration and model stay in place, so
    /// callers can keep displaying last-known-good results.
    pub fn update_values(&mut self, config: SystemConfig) -> Result<(), SimError> {
        let model = model::instantiate(&config, &self.air)?;
        self.config = config;
        self.model = model;
        Ok(())
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn air(&self) -> &AirProperties {
        &self.air
    }

    /// The current numeric model.
    pub fn model(&self) -> &NumericModel {
        &self.model
    }

    /// Evaluate the response at the given frequencies for an excitation.
    pub fn response(
        &self,
        freqs: &[f64],
        excitation: Excitation,
    ) -> Result<SystemResponse, SimError> {
        let v_source = excitation.source_voltage(self.config.driver.re)?;
        let drv = &self.config.driver;
        let params = ResponseParams {
            bl: drv.bl,
            r_total: self.model.r_total,
            rext: self.config.rext,
            mms: drv.mms,
            sd: drv.sd,
            rho: self.air.rho,
            parent_mass: self.config.parent_body.as_ref().map(|pb| pb.m),
            radiator: self
                .config
                .passive_radiator
                .as_ref()
                .map(|pr| (pr.moving_mass(), self.config.pr_direction.coefficient())),
        };
        frequency_response::evaluate(&self.model.matrices, freqs, v_source, params)
    }

    /// Scalar quantities for textual display.
    pub fn summary(&self) -> SystemSummary {
        let drv = &self.config.driver;
        SystemSummary {
            r_sys: self.model.r_total,
            fs: drv.fs,
            fs_damped: drv.fs_damped(),
            qms: drv.qms,
            qes: drv.qes,
            qts: drv.qts,
            sensitivity_db: drv.sensitivity(&self.air),
            vas: drv.vas(&self.air),
            xpeak: drv.xpeak,
            enclosure: self.model.enclosure,
            parent_body: self.model.parent_body,
            radiator: self.model.radiator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MovingMass, SpeakerDriver};
    use crate::elements::{Enclosure, ParentBody, PassiveRadiator, PrDirection};
    use crate::frequency_response::log_spaced_frequencies;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

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

    fn scenario_a() -> SpeakerSystem {
        let mut config = SystemConfig::new(scenario_driver());
        config.rext = 1.0;
        SpeakerSystem::new(config, AirProperties::default()).unwrap()
    }

    fn peak_frequency(freqs: &[f64], values: &[Complex64]) -> f64 {
        let mut best = 0;
        for i in 1..values.len() {
            if values[i].norm() > values[best].norm() {
                best = i;
            }
        }
        freqs[best]
    }

    #[test]
    fn test_scenario_a_low_frequency_impedance() {
        let system = scenario_a();
        let response = system
            .response(&[0.5, 1.0, 2.0], Excitation::Voltage(1.0))
            .unwrap();
        let z = &response.impedances()[0].values;
        for (i, zi) in z.iter().enumerate() {
            assert_relative_eq!(zi.norm(), 5.18, max_relative = 1e-2);
            assert!(zi.im.abs() < 0.2, "point {i}: Z = {zi}");
        }
    }

    #[test]
    fn test_scenario_a_resonance_at_fs() {
        // the fundamental resonance shows as the impedance and velocity
        // maxima, both at fs to within the grid spacing
        let system = scenario_a();
        let freqs = log_spaced_frequencies(10.0, 3000.0, 768);
        let response = system.response(&freqs, Excitation::Voltage(1.0)).unwrap();

        let z_peak = peak_frequency(&freqs, &response.impedances()[0].values);
        assert!((z_peak - 111.0).abs() / 111.0 < 0.01, "Z peak at {z_peak} Hz");

        let v_peak = peak_frequency(&freqs, &response.velocities()[0].values);
        assert!((v_peak - 111.0).abs() / 111.0 < 0.01, "v peak at {v_peak} Hz");
    }

    #[test]
    fn test_scenario_b_boxed_resonance() {
        let mut config = SystemConfig::new(scenario_driver());
        config.rext = 1.0;
        config.enclosure = Some(Enclosure { vb: 1e-3, qa: 200.0 });
        let system = SpeakerSystem::new(config, AirProperties::default()).unwrap();

        let summary = system.summary();
        let report = summary.enclosure.expect("enclosure present");
        assert!(report.fb > summary.fs);
        assert!(report.qtc.is_finite() && report.qtc > summary.qts);

        // the impedance peak moves up to fb
        let freqs = log_spaced_frequencies(10.0, 3000.0, 768);
        let response = system.response(&freqs, Excitation::Voltage(1.0)).unwrap();
        let z_peak = peak_frequency(&freqs, &response.impedances()[0].values);
        assert!(
            (z_peak - report.fb).abs() / report.fb < 0.02,
            "Z peak at {z_peak} Hz, fb = {} Hz",
            report.fb
        );
    }

    #[test]
    fn test_scenario_c_mount_resonance_visible() {
        let mut config = SystemConfig::new(scenario_driver());
        config.rext = 1.0;
        config.parent_body = Some(ParentBody { m: 0.1, k: 25e3, c: 4.0 });
        let system = SpeakerSystem::new(config, AirProperties::default()).unwrap();

        let freqs = log_spaced_frequencies(10.0, 3000.0, 768);
        let response = system.response(&freqs, Excitation::Voltage(1.0)).unwrap();

        // the parent body peaks at its own resonance, (1/2π)·√(k/m) pulled
        // down a little by the coupled driver mass
        let displacements = response.displacements();
        let parent = displacements
            .iter()
            .find(|c| c.label == "Parent body, RMS")
            .expect("parent curve present");
        let pb_peak = peak_frequency(&freqs, &parent.values);
        assert!(
            (70.0..=90.0).contains(&pb_peak),
            "parent peak at {pb_peak} Hz"
        );

        // and leaves a second feature in the relative displacement
        let relative = displacements
            .iter()
            .find(|c| c.label == "Diaphragm, RMS, relative to parent")
            .expect("relative curve present");
        let mags: Vec<f64> = relative.values.iter().map(|v| v.norm()).collect();
        let mut found = false;
        for i in 1..mags.len() - 1 {
            if !(55.0..=115.0).contains(&freqs[i]) {
                continue;
            }
            let local_max = mags[i] > mags[i - 1] && mags[i] > mags[i + 1];
            let local_min = mags[i] < mags[i - 1] && mags[i] < mags[i + 1];
            if local_max || local_min {
                found = true;
                break;
            }
        }
        assert!(found, "no feature near the mount resonance");
    }

    #[test]
    fn test_impedance_at_dc_for_all_topologies() {
        let air = AirProperties::default();
        let enclosure = Enclosure { vb: 1e-3, qa: 200.0 };
        let parent = ParentBody { m: 0.1, k: 25e3, c: 4.0 };
        let radiator = PassiveRadiator { m: 10e-3, k: 800.0, q: 7.0, s: 50e-4 };

        let mut configs = Vec::new();
        for with_enc in [false, true] {
            for with_pb in [false, true] {
                for with_pr in [false, true] {
                    let mut config = SystemConfig::new(scenario_driver());
                    config.rext = 1.0;
                    config.enclosure = with_enc.then_some(enclosure);
                    config.parent_body = with_pb.then_some(parent);
                    config.passive_radiator = with_pr.then_some(radiator);
                    configs.push(config);
                }
            }
        }

        for config in configs {
            let system = SpeakerSystem::new(config, air).unwrap();
            let response = system.response(&[0.2], Excitation::Voltage(1.0)).unwrap();
            let z = response.impedances()[0].values[0];
            assert_relative_eq!(z.norm(), 5.18, max_relative = 5e-3);
        }
    }

    #[test]
    fn test_vented_box_radiator_peaks_near_tuning() {
        let mut config = SystemConfig::new(scenario_driver());
        config.rext = 1.0;
        config.enclosure = Some(Enclosure { vb: 1e-3, qa: 200.0 });
        config.passive_radiator = Some(PassiveRadiator {
            m: 10e-3,
            k: 800.0,
            q: 7.0,
            s: 50e-4,
        });
        let system = SpeakerSystem::new(config, AirProperties::default()).unwrap();

        let f_housed = system
            .summary()
            .radiator
            .unwrap()
            .f_housed
            .expect("housed resonance with enclosure");

        let freqs = log_spaced_frequencies(10.0, 3000.0, 768);
        let response = system.response(&freqs, Excitation::Voltage(1.0)).unwrap();
        let displacements = response.displacements();
        let pr_curve = displacements
            .iter()
            .find(|c| c.label == "PR/vent, RMS")
            .expect("radiator curve present");
        let pr_peak = peak_frequency(&freqs, &pr_curve.values);
        assert!(
            (pr_peak - f_housed).abs() / f_housed < 0.35,
            "PR peak at {pr_peak} Hz, housed resonance {f_housed} Hz"
        );
    }

    #[test]
    fn test_radiator_direction_irrelevant_without_parent() {
        // dir only enters the mechanical projections onto the parent body
        let mut aligned = SystemConfig::new(scenario_driver());
        aligned.rext = 1.0;
        aligned.enclosure = Some(Enclosure { vb: 1e-3, qa: 200.0 });
        aligned.passive_radiator = Some(PassiveRadiator {
            m: 10e-3,
            k: 800.0,
            q: 7.0,
            s: 50e-4,
        });
        let mut opposed = aligned.clone();
        opposed.pr_direction = PrDirection::Opposed;

        let air = AirProperties::default();
        let freqs = [20.0, 80.0, 111.0, 300.0];
        let ra = SpeakerSystem::new(aligned, air)
            .unwrap()
            .response(&freqs, Excitation::Voltage(1.0))
            .unwrap();
        let ro = SpeakerSystem::new(opposed, air)
            .unwrap()
            .response(&freqs, Excitation::Voltage(1.0))
            .unwrap();

        let xa = &ra.displacements()[0].values;
        let xo = &ro.displacements()[0].values;
        for i in 0..freqs.len() {
            assert_relative_eq!(xa[i].re, xo[i].re, max_relative = 1e-9);
            assert_relative_eq!(xa[i].im, xo[i].im, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_failed_update_keeps_last_model() {
        let mut system = scenario_a();
        let before = system.model().clone();

        let mut bad = system.config().clone();
        bad.enclosure = Some(Enclosure { vb: -1e-3, qa: 200.0 });
        let err = system.update_values(bad).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));

        assert_eq!(system.model(), &before);
        // and the retained model still evaluates
        let response = system.response(&[100.0], Excitation::Voltage(1.0)).unwrap();
        assert!(response.displacements()[0].values[0].norm() > 0.0);
    }

    #[test]
    fn test_successful_update_swaps_model() {
        let mut system = scenario_a();
        let before = system.model().clone();

        let mut updated = system.config().clone();
        updated.enclosure = Some(Enclosure { vb: 1e-3, qa: 200.0 });
        system.update_values(updated).unwrap();

        assert_ne!(system.model(), &before);
        assert!(system.summary().enclosure.is_some());
    }

    #[test]
    fn test_summary_scalars() {
        let system = scenario_a();
        let summary = system.summary();
        assert_relative_eq!(summary.r_sys, 5.18, max_relative = 1e-12);
        assert!((summary.qts - 0.59).abs() < 0.01);
        assert!((summary.sensitivity_db - 87.2).abs() < 0.2);
        assert!(summary.vas > 0.0);
        assert!(summary.enclosure.is_none());
        assert!(summary.parent_body.is_none());
        assert!(summary.radiator.is_none());
    }
}
