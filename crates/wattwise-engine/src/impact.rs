//! Post-execution impact assessment.
//!
//! Rates a completed action on energy, user experience and speed. The score
//! is reported alongside the result and never feeds back into execution.

use wattwise_core::config::ImpactConfig;
use wattwise_core::types::clip;

use crate::types::{
    EnergyImpact, ImpactAssessment, PerformanceImpact, Rating, UserExperienceImpact, UserImpact,
};

#[derive(Debug, Clone, Default)]
pub struct ImpactAnalyzer {
    config: ImpactConfig,
}

impl ImpactAnalyzer {
    pub fn new(config: ImpactConfig) -> Self {
        Self { config }
    }

    /// Saving per millisecond, with execution time floored at 1 ms.
    pub fn efficiency(&self, energy_saved: f64, execution_time_ms: f64) -> Rating {
        let rate = energy_saved / execution_time_ms.max(1.0);
        if rate > self.config.high_efficiency {
            Rating::High
        } else if rate > self.config.medium_efficiency {
            Rating::Medium
        } else {
            Rating::Low
        }
    }

    pub fn sustainability(&self, energy_saved: f64) -> Rating {
        if energy_saved > self.config.high_sustainability {
            Rating::High
        } else if energy_saved > self.config.medium_sustainability {
            Rating::Medium
        } else {
            Rating::Low
        }
    }

    pub fn overall_score(&self, energy_saved: f64, user_impact: UserImpact, execution_time_ms: f64) -> f64 {
        let energy = clip(energy_saved / self.config.saving_normalizer, 0.0, 1.0);
        let speed = clip(
            execution_time_ms / self.config.execution_time_normalizer_ms,
            0.0,
            1.0,
        );
        0.4 * energy + 0.4 * (1.0 - user_impact.score()) + 0.2 * (1.0 - speed)
    }

    pub fn analyze(
        &self,
        energy_saved: f64,
        user_impact: UserImpact,
        execution_time_ms: f64,
    ) -> ImpactAssessment {
        let score = user_impact.score();
        ImpactAssessment {
            energy_impact: EnergyImpact {
                saved: energy_saved,
                efficiency: self.efficiency(energy_saved, execution_time_ms),
                sustainability: self.sustainability(energy_saved),
            },
            user_experience_impact: UserExperienceImpact {
                level: user_impact,
                score,
                acceptable: score < self.config.acceptable_user_impact,
            },
            performance_impact: PerformanceImpact { execution_time_ms },
            overall_score: self.overall_score(energy_saved, user_impact, execution_time_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_efficiency_thresholds() {
        let a = ImpactAnalyzer::default();
        assert_eq!(a.efficiency(20.0, 100.0), Rating::High);
        assert_eq!(a.efficiency(2.0, 100.0), Rating::Medium);
        assert_eq!(a.efficiency(0.5, 100.0), Rating::Low);
    }

    #[test]
    fn test_efficiency_zero_time_does_not_divide_by_zero() {
        let a = ImpactAnalyzer::default();
        assert_eq!(a.efficiency(5.0, 0.0), Rating::High);
        assert_eq!(a.efficiency(0.0, 0.0), Rating::Low);
    }

    #[test]
    fn test_sustainability_thresholds() {
        let a = ImpactAnalyzer::default();
        assert_eq!(a.sustainability(12.0), Rating::High);
        assert_eq!(a.sustainability(10.0), Rating::Medium);
        assert_eq!(a.sustainability(5.0), Rating::Low);
    }

    #[test]
    fn test_acceptability_cutoff() {
        let a = ImpactAnalyzer::default();
        assert!(a.analyze(0.0, UserImpact::Medium, 1.0).user_experience_impact.acceptable);
        assert!(!a.analyze(0.0, UserImpact::High, 1.0).user_experience_impact.acceptable);
    }

    #[test]
    fn test_overall_score() {
        let a = ImpactAnalyzer::default();
        // 0.4*0.5 + 0.4*0.7 + 0.2*0.9
        let score = a.overall_score(15.0, UserImpact::Low, 100.0);
        assert!((score - 0.66).abs() < 1e-9);

        // Saturates on both ends.
        let best = a.overall_score(100.0, UserImpact::Minimal, 0.0);
        assert!((best - 0.96).abs() < 1e-9);
        let worst = a.overall_score(0.0, UserImpact::High, 5000.0);
        assert!((worst - 0.04).abs() < 1e-9);
    }
}
