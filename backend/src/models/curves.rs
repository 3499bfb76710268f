//! Marginal-utility and effort curves
//!
//! Both curves are computed once from an agent's parameters and are pure
//! lookups afterwards.
//!
//! # Critical Invariants
//!
//! - Marginal utility is non-increasing in holdings and never drops below
//!   the configured floor once the curve runs out
//! - Effort is non-increasing in experience and never drops below the
//!   minimum effort once the curve runs out
//!
//! # Example
//!
//! ```
//! use societies_core::models::{EffortCurve, UtilityCurve};
//!
//! let utility = UtilityCurve::power_law(2.5, 600.0, 1.0);
//! assert!(utility.marginal(0) > utility.marginal(10));
//! assert_eq!(utility.marginal(1_000_000), 1.0);
//!
//! let effort = EffortCurve::flat(10.0);
//! assert_eq!(effort.at(0.0), 10.0);
//! ```

use serde::{Deserialize, Serialize};

/// Marginal utility of each successive unit held
///
/// Index `n` is the utility added by going from `n` to `n + 1` units.
/// Prefix sums are kept so any integral over holdings is a subtraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityCurve {
    marginal: Vec<f64>,
    /// `prefix[n]` = sum of `marginal[..n]`
    prefix: Vec<f64>,
    floor: f64,
}

impl UtilityCurve {
    /// Curve of `scaling * h^(1 / steepness)`, cut where an extra unit adds
    /// no more than `floor`
    ///
    /// # Arguments
    /// * `steepness` - exponent divisor, must exceed 1 for the curve to end
    /// * `scaling` - multiplier of the power function
    /// * `floor` - marginal utility of every unit past the end of the curve
    pub fn power_law(steepness: f64, scaling: f64, floor: f64) -> Self {
        let total = |held: f64| scaling * held.powf(1.0 / steepness);

        let mut utils = vec![0.0];
        let mut held = 1.0;
        let mut next = total(held);
        while let Some(&last) = utils.last() {
            if next - last <= floor {
                break;
            }
            utils.push(next);
            held += 1.0;
            next = total(held);
        }

        let marginal = utils.windows(2).map(|w| w[1] - w[0]).collect();
        Self::from_marginal(marginal, floor)
    }

    /// Curve from explicit marginal utilities
    pub fn from_marginal(marginal: Vec<f64>, floor: f64) -> Self {
        let mut prefix = Vec::with_capacity(marginal.len() + 1);
        let mut sum = 0.0;
        prefix.push(sum);
        for mu in &marginal {
            sum += mu;
            prefix.push(sum);
        }
        Self {
            marginal,
            prefix,
            floor,
        }
    }

    /// Utility of the next unit when holding `held` units
    ///
    /// Negative holdings read the first entry of the curve.
    pub fn marginal(&self, held: i64) -> f64 {
        let idx = held.max(0) as usize;
        self.marginal.get(idx).copied().unwrap_or(self.floor)
    }

    /// Total utility of holding `units` units
    pub fn total(&self, units: i64) -> f64 {
        if units <= 0 {
            return 0.0;
        }
        let units = units as usize;
        let len = self.marginal.len();
        if units <= len {
            self.prefix[units]
        } else {
            self.prefix[len] + self.floor * (units - len) as f64
        }
    }

    pub fn len(&self) -> usize {
        self.marginal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marginal.is_empty()
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }
}

/// Minutes needed per unit at each whole experience level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffortCurve {
    minutes: Vec<f64>,
    floor: f64,
}

impl EffortCurve {
    /// Extraction learning curve
    ///
    /// `max - (max - min) * exp(-2 * sqrt(max) * exp(-(max - min) * e / max_exp))`
    /// for each whole experience level `e` below `max_experience`.
    pub fn resource(min_effort: f64, max_effort: f64, max_experience: f64) -> Self {
        let span = max_effort - min_effort;
        let steps = max_experience.max(0.0) as usize;
        let minutes = (0..steps)
            .map(|e| {
                let inner = (-span * e as f64 / max_experience).exp();
                max_effort - span * (-max_effort.sqrt() * 2.0 * inner).exp()
            })
            .collect();
        Self {
            minutes,
            floor: min_effort,
        }
    }

    /// Device-building learning curve
    ///
    /// `max - (max - min) * exp(-2 * max * exp(-(max - min) / 2 * e / max_exp))`.
    /// Starts closer to `max` than the extraction curve and flattens later.
    pub fn device(min_effort: f64, max_effort: f64, max_experience: f64) -> Self {
        let span = max_effort - min_effort;
        let steps = max_experience.max(0.0) as usize;
        let minutes = (0..steps)
            .map(|e| {
                let inner = (-span / 2.0 * e as f64 / max_experience).exp();
                max_effort - span * (-max_effort * 2.0 * inner).exp()
            })
            .collect();
        Self {
            minutes,
            floor: min_effort,
        }
    }

    /// Same effort at every experience level
    pub fn flat(minutes: f64) -> Self {
        Self {
            minutes: Vec::new(),
            floor: minutes,
        }
    }

    /// Minutes per unit at `experience` (truncated to a whole level)
    pub fn at(&self, experience: f64) -> f64 {
        // `as` saturates negative experience to level 0
        let level = experience as usize;
        self.minutes.get(level).copied().unwrap_or(self.floor)
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }
}
