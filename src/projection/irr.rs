//! Internal Rate of Return (IRR) calculation
//!
//! Multi-start Newton-Raphson over yearly cash flows. Used to price each
//! contribution year against the benefit it buys.

use serde::{Deserialize, Serialize};

/// Returned by [`IrrSolver::solve`] when no rate could be found
pub const NO_SOLUTION: f64 = -1.0;

/// Lowest rate the iteration may visit
const MIN_RATE: f64 = -0.99;
/// Highest rate the iteration may visit
const MAX_RATE: f64 = 10.0;
/// Largest Newton step taken as is
const MAX_STEP: f64 = 0.5;
const DERIVATIVE_FLOOR: f64 = 1e-10;
const FALLBACK_GUESS: f64 = 0.1;

/// Newton-Raphson IRR solver with retries around the initial guess
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrSolver {
    /// Convergence threshold on |NPV|
    pub tolerance: f64,
    /// Iterations per starting point
    pub max_iterations: usize,
}

impl Default for IrrSolver {
    fn default() -> Self {
        Self {
            tolerance: 1e-7,
            max_iterations: 1000,
        }
    }
}

impl IrrSolver {
    /// Rate per period, or [`NO_SOLUTION`]
    pub fn solve(&self, cashflows: &[f64]) -> f64 {
        self.try_solve(cashflows).unwrap_or(NO_SOLUTION)
    }

    /// Rate per period starting from an explicit guess, or [`NO_SOLUTION`]
    pub fn solve_with_guess(&self, cashflows: &[f64], guess: f64) -> f64 {
        self.try_solve_with_guess(cashflows, Some(guess)).unwrap_or(NO_SOLUTION)
    }

    /// Rate per period, or `None` when the flows have no sign change or no start converges
    pub fn try_solve(&self, cashflows: &[f64]) -> Option<f64> {
        self.try_solve_with_guess(cashflows, None)
    }

    fn try_solve_with_guess(&self, cashflows: &[f64], guess: Option<f64>) -> Option<f64> {
        if cashflows.len() < 2 {
            return None;
        }

        // Check if there's at least one sign change (required for IRR to exist)
        let has_positive = cashflows.iter().any(|&cf| cf > 0.0);
        let has_negative = cashflows.iter().any(|&cf| cf < 0.0);
        if !has_positive || !has_negative {
            return None;
        }

        let guess = guess.unwrap_or_else(|| initial_guess(cashflows));

        starting_points(guess)
            .into_iter()
            .find_map(|start| self.newton(cashflows, start))
    }

    /// One Newton run; `None` when this start does not converge
    fn newton(&self, cashflows: &[f64], start: f64) -> Option<f64> {
        let tol = self.tolerance;
        let mut rate = start;
        let mut prev: Option<f64> = None;

        for _ in 0..self.max_iterations {
            if rate <= -1.0 {
                rate = MIN_RATE;
            }

            let (npv, dnpv) = npv_and_derivative(cashflows, rate);
            if !npv.is_finite() || !dnpv.is_finite() {
                return None;
            }

            if npv.abs() < tol {
                return in_range(rate).then_some(rate);
            }

            if dnpv.abs() < DERIVATIVE_FLOOR {
                return None;
            }

            let step = -npv / dnpv;
            let mut new_rate = if step.abs() > MAX_STEP {
                rate + MAX_STEP * step.signum()
            } else {
                rate + step
            };

            // Oscillating between two estimates: try their midpoint
            if let Some(prev) = prev.filter(|p| (new_rate - p).abs() < tol) {
                let midpoint = (rate + prev) / 2.0;
                let npv_mid = npv_at_rate(cashflows, midpoint);
                if npv_mid.abs() < tol && in_range(midpoint) {
                    return Some(midpoint);
                }
                return None;
            }

            new_rate = new_rate.clamp(MIN_RATE, MAX_RATE);
            prev = Some(rate);
            rate = new_rate;
        }

        None
    }
}

fn in_range(rate: f64) -> bool {
    rate > -1.0 && rate < MAX_RATE
}

/// Closed-form estimate from the weighted timing of inflows and outflows
pub fn initial_guess(cashflows: &[f64]) -> f64 {
    let mut inflow = 0.0;
    let mut outflow = 0.0;
    let mut inflow_time = 0.0;
    let mut outflow_time = 0.0;

    for (t, &cf) in cashflows.iter().enumerate() {
        if cf > 0.0 {
            inflow += cf;
            inflow_time += cf * t as f64;
        } else if cf < 0.0 {
            outflow -= cf;
            outflow_time -= cf * t as f64;
        }
    }

    if inflow <= 0.0 || outflow <= 0.0 {
        return FALLBACK_GUESS;
    }

    let delta = inflow_time / inflow - outflow_time / outflow;
    let span = if delta.abs() >= 1e-12 {
        delta
    } else {
        (cashflows.len().saturating_sub(1)).max(1) as f64
    };

    let guess = (inflow / outflow).powf(1.0 / span) - 1.0;
    if guess.is_finite() {
        guess
    } else {
        FALLBACK_GUESS
    }
}

/// The guess and its ±10% / ±20% perturbations, without repeats
fn starting_points(guess: f64) -> Vec<f64> {
    let mut points: Vec<f64> = Vec::with_capacity(5);
    for candidate in [guess, guess * 1.1, guess * 0.9, guess * 1.2, guess * 0.8] {
        if !points.contains(&candidate) {
            points.push(candidate);
        }
    }
    points
}

/// Calculate NPV and its derivative with respect to rate
pub fn npv_and_derivative(cashflows: &[f64], rate: f64) -> (f64, f64) {
    let mut npv = 0.0;
    let mut dnpv = 0.0;

    for (t, &cf) in cashflows.iter().enumerate() {
        let discount = (1.0 + rate).powi(t as i32);
        npv += cf / discount;
        if t > 0 {
            dnpv -= (t as f64) * cf / ((1.0 + rate).powi(t as i32 + 1));
        }
    }

    (npv, dnpv)
}

/// Calculate NPV at a given periodic rate
pub fn npv_at_rate(cashflows: &[f64], rate: f64) -> f64 {
    cashflows
        .iter()
        .enumerate()
        .map(|(t, &cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_simple_irr() {
        // Pay 1000, receive 1100 a year later
        let irr = IrrSolver::default().solve(&[-1000.0, 1100.0]);
        assert_relative_eq!(irr, 0.10, epsilon = 1e-6);
    }

    #[test]
    fn test_sentinel_without_sign_change() {
        let solver = IrrSolver::default();
        assert_eq!(solver.solve(&[100.0, 200.0]), NO_SOLUTION);
        assert_eq!(solver.solve(&[-100.0, -200.0]), NO_SOLUTION);
        assert_eq!(solver.solve(&[-100.0]), NO_SOLUTION);
        assert_eq!(solver.solve(&[]), NO_SOLUTION);
        assert_eq!(solver.try_solve(&[0.0, 0.0]), None);
    }

    #[test]
    fn test_annuity() {
        // 1000 now buys 200 a year for 10 years
        let mut cashflows = vec![-1000.0];
        cashflows.extend(vec![200.0; 10]);

        let irr = IrrSolver::default().solve(&cashflows);
        assert!((irr - 0.1510).abs() < 1e-3, "Expected ~15.1% IRR, got {}", irr);
        assert!(npv_at_rate(&cashflows, irr).abs() < 1e-7);
    }

    #[test]
    fn test_contribution_then_indexed_benefit() {
        // Shape of one contribution year: a payment, a wait, then an indexed pension
        let mut cashflows = vec![-2500.0];
        cashflows.extend(vec![0.0; 29]);
        let mut benefit = 150.0;
        for _ in 0..25 {
            cashflows.push(benefit);
            benefit *= 1.021;
        }

        let irr = IrrSolver::default().solve(&cashflows);
        assert!(irr > -1.0 && irr < 10.0);
        assert!(npv_at_rate(&cashflows, irr).abs() < 1e-7);
    }

    #[test]
    fn test_explicit_guess() {
        let irr = IrrSolver::default().solve_with_guess(&[-1000.0, 0.0, 1210.0], 0.5);
        assert_relative_eq!(irr, 0.10, epsilon = 1e-6);
    }

    #[test]
    fn test_first_step_below_tolerance_keeps_iterating() {
        // NPV is about 9e-7 here but the Newton step is about 1e-9
        let start = 0.1 - 1e-9;
        let (npv, _) = npv_and_derivative(&[-1000.0, 1100.0], start);
        assert!(npv.abs() >= 1e-7);

        let rate = IrrSolver::default().newton(&[-1000.0, 1100.0], start);
        assert!(rate.is_some());
        assert_relative_eq!(rate.unwrap_or(NO_SOLUTION), 0.10, epsilon = 1e-8);
    }

    #[test]
    fn test_initial_guess_falls_back() {
        assert_eq!(initial_guess(&[100.0, 200.0]), FALLBACK_GUESS);
        assert_eq!(initial_guess(&[-100.0, 0.0, 0.0]), FALLBACK_GUESS);
        // Inflows and outflows centred on the same period: span is the series length
        let guess = initial_guess(&[-100.0, 50.0, -100.0]);
        assert_relative_eq!(guess, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_starting_points_are_unique() {
        assert_eq!(starting_points(0.0), vec![0.0]);
        assert_eq!(starting_points(0.1).len(), 5);
    }

    #[test]
    fn test_npv_derivative_matches_finite_difference() {
        let cashflows = [-1000.0, 300.0, 400.0, 500.0];
        let rate = 0.05;
        let h = 1e-6;
        let (_, dnpv) = npv_and_derivative(&cashflows, rate);
        let numeric = (npv_at_rate(&cashflows, rate + h) - npv_at_rate(&cashflows, rate - h)) / (2.0 * h);
        assert_relative_eq!(dnpv, numeric, epsilon = 1e-3);
    }

    proptest! {
        #[test]
        fn prop_two_flow_round_trip(rate in -0.5f64..2.0) {
            let cashflows = [-1000.0, 1000.0 * (1.0 + rate)];
            let irr = IrrSolver::default().solve(&cashflows);
            prop_assert!((irr - rate).abs() < 1e-6, "rate {} solved as {}", rate, irr);
        }

        #[test]
        fn prop_deterministic(flows in proptest::collection::vec(-1000.0f64..1000.0, 2..20)) {
            let solver = IrrSolver::default();
            let first = solver.solve(&flows);
            let second = solver.solve(&flows);
            prop_assert!(first == second || (first.is_nan() && second.is_nan()));
        }
    }
}
