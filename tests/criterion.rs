//! Termination behaviour of the normalised residual criterion.

use ldubridge::core::Executor;
use ldubridge::utils::{CriterionFactory, CriterionParams, CriterionStatus, ResidualCriterion, StoppingCriterion};
use rand::Rng;

fn params(tol: f64, rel: f64, min_iter: usize, max_iter: usize) -> CriterionParams {
    CriterionParams {
        absolute_tolerance: tol,
        relative_tolerance: rel,
        norm_factor: 1.0,
        min_iter,
        max_iter,
    }
}

/// Feed residual vectors until the criterion stops; returns the number of evaluations.
fn run(c: &mut ResidualCriterion<f64>, mut residual: impl FnMut(usize) -> Vec<f64>) -> usize {
    let exec = Executor::reference();
    let mut calls = 0;
    loop {
        let r = residual(calls);
        calls += 1;
        if c.check(&exec, &r) {
            return calls;
        }
        assert!(calls < 10_000, "criterion never stopped");
    }
}

#[test]
fn zero_tolerance_stops_exactly_at_max_iter() {
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let mut c = ResidualCriterion::new(params(0.0, 0.0, 0, 5));
        let calls = run(&mut c, |_| (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect());
        assert_eq!(calls, 6);
        assert_eq!(c.status(), CriterionStatus::MaxedOut);
        assert_eq!(c.stats().iterations, 5);
        assert!(!c.stats().converged());
    }
}

#[test]
fn converges_at_first_residual_below_tolerance() {
    // normalised residuals 2, 2e-1, 2e-2, ...
    let mut c = ResidualCriterion::new(params(1e-6, 0.0, 0, 100));
    let calls = run(&mut c, |k| vec![10f64.powi(-(k as i32)), -10f64.powi(-(k as i32))]);
    assert_eq!(calls, 8);
    let stats = c.stats();
    assert_eq!(stats.iterations, 7);
    assert!(stats.converged());
    assert!(stats.final_residual < 1e-6);
    assert_eq!(stats.initial_residual, 2.0);
}

#[test]
fn min_iter_delays_convergence() {
    let mut c = ResidualCriterion::new(params(1e-6, 0.0, 9, 100));
    run(&mut c, |k| vec![10f64.powi(-(k as i32))]);
    assert_eq!(c.stats().iterations, 10);
    assert!(c.stats().converged());
}

#[test]
fn max_iter_overrides_min_iter() {
    let mut c = ResidualCriterion::new(params(1e-6, 0.0, 50, 3));
    let calls = run(&mut c, |_| vec![0.0]);
    assert_eq!(calls, 4);
    assert_eq!(c.status(), CriterionStatus::MaxedOut);
}

#[test]
fn relative_tolerance_against_initial_residual() {
    let mut c = ResidualCriterion::new(params(0.0, 1e-3, 0, 100));
    run(&mut c, |k| vec![4.0 * 0.5f64.powi(k as i32)]);
    // 4 · 0.5^k < 4e-3 first holds for k = 10
    assert_eq!(c.stats().iterations, 10);
}

#[test]
fn normalisation_factor_scales_the_residual() {
    let factory = CriterionFactory::new(CriterionParams { norm_factor: 8.0, ..params(1.0, 0.0, 0, 10) });
    let mut c = factory.create::<f64>();
    let exec = Executor::reference();
    assert!(!c.check(&exec, &[4.0, -4.0]));
    assert_eq!(c.residual_norm(), 1.0);
    // 7/8 < 1
    assert!(c.check(&exec, &[3.0, -4.0]));
}
