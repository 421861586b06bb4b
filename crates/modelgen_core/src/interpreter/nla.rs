use anyhow::{anyhow, bail, Context, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub max_steps: usize,
    pub damping: f64,
    pub tolerance: f64,
    /// Relative step of the finite-difference Jacobian.
    pub jacobian_step: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_steps: 100,
            damping: 1.0,
            tolerance: 1e-10,
            jacobian_step: 1e-7,
        }
    }
}

impl NewtonSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            bail!("max_steps must be greater than zero.");
        }
        if self.damping <= 0.0 {
            bail!("damping must be positive.");
        }
        if self.tolerance <= 0.0 {
            bail!("tolerance must be positive.");
        }
        if self.jacobian_step <= 0.0 {
            bail!("jacobian_step must be positive.");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NlaOutcome {
    pub residual_norm: f64,
    pub iterations: usize,
}

/// Solves the NLA systems of a model.
///
/// `objective(u, f)` fills `f` with one residual per equation of the system
/// for the unknowns `u`. On success `u` holds the root.
pub trait NlaSolver {
    fn solve(
        &self,
        objective: &mut dyn FnMut(&[f64], &mut [f64]),
        u: &mut [f64],
    ) -> Result<NlaOutcome>;
}

/// Damped Newton iteration with a forward-difference Jacobian.
#[derive(Debug, Clone, Default)]
pub struct NewtonSolver {
    pub settings: NewtonSettings,
}

impl NewtonSolver {
    pub fn new(settings: NewtonSettings) -> Self {
        Self { settings }
    }
}

impl NlaSolver for NewtonSolver {
    fn solve(
        &self,
        objective: &mut dyn FnMut(&[f64], &mut [f64]),
        u: &mut [f64],
    ) -> Result<NlaOutcome> {
        let settings = self.settings;
        settings.validate()?;
        let dim = u.len();
        if dim == 0 {
            bail!("NLA system has no unknowns.");
        }

        let mut residual = vec![0.0; dim];
        objective(u, &mut residual);
        let mut residual_norm = l2_norm(&residual);
        let mut iterations = 0usize;

        loop {
            if !residual_norm.is_finite() {
                bail!("Residual is not finite (‖f(u)‖ = {}).", residual_norm);
            }
            if residual_norm <= settings.tolerance {
                break;
            }
            if iterations >= settings.max_steps {
                bail!(
                    "Newton solver failed to converge in {} steps (‖f(u)‖ = {}).",
                    settings.max_steps,
                    residual_norm
                );
            }

            let jacobian = compute_jacobian(objective, u, &residual, settings.jacobian_step);
            let delta = solve_linear_system(dim, &jacobian, &residual)
                .context("Failed to solve linear system during Newton iteration.")?;

            for (x, d) in u.iter_mut().zip(&delta) {
                *x -= settings.damping * d;
            }

            iterations += 1;
            objective(u, &mut residual);
            residual_norm = l2_norm(&residual);
        }

        Ok(NlaOutcome {
            residual_norm,
            iterations,
        })
    }
}

/// Row-major Jacobian of `objective` at `u`, where `residual` is the
/// objective at `u`. `u` is restored before returning.
fn compute_jacobian(
    objective: &mut dyn FnMut(&[f64], &mut [f64]),
    u: &mut [f64],
    residual: &[f64],
    step: f64,
) -> Vec<f64> {
    let dim = u.len();
    let mut jacobian = vec![0.0; dim * dim];
    let mut shifted = vec![0.0; dim];
    for j in 0..dim {
        let original = u[j];
        let h = step * original.abs().max(1.0);
        u[j] = original + h;
        objective(u, &mut shifted);
        u[j] = original;
        for i in 0..dim {
            jacobian[i * dim + j] = (shifted[i] - residual[i]) / h;
        }
    }
    jacobian
}

fn solve_linear_system(dim: usize, jacobian: &[f64], residual: &[f64]) -> Result<Vec<f64>> {
    let j_matrix = DMatrix::from_row_slice(dim, dim, jacobian);
    let rhs = DVector::from_column_slice(residual);
    j_matrix
        .lu()
        .solve(&rhs)
        .map(|v| v.iter().cloned().collect())
        .ok_or_else(|| anyhow!("Jacobian is singular."))
}

fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}
