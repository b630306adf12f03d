//! Derivative-free minimisation used for likelihood and CSS estimation.

/// Result of Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// The optimal point found.
    pub optimal_point: Vec<f64>,
    /// The objective function value at the optimal point.
    pub optimal_value: f64,
    /// Number of iterations performed across all restarts.
    pub iterations: usize,
    /// Whether the final run converged.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations per run.
    pub max_iter: usize,
    /// Convergence tolerance on the spread of vertex values.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrinkage coefficient.
    pub sigma: f64,
    /// Initial simplex step, relative to each coordinate's magnitude.
    pub initial_step: f64,
    /// Number of restarts from the previous optimum.
    ///
    /// A fresh simplex around the incumbent escapes premature collapse, which
    /// is common on the flat likelihood surfaces of smoothing parameters.
    pub restarts: usize,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
            restarts: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Vertex {
    point: Vec<f64>,
    value: f64,
}

/// Minimise `objective` starting from `initial`, optionally inside box `bounds`.
///
/// Points outside the bounds are clamped onto them before evaluation.
/// Non-finite objective values are treated as `+inf`.
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    if initial.is_empty() {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let mut start = clamp(initial, bounds);
    let mut total_iterations = 0;
    let mut best = Vertex {
        value: eval(&start),
        point: start.clone(),
    };
    let mut converged = false;

    for _ in 0..=config.restarts {
        let (vertex, iterations, run_converged) = run_simplex(&eval, &start, bounds, &config);
        total_iterations += iterations;
        converged = run_converged;

        let improved = vertex.value < best.value;
        if vertex.value <= best.value {
            best = vertex;
        }
        if !improved && total_iterations > iterations {
            break;
        }
        start = best.point.clone();
    }

    NelderMeadResult {
        optimal_point: best.point,
        optimal_value: best.value,
        iterations: total_iterations,
        converged,
    }
}

fn run_simplex<F>(
    eval: &F,
    start: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &NelderMeadConfig,
) -> (Vertex, usize, bool)
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    let mut simplex: Vec<Vertex> = Vec::with_capacity(n + 1);
    simplex.push(Vertex {
        point: start.to_vec(),
        value: eval(start),
    });

    for i in 0..n {
        let mut point = start.to_vec();
        let step = if start[i].abs() > 1e-10 {
            config.initial_step * start[i].abs()
        } else {
            config.initial_step
        };
        point[i] += step;
        // A step pushed onto a bound would give a degenerate simplex; go the other way.
        if let Some(b) = bounds.and_then(|b| b.get(i)) {
            if point[i] > b.1 {
                point[i] = start[i] - step;
            }
        }
        let point = clamp(&point, bounds);
        let value = eval(&point);
        simplex.push(Vertex { point, value });
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;
        simplex.sort_by(|a, b| a.value.total_cmp(&b.value));

        let best_value = simplex[0].value;
        let worst_value = simplex[n].value;
        if (worst_value - best_value).abs() < config.tolerance
            || (best_value.is_infinite() && worst_value.is_infinite())
        {
            converged = best_value.is_finite();
            break;
        }

        let centroid = centroid(&simplex[..n]);
        let diameter = simplex
            .iter()
            .map(|v| distance(&v.point, &centroid))
            .fold(0.0, f64::max);
        if diameter < config.tolerance {
            converged = true;
            break;
        }

        let worst = &simplex[n].point;
        let reflected = clamp(&towards(&centroid, worst, -config.alpha), bounds);
        let reflected_value = eval(&reflected);

        if reflected_value < simplex[0].value {
            let expanded = clamp(&towards(&centroid, &reflected, config.gamma), bounds);
            let expanded_value = eval(&expanded);
            simplex[n] = if expanded_value < reflected_value {
                Vertex {
                    point: expanded,
                    value: expanded_value,
                }
            } else {
                Vertex {
                    point: reflected,
                    value: reflected_value,
                }
            };
            continue;
        }

        if reflected_value < simplex[n - 1].value {
            simplex[n] = Vertex {
                point: reflected,
                value: reflected_value,
            };
            continue;
        }

        let (contracted, threshold) = if reflected_value < worst_value {
            (
                clamp(&towards(&centroid, &reflected, config.rho), bounds),
                reflected_value,
            )
        } else {
            (
                clamp(&towards(&centroid, worst, config.rho), bounds),
                worst_value,
            )
        };
        let contracted_value = eval(&contracted);
        if contracted_value < threshold {
            simplex[n] = Vertex {
                point: contracted,
                value: contracted_value,
            };
            continue;
        }

        let anchor = simplex[0].point.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let shrunk = clamp(&towards(&anchor, &vertex.point, config.sigma), bounds);
            vertex.value = eval(&shrunk);
            vertex.point = shrunk;
        }
    }

    simplex.sort_by(|a, b| a.value.total_cmp(&b.value));
    let best = simplex.swap_remove(0);
    (best, iterations, converged)
}

/// Mean of the given vertices.
fn centroid(vertices: &[Vertex]) -> Vec<f64> {
    let dim = vertices[0].point.len();
    let mut c = vec![0.0; dim];
    for v in vertices {
        for (ci, xi) in c.iter_mut().zip(&v.point) {
            *ci += xi;
        }
    }
    let count = vertices.len() as f64;
    c.iter_mut().for_each(|ci| *ci /= count);
    c
}

/// `from + t * (to - from)`.
fn towards(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(f, x)| f + t * (x - f)).collect()
}

fn clamp(point: &[f64], bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    match bounds {
        None => point.to_vec(),
        Some(b) => point
            .iter()
            .enumerate()
            .map(|(i, &x)| match b.get(i) {
                Some(&(lo, hi)) => x.clamp(lo, hi),
                None => x,
            })
            .collect(),
    }
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nelder_mead_quadratic_2d() {
        let result = nelder_mead(
            |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
            &[0.0, 0.0],
            None,
            NelderMeadConfig::default(),
        );

        assert!(result.converged);
        assert_relative_eq!(result.optimal_point[0], 2.0, epsilon = 1e-3);
        assert_relative_eq!(result.optimal_point[1], 3.0, epsilon = 1e-3);
    }

    #[test]
    fn nelder_mead_rosenbrock_with_restarts() {
        let config = NelderMeadConfig {
            max_iter: 5000,
            tolerance: 1e-12,
            restarts: 2,
            ..Default::default()
        };

        let result = nelder_mead(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2),
            &[-1.0, 1.5],
            None,
            config,
        );

        assert_relative_eq!(result.optimal_point[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(result.optimal_point[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn nelder_mead_respects_bounds() {
        let result = nelder_mead(
            |x| (x[0] - 5.0).powi(2),
            &[1.0],
            Some(&[(0.0, 3.0)]),
            NelderMeadConfig::default(),
        );

        assert_relative_eq!(result.optimal_point[0], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn nelder_mead_starting_on_upper_bound() {
        let result = nelder_mead(
            |x| (x[0] - 0.5).powi(2),
            &[0.9999],
            Some(&[(0.0001, 0.9999)]),
            NelderMeadConfig::default(),
        );

        assert_relative_eq!(result.optimal_point[0], 0.5, epsilon = 1e-3);
    }

    #[test]
    fn nelder_mead_treats_nan_as_infinite() {
        let result = nelder_mead(
            |x| if x[0] < 0.0 { f64::NAN } else { (x[0] - 1.0).powi(2) },
            &[0.5],
            None,
            NelderMeadConfig::default(),
        );

        assert!(result.optimal_value.is_finite());
        assert_relative_eq!(result.optimal_point[0], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn nelder_mead_empty_initial() {
        let result = nelder_mead(|_| 0.0, &[], None, NelderMeadConfig::default());

        assert!(!result.converged);
        assert!(result.optimal_value.is_nan());
    }
}
