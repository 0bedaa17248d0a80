//! Derivative-free minimization (Nelder–Mead simplex).
//!
//! Deterministic: the initial simplex is derived from the starting point
//! only, so identical inputs always converge to identical parameters.

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub(crate) struct NelderMead {
    pub max_iter: usize,
    /// Stop once the simplex's function values span less than this
    /// (relative to the best value).
    pub tolerance: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iter: 2_000,
            tolerance: 1e-10,
        }
    }
}

impl NelderMead {
    /// Minimize `f` starting at `x0`. Returns the best point and its value.
    /// NaN objective values are treated as +∞.
    pub fn minimize<F>(&self, f: F, x0: &[f64]) -> (Vec<f64>, f64)
    where
        F: Fn(&[f64]) -> f64,
    {
        let eval = |x: &[f64]| {
            let v = f(x);
            if v.is_nan() { f64::INFINITY } else { v }
        };

        let n = x0.len();
        if n == 0 {
            return (Vec::new(), eval(x0));
        }

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((x0.to_vec(), eval(x0)));
        for i in 0..n {
            let mut x = x0.to_vec();
            x[i] += (0.05 * x0[i].abs()).max(0.1);
            let v = eval(&x);
            simplex.push((x, v));
        }

        for _ in 0..self.max_iter {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

            let best = simplex[0].1;
            let worst = simplex[n].1;
            if (worst - best).abs() <= self.tolerance * (best.abs() + self.tolerance) {
                break;
            }

            let centroid: Vec<f64> = (0..n)
                .map(|j| simplex[..n].iter().map(|(x, _)| x[j]).sum::<f64>() / n as f64)
                .collect();
            let worst_x = simplex[n].0.clone();
            let toward = |coef: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&worst_x)
                    .map(|(c, w)| c + coef * (c - w))
                    .collect()
            };

            let reflected = toward(REFLECT);
            let f_reflected = eval(&reflected);

            if f_reflected < best {
                let expanded = toward(EXPAND);
                let f_expanded = eval(&expanded);
                simplex[n] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
                continue;
            }

            if f_reflected < simplex[n - 1].1 {
                simplex[n] = (reflected, f_reflected);
                continue;
            }

            let contracted = toward(-CONTRACT);
            let f_contracted = eval(&contracted);
            if f_contracted < worst {
                simplex[n] = (contracted, f_contracted);
                continue;
            }

            let anchor = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                for (x, a) in vertex.0.iter_mut().zip(&anchor) {
                    *x = a + SHRINK * (*x - a);
                }
                vertex.1 = eval(&vertex.0);
            }
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (x, v) = simplex.swap_remove(0);
        (x, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimizes_quadratic_bowl() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2);
        let (x, v) = NelderMead::default().minimize(f, &[0.0, 0.0]);
        assert!((x[0] - 3.0).abs() < 1e-3, "x0 = {}", x[0]);
        assert!((x[1] + 1.0).abs() < 1e-3, "x1 = {}", x[1]);
        assert!(v < 1e-6);
    }

    #[test]
    fn respects_infeasible_region() {
        // Minimum at 2.0 but |x| >= 1 is forbidden.
        let f = |x: &[f64]| {
            if x[0].abs() >= 1.0 {
                f64::INFINITY
            } else {
                (x[0] - 2.0).powi(2)
            }
        };
        let (x, v) = NelderMead::default().minimize(f, &[0.0]);
        assert!(x[0] < 1.0 && x[0] > 0.9, "x = {}", x[0]);
        assert!(v.is_finite());
    }

    #[test]
    fn zero_dimensional_evaluates_once() {
        let (x, v) = NelderMead::default().minimize(|_| 7.0, &[]);
        assert!(x.is_empty());
        assert_eq!(v, 7.0);
    }
}
