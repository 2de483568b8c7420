/// Why a derivative-free minimizer stopped.
///
/// An exhausted evaluation budget is a soft stop: the best point seen is
/// handed back with [`Termination::EvaluationLimit`] instead of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Tolerance reached
    Converged,
    /// Evaluation budget exhausted; the best point seen is returned
    EvaluationLimit,
}

/// Best point found by a minimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum<P> {
    pub point: P,
    pub value: f64,
    pub evaluations: usize,
    pub status: Termination,
}

impl<P> Minimum<P> {
    pub fn converged(&self) -> bool {
        self.status == Termination::Converged
    }
}

const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// Map NaN to +inf so a failed evaluation never wins a comparison.
#[inline]
fn sanitize(v: f64) -> f64 {
    if v.is_nan() {
        f64::INFINITY
    } else {
        v
    }
}

/// Golden-section search for a minimum of `f` on `[lo, hi]`.
///
/// `max_evaluations` is a hard cap on calls to `f`.
pub fn golden_section<F>(mut f: F, lo: f64, hi: f64, tolerance: f64, max_evaluations: usize) -> Minimum<f64>
where
    F: FnMut(f64) -> f64,
{
    let (mut a, mut b) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let mut evaluations = 0;
    let mut best = (0.5 * (a + b), f64::INFINITY);

    let mut eval = |x: f64, evaluations: &mut usize, best: &mut (f64, f64)| -> f64 {
        *evaluations += 1;
        let v = sanitize(f(x));
        if v < best.1 {
            *best = (x, v);
        }
        v
    };

    if max_evaluations == 0 {
        return Minimum {
            point: best.0,
            value: best.1,
            evaluations,
            status: Termination::EvaluationLimit,
        };
    }
    if max_evaluations < 2 || b - a <= tolerance {
        let m = 0.5 * (a + b);
        let v = eval(m, &mut evaluations, &mut best);
        return Minimum {
            point: m,
            value: v,
            evaluations,
            status: if b - a <= tolerance {
                Termination::Converged
            } else {
                Termination::EvaluationLimit
            },
        };
    }

    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = eval(c, &mut evaluations, &mut best);
    let mut fd = eval(d, &mut evaluations, &mut best);

    let status = loop {
        if b - a <= tolerance {
            break Termination::Converged;
        }
        if evaluations >= max_evaluations {
            break Termination::EvaluationLimit;
        }
        if fc <= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = eval(c, &mut evaluations, &mut best);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = eval(d, &mut evaluations, &mut best);
        }
    };

    Minimum {
        point: best.0,
        value: best.1,
        evaluations,
        status,
    }
}

/// Box-bounded Nelder–Mead simplex search.
///
/// Trial points are projected onto `[lower, upper]` before evaluation.
/// Stops when every vertex lies within `radius` (max-norm) of the best
/// vertex, or after `max_evaluations` calls to `f`.
pub fn nelder_mead<F>(
    mut f: F,
    start: &[f64],
    steps: &[f64],
    lower: &[f64],
    upper: &[f64],
    max_evaluations: usize,
    radius: f64,
) -> Minimum<Vec<f64>>
where
    F: FnMut(&[f64]) -> f64,
{
    let n = start.len();
    let project = |x: &mut Vec<f64>| {
        for i in 0..n {
            x[i] = x[i].clamp(lower[i], upper[i]);
        }
    };
    let mut evaluations = 0usize;
    let mut call = |x: &[f64], evaluations: &mut usize| -> f64 {
        *evaluations += 1;
        sanitize(f(x))
    };

    let mut x0 = start.to_vec();
    project(&mut x0);
    if n == 0 || max_evaluations == 0 {
        let value = if max_evaluations == 0 { f64::INFINITY } else { call(&x0, &mut evaluations) };
        return Minimum {
            point: x0,
            value,
            evaluations,
            status: if n == 0 { Termination::Converged } else { Termination::EvaluationLimit },
        };
    }

    // Initial simplex: start plus one step along each axis, flipped if the
    // step would leave the box
    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    let v0 = call(&x0, &mut evaluations);
    simplex.push((x0.clone(), v0));
    for i in 0..n {
        let mut xi = x0.clone();
        let step = if steps[i] != 0.0 { steps[i] } else { 1e-3 };
        xi[i] += step;
        if xi[i] > upper[i] {
            xi[i] = x0[i] - step;
        }
        project(&mut xi);
        let vi = call(&xi, &mut evaluations);
        simplex.push((xi, vi));
    }

    let status = loop {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = &simplex[0].0;
        let spread = simplex[1..]
            .iter()
            .map(|(x, _)| {
                x.iter()
                    .zip(best)
                    .map(|(a, b)| (a - b).abs())
                    .fold(0.0f64, f64::max)
            })
            .fold(0.0f64, f64::max);
        if spread < radius {
            break Termination::Converged;
        }
        if evaluations >= max_evaluations {
            break Termination::EvaluationLimit;
        }

        // Centroid of all but the worst vertex
        let mut centroid = vec![0.0; n];
        for (x, _) in &simplex[..n] {
            for i in 0..n {
                centroid[i] += x[i];
            }
        }
        centroid.iter_mut().for_each(|c| *c /= n as f64);
        let worst_value = simplex[n].1;
        let second_worst = simplex[n - 1].1;
        let best_value = simplex[0].1;

        let towards = |t: f64, worst: &[f64]| -> Vec<f64> {
            let mut p: Vec<f64> = (0..n).map(|i| centroid[i] + t * (worst[i] - centroid[i])).collect();
            project(&mut p);
            p
        };

        let worst = simplex[n].0.clone();
        let reflected = towards(-1.0, &worst);
        let fr = call(&reflected, &mut evaluations);

        if fr < best_value {
            let expanded = towards(-2.0, &worst);
            let fe = call(&expanded, &mut evaluations);
            simplex[n] = if fe < fr { (expanded, fe) } else { (reflected, fr) };
        } else if fr < second_worst {
            simplex[n] = (reflected, fr);
        } else {
            let (contracted, fk) = if fr < worst_value {
                let p = towards(-0.5, &worst);
                let v = call(&p, &mut evaluations);
                (p, v)
            } else {
                let p = towards(0.5, &worst);
                let v = call(&p, &mut evaluations);
                (p, v)
            };
            if fk < worst_value.min(fr) {
                simplex[n] = (contracted, fk);
            } else {
                // Shrink towards the best vertex
                let best = simplex[0].0.clone();
                for vertex in simplex.iter_mut().skip(1) {
                    let mut p: Vec<f64> = (0..n).map(|i| best[i] + 0.5 * (vertex.0[i] - best[i])).collect();
                    project(&mut p);
                    let v = call(&p, &mut evaluations);
                    *vertex = (p, v);
                }
            }
        }
    };

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (point, value) = simplex.swap_remove(0);
    Minimum {
        point,
        value,
        evaluations,
        status,
    }
}
