/// Small dense solvers used by the fitting pipeline.
///
/// Systems here are tiny (one row/column per candidate signal), so
/// straightforward O(n³) factorizations are all that is needed.

use num_complex::Complex64;

/// Solve `G·x = rhs` for a symmetric positive (semi-)definite `k × k` matrix
/// stored row-major.
///
/// Uses Cholesky; when the factorization breaks down (rank deficiency,
/// near-collinear columns) a growing diagonal ridge is added and the
/// factorization retried. Returns `None` only if every attempt fails.
pub fn solve_symmetric(gram: &[f64], k: usize, rhs: &[f64]) -> Option<Vec<f64>> {
    if k == 0 {
        return Some(Vec::new());
    }
    let max_diag = (0..k).map(|i| gram[i * k + i].abs()).fold(0.0f64, f64::max);
    if max_diag == 0.0 || !max_diag.is_finite() {
        return None;
    }
    let mut ridge = 0.0;
    for _ in 0..6 {
        if let Some(l) = cholesky(gram, k, ridge) {
            return Some(cholesky_solve(&l, k, rhs));
        }
        ridge = if ridge == 0.0 { max_diag * 1e-12 } else { ridge * 100.0 };
    }
    None
}

fn cholesky(gram: &[f64], k: usize, ridge: f64) -> Option<Vec<f64>> {
    let mut l = vec![0.0; k * k];
    for i in 0..k {
        for j in 0..=i {
            let mut sum = gram[i * k + j];
            if i == j {
                sum += ridge;
            }
            for p in 0..j {
                sum -= l[i * k + p] * l[j * k + p];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i * k + i] = sum.sqrt();
            } else {
                l[i * k + j] = sum / l[j * k + j];
            }
        }
    }
    Some(l)
}

fn cholesky_solve(l: &[f64], k: usize, rhs: &[f64]) -> Vec<f64> {
    // Forward: L·y = rhs
    let mut y = vec![0.0; k];
    for i in 0..k {
        let mut sum = rhs[i];
        for p in 0..i {
            sum -= l[i * k + p] * y[p];
        }
        y[i] = sum / l[i * k + i];
    }
    // Backward: Lᵀ·x = y
    let mut x = vec![0.0; k];
    for i in (0..k).rev() {
        let mut sum = y[i];
        for p in i + 1..k {
            sum -= l[p * k + i] * x[p];
        }
        x[i] = sum / l[i * k + i];
    }
    x
}

/// Solve a dense complex system `A·x = b` (row-major `n × n`) by Gaussian
/// elimination with partial pivoting. Returns `None` for a singular matrix.
pub fn solve_complex(mut a: Vec<Complex64>, n: usize, mut b: Vec<Complex64>) -> Option<Vec<Complex64>> {
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&r1, &r2| a[r1 * n + col].norm().total_cmp(&a[r2 * n + col].norm()))?;
        if a[pivot * n + col].norm() < 1e-300 {
            return None;
        }
        if pivot != col {
            for c in 0..n {
                a.swap(pivot * n + c, col * n + c);
            }
            b.swap(pivot, col);
        }
        let diag = a[col * n + col];
        for row in col + 1..n {
            let factor = a[row * n + col] / diag;
            if factor == Complex64::new(0.0, 0.0) {
                continue;
            }
            for c in col..n {
                let v = a[col * n + c];
                a[row * n + c] -= factor * v;
            }
            let bv = b[col];
            b[row] -= factor * bv;
        }
    }
    let mut x = vec![Complex64::new(0.0, 0.0); n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for c in row + 1..n {
            sum -= a[row * n + c] * x[c];
        }
        x[row] = sum / a[row * n + row];
    }
    if x.iter().all(|v| v.re.is_finite() && v.im.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Roots of the monic polynomial `zⁿ + c[0]·zⁿ⁻¹ + … + c[n-1]`
/// by Durand–Kerner iteration.
pub fn polynomial_roots(coeffs: &[Complex64]) -> Vec<Complex64> {
    let n = coeffs.len();
    if n == 0 {
        return Vec::new();
    }
    // Fujiwara bound on root magnitude
    let bound = coeffs
        .iter()
        .enumerate()
        .map(|(k, c)| c.norm().powf(1.0 / (k + 1) as f64))
        .fold(0.0f64, f64::max)
        * 2.0;
    let radius = bound.clamp(1e-3, 1e6);
    let mut roots: Vec<Complex64> = (0..n)
        .map(|i| Complex64::from_polar(radius, 2.0 * std::f64::consts::PI * i as f64 / n as f64 + 0.4))
        .collect();

    let eval = |z: Complex64| -> Complex64 {
        coeffs.iter().fold(Complex64::new(1.0, 0.0), |acc, &c| acc * z + c)
    };

    for _ in 0..1000 {
        let mut max_step = 0.0f64;
        for i in 0..n {
            let zi = roots[i];
            let mut denom = Complex64::new(1.0, 0.0);
            for (j, &zj) in roots.iter().enumerate() {
                if j != i {
                    denom *= zi - zj;
                }
            }
            if denom.norm() == 0.0 {
                // Coincident estimates: nudge apart and keep iterating
                roots[i] = zi + Complex64::new(1e-9 * radius, 1e-9 * radius);
                max_step = f64::INFINITY;
                continue;
            }
            let step = eval(zi) / denom;
            if step.re.is_finite() && step.im.is_finite() {
                roots[i] = zi - step;
                max_step = max_step.max(step.norm() / (1.0 + zi.norm()));
            }
        }
        if max_step < 1e-13 {
            break;
        }
    }
    roots
}
