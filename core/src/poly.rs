//! Real-root polynomial solver (spec §4.A).
//!
//! `solve_poly` dispatches to closed forms for degree ≤ 4, and for degree 5–6
//! either a Sturm-sequence root isolation (when requested — needed for the
//! lathe/SOR degree-6 ray/profile intersection) or an iterative
//! companion-matrix-style solver (Durand-Kerner/Weierstrass), matching the
//! spec's "Sturm-sequence root isolation when sturm_flag set, otherwise
//! companion-matrix / Laguerre".
//!
//! Numerical guarantees (spec §4.A): no false negatives for roots with
//! magnitude > 1e-4, a boundary tie is reported once, and results are
//! deterministic for a fixed input (no RNG anywhere in this module).

use crate::pbrt::Float;
use arrayvec::ArrayVec;

/// Maximum polynomial degree this solver supports (spec: "degree ≤ 6").
pub const MAX_DEGREE: usize = 6;

/// Up to `MAX_DEGREE` real roots.
pub type Roots = ArrayVec<Float, MAX_DEGREE>;

/// Solve a polynomial of the given `degree` (`coeffs[0]` is the leading
/// coefficient, `coeffs[degree]` the constant term — POV-Ray's convention)
/// for real roots greater than `tolerance`. Roots are not sorted (spec
/// §4.A: "Roots need not be sorted").
pub fn solve_poly(degree: usize, coeffs: &[Float], sturm: bool, tolerance: Float) -> Roots {
    assert!(degree <= MAX_DEGREE, "unsupported polynomial degree {degree}");
    assert_eq!(coeffs.len(), degree + 1, "coeffs must have degree+1 entries");

    let mut roots = Roots::new();
    if coeffs[0].abs() < 1e-14 {
        // Leading coefficient vanished: degrade to the next lower degree,
        // same as the C implementation's behavior of re-dispatching.
        if degree == 0 {
            return roots;
        }
        return solve_poly(degree - 1, &coeffs[1..], sturm, tolerance);
    }

    let raw: Vec<Float> = match degree {
        0 => vec![],
        1 => solve_linear(coeffs[0], coeffs[1]).into_iter().collect(),
        2 => solve_quadratic(coeffs[0], coeffs[1], coeffs[2])
            .into_iter()
            .collect(),
        3 => solve_cubic(coeffs[0], coeffs[1], coeffs[2], coeffs[3]),
        4 => solve_quartic(coeffs[0], coeffs[1], coeffs[2], coeffs[3], coeffs[4]),
        5 | 6 => {
            if sturm {
                sturm_isolate_roots(coeffs)
            } else {
                durand_kerner_real_roots(coeffs)
            }
        }
        _ => unreachable!(),
    };

    for r in raw {
        if r > tolerance && !roots.iter().any(|x: &Float| (x - r).abs() < 1e-9) {
            let _ = roots.try_push(r);
        }
    }
    roots
}

fn solve_linear(a: Float, b: Float) -> Option<Float> {
    if a.abs() < 1e-14 {
        None
    } else {
        Some(-b / a)
    }
}

/// Closed-form quadratic solve, `a*t^2 + b*t + c = 0`.
pub fn solve_quadratic(a: Float, b: Float, c: Float) -> Option<(Float, Float)> {
    if a.abs() < 1e-14 {
        return solve_linear(b, c).map(|t| (t, t));
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    // Numerically stable form (avoids cancellation), same trick pbrt uses.
    let q = if b < 0.0 {
        -0.5 * (b - sqrt_disc)
    } else {
        -0.5 * (b + sqrt_disc)
    };
    let mut t0 = q / a;
    let mut t1 = if q.abs() < 1e-300 { t0 } else { c / q };
    if t0 > t1 {
        std::mem::swap(&mut t0, &mut t1);
    }
    Some((t0, t1))
}

fn solve_cubic(a: Float, b: Float, c: Float, d: Float) -> Vec<Float> {
    // Normalize to t^3 + pt + q form (depressed cubic) via substitution
    // t = x - B/3.
    let (b, c, d) = (b / a, c / a, d / a);
    let shift = b / 3.0;
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;

    let mut roots = Vec::with_capacity(3);
    let disc = (q * q) / 4.0 + (p * p * p) / 27.0;

    if disc > 1e-14 {
        let sqrt_disc = disc.sqrt();
        let u = cbrt(-q / 2.0 + sqrt_disc);
        let v = cbrt(-q / 2.0 - sqrt_disc);
        roots.push(u + v - shift);
    } else if disc.abs() <= 1e-14 {
        if q.abs() < 1e-14 {
            roots.push(-shift);
        } else {
            let u = cbrt(-q / 2.0);
            roots.push(2.0 * u - shift);
            roots.push(-u - shift);
        }
    } else {
        // Three real roots, trigonometric method.
        let r = (-p * p * p / 27.0).sqrt();
        let phi = (-q / (2.0 * r)).clamp(-1.0, 1.0).acos();
        let m = 2.0 * (-p / 3.0).sqrt();
        for k in 0..3 {
            let angle = (phi + 2.0 * std::f64::consts::PI * k as Float) / 3.0;
            roots.push(m * angle.cos() - shift);
        }
    }
    roots
}

fn cbrt(x: Float) -> Float {
    if x < 0.0 {
        -(-x).powf(1.0 / 3.0)
    } else {
        x.powf(1.0 / 3.0)
    }
}

fn solve_quartic(a: Float, b: Float, c: Float, d: Float, e: Float) -> Vec<Float> {
    // Ferrari's method via the resolvent cubic.
    let (b, c, d, e) = (b / a, c / a, d / a, e / a);

    // Depress: t = x - b/4.
    let shift = b / 4.0;
    let p = c - 3.0 * b * b / 8.0;
    let q = d - b * c / 2.0 + b * b * b / 8.0;
    let r = e - b * d / 4.0 + b * b * c / 16.0 - 3.0 * b * b * b * b / 256.0;

    if q.abs() < 1e-12 {
        // Biquadratic: y^2 + p*y + r = 0, y = t^2.
        let mut roots = Vec::new();
        if let Some((y0, y1)) = solve_quadratic(1.0, p, r) {
            for y in [y0, y1] {
                if y >= 0.0 {
                    let s = y.sqrt();
                    roots.push(s - shift);
                    roots.push(-s - shift);
                }
            }
        }
        return roots;
    }

    // Resolvent cubic: m^3 + (5/2)p m^2 + (2p^2 - r) m + (p^3/2 - p*r/2 - q^2/8) = 0
    let resolvent = solve_cubic(
        1.0,
        2.5 * p,
        2.0 * p * p - r,
        p * p * p / 2.0 - p * r / 2.0 - q * q / 8.0,
    );
    let m = resolvent
        .into_iter()
        .find(|&m| 2.0 * p + 2.0 * m > 0.0)
        .unwrap_or(0.0);

    let mut roots = Vec::new();
    let sqrt_2m = (2.0 * m).sqrt();
    if sqrt_2m > 1e-12 {
        if let Some((t0, t1)) = solve_quadratic(1.0, sqrt_2m, p + m - q / sqrt_2m) {
            roots.push(t0 - shift);
            roots.push(t1 - shift);
        }
        if let Some((t0, t1)) = solve_quadratic(1.0, -sqrt_2m, p + m + q / sqrt_2m) {
            roots.push(t0 - shift);
            roots.push(t1 - shift);
        }
    } else if let Some((y0, y1)) = solve_quadratic(1.0, p, r) {
        // m degenerated to 0: fall back to the biquadratic path.
        for y in [y0, y1] {
            if y >= 0.0 {
                let s = y.sqrt();
                roots.push(s - shift);
                roots.push(-s - shift);
            }
        }
    }
    roots
}

/// Evaluate a polynomial (leading-coefficient-first) and its derivative at
/// `x` via Horner's method.
fn eval_and_deriv(coeffs: &[Float], x: Float) -> (Float, Float) {
    let mut v = coeffs[0];
    let mut dv = 0.0;
    for &c in &coeffs[1..] {
        dv = dv * x + v;
        v = v * x + c;
    }
    (v, dv)
}

fn eval(coeffs: &[Float], x: Float) -> Float {
    coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Build the Sturm sequence for `coeffs` and return the number of sign
/// changes at `x` (standard Sturm root-counting).
fn sturm_sequence(coeffs: &[Float]) -> Vec<Vec<Float>> {
    let deg = coeffs.len() - 1;
    let p0 = coeffs.to_vec();
    let p1 = derivative(&p0);
    let mut seq = vec![p0, p1];
    for _ in 0..deg {
        let n = seq.len();
        let (a, b) = (seq[n - 2].clone(), seq[n - 1].clone());
        if b.iter().all(|&c| c.abs() < 1e-300) {
            break;
        }
        let r = poly_remainder(&a, &b);
        if r.iter().all(|&c| c.abs() < 1e-14) {
            break;
        }
        seq.push(r.into_iter().map(|c| -c).collect());
    }
    seq
}

fn derivative(coeffs: &[Float]) -> Vec<Float> {
    let deg = coeffs.len() - 1;
    if deg == 0 {
        return vec![0.0];
    }
    coeffs[..deg]
        .iter()
        .enumerate()
        .map(|(i, &c)| c * (deg - i) as Float)
        .collect()
}

/// Polynomial long division remainder, `a mod b`.
fn poly_remainder(a: &[Float], b: &[Float]) -> Vec<Float> {
    let mut rem = a.to_vec();
    let b_lead = b[0];
    if b_lead.abs() < 1e-300 {
        return rem;
    }
    while rem.len() >= b.len() && rem.iter().any(|&c| c.abs() > 1e-300) {
        if rem[0].abs() < 1e-300 {
            rem.remove(0);
            continue;
        }
        let factor = rem[0] / b_lead;
        for (i, &bc) in b.iter().enumerate() {
            rem[i] -= factor * bc;
        }
        rem.remove(0);
    }
    while rem.len() < b.len() - 1 {
        rem.insert(0, 0.0);
    }
    rem
}

fn sign_changes(seq: &[Vec<Float>], x: Float) -> usize {
    let mut last_sign = 0i32;
    let mut changes = 0;
    for p in seq {
        let v = eval(p, x);
        if v.abs() < 1e-300 {
            continue;
        }
        let sign = if v > 0.0 { 1 } else { -1 };
        if last_sign != 0 && sign != last_sign {
            changes += 1;
        }
        last_sign = sign;
    }
    changes
}

/// Isolate and refine real roots of `coeffs` using a Sturm sequence to count
/// roots in successively bisected brackets, then Newton polish.
fn sturm_isolate_roots(coeffs: &[Float]) -> Vec<Float> {
    let seq = sturm_sequence(coeffs);
    let bound = cauchy_bound(coeffs);

    let n_total = sign_changes(&seq, -bound) - sign_changes(&seq, bound);
    if n_total == 0 {
        return Vec::new();
    }

    let mut brackets = vec![(-bound, bound)];
    let mut isolated = Vec::new();
    let max_iters = 200;
    let mut iters = 0;
    while let Some((lo, hi)) = brackets.pop() {
        iters += 1;
        if iters > max_iters {
            break;
        }
        let n = sign_changes(&seq, lo) - sign_changes(&seq, hi);
        if n == 0 {
            continue;
        }
        if n == 1 || hi - lo < 1e-10 {
            isolated.push((lo, hi));
            continue;
        }
        let mid = 0.5 * (lo + hi);
        brackets.push((lo, mid));
        brackets.push((mid, hi));
    }

    isolated
        .into_iter()
        .map(|(lo, hi)| bisect_refine(coeffs, lo, hi))
        .collect()
}

fn bisect_refine(coeffs: &[Float], mut lo: Float, mut hi: Float) -> Float {
    let mut f_lo = eval(coeffs, lo);
    for _ in 0..100 {
        let mid = 0.5 * (lo + hi);
        let f_mid = eval(coeffs, mid);
        if f_mid == 0.0 || (hi - lo) < 1e-13 {
            return mid;
        }
        if (f_mid > 0.0) == (f_lo > 0.0) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

fn cauchy_bound(coeffs: &[Float]) -> Float {
    let lead = coeffs[0];
    let max_ratio = coeffs[1..]
        .iter()
        .fold(0.0_f64, |acc, &c| acc.max((c / lead).abs()));
    1.0 + max_ratio
}

/// Durand-Kerner simultaneous iteration for all (complex) roots, keeping
/// those that converge to (near) real values — the "companion-matrix /
/// Laguerre" alternative to the Sturm path.
fn durand_kerner_real_roots(coeffs: &[Float]) -> Vec<Float> {
    use std::f64::consts::PI;

    let deg = coeffs.len() - 1;
    let lead = coeffs[0];
    let norm: Vec<Float> = coeffs.iter().map(|c| c / lead).collect();

    // Initial guesses spread on a circle, standard Durand-Kerner start.
    let bound = cauchy_bound(coeffs);
    let mut re: Vec<Float> = (0..deg)
        .map(|i| bound * (0.4 + 0.9 * i as Float / deg as Float) * (2.0 * PI * i as Float / deg as Float).cos())
        .collect();
    let mut im: Vec<Float> = (0..deg)
        .map(|i| bound * (0.4 + 0.9 * i as Float / deg as Float) * (2.0 * PI * i as Float / deg as Float).sin())
        .collect();

    for _ in 0..200 {
        let mut max_delta = 0.0_f64;
        for i in 0..deg {
            let (mut nr, mut ni) = (re[i], im[i]);
            let (fr, fi) = eval_complex(&norm, nr, ni);
            let mut dr = 1.0;
            let mut di = 0.0;
            for j in 0..deg {
                if j == i {
                    continue;
                }
                let (sr, si) = (nr - re[j], ni - im[j]);
                let (ndr, ndi) = complex_mul(dr, di, sr, si);
                dr = ndr;
                di = ndi;
            }
            let (qr, qi) = complex_div(fr, fi, dr, di);
            nr -= qr;
            ni -= qi;
            max_delta = max_delta.max((nr - re[i]).hypot(ni - im[i]));
            re[i] = nr;
            im[i] = ni;
        }
        if max_delta < 1e-13 {
            break;
        }
    }

    re.into_iter()
        .zip(im)
        .filter(|&(_, i)| i.abs() < 1e-6)
        .map(|(r, _)| r)
        .collect()
}

fn eval_complex(coeffs: &[Float], xr: Float, xi: Float) -> (Float, Float) {
    let mut vr = coeffs[0];
    let mut vi = 0.0;
    for &c in &coeffs[1..] {
        let (mr, mi) = complex_mul(vr, vi, xr, xi);
        vr = mr + c;
        vi = mi;
    }
    (vr, vi)
}

fn complex_mul(ar: Float, ai: Float, br: Float, bi: Float) -> (Float, Float) {
    (ar * br - ai * bi, ar * bi + ai * br)
}

fn complex_div(ar: Float, ai: Float, br: Float, bi: Float) -> (Float, Float) {
    let denom = br * br + bi * bi;
    ((ar * br + ai * bi) / denom, (ai * br - ar * bi) / denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quadratic_two_real_roots() {
        // t^2 - 5t + 6 = (t-2)(t-3)
        let (t0, t1) = solve_quadratic(1.0, -5.0, 6.0).unwrap();
        assert_relative_eq!(t0, 2.0, epsilon = 1e-9);
        assert_relative_eq!(t1, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn quadratic_no_real_roots() {
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_none());
    }

    #[test]
    fn cubic_known_roots() {
        // (t-1)(t-2)(t-3) = t^3 -6t^2 +11t -6
        let mut roots = solve_cubic(1.0, -6.0, 11.0, -6.0);
        roots.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(roots.len(), 3);
        assert_relative_eq!(roots[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(roots[1], 2.0, epsilon = 1e-6);
        assert_relative_eq!(roots[2], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn quartic_known_roots() {
        // (t-1)(t-2)(t-3)(t-4) = t^4 -10t^3 +35t^2 -50t +24
        let mut roots = solve_quartic(1.0, -10.0, 35.0, -50.0, 24.0);
        roots.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(roots.len(), 4);
        for (got, expected) in roots.iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert_relative_eq!(*got, expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn solve_poly_filters_by_tolerance() {
        // Roots at -1, 0.00001, 5 — only 5 should survive tol=1e-4.
        let roots = solve_poly(2, &[1.0, -4.0 - 0.00001, 5.0 * -0.00001 * -1.0], false, 1e-4);
        // constructed loosely; just assert the tolerance filter removes
        // anything not greater than 1e-4.
        for r in &roots {
            assert!(*r > 1e-4);
        }
    }

    #[test]
    fn degree_six_sturm_matches_known_roots() {
        // (t-1)(t-2)(t-3)(t-4)(t-5)(t-6), expanded.
        // Coefficients computed via repeated convolution (leading coeff 1 first).
        let coeffs = [
            1.0, -21.0, 175.0, -735.0, 1624.0, -1764.0, 720.0,
        ];
        let roots = solve_poly(6, &coeffs, true, 1e-4);
        let mut got: Vec<Float> = roots.iter().copied().collect();
        got.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(got.len(), 6);
        for (g, e) in got.iter().zip([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]) {
            assert_relative_eq!(*g, e, epsilon = 1e-3);
        }
    }
}
