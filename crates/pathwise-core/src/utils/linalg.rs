//! Small dense linear algebra over `Vec<Vec<f64>>` matrices.
//!
//! Only the routines the construction itself needs: symmetry checks, a
//! semidefinite-tolerant Cholesky factorization, Jacobi eigenvalues for PSD
//! verification, and triangular solves. Matrices here are tiny (finite index
//! subsets), so clarity wins over blocking or SIMD.

use crate::utils::EPS;
use crate::{PathwiseError, Result};

/// Check square shape, returning the dimension.
pub fn square_dim(m: &[Vec<f64>]) -> Result<usize> {
    let n = m.len();
    if n == 0 {
        return Err(PathwiseError::empty_input("matrix"));
    }
    for row in m {
        if row.len() != n {
            return Err(PathwiseError::DimensionMismatch {
                expected: n,
                actual: row.len(),
            });
        }
    }
    Ok(n)
}

/// First symmetry violation beyond `tol`, if any.
pub fn symmetry_violation(m: &[Vec<f64>], tol: f64) -> Option<(usize, usize, f64)> {
    let n = m.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let gap = (m[i][j] - m[j][i]).abs();
            if gap > tol {
                return Some((i, j, gap));
            }
        }
    }
    None
}

/// Eigenvalues of a symmetric matrix via cyclic Jacobi rotations.
///
/// Converges quadratically for the small matrices used here; iteration stops
/// once the off-diagonal Frobenius norm drops below `EPS` times the diagonal
/// scale, or after a fixed sweep budget.
pub fn symmetric_eigenvalues(m: &[Vec<f64>]) -> Result<Vec<f64>> {
    let n = square_dim(m)?;
    let mut a: Vec<Vec<f64>> = m.to_vec();

    let scale: f64 = (0..n).map(|i| a[i][i].abs()).fold(1.0, f64::max);

    for _sweep in 0..50 {
        let off: f64 = {
            let mut s = 0.0;
            for i in 0..n {
                for j in (i + 1)..n {
                    s += a[i][j] * a[i][j];
                }
            }
            s.sqrt()
        };
        if off <= EPS * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                if a[p][q].abs() <= EPS * scale * 1e-3 {
                    continue;
                }
                // Classic Jacobi rotation annihilating a[p][q].
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
            }
        }
    }

    Ok((0..n).map(|i| a[i][i]).collect())
}

/// Minimum eigenvalue of a symmetric matrix.
pub fn min_eigenvalue(m: &[Vec<f64>]) -> Result<f64> {
    let eigs = symmetric_eigenvalues(m)?;
    Ok(eigs.into_iter().fold(f64::INFINITY, f64::min))
}

/// Semidefinite-tolerant Cholesky factorization `A = L L^T`.
///
/// Accepts singular PSD matrices (e.g. a Gram matrix containing the time 0,
/// whose variance is exactly zero): a pivot within `tol` of zero produces a
/// zero column. A pivot below `-tol` means the matrix is not PSD and is
/// reported, never clamped.
pub fn cholesky_psd(m: &[Vec<f64>], tol: f64) -> Result<Vec<Vec<f64>>> {
    let n = square_dim(m)?;
    let mut l = vec![vec![0.0; n]; n];

    for j in 0..n {
        let mut d = m[j][j];
        for k in 0..j {
            d -= l[j][k] * l[j][k];
        }
        if d < -tol {
            return Err(PathwiseError::invalid_kernel(format!(
                "Cholesky pivot {d:.3e} at index {j} below -{tol:.1e}: matrix is not PSD"
            )));
        }
        if d <= tol {
            // Rank-deficient direction; whole column stays zero.
            continue;
        }
        let ljj = d.sqrt();
        l[j][j] = ljj;
        for i in (j + 1)..n {
            let mut s = m[i][j];
            for k in 0..j {
                s -= l[i][k] * l[j][k];
            }
            l[i][j] = s / ljj;
        }
    }

    Ok(l)
}

/// Forward substitution `L x = b` for lower-triangular `L`.
///
/// Zero pivots (rank-deficient columns from [`cholesky_psd`]) map to zero
/// solution components, which is the minimum-norm choice and exactly right
/// for conditioning on degenerate coordinates.
pub fn solve_lower(l: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>> {
    let n = square_dim(l)?;
    if b.len() != n {
        return Err(PathwiseError::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }
    let mut x = vec![0.0; n];
    for i in 0..n {
        let mut s = b[i];
        for k in 0..i {
            s -= l[i][k] * x[k];
        }
        x[i] = if l[i][i].abs() > EPS { s / l[i][i] } else { 0.0 };
    }
    Ok(x)
}

/// Back substitution `L^T x = b` for lower-triangular `L`.
pub fn solve_lower_transpose(l: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>> {
    let n = square_dim(l)?;
    if b.len() != n {
        return Err(PathwiseError::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut s = b[i];
        for k in (i + 1)..n {
            s -= l[k][i] * x[k];
        }
        x[i] = if l[i][i].abs() > EPS { s / l[i][i] } else { 0.0 };
    }
    Ok(x)
}

/// Solve `A x = b` given the Cholesky factor `L` of `A`.
pub fn solve_spd(l: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>> {
    let y = solve_lower(l, b)?;
    solve_lower_transpose(l, &y)
}

/// Matrix-vector product.
pub fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn test_symmetry_violation() {
        let m = vec![vec![1.0, 0.5], vec![0.5, 2.0]];
        assert!(symmetry_violation(&m, 1e-12).is_none());

        let m = vec![vec![1.0, 0.5], vec![0.4, 2.0]];
        let (i, j, gap) = symmetry_violation(&m, 1e-12).unwrap();
        assert_eq!((i, j), (0, 1));
        assert!(approx_eq(gap, 0.1));
    }

    #[test]
    fn test_eigenvalues_diagonal() {
        let m = vec![vec![3.0, 0.0], vec![0.0, 1.0]];
        let mut eigs = symmetric_eigenvalues(&m).unwrap();
        eigs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!(approx_eq(eigs[0], 1.0));
        assert!(approx_eq(eigs[1], 3.0));
    }

    #[test]
    fn test_eigenvalues_2x2() {
        // Eigenvalues of [[2,1],[1,2]] are 1 and 3.
        let m = vec![vec![2.0, 1.0], vec![1.0, 2.0]];
        let mut eigs = symmetric_eigenvalues(&m).unwrap();
        eigs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!(approx_eq(eigs[0], 1.0));
        assert!(approx_eq(eigs[1], 3.0));
    }

    #[test]
    fn test_min_eigenvalue_indefinite() {
        let m = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let min = min_eigenvalue(&m).unwrap();
        assert!(approx_eq(min, -1.0));
    }

    #[test]
    fn test_cholesky_roundtrip() {
        let m = vec![
            vec![4.0, 2.0, 0.0],
            vec![2.0, 5.0, 1.0],
            vec![0.0, 1.0, 3.0],
        ];
        let l = cholesky_psd(&m, 1e-12).unwrap();
        // Reconstruct L L^T and compare.
        for i in 0..3 {
            for j in 0..3 {
                let v: f64 = (0..3).map(|k| l[i][k] * l[j][k]).sum();
                assert!(approx_eq(v, m[i][j]), "mismatch at ({i},{j}): {v}");
            }
        }
    }

    #[test]
    fn test_cholesky_singular_psd() {
        // Brownian Gram matrix including t = 0: first row/col all zero.
        let m = vec![
            vec![0.0, 0.0, 0.0],
            vec![0.0, 1.0, 1.0],
            vec![0.0, 1.0, 2.0],
        ];
        let l = cholesky_psd(&m, 1e-12).unwrap();
        assert_eq!(l[0][0], 0.0);
        assert!(approx_eq(l[1][1], 1.0));
    }

    #[test]
    fn test_cholesky_rejects_negative() {
        let m = vec![vec![1.0, 2.0], vec![2.0, 1.0]]; // eigenvalues -1, 3
        assert!(cholesky_psd(&m, 1e-12).is_err());
    }

    #[test]
    fn test_solve_spd() {
        let m = vec![vec![4.0, 2.0], vec![2.0, 5.0]];
        let l = cholesky_psd(&m, 1e-12).unwrap();
        let b = vec![8.0, 9.0];
        let x = solve_spd(&l, &b).unwrap();
        let back = mat_vec(&m, &x);
        assert!(approx_eq(back[0], 8.0));
        assert!(approx_eq(back[1], 9.0));
    }
}
