use crate::error::{BootstrapError, Result};
use nalgebra::{DMatrix, DVector};

/// Solve `J x = rhs`, refusing near-singular systems.
///
/// The reciprocal condition number is the ratio of the smallest to the
/// largest singular value; anything below `threshold`, or a non-finite
/// solution, is reported as `SingularJacobian`.
pub(crate) fn solve_checked(
    jacobian: &DMatrix<f64>,
    rhs: &DVector<f64>,
    threshold: f64,
    context: &'static str,
) -> Result<DVector<f64>> {
    if jacobian.nrows() == 0 {
        return Ok(DVector::zeros(0));
    }

    if jacobian.iter().any(|v| !v.is_finite()) {
        return Err(BootstrapError::SingularJacobian { context, rcond: f64::NAN });
    }

    let singular_values = jacobian.clone().svd(false, false).singular_values;
    let max = singular_values.max();
    let min = singular_values.min();
    let rcond = if max > 0.0 { min / max } else { 0.0 };
    if !rcond.is_finite() || rcond < threshold {
        return Err(BootstrapError::SingularJacobian { context, rcond });
    }

    let step = jacobian
        .clone()
        .lu()
        .solve(rhs)
        .ok_or(BootstrapError::SingularJacobian { context, rcond })?;
    if step.iter().any(|v| !v.is_finite()) {
        return Err(BootstrapError::SingularJacobian { context, rcond });
    }
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solves_regular_system() {
        let j = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let rhs = DVector::from_vec(vec![3.0, 5.0]);
        let x = solve_checked(&j, &rhs, 1e-12, "test").unwrap();
        assert_relative_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_singular_system() {
        let j = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let rhs = DVector::from_vec(vec![1.0, 1.0]);
        assert!(matches!(
            solve_checked(&j, &rhs, 1e-12, "test"),
            Err(BootstrapError::SingularJacobian { context: "test", .. })
        ));
        let nan = DMatrix::from_element(2, 2, f64::NAN);
        assert!(solve_checked(&nan, &rhs, 1e-12, "test").is_err());
    }
}
