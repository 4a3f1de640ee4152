//! Console formatting.
//!
//! Kept in one place so wording changes stay local and tests can pin the format.

use crate::report::Evaluation;

/// The stdout line reported for each regressor.
pub fn format_mae_line(regressor: &str, mae: Option<f64>) -> String {
    match mae {
        Some(mae) => format!("Facebook Prophet MAE ({regressor}): {mae:.2}"),
        None => format!("Facebook Prophet MAE ({regressor}): n/a (empty test set)"),
    }
}

/// Multi-line diagnostic summary for one evaluation (logged at debug level).
pub fn format_model_summary(eval: &Evaluation) -> String {
    let m = &eval.model;
    let mut out = String::new();
    out.push_str(&format!(
        "{}: train={} test={} iterations={}{}\n",
        eval.regressor,
        eval.n_train,
        eval.n_test,
        m.iterations,
        if m.converged { "" } else { " (not converged)" }
    ));
    out.push_str(&format!(
        "  trend: k={:.6} m={:.6} changepoints={}\n",
        m.k,
        m.m,
        m.changepoints.len()
    ));
    out.push_str(&format!(
        "  regressor: beta={:.6} mu={:.4} std={:.4}\n",
        m.regressor_beta, m.regressor.mu, m.regressor.std
    ));
    out.push_str(&format!("  sigma_obs={:.6} y_scale={:.4}", m.sigma_obs, m.y_scale));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mae_line_has_two_decimals() {
        assert_eq!(format_mae_line("GDP", Some(1.23456)), "Facebook Prophet MAE (GDP): 1.23");
        assert_eq!(format_mae_line("Schooling", Some(0.0051)), "Facebook Prophet MAE (Schooling): 0.01");
    }

    #[test]
    fn empty_test_set_reports_undefined() {
        assert_eq!(format_mae_line("GDP", None), "Facebook Prophet MAE (GDP): n/a (empty test set)");
    }
}
