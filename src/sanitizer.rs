use crate::types::{NEG_INF_REPLACEMENT, POS_INF_REPLACEMENT};

/// NaN -> 0.0, +inf -> 1e10, -inf -> -1e10. Los valores finitos no cambian.
#[inline]
pub fn clean_value(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else if v == f64::INFINITY {
        POS_INF_REPLACEMENT
    } else if v == f64::NEG_INFINITY {
        NEG_INF_REPLACEMENT
    } else {
        v
    }
}

/// Copia limpia de un vector de características
pub fn clean(vector: &[f64]) -> Vec<f64> {
    vector.iter().copied().map(clean_value).collect()
}

pub fn clean_in_place(vector: &mut [f64]) {
    for v in vector.iter_mut() {
        *v = clean_value(*v);
    }
}

/// Versión por filas para matrices de entrenamiento
pub fn clean_matrix(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    rows.iter().map(|row| clean(row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_non_finite_values() {
        let v = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1.5, -0.0];
        assert_eq!(clean(&v), vec![0.0, 1e10, -1e10, 1.5, -0.0]);
    }

    #[test]
    fn clean_is_idempotent() {
        let v = [f64::NAN, 3.0, f64::INFINITY, f64::MAX, f64::NEG_INFINITY, f64::MIN_POSITIVE];
        let once = clean(&v);
        let twice = clean(&once);
        assert_eq!(once, twice);
        assert!(once.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn in_place_matches_copy() {
        let mut v = vec![f64::NAN, 2.0, f64::NEG_INFINITY];
        let copy = clean(&v);
        clean_in_place(&mut v);
        assert_eq!(v, copy);
    }

    #[test]
    fn matrix_is_cleaned_row_by_row() {
        let m = vec![vec![f64::NAN, 1.0], vec![2.0, f64::INFINITY]];
        assert_eq!(clean_matrix(&m), vec![vec![0.0, 1.0], vec![2.0, 1e10]]);
    }
}
