use std::cmp::Ordering;
use thiserror::Error;

/// InputValueError is used if some simulation option or parameter does not fulfill the posed
/// requirements, e.g., a probability outside of [0, 1] or interpolation data of unequal length.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid input value: {0}")]
pub struct InputValueError(pub String);

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. The sort is stable, i.e. equal values
/// keep their original relative order. NaN values compare as equal.
pub fn argsort<T: PartialOrd>(x: &[T], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    match order {
        SortOrder::Ascending => {
            indices.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(Ordering::Equal))
        }
        SortOrder::Descending => {
            indices.sort_by(|&a, &b| x[b].partial_cmp(&x[a]).unwrap_or(Ordering::Equal))
        }
    }
    indices
}

/// lin_interp returns the linearly interpolated value at x for given discrete data points xp, fp.
/// xp must be non-decreasing. Values outside of the data range are clamped to the first/last
/// value of fp. Inspired by numpy.interp.
pub fn lin_interp(x: f64, xp: &[f64], fp: &[f64]) -> Result<f64, InputValueError> {
    if xp.len() != fp.len() {
        return Err(InputValueError(format!(
            "number of items in xp ({}) and fp ({}) must be equal",
            xp.len(),
            fp.len()
        )));
    }

    if xp.is_empty() {
        return Err(InputValueError("interpolation data must not be empty".to_owned()));
    }

    if x <= xp[0] {
        return Ok(fp[0]);
    }

    for i in 1..xp.len() {
        if x <= xp[i] {
            return Ok(fp[i - 1] + (x - xp[i - 1]) * (fp[i] - fp[i - 1]) / (xp[i] - xp[i - 1]));
        }
    }

    Ok(fp[fp.len() - 1])
}
