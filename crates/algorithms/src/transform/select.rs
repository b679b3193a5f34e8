//! Index selection along one axis

use geolearn_core::{Error, Result};
use ndarray::{Array, ArrayView, Axis, RemoveAxis};

/// Keep `indices` along `axis`, preserving their order.
///
/// Position `j` of the output axis holds index `indices[j]` of the input,
/// so repeated or reordered indices are allowed.
///
/// # Errors
/// - `InvalidParameter` if `axis` is out of range or `indices` is empty
/// - `IndexOutOfRange` if any index exceeds the axis length
pub fn select_indices<A, D>(array: ArrayView<'_, A, D>, axis: Axis, indices: &[usize]) -> Result<Array<A, D>>
where
    A: Clone,
    D: RemoveAxis,
{
    if axis.index() >= array.ndim() {
        return Err(Error::invalid_parameter(
            "axis",
            axis.index(),
            format!("array has {} dimensions", array.ndim()),
        ));
    }
    if indices.is_empty() {
        return Err(Error::invalid_parameter("indices", "[]", "at least one index is required"));
    }
    let len = array.len_of(axis);
    if let Some(&bad) = indices.iter().find(|&&i| i >= len) {
        return Err(Error::IndexOutOfRange { index: bad, len });
    }
    Ok(array.select(axis, indices))
}
