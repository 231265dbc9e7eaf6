//! Conversions between ndarray and nalgebra containers.
//!
//! Vectors and Jacobians are carried as ndarray arrays throughout the crate;
//! the dense decompositions (Cholesky, LU, SVD) come from nalgebra.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

/// Convert an ndarray Array2 to a nalgebra DMatrix.
pub fn ndarray_to_nalgebra(arr: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(arr.nrows(), arr.ncols(), |i, j| arr[[i, j]])
}

/// Convert an ndarray Array1 to a nalgebra DVector.
pub fn ndarray_vec_to_nalgebra(arr: &Array1<f64>) -> DVector<f64> {
    DVector::from_iterator(arr.len(), arr.iter().copied())
}

/// Convert a nalgebra DVector to an ndarray Array1.
pub fn nalgebra_vec_to_ndarray(vec: &DVector<f64>) -> Array1<f64> {
    vec.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_matrix_layout_is_preserved() {
        let arr = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let mat = ndarray_to_nalgebra(&arr);

        assert_eq!(mat.nrows(), 2);
        assert_eq!(mat.ncols(), 3);
        for ((i, j), v) in arr.indexed_iter() {
            assert_eq!(mat[(i, j)], *v);
        }
    }

    #[test]
    fn test_vector_round_trip() {
        let arr = array![1.0, -2.0, 3.5];
        let vec = ndarray_vec_to_nalgebra(&arr);
        assert_eq!(vec.len(), 3);
        assert_eq!(vec[1], -2.0);
        assert_eq!(nalgebra_vec_to_ndarray(&vec), arr);
    }

    #[test]
    fn test_empty_matrix() {
        let arr = Array2::<f64>::zeros((0, 4));
        let mat = ndarray_to_nalgebra(&arr);
        assert_eq!(mat.shape(), (0, 4));
    }
}
