//! Transport-friendly serialization for complex matrices and Joint States.

use std::collections::HashMap;

use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use qsi_core::{EngineError, Result};

/// A serialized complex matrix: `matrix[i][j] = [Re, Im]`.
pub type SerializedMatrix = Vec<Vec<[f64; 2]>>;

/// The transport representation of a Joint State produced by
/// [`crate::JointState::to_envelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEnvelope {
    pub dimensions: usize,
    pub state: SerializedMatrix,
    pub state_props: Vec<HashMap<String, String>>,
}

/// Flatten a square complex matrix into its transport form.
pub fn matrix_to_json(matrix: &DMatrix<Complex64>) -> SerializedMatrix {
    (0..matrix.nrows())
        .map(|i| {
            (0..matrix.ncols())
                .map(|j| {
                    let c = matrix[(i, j)];
                    [c.re, c.im]
                })
                .collect()
        })
        .collect()
}

/// Rebuild a square complex matrix from its transport form. Rejects empty
/// matrices and ragged/non-square rows.
pub fn matrix_from_json(rows: &SerializedMatrix) -> Result<DMatrix<Complex64>> {
    if rows.is_empty() {
        return Err(EngineError::malformed_state(
            "empty matrices are disallowed in transport",
        ));
    }
    let side = rows.len();
    for row in rows {
        if row.len() != side {
            return Err(EngineError::malformed_state(
                "serialized matrix is not square",
            ));
        }
    }
    let mut matrix = DMatrix::zeros(side, side);
    for (i, row) in rows.iter().enumerate() {
        for (j, [re, im]) in row.iter().enumerate() {
            matrix[(i, j)] = Complex64::new(*re, *im);
        }
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_small_matrix() {
        let mut m = DMatrix::<Complex64>::zeros(2, 2);
        m[(0, 0)] = Complex64::new(1.0, 0.0);
        m[(1, 1)] = Complex64::new(0.0, -2.5);
        let json = matrix_to_json(&m);
        let back = matrix_from_json(&json).unwrap();
        assert_eq!(m, back);
    }

    #[test]
    fn rejects_empty_matrix() {
        let rows: SerializedMatrix = vec![];
        assert!(matrix_from_json(&rows).is_err());
    }

    #[test]
    fn rejects_ragged_rows() {
        let rows: SerializedMatrix = vec![vec![[0.0, 0.0], [0.0, 0.0]], vec![[0.0, 0.0]]];
        assert!(matrix_from_json(&rows).is_err());
    }
}
