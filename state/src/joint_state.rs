//! The Joint State: a multipartite density-matrix container.

use nalgebra::DMatrix;
use num_complex::Complex64;
use uuid::Uuid;

use qsi_core::{EngineError, Result, SubsystemDescriptor};

use crate::envelope::{matrix_from_json, matrix_to_json, StateEnvelope};

/// Per-factor strides for addressing a flattened index, factor 0 outermost
/// (row-major), as described for `props`/`rho` in the data model: strides
/// `(D/d0, D/(d0 d1), ..., 1)`.
fn strides(truncations: &[usize]) -> Vec<usize> {
    let k = truncations.len();
    let mut s = vec![1usize; k];
    for j in (0..k.saturating_sub(1)).rev() {
        s[j] = s[j + 1] * truncations[j + 1];
    }
    s
}

/// Extract factor `pos`'s digit from a flattened index.
fn digit(idx: usize, pos: usize, strides: &[usize], truncations: &[usize]) -> usize {
    (idx / strides[pos]) % truncations[pos]
}

/// A multipartite density matrix together with the ordered descriptors of
/// the factors it is built from.
#[derive(Debug, Clone)]
pub struct JointState {
    props: Vec<SubsystemDescriptor>,
    rho: DMatrix<Complex64>,
}

impl JointState {
    /// Construct a state with a single factor, initialized to the ground
    /// state `|0><0|` in that factor's truncation.
    pub fn ground(desc: SubsystemDescriptor) -> Self {
        let d = desc.truncation();
        let mut rho = DMatrix::zeros(d, d);
        rho[(0, 0)] = Complex64::new(1.0, 0.0);
        Self {
            props: vec![desc],
            rho,
        }
    }

    /// Rebuild a Joint State from a serialized envelope. Fails with
    /// [`EngineError::MalformedState`] if the matrix side disagrees with
    /// the product of the descriptors' truncations, or if a descriptor is
    /// unreadable.
    pub fn from_envelope(env: &StateEnvelope) -> Result<Self> {
        let rho = matrix_from_json(&env.state)?;
        if rho.nrows() != env.dimensions || rho.ncols() != env.dimensions {
            return Err(EngineError::malformed_state(
                "envelope dimensions disagree with the serialized matrix side",
            ));
        }
        let props: Vec<SubsystemDescriptor> = env
            .state_props
            .iter()
            .map(SubsystemDescriptor::from_dict)
            .collect::<Result<_>>()?;
        let expected: usize = props.iter().map(|d| d.truncation()).product();
        if expected != env.dimensions {
            return Err(EngineError::malformed_state(format!(
                "side {} does not match the product of descriptor truncations {}",
                env.dimensions, expected
            )));
        }
        Ok(Self { props, rho })
    }

    pub fn props(&self) -> &[SubsystemDescriptor] {
        &self.props
    }

    pub fn rho(&self) -> &DMatrix<Complex64> {
        &self.rho
    }

    /// Side length of `rho`, equal to the product of the factor
    /// truncations.
    pub fn side(&self) -> usize {
        self.rho.nrows()
    }

    fn truncations(&self) -> Vec<usize> {
        self.props.iter().map(|d| d.truncation()).collect()
    }

    /// Compose with `other` in place: `rho <- rho ⊗ other.rho`, `props <-
    /// props ++ other.props`. Consumes `other`; using it afterwards is a
    /// logic error on the caller's part, not something this engine can
    /// prevent.
    pub fn compose(&mut self, other: Self) -> Result<()> {
        for desc in &other.props {
            if self.props.iter().any(|d| d.id() == desc.id()) {
                return Err(EngineError::duplicate_subsystem(desc.id().to_string()));
            }
        }
        self.rho = self.rho.kronecker(&other.rho);
        self.props.extend(other.props);
        Ok(())
    }

    /// Look up a descriptor by id.
    pub fn get(&self, id: Uuid) -> Result<&SubsystemDescriptor> {
        self.props
            .iter()
            .find(|d| d.id() == id)
            .ok_or_else(|| EngineError::unknown_subsystem(id.to_string()))
    }

    /// Best-effort lookup of several ids, preserving input order and
    /// silently skipping ids that are not present.
    pub fn get_all(&self, ids: &[Uuid]) -> Vec<SubsystemDescriptor> {
        ids.iter().filter_map(|id| self.get(*id).ok().cloned()).collect()
    }

    fn position_of(&self, id: Uuid) -> Option<usize> {
        self.props.iter().position(|d| d.id() == id)
    }

    /// Permute the factor order so the given descriptors appear first, in
    /// the order given, followed by the remaining descriptors in their
    /// original relative order. Preserves the physical state exactly.
    pub fn reorder(&mut self, target_prefix: &[SubsystemDescriptor]) -> Result<()> {
        let mut positions = Vec::with_capacity(target_prefix.len());
        for desc in target_prefix {
            let pos = self
                .position_of(desc.id())
                .ok_or_else(|| EngineError::unknown_subsystem(desc.id().to_string()))?;
            positions.push(pos);
        }
        let prefix_set: Vec<usize> = positions.clone();
        let mut new_order: Vec<usize> = positions;
        for (pos, _) in self.props.iter().enumerate() {
            if !prefix_set.contains(&pos) {
                new_order.push(pos);
            }
        }

        let old_truncations = self.truncations();
        let old_strides = strides(&old_truncations);
        let new_truncations: Vec<usize> = new_order.iter().map(|&p| old_truncations[p]).collect();
        let new_strides = strides(&new_truncations);
        let d = self.side();

        let mut new_rho = DMatrix::<Complex64>::zeros(d, d);
        for new_row in 0..d {
            for new_col in 0..d {
                let mut old_row = 0usize;
                let mut old_col = 0usize;
                for (new_pos, &old_pos) in new_order.iter().enumerate() {
                    let dig_row = digit(new_row, new_pos, &new_strides, &new_truncations);
                    let dig_col = digit(new_col, new_pos, &new_strides, &new_truncations);
                    old_row += dig_row * old_strides[old_pos];
                    old_col += dig_col * old_strides[old_pos];
                }
                new_rho[(new_row, new_col)] = self.rho[(old_row, old_col)];
            }
        }

        self.rho = new_rho;
        self.props = new_order.into_iter().map(|p| self.props[p].clone()).collect();
        Ok(())
    }

    /// Apply `sum_i K_i rho K_i^dagger`, where each `K_i` acts as the
    /// identity on every factor not in `targets` and as given on the
    /// factor product (in the order of `targets`) otherwise. `props` is
    /// unchanged: each `K_i` is embedded into the full space by
    /// multi-index substitution rather than by reordering factors first.
    pub fn apply_channel(
        &mut self,
        kraus_list: &[DMatrix<Complex64>],
        targets: &[SubsystemDescriptor],
    ) -> Result<()> {
        let mut target_positions = Vec::with_capacity(targets.len());
        for t in targets {
            let pos = self
                .position_of(t.id())
                .ok_or_else(|| EngineError::unknown_subsystem(t.id().to_string()))?;
            target_positions.push(pos);
        }
        let target_truncations: Vec<usize> = targets.iter().map(|d| d.truncation()).collect();
        let target_strides = strides(&target_truncations);
        let dt: usize = target_truncations.iter().product();

        for k in kraus_list {
            if k.nrows() != dt || k.ncols() != dt {
                return Err(EngineError::channel_mismatch(format!(
                    "kraus operator has side {} but targets require {}",
                    k.nrows(),
                    dt
                )));
            }
        }

        let truncations = self.truncations();
        let full_strides = strides(&truncations);
        let d = self.side();
        let k = self.props.len();
        let is_target: Vec<bool> = (0..k).map(|p| target_positions.contains(&p)).collect();

        let target_of = |full_idx: usize| -> usize {
            let mut t = 0usize;
            for (j, &pos) in target_positions.iter().enumerate() {
                let dig = digit(full_idx, pos, &full_strides, &truncations);
                t += dig * target_strides[j];
            }
            t
        };

        let rest_matches = |row: usize, col: usize| -> bool {
            (0..k).all(|pos| {
                is_target[pos]
                    || digit(row, pos, &full_strides, &truncations)
                        == digit(col, pos, &full_strides, &truncations)
            })
        };

        let mut accumulated = DMatrix::<Complex64>::zeros(d, d);
        for k_op in kraus_list {
            let mut embedded = DMatrix::<Complex64>::zeros(d, d);
            for row in 0..d {
                for col in 0..d {
                    if !rest_matches(row, col) {
                        continue;
                    }
                    let row_t = target_of(row);
                    let col_t = target_of(col);
                    let amplitude = k_op[(row_t, col_t)];
                    if amplitude != Complex64::new(0.0, 0.0) {
                        embedded[(row, col)] = amplitude;
                    }
                }
            }
            accumulated += &embedded * &self.rho * embedded.adjoint();
        }

        self.rho = accumulated;
        Ok(())
    }

    /// Return the reduced density matrix over the ordered descriptor list
    /// `keep`, without modifying `self`.
    pub fn reduce(&self, keep: &[SubsystemDescriptor]) -> Result<DMatrix<Complex64>> {
        let mut keep_positions = Vec::with_capacity(keep.len());
        for desc in keep {
            let pos = self
                .position_of(desc.id())
                .ok_or_else(|| EngineError::unknown_subsystem(desc.id().to_string()))?;
            keep_positions.push(pos);
        }

        let truncations = self.truncations();
        let full_strides = strides(&truncations);
        let k = self.props.len();
        let is_kept: Vec<bool> = (0..k).map(|p| keep_positions.contains(&p)).collect();

        let trace_positions: Vec<usize> = (0..k).filter(|&p| !is_kept[p]).collect();
        let trace_truncations: Vec<usize> =
            trace_positions.iter().map(|&p| truncations[p]).collect();
        let trace_strides = strides(&trace_truncations);
        let trace_count: usize = trace_truncations.iter().product();

        let keep_truncations: Vec<usize> = keep.iter().map(|d| d.truncation()).collect();
        let keep_strides = strides(&keep_truncations);
        let dk: usize = keep_truncations.iter().product();

        let full_index = |keep_flat: usize, trace_flat: usize| -> usize {
            let mut out = 0usize;
            for (j, &pos) in keep_positions.iter().enumerate() {
                let dig = digit(keep_flat, j, &keep_strides, &keep_truncations);
                out += dig * full_strides[pos];
            }
            for (j, &pos) in trace_positions.iter().enumerate() {
                let dig = digit(trace_flat, j, &trace_strides, &trace_truncations);
                out += dig * full_strides[pos];
            }
            out
        };

        let mut out = DMatrix::<Complex64>::zeros(dk, dk);
        for row_k in 0..dk {
            for col_k in 0..dk {
                let mut sum = Complex64::new(0.0, 0.0);
                for t in 0..trace_count {
                    let row_full = full_index(row_k, t);
                    let col_full = full_index(col_k, t);
                    sum += self.rho[(row_full, col_full)];
                }
                out[(row_k, col_k)] = sum;
            }
        }
        Ok(out)
    }

    /// Produce the transport representation:
    /// `{dimensions: D, state: <serialized matrix>, state_props: [desc.to_dict()]}`.
    pub fn to_envelope(&self) -> StateEnvelope {
        StateEnvelope {
            dimensions: self.side(),
            state: matrix_to_json(&self.rho),
            state_props: self.props.iter().map(|d| d.to_dict()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qsi_core::{Polarization, SubsystemKind};

    fn light(d: usize) -> SubsystemDescriptor {
        SubsystemDescriptor::new(SubsystemKind::Light, d, Some(1550.0), Some(Polarization::R))
            .unwrap()
    }

    fn internal(d: usize) -> SubsystemDescriptor {
        SubsystemDescriptor::new(SubsystemKind::Internal, d, None, None).unwrap()
    }

    #[test]
    fn single_mode_creation() {
        let desc = light(3);
        let state = JointState::ground(desc);
        assert_eq!(state.side(), 3);
        assert_eq!(state.rho()[(0, 0)], Complex64::new(1.0, 0.0));
        for i in 0..3 {
            for j in 0..3 {
                if (i, j) != (0, 0) {
                    assert_eq!(state.rho()[(i, j)], Complex64::new(0.0, 0.0));
                }
            }
        }
    }

    #[test]
    fn composition_and_reorder() {
        let a = internal(2);
        let b = internal(3);
        let a_id = a.id();
        let b_id = b.id();

        let mut state_a = JointState::ground(a.clone());
        state_a.rho[(0, 0)] = Complex64::new(0.0, 0.0);
        state_a.rho[(1, 1)] = Complex64::new(1.0, 0.0);

        let state_b = JointState::ground(b.clone());
        state_a.compose(state_b).unwrap();

        assert_eq!(state_a.side(), 6);
        assert_eq!(state_a.rho()[(3, 3)], Complex64::new(1.0, 0.0));

        state_a.reorder(&[state_a.get(b_id).unwrap().clone(), state_a.get(a_id).unwrap().clone()]).unwrap();
        assert_eq!(state_a.rho()[(1, 1)], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn x_on_first_factor() {
        let a = internal(2);
        let b = internal(3);
        let a_desc = a.clone();
        let mut state = JointState::ground(a);
        state.compose(JointState::ground(b)).unwrap();

        let x = DMatrix::from_row_slice(
            2,
            2,
            &[
                Complex64::new(0.0, 0.0),
                Complex64::new(1.0, 0.0),
                Complex64::new(1.0, 0.0),
                Complex64::new(0.0, 0.0),
            ],
        );
        state.apply_channel(&[x], &[a_desc]).unwrap();

        for i in 0..6 {
            for j in 0..6 {
                let expected = if i == 3 && j == 3 {
                    Complex64::new(1.0, 0.0)
                } else {
                    Complex64::new(0.0, 0.0)
                };
                assert_eq!(state.rho()[(i, j)], expected);
            }
        }
    }

    #[test]
    fn identity_channel_leaves_state_unchanged() {
        let a = internal(2);
        let b = internal(3);
        let c = internal(2);
        let a_desc = a.clone();
        let mut state = JointState::ground(a);
        state.compose(JointState::ground(b)).unwrap();
        state.compose(JointState::ground(c)).unwrap();

        let before = state.rho().clone();
        let identity = DMatrix::<Complex64>::identity(2, 2);
        state.apply_channel(&[identity], &[a_desc]).unwrap();
        assert_relative_eq!(
            state.rho().iter().map(|c| c.norm()).sum::<f64>(),
            before.iter().map(|c| c.norm()).sum::<f64>(),
            epsilon = 1e-12
        );
        assert_eq!(state.rho(), &before);
    }

    #[test]
    fn partial_trace_on_product_ground_state() {
        let a = internal(2);
        let b = internal(3);
        let b_desc = b.clone();
        let mut state = JointState::ground(a);
        state.compose(JointState::ground(b)).unwrap();

        let reduced = state.reduce(&[b_desc]).unwrap();
        assert_eq!(reduced.nrows(), 2);
        assert_relative_eq!(reduced[(0, 0)].re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(reduced[(1, 1)].re, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn reduce_to_all_props_is_a_copy_of_rho() {
        let a = internal(2);
        let b = internal(3);
        let mut state = JointState::ground(a.clone());
        state.compose(JointState::ground(b.clone())).unwrap();
        let full = state.reduce(&[a, b]).unwrap();
        assert_eq!(&full, state.rho());
    }

    #[test]
    fn envelope_round_trip() {
        let a = internal(2);
        let b = internal(3);
        let mut state = JointState::ground(a);
        state.compose(JointState::ground(b)).unwrap();

        let env = state.to_envelope();
        let restored = JointState::from_envelope(&env).unwrap();
        assert_eq!(restored.props().len(), state.props().len());
        for (x, y) in state.props().iter().zip(restored.props().iter()) {
            assert_eq!(x.id(), y.id());
        }
        assert_eq!(state.rho(), restored.rho());
    }

    #[test]
    fn from_envelope_rejects_dimension_mismatch() {
        let a = internal(2);
        let state = JointState::ground(a);
        let mut env = state.to_envelope();
        env.dimensions = 5;
        assert!(JointState::from_envelope(&env).is_err());
    }

    #[test]
    fn envelope_round_trip_with_random_hermitian_rho() {
        use rand::Rng;

        let a = internal(2);
        let b = internal(3);
        let mut state = JointState::ground(a);
        state.compose(JointState::ground(b)).unwrap();

        let d = state.side();
        let mut rng = rand::thread_rng();
        let mut rho = DMatrix::<Complex64>::zeros(d, d);
        for i in 0..d {
            for j in i..d {
                let re: f64 = rng.gen_range(-1.0..1.0);
                let im: f64 = if i == j { 0.0 } else { rng.gen_range(-1.0..1.0) };
                rho[(i, j)] = Complex64::new(re, im);
                rho[(j, i)] = Complex64::new(re, -im);
            }
        }
        state.rho = rho.clone();

        let env = state.to_envelope();
        let restored = JointState::from_envelope(&env).unwrap();
        for i in 0..d {
            for j in 0..d {
                assert_relative_eq!(restored.rho()[(i, j)].re, rho[(i, j)].re, epsilon = 1e-15);
                assert_relative_eq!(restored.rho()[(i, j)].im, rho[(i, j)].im, epsilon = 1e-15);
            }
        }
        for (x, y) in state.props().iter().zip(restored.props().iter()) {
            assert_eq!(x.id(), y.id());
        }
    }

    #[test]
    fn compose_rejects_duplicate_ids() {
        let a = internal(2);
        let state_a = JointState::ground(a.clone());
        let mut state_b = JointState::ground(a);
        assert!(state_b.compose(state_a).is_err());
    }
}
