//! Requirement lattice
//!
//! The state space of one computation is every requirement vector `v` with
//! `0 <= v[i] <= root[i]`. Points are addressed by a mixed-radix flat index
//! with digit 0 least significant, which is also the odometer visiting
//! order.

mod odometer;

pub use odometer::Odometer;

use std::ops::Deref;

/// Remaining required amount of every reward, one slot per reward id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequirementVector(Vec<u32>);

impl RequirementVector {
    /// Wrap dense per-reward amounts.
    pub fn new(amounts: Vec<u32>) -> Self {
        Self(amounts)
    }

    /// Vector requiring nothing.
    pub fn zeros(len: usize) -> Self {
        Self(vec![0; len])
    }

    /// Whether nothing remains to be collected.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }

    /// Number of rewards still required.
    pub fn nonzero_count(&self) -> usize {
        self.0.iter().filter(|&&n| n > 0).count()
    }

    /// Requirement left after a bundle is granted, floored at zero.
    pub fn reduced(&self, bundle: &[u32]) -> Self {
        let mut out = vec![0; self.0.len()];
        reduce_into(&self.0, bundle, &mut out);
        Self(out)
    }

    /// The same vector with one more unit required on `axis`.
    pub fn incremented(&self, axis: usize) -> Self {
        let mut amounts = self.0.clone();
        amounts[axis] += 1;
        Self(amounts)
    }
}

impl Deref for RequirementVector {
    type Target = [u32];

    fn deref(&self) -> &[u32] {
        &self.0
    }
}

/// Write `max(requirement - bundle, 0)` into `out`.
pub fn reduce_into(requirement: &[u32], bundle: &[u32], out: &mut [u32]) {
    for ((slot, &needed), &granted) in out.iter_mut().zip(requirement).zip(bundle) {
        *slot = needed.saturating_sub(granted);
    }
}

/// Shape of the lattice below a root requirement.
#[derive(Debug, Clone)]
pub struct Lattice {
    /// Inclusive upper bound per dimension (the root requirement)
    bounds: Vec<u32>,
    /// Flat-index weight per dimension
    strides: Vec<usize>,
    /// Number of points, `prod(bounds[i] + 1)`
    size: usize,
}

impl Lattice {
    /// Lattice of every vector componentwise below `root`.
    ///
    /// Returns `None` when the number of points does not fit in `usize`.
    pub fn new(root: &[u32]) -> Option<Self> {
        let mut strides = Vec::with_capacity(root.len());
        let mut size = 1usize;
        for &bound in root {
            strides.push(size);
            size = size.checked_mul(bound as usize + 1)?;
        }
        Some(Self {
            bounds: root.to_vec(),
            strides,
            size,
        })
    }

    /// Number of lattice points.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.bounds.len()
    }

    /// Inclusive upper bound per dimension.
    pub fn bounds(&self) -> &[u32] {
        &self.bounds
    }

    /// Flat index of a point.
    pub fn index_of(&self, point: &[u32]) -> usize {
        debug_assert!(self.contains(point));
        point
            .iter()
            .zip(&self.strides)
            .map(|(&digit, &stride)| digit as usize * stride)
            .sum()
    }

    /// Decode a flat index into `out`.
    pub fn coords_into(&self, mut index: usize, out: &mut Vec<u32>) {
        out.clear();
        for &bound in &self.bounds {
            let radix = bound as usize + 1;
            out.push((index % radix) as u32);
            index /= radix;
        }
    }

    /// Flat index of the root requirement (the largest point).
    pub fn root_index(&self) -> usize {
        self.size - 1
    }

    /// Whether `point` lies inside the lattice.
    pub fn contains(&self, point: &[u32]) -> bool {
        point.len() == self.bounds.len() && point.iter().zip(&self.bounds).all(|(v, b)| v <= b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_product_of_radices() {
        let lattice = Lattice::new(&[1, 2, 3]).unwrap();
        assert_eq!(lattice.size(), 2 * 3 * 4);
        assert_eq!(lattice.root_index(), 23);
        assert_eq!(lattice.index_of(&[1, 2, 3]), 23);
    }

    #[test]
    fn index_round_trips_through_coords() {
        let lattice = Lattice::new(&[2, 0, 4]).unwrap();
        let mut coords = Vec::new();
        for index in 0..lattice.size() {
            lattice.coords_into(index, &mut coords);
            assert_eq!(lattice.index_of(&coords), index);
        }
    }

    #[test]
    fn overflowing_lattice_is_rejected() {
        assert!(Lattice::new(&[u32::MAX; 4]).is_none());
    }

    #[test]
    fn reduction_floors_at_zero() {
        let r = RequirementVector::new(vec![3, 1, 0]);
        assert_eq!(&*r.reduced(&[1, 2, 1]), &[2, 0, 0]);
        assert_eq!(r.nonzero_count(), 2);
        assert!(RequirementVector::zeros(3).is_zero());
    }
}
