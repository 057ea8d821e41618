//! Mixed-radix counter over a bounded lattice.

/// Visits every vector `v` with `v[i] <= bounds[i]`.
///
/// Starts one step before the zero vector; each [`advance`](Self::advance)
/// increments digit 0 and carries into the next digit on overflow. The walk
/// ends when the most significant digit overflows.
#[derive(Debug, Clone)]
pub struct Odometer {
    bounds: Vec<u32>,
    digits: Vec<u32>,
    primed: bool,
    done: bool,
}

impl Odometer {
    /// Counter positioned just before the zero vector.
    pub fn new(bounds: &[u32]) -> Self {
        Self {
            bounds: bounds.to_vec(),
            digits: vec![0; bounds.len()],
            primed: true,
            done: false,
        }
    }

    /// Step to the next point; `None` once every point has been visited.
    pub fn advance(&mut self) -> Option<&[u32]> {
        if self.done {
            return None;
        }
        if self.primed {
            self.primed = false;
            return Some(&self.digits);
        }
        for i in 0..self.digits.len() {
            if self.digits[i] < self.bounds[i] {
                self.digits[i] += 1;
                return Some(&self.digits);
            }
            self.digits[i] = 0;
        }
        self.done = true;
        None
    }

    /// Whether every point has been visited.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::Lattice;

    #[test]
    fn visits_points_in_flat_index_order() {
        let bounds = [1, 2];
        let lattice = Lattice::new(&bounds).unwrap();
        let mut odometer = Odometer::new(&bounds);

        let mut visited = Vec::new();
        while let Some(point) = odometer.advance() {
            visited.push(point.to_vec());
            assert_eq!(lattice.index_of(point), visited.len() - 1);
        }

        assert_eq!(
            visited,
            vec![
                vec![0, 0],
                vec![1, 0],
                vec![0, 1],
                vec![1, 1],
                vec![0, 2],
                vec![1, 2]
            ]
        );
        assert!(odometer.is_done());
        assert!(odometer.advance().is_none());
    }

    #[test]
    fn zero_dimensional_lattice_has_one_point() {
        let mut odometer = Odometer::new(&[]);
        assert_eq!(odometer.advance(), Some(&[][..]));
        assert!(odometer.advance().is_none());
    }

    #[test]
    fn zero_bounds_are_skipped_by_carry() {
        let mut odometer = Odometer::new(&[0, 1]);
        let mut count = 0;
        while odometer.advance().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
