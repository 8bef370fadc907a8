use itertools::iproduct;
use log::debug;
use rayon::prelude::*;

use super::{
    DataCollection, DataError, DataKind, Pos, PropertyStore, PropertyValues, Shared,
    SimulationCell, StandardType, Vector3f,
};

/// One record produced by a neighbor query.
///
/// The same neighbor index may recur with distinct delta/shift values when
/// several periodic images of a particle fall within the cutoff, and in a
/// sufficiently small periodic cell the center is among its own neighbors.
/// This is by design.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Index of the neighbor particle (0-based).
    pub index: usize,
    /// Vector from the center to this neighbor image.
    pub delta: Vector3f,
    pub distance_squared: f32,
    /// How often each periodic cell boundary is crossed when going from the
    /// center to this neighbor image.
    pub pbc_shift: [i32; 3],
}

impl Neighbor {
    pub fn distance(&self) -> f32 {
        self.distance_squared.sqrt()
    }
}

/// Finds all particles within a cutoff radius of a center particle,
/// including periodic images.
///
/// Holds shared references to the position store and the cell, so the
/// particle data stays alive (and unchanged, thanks to copy-on-write
/// sharing) for the finder's lifetime. A query is started per center index
/// with [find](Self::find); the returned iterator is consumed by exhaustion
/// and a fresh `find` call is needed for the next center.
pub struct CutoffNeighborFinder {
    cutoff: f32,
    cutoff2: f32,
    positions: Shared<PropertyStore>,
    cell: Shared<SimulationCell>,
    // All periodic image shifts that can bring a particle within the
    // cutoff, with their precomputed cartesian offsets.
    image_shifts: Vec<([i32; 3], Vector3f)>,
    row_count: usize,
}

impl CutoffNeighborFinder {
    /// Validates the inputs and precomputes the periodic image shifts to
    /// visit. The shift range per dimension is derived from the distance
    /// between the cell's periodic faces.
    pub fn prepare(
        cutoff: f32,
        positions: Shared<PropertyStore>,
        cell: Shared<SimulationCell>,
    ) -> Result<Self, DataError> {
        if !(cutoff > 0.0) {
            return Err(DataError::InvalidArgument(format!(
                "cutoff must be positive, got {cutoff}"
            )));
        }
        if positions.data_kind() != DataKind::Float || positions.component_count() != 3 {
            return Err(DataError::InvalidArgument(format!(
                "property '{}' does not store 3-component float positions",
                positions.name()
            )));
        }

        let pbc = cell.pbc_dims();
        let mut range = [0i32; 3];
        for d in 0..3 {
            if pbc.get_dim(d) {
                range[d] = (cutoff / cell.plane_width(d)).ceil() as i32;
            }
        }
        let mut image_shifts =
            Vec::with_capacity(((2 * range[0] + 1) * (2 * range[1] + 1) * (2 * range[2] + 1)) as usize);
        for (sx, sy, sz) in iproduct!(-range[0]..=range[0], -range[1]..=range[1], -range[2]..=range[2])
        {
            let offset = cell.to_cartesian(&Vector3f::new(sx as f32, sy as f32, sz as f32));
            image_shifts.push(([sx, sy, sz], offset));
        }

        let row_count = positions.row_count();
        debug!(
            "neighbor finder over {} particles, cutoff {}, image range {:?}",
            row_count, cutoff, range
        );

        Ok(Self {
            cutoff,
            cutoff2: cutoff * cutoff,
            positions,
            cell,
            image_shifts,
            row_count,
        })
    }

    /// Convenience constructor taking positions and cell from a collection.
    pub fn for_collection(cutoff: f32, data: &DataCollection) -> Result<Self, DataError> {
        let positions = data.get_property(StandardType::Position).ok_or_else(|| {
            DataError::PreconditionFailed(
                "data collection contains no particle positions".into(),
            )
        })?;
        let cell = data.cell().ok_or_else(|| {
            DataError::PreconditionFailed(
                "data collection contains no simulation cell".into(),
            )
        })?;
        Self::prepare(cutoff, positions.new_ref(), cell.new_ref())
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn cell(&self) -> &SimulationCell {
        &self.cell
    }

    fn position(&self, i: usize) -> Pos {
        let v = match self.positions.values() {
            PropertyValues::Float(v) => v,
            PropertyValues::Int(_) => unreachable!("position kind was validated in prepare()"),
        };
        Pos::new(v[3 * i], v[3 * i + 1], v[3 * i + 2])
    }

    /// Starts a query over all neighbors of the given center particle.
    pub fn find(&self, center: usize) -> Result<NeighborIterator<'_>, DataError> {
        if center >= self.row_count {
            return Err(DataError::IndexOutOfRange {
                index: center,
                len: self.row_count,
            });
        }
        Ok(NeighborIterator {
            finder: self,
            center,
            center_pos: self.position(center),
            particle: 0,
            image: 0,
        })
    }

    /// Collects the unique half-pair list `(i, j, distance)` over the whole
    /// system, one entry per visited image pair.
    pub fn all_pairs(&self) -> Result<Vec<(usize, usize, f32)>, DataError> {
        (0..self.row_count)
            .into_par_iter()
            .map(|i| {
                let mut found = Vec::new();
                for n in self.find(i)? {
                    // Count each image pair once: by index order, and for
                    // self images by the lexicographically positive shift
                    if n.index > i || (n.index == i && n.pbc_shift > [0, 0, 0]) {
                        found.push((i, n.index, n.distance()));
                    }
                }
                Ok(found)
            })
            .try_reduce(Vec::new, |mut acc, mut v| {
                acc.append(&mut v);
                Ok(acc)
            })
    }
}

/// Lazy, finite iterator over the neighbors of one center particle.
/// Exhausted iterators are not restartable; call
/// [find](CutoffNeighborFinder::find) again for the next center.
pub struct NeighborIterator<'a> {
    finder: &'a CutoffNeighborFinder,
    center: usize,
    center_pos: Pos,
    particle: usize,
    image: usize,
}

impl Iterator for NeighborIterator<'_> {
    type Item = Neighbor;

    fn next(&mut self) -> Option<Neighbor> {
        loop {
            if self.particle == self.finder.row_count {
                return None;
            }
            if self.image == self.finder.image_shifts.len() {
                self.particle += 1;
                self.image = 0;
                continue;
            }
            let (shift, offset) = self.finder.image_shifts[self.image];
            self.image += 1;

            // The center itself in the primary image is not its own neighbor
            if self.particle == self.center && shift == [0, 0, 0] {
                continue;
            }
            let delta = self.finder.position(self.particle) + offset - self.center_pos;
            let d2 = delta.norm_squared();
            if d2 <= self.finder.cutoff2 {
                return Some(Neighbor {
                    index: self.particle,
                    delta,
                    distance_squared: d2,
                    pbc_shift: shift,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PBC_NONE, PbcDims};
    use approx::assert_relative_eq;

    fn positions_store(coords: &[[f32; 3]]) -> anyhow::Result<Shared<PropertyStore>> {
        let mut store = PropertyStore::new_standard(StandardType::Position, coords.len())?;
        {
            let mut g = store.begin_write();
            let mut view = g.floats_mut()?;
            for (i, c) in coords.iter().enumerate() {
                for d in 0..3 {
                    view[(i, d)] = c[d];
                }
            }
        }
        Ok(Shared::new(store))
    }

    #[test]
    fn invalid_cutoff() -> anyhow::Result<()> {
        let pos = positions_store(&[[0.0; 3]])?;
        let cell = Shared::new(SimulationCell::from_lengths(10.0, 10.0, 10.0, PBC_NONE)?);
        assert!(matches!(
            CutoffNeighborFinder::prepare(0.0, pos.new_ref(), cell.new_ref()),
            Err(DataError::InvalidArgument(_))
        ));
        assert!(matches!(
            CutoffNeighborFinder::prepare(-1.0, pos, cell),
            Err(DataError::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn center_index_is_bounds_checked() -> anyhow::Result<()> {
        let pos = positions_store(&[[0.0; 3], [1.0, 0.0, 0.0]])?;
        let cell = Shared::new(SimulationCell::from_lengths(10.0, 10.0, 10.0, PBC_NONE)?);
        let finder = CutoffNeighborFinder::prepare(2.5, pos, cell)?;
        assert!(finder.find(1).is_ok());
        assert!(matches!(
            finder.find(2),
            Err(DataError::IndexOutOfRange { index: 2, len: 2 })
        ));
        Ok(())
    }

    #[test]
    fn reciprocal_pair_in_open_cell() -> anyhow::Result<()> {
        let pos = positions_store(&[[4.0, 5.0, 5.0], [5.0, 5.0, 5.0]])?;
        let cell = Shared::new(SimulationCell::from_lengths(100.0, 100.0, 100.0, PBC_NONE)?);
        let finder = CutoffNeighborFinder::prepare(2.5, pos, cell)?;

        let n0: Vec<Neighbor> = finder.find(0)?.collect();
        assert_eq!(n0.len(), 1);
        assert_eq!(n0[0].index, 1);
        assert_relative_eq!(n0[0].distance(), 1.0, epsilon = 1e-5);
        assert_eq!(n0[0].pbc_shift, [0, 0, 0]);
        assert_relative_eq!(n0[0].delta.x, 1.0, epsilon = 1e-5);

        let n1: Vec<Neighbor> = finder.find(1)?.collect();
        assert_eq!(n1.len(), 1);
        assert_eq!(n1[0].index, 0);
        assert_relative_eq!(n1[0].distance(), 1.0, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn periodic_images_and_self_neighboring() -> anyhow::Result<()> {
        // One particle in a 2x2x2 periodic cell with cutoff 2.1: the
        // center sees its own images at distances 2.0 along each axis.
        let pos = positions_store(&[[1.0, 1.0, 1.0]])?;
        let cell = Shared::new(SimulationCell::from_lengths(
            2.0,
            2.0,
            2.0,
            PbcDims::new(true, true, true),
        )?);
        let finder = CutoffNeighborFinder::prepare(2.1, pos, cell)?;

        let neighbors: Vec<Neighbor> = finder.find(0)?.collect();
        // Six face images at d=2.0, no diagonal image within 2.1
        assert_eq!(neighbors.len(), 6);
        for n in &neighbors {
            assert_eq!(n.index, 0);
            assert_relative_eq!(n.distance(), 2.0, epsilon = 1e-5);
            assert_ne!(n.pbc_shift, [0, 0, 0]);
        }
        Ok(())
    }

    #[test]
    fn neighbor_through_periodic_boundary_has_shift() -> anyhow::Result<()> {
        let pos = positions_store(&[[0.5, 5.0, 5.0], [9.5, 5.0, 5.0]])?;
        let cell = Shared::new(SimulationCell::from_lengths(
            10.0,
            10.0,
            10.0,
            PbcDims::new(true, true, true),
        )?);
        let finder = CutoffNeighborFinder::prepare(1.5, pos, cell)?;

        let n0: Vec<Neighbor> = finder.find(0)?.collect();
        assert_eq!(n0.len(), 1);
        assert_eq!(n0[0].index, 1);
        assert_relative_eq!(n0[0].distance(), 1.0, epsilon = 1e-5);
        assert_eq!(n0[0].pbc_shift, [-1, 0, 0]);
        assert_relative_eq!(n0[0].delta.x, -1.0, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn collection_preconditions() -> anyhow::Result<()> {
        let mut data = DataCollection::new();
        assert!(matches!(
            CutoffNeighborFinder::for_collection(2.0, &data),
            Err(DataError::PreconditionFailed(_))
        ));

        data.add(PropertyStore::new_standard(StandardType::Position, 2)?);
        assert!(matches!(
            CutoffNeighborFinder::for_collection(2.0, &data),
            Err(DataError::PreconditionFailed(_))
        ));

        data.add(SimulationCell::from_lengths(10.0, 10.0, 10.0, PBC_NONE)?);
        assert!(CutoffNeighborFinder::for_collection(2.0, &data).is_ok());
        Ok(())
    }

    #[test]
    fn all_pairs_counts_each_pair_once() -> anyhow::Result<()> {
        let pos = positions_store(&[
            [1.0, 1.0, 1.0],
            [2.0, 1.0, 1.0],
            [8.0, 8.0, 8.0],
        ])?;
        let cell = Shared::new(SimulationCell::from_lengths(10.0, 10.0, 10.0, PBC_NONE)?);
        let finder = CutoffNeighborFinder::prepare(1.5, pos, cell)?;

        let pairs = finder.all_pairs()?;
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].0, pairs[0].1), (0, 1));
        assert_relative_eq!(pairs[0].2, 1.0, epsilon = 1e-5);
        Ok(())
    }
}
