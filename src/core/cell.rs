use super::{DataError, Matrix3f, Pos, Vector3f};

/// Periodic boundary flags of a simulation cell, one bit per dimension.
#[derive(Debug, Default, PartialEq, Clone, Copy)]
pub struct PbcDims(u8);

impl PbcDims {
    pub fn new(x: bool, y: bool, z: bool) -> Self {
        let mut ret = Self(0);
        ret.set_dim(0, x);
        ret.set_dim(1, y);
        ret.set_dim(2, z);
        ret
    }

    pub fn set_dim(&mut self, n: usize, val: bool) {
        if n > 2 {
            panic!("pbc has only 3 dimensions")
        }
        if val {
            self.0 |= 1 << n;
        } else {
            self.0 &= !(1 << n);
        }
    }

    pub fn get_dim(&self, n: usize) -> bool {
        if n > 2 {
            panic!("pbc has only 3 dimensions")
        }
        (self.0 & (1 << n)) != 0
    }

    pub fn any(&self) -> bool {
        self.0 != 0
    }
}

impl From<(bool, bool, bool)> for PbcDims {
    fn from(flags: (bool, bool, bool)) -> Self {
        Self::new(flags.0, flags.1, flags.2)
    }
}

impl From<PbcDims> for (bool, bool, bool) {
    fn from(pbc: PbcDims) -> Self {
        (pbc.get_dim(0), pbc.get_dim(1), pbc.get_dim(2))
    }
}

pub const PBC_FULL: PbcDims = PbcDims(0b0000_0111);
pub const PBC_NONE: PbcDims = PbcDims(0b0000_0000);

/// Geometry of the simulation cell: three cell vectors stored as matrix
/// columns, plus periodic boundary flags per dimension.
#[derive(Debug, Clone)]
pub struct SimulationCell {
    matrix: Matrix3f,
    inv: Matrix3f,
    pbc: PbcDims,
}

impl SimulationCell {
    pub fn from_matrix(matrix: Matrix3f, pbc: PbcDims) -> Result<Self, DataError> {
        // Sanity check
        for col in matrix.column_iter() {
            if col.norm() == 0.0 {
                return Err(DataError::InvalidArgument(
                    "zero length cell vector".into(),
                ));
            }
        }
        let inv = matrix.try_inverse().ok_or_else(|| {
            DataError::InvalidArgument("cell matrix is not invertible".into())
        })?;
        Ok(Self { matrix, inv, pbc })
    }

    /// Orthorhombic cell with the given edge lengths.
    pub fn from_lengths(a: f32, b: f32, c: f32, pbc: PbcDims) -> Result<Self, DataError> {
        Self::from_matrix(Matrix3f::from_diagonal(&Vector3f::new(a, b, c)), pbc)
    }

    #[inline(always)]
    pub fn matrix(&self) -> Matrix3f {
        self.matrix
    }

    /// Periodic boundary flags as a tuple `(x, y, z)`.
    pub fn pbc(&self) -> (bool, bool, bool) {
        self.pbc.into()
    }

    pub fn set_pbc(&mut self, flags: (bool, bool, bool)) {
        self.pbc = flags.into();
    }

    pub fn pbc_dims(&self) -> PbcDims {
        self.pbc
    }

    #[inline(always)]
    pub fn to_fractional(&self, v: &Vector3f) -> Vector3f {
        self.inv * v
    }

    #[inline(always)]
    pub fn to_cartesian(&self, v: &Vector3f) -> Vector3f {
        self.matrix * v
    }

    /// Lengths of the three cell vectors.
    pub fn extents(&self) -> Vector3f {
        Vector3f::from_iterator(self.matrix.column_iter().map(|c| c.norm()))
    }

    /// Distance between the two periodic faces perpendicular to cell
    /// vector `dim`. Equals the edge length for orthorhombic cells and is
    /// smaller for triclinic ones.
    pub fn plane_width(&self, dim: usize) -> f32 {
        1.0 / self.inv.row(dim).norm()
    }

    /// Minimum image vector for `vec` over the periodic dimensions.
    #[inline(always)]
    pub fn shortest_vector(&self, vec: &Vector3f) -> Vector3f {
        let mut bv = self.inv * vec;
        for d in 0..3 {
            if self.pbc.get_dim(d) {
                bv[d] -= bv[d].round();
            }
        }
        self.matrix * bv
    }

    #[inline(always)]
    pub fn distance_squared(&self, p1: &Pos, p2: &Pos) -> f32 {
        self.shortest_vector(&(p2 - p1)).norm_squared()
    }

    #[inline(always)]
    pub fn distance(&self, p1: &Pos, p2: &Pos) -> f32 {
        self.distance_squared(p1, p2).sqrt()
    }

    pub fn is_triclinic(&self) -> bool {
        self.matrix[(0, 1)] != 0.0
            || self.matrix[(0, 2)] != 0.0
            || self.matrix[(1, 0)] != 0.0
            || self.matrix[(1, 2)] != 0.0
            || self.matrix[(2, 0)] != 0.0
            || self.matrix[(2, 1)] != 0.0
    }
}
