use super::DataError;

/// A directed half bond from particle `a` to particle `b`, together with
/// the periodic image shift crossed when going from `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
    pub pbc_shift: [i32; 3],
}

/// List of half bonds. Each pair-wise bond is stored twice, once per
/// direction, matching the convention of the upstream pipeline stages.
#[derive(Debug, Default, Clone)]
pub struct BondList {
    bonds: Vec<Bond>,
}

impl BondList {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// Adds a half bond from `a` to `b` with zero shift.
    pub fn add(&mut self, a: usize, b: usize) {
        self.add_with_shift(a, b, [0, 0, 0]);
    }

    /// Adds both half bonds between `a` and `b`.
    pub fn add_full(&mut self, a: usize, b: usize) {
        self.add(a, b);
        self.add(b, a);
    }

    pub fn add_with_shift(&mut self, a: usize, b: usize, pbc_shift: [i32; 3]) {
        self.bonds.push(Bond { a, b, pbc_shift });
    }

    pub fn get(&self, index: usize) -> Result<&Bond, DataError> {
        self.bonds.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.bonds.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bond> {
        self.bonds.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_bonds() -> anyhow::Result<()> {
        let mut bonds = BondList::new();
        bonds.add_full(0, 1);
        bonds.add_with_shift(1, 2, [1, 0, 0]);
        assert_eq!(bonds.len(), 3);
        assert_eq!(bonds.get(0)?.a, 0);
        assert_eq!(bonds.get(1)?.b, 0);
        assert_eq!(bonds.get(2)?.pbc_shift, [1, 0, 0]);
        assert!(matches!(
            bonds.get(3),
            Err(DataError::IndexOutOfRange { index: 3, len: 3 })
        ));
        Ok(())
    }
}
