use indexmap::IndexMap;

use super::{
    BondList, DataError, DataKey, DataKind, PropertyStore, PropertyValues, Shared, SimulationCell,
    StandardType, SurfaceMesh,
};

/// A member object stored in a [DataCollection]: a particle property or one
/// of the structural objects. Structural members live under fixed keys.
#[derive(Debug, Clone)]
pub enum DataMember {
    Property(Shared<PropertyStore>),
    Cell(Shared<SimulationCell>),
    Bonds(Shared<BondList>),
    Mesh(Shared<SurfaceMesh>),
}

impl DataMember {
    /// Semantic identity under which the member is stored.
    pub fn key(&self) -> DataKey {
        match self {
            DataMember::Property(p) => p.key(),
            DataMember::Cell(_) => DataKey::Named("cell".into()),
            DataMember::Bonds(_) => DataKey::Named("bonds".into()),
            DataMember::Mesh(_) => DataKey::Named("surface".into()),
        }
    }
}

impl From<PropertyStore> for DataMember {
    fn from(p: PropertyStore) -> Self {
        DataMember::Property(Shared::new(p))
    }
}

impl From<Shared<PropertyStore>> for DataMember {
    fn from(p: Shared<PropertyStore>) -> Self {
        DataMember::Property(p)
    }
}

impl From<SimulationCell> for DataMember {
    fn from(c: SimulationCell) -> Self {
        DataMember::Cell(Shared::new(c))
    }
}

impl From<Shared<SimulationCell>> for DataMember {
    fn from(c: Shared<SimulationCell>) -> Self {
        DataMember::Cell(c)
    }
}

impl From<BondList> for DataMember {
    fn from(b: BondList) -> Self {
        DataMember::Bonds(Shared::new(b))
    }
}

impl From<SurfaceMesh> for DataMember {
    fn from(m: SurfaceMesh) -> Self {
        DataMember::Mesh(Shared::new(m))
    }
}

/// Insertion-ordered mapping from semantic key to data member, representing
/// the contents of one pipeline state.
///
/// Cloning a collection is cheap: members are shared by reference and only
/// cloned when a mutation path requests unique ownership. Derived values
/// like [number_of_particles](Self::number_of_particles) are recomputed from
/// the current member set on every access, never cached.
#[derive(Debug, Default, Clone)]
pub struct DataCollection {
    members: IndexMap<DataKey, DataMember>,
}

impl DataCollection {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Inserts or replaces a member by its semantic identity. New keys are
    /// appended, existing keys are replaced in place keeping their position.
    pub fn add(&mut self, member: impl Into<DataMember>) {
        let member = member.into();
        self.members.insert(member.key(), member);
    }

    pub fn contains(&self, key: &DataKey) -> bool {
        self.members.contains_key(key)
    }

    pub fn get(&self, key: &DataKey) -> Option<&DataMember> {
        self.members.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &DataKey> {
        self.members.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &DataMember> {
        self.members.values()
    }

    pub fn get_property(&self, standard_type: StandardType) -> Option<&Shared<PropertyStore>> {
        match self.members.get(&DataKey::Standard(standard_type)) {
            Some(DataMember::Property(p)) => Some(p),
            _ => None,
        }
    }

    pub fn get_named(&self, name: &str) -> Option<&Shared<PropertyStore>> {
        match self.members.get(&DataKey::Named(name.to_owned())) {
            Some(DataMember::Property(p)) => Some(p),
            _ => None,
        }
    }

    pub fn cell(&self) -> Option<&Shared<SimulationCell>> {
        match self.members.get(&DataKey::Named("cell".into())) {
            Some(DataMember::Cell(c)) => Some(c),
            _ => None,
        }
    }

    pub fn bonds(&self) -> Option<&Shared<BondList>> {
        match self.members.get(&DataKey::Named("bonds".into())) {
            Some(DataMember::Bonds(b)) => Some(b),
            _ => None,
        }
    }

    pub fn surface(&self) -> Option<&Shared<SurfaceMesh>> {
        match self.members.get(&DataKey::Named("surface".into())) {
            Some(DataMember::Mesh(m)) => Some(m),
            _ => None,
        }
    }

    /// Number of particles, derived from the Position property on every
    /// call. Zero when no Position member is present.
    pub fn number_of_particles(&self) -> usize {
        self.get_property(StandardType::Position)
            .map(|p| p.row_count())
            .unwrap_or(0)
    }

    /// Mutable access to a property with copy-on-write: if the store is
    /// still shared with another snapshot, this snapshot gets a private
    /// clone first.
    pub fn make_property_mut(&mut self, key: &DataKey) -> Option<&mut PropertyStore> {
        match self.members.get_mut(key) {
            Some(DataMember::Property(p)) => Some(p.make_mut()),
            _ => None,
        }
    }

    /// Mutable access to the simulation cell, with the same copy-on-write
    /// behavior as [make_property_mut](Self::make_property_mut).
    pub fn cell_mut(&mut self) -> Option<&mut SimulationCell> {
        match self.members.get_mut(&DataKey::Named("cell".into())) {
            Some(DataMember::Cell(c)) => Some(c.make_mut()),
            _ => None,
        }
    }

    /// Adds a standard particle property, or returns the existing one.
    ///
    /// Requires particles to be defined, i.e. a Position property must be
    /// present. The property is sized to the current particle count and
    /// optionally initialized from `data`; the existing store is detached
    /// from other snapshots first so it is safe to mutate afterwards.
    pub fn create_particle_property(
        &mut self,
        standard_type: StandardType,
        data: Option<PropertyValues>,
    ) -> Result<Shared<PropertyStore>, DataError> {
        if standard_type == StandardType::User {
            return Err(DataError::InvalidArgument(
                "user-defined properties are created by name with create_user_particle_property()"
                    .into(),
            ));
        }
        let num_particles = self.require_particles()?;
        let key = DataKey::Standard(standard_type);

        if let Some(d) = &data {
            let (kind, ncomp) = standard_type
                .schema()
                .expect("non-User standard type has a schema");
            check_init_data(d, kind, num_particles, ncomp, standard_type.display_name())?;
        }

        if !self.members.contains_key(&key) {
            let store = PropertyStore::new_standard(standard_type, num_particles)?;
            self.add(store);
        }
        self.detach_and_init(&key, data)
    }

    /// Adds a user-defined particle property keyed by name, or returns the
    /// existing one. Same contract as
    /// [create_particle_property](Self::create_particle_property).
    pub fn create_user_particle_property(
        &mut self,
        name: &str,
        data_kind: DataKind,
        num_components: usize,
        data: Option<PropertyValues>,
    ) -> Result<Shared<PropertyStore>, DataError> {
        let num_particles = self.require_particles()?;
        let key = DataKey::Named(name.to_owned());

        if let Some(d) = &data {
            check_init_data(d, data_kind, num_particles, num_components, name)?;
        }

        match self.members.get(&key) {
            None => {
                let store =
                    PropertyStore::new_user(name, data_kind, num_particles, num_components)?;
                self.add(store);
            }
            Some(DataMember::Property(_)) => {}
            Some(_) => {
                return Err(DataError::InvalidArgument(format!(
                    "member '{name}' is not a particle property"
                )));
            }
        }
        self.detach_and_init(&key, data)
    }

    fn require_particles(&self) -> Result<usize, DataError> {
        if self.get_property(StandardType::Position).is_none() {
            return Err(DataError::PreconditionFailed(
                "data collection contains no particles".into(),
            ));
        }
        Ok(self.number_of_particles())
    }

    fn detach_and_init(
        &mut self,
        key: &DataKey,
        data: Option<PropertyValues>,
    ) -> Result<Shared<PropertyStore>, DataError> {
        let Some(DataMember::Property(holder)) = self.members.get_mut(key) else {
            return Err(DataError::PreconditionFailed(format!(
                "member '{key}' is not a particle property"
            )));
        };
        // Detach from other snapshots so the caller may safely mutate
        let store = holder.make_mut();
        if let Some(d) = data {
            store.begin_write().assign(&d)?;
        }
        Ok(holder.new_ref())
    }
}

fn check_init_data(
    data: &PropertyValues,
    kind: DataKind,
    rows: usize,
    components: usize,
    name: &str,
) -> Result<(), DataError> {
    if data.kind() != kind {
        return Err(DataError::ShapeMismatch(format!(
            "initialization data kind '{}' differs from kind '{}' of property '{}'",
            data.kind(),
            kind,
            name
        )));
    }
    if data.len() != rows * components {
        return Err(DataError::ShapeMismatch(format!(
            "initialization data length {} does not fill {rows} rows x {components} components of property '{name}'",
            data.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PBC_FULL, Pos};

    fn collection_with_particles(n: usize) -> anyhow::Result<DataCollection> {
        let mut data = DataCollection::new();
        let mut pos = PropertyStore::new_standard(StandardType::Position, n)?;
        {
            let mut g = pos.begin_write();
            let mut view = g.floats_mut()?;
            for i in 0..n {
                view[(i, 0)] = i as f32;
            }
        }
        data.add(pos);
        Ok(data)
    }

    #[test]
    fn particle_count_is_derived() -> anyhow::Result<()> {
        let mut data = DataCollection::new();
        assert_eq!(data.number_of_particles(), 0);
        data.add(PropertyStore::new_standard(StandardType::Position, 10)?);
        assert_eq!(data.number_of_particles(), 10);
        // Replacing the position member changes the derived count
        data.add(PropertyStore::new_standard(StandardType::Position, 3)?);
        assert_eq!(data.number_of_particles(), 3);
        assert_eq!(data.len(), 1);
        Ok(())
    }

    #[test]
    fn add_replaces_in_place_and_keeps_order() -> anyhow::Result<()> {
        let mut data = collection_with_particles(4)?;
        data.add(SimulationCell::from_lengths(10.0, 10.0, 10.0, PBC_FULL)?);
        data.add(PropertyStore::new_standard(StandardType::Mass, 4)?);

        let keys: Vec<String> = data.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["Position", "cell", "Mass"]);

        // Replacement keeps the original position in the order
        data.add(PropertyStore::new_standard(StandardType::Position, 4)?);
        let keys: Vec<String> = data.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["Position", "cell", "Mass"]);
        Ok(())
    }

    #[test]
    fn no_particles_precondition() {
        let mut data = DataCollection::new();
        let res = data.create_particle_property(StandardType::Mass, None);
        assert!(matches!(res, Err(DataError::PreconditionFailed(_))));

        let res = data.create_user_particle_property("q", DataKind::Float, 1, None);
        assert!(matches!(res, Err(DataError::PreconditionFailed(_))));
    }

    #[test]
    fn create_particle_property_is_idempotent() -> anyhow::Result<()> {
        let mut data = collection_with_particles(5)?;
        let first = data.create_particle_property(StandardType::Mass, None)?;
        let n_members = data.len();

        let second = data.create_particle_property(StandardType::Mass, None)?;
        assert_eq!(data.len(), n_members);
        assert_eq!(first.row_count(), second.row_count());
        assert_eq!(first.values(), second.values());
        Ok(())
    }

    #[test]
    fn user_property_scenario() -> anyhow::Result<()> {
        let mut data = collection_with_particles(10)?;
        let mass = data.create_user_particle_property(
            "mass",
            DataKind::Float,
            1,
            Some(vec![1.0f32; 10].into()),
        )?;
        assert_eq!(mass.row_count(), 10);
        assert_eq!(mass.component_count(), 1);
        assert!(mass.floats_1d()?.iter().all(|v| *v == 1.0));
        assert!(data.contains(&DataKey::Named("mass".into())));
        Ok(())
    }

    #[test]
    fn init_data_shape_is_checked_before_mutation() -> anyhow::Result<()> {
        let mut data = collection_with_particles(10)?;
        // Wrong length: nothing is added to the collection
        let res = data.create_user_particle_property(
            "mass",
            DataKind::Float,
            1,
            Some(vec![1.0f32; 3].into()),
        );
        assert!(matches!(res, Err(DataError::ShapeMismatch(_))));
        assert!(!data.contains(&DataKey::Named("mass".into())));

        // Wrong kind
        let res = data.create_particle_property(
            StandardType::Mass,
            Some(vec![1i32; 10].into()),
        );
        assert!(matches!(res, Err(DataError::ShapeMismatch(_))));
        assert!(data.get_property(StandardType::Mass).is_none());
        Ok(())
    }

    #[test]
    fn snapshots_are_isolated_by_cow() -> anyhow::Result<()> {
        let mut data = collection_with_particles(3)?;
        let snapshot = data.clone();
        assert!(data
            .get_property(StandardType::Position)
            .unwrap()
            .same_data(snapshot.get_property(StandardType::Position).unwrap()));

        // Writing through one collection must not change the other
        let store = data
            .make_property_mut(&DataKey::Standard(StandardType::Position))
            .unwrap();
        store.begin_write().floats_mut()?.fill(9.0);

        let old = snapshot.get_property(StandardType::Position).unwrap();
        assert_eq!(old.floats()?[(1, 0)], 1.0);
        let new = data.get_property(StandardType::Position).unwrap();
        assert_eq!(new.floats()?[(1, 0)], 9.0);
        Ok(())
    }

    #[test]
    fn cell_mutation_through_collection() -> anyhow::Result<()> {
        let mut data = collection_with_particles(2)?;
        data.add(SimulationCell::from_lengths(5.0, 5.0, 5.0, PBC_FULL)?);
        data.cell_mut().unwrap().set_pbc((true, false, true));
        assert_eq!(data.cell().unwrap().pbc(), (true, false, true));
        Ok(())
    }

    #[test]
    fn structural_members_by_fixed_keys() -> anyhow::Result<()> {
        let mut data = DataCollection::new();
        data.add(BondList::new());
        let mut mesh = SurfaceMesh::new();
        mesh.add_vertex(Pos::origin());
        data.add(mesh);
        assert!(data.bonds().is_some());
        assert_eq!(data.surface().unwrap().vertex_count(), 1);
        assert!(data.cell().is_none());
        Ok(())
    }
}
