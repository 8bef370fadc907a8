use std::fmt::Display;
use std::ops::Index;
use std::str::FromStr;

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut2};

use super::DataError;

/// Scalar kind of the values stored in a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Int,
    Float,
}

impl FromStr for DataKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, DataError> {
        match s {
            "int" => Ok(DataKind::Int),
            "float" => Ok(DataKind::Float),
            other => Err(DataError::InvalidArgument(format!(
                "unknown data kind '{other}', only 'int' or 'float' are allowed"
            ))),
        }
    }
}

impl Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataKind::Int => write!(f, "int"),
            DataKind::Float => write!(f, "float"),
        }
    }
}

/// Standard per-particle properties with a registered schema.
///
/// [User](StandardType::User) is a sentinel for user-defined properties,
/// which are identified by name instead and carry no registered schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardType {
    User,
    Selection,
    Color,
    ParticleType,
    Identifier,
    Position,
    Velocity,
    Force,
    Mass,
    Charge,
    Radius,
    Displacement,
    PeriodicImage,
}

impl StandardType {
    /// Registered schema as `(data kind, components per row)`.
    /// `None` for the [User](StandardType::User) sentinel.
    pub fn schema(&self) -> Option<(DataKind, usize)> {
        use StandardType::*;
        match self {
            User => None,
            Selection => Some((DataKind::Int, 1)),
            Color => Some((DataKind::Float, 3)),
            ParticleType => Some((DataKind::Int, 1)),
            Identifier => Some((DataKind::Int, 1)),
            Position => Some((DataKind::Float, 3)),
            Velocity => Some((DataKind::Float, 3)),
            Force => Some((DataKind::Float, 3)),
            Mass => Some((DataKind::Float, 1)),
            Charge => Some((DataKind::Float, 1)),
            Radius => Some((DataKind::Float, 1)),
            Displacement => Some((DataKind::Float, 3)),
            PeriodicImage => Some((DataKind::Int, 3)),
        }
    }

    pub fn display_name(&self) -> &'static str {
        use StandardType::*;
        match self {
            User => "",
            Selection => "Selection",
            Color => "Color",
            ParticleType => "Particle Type",
            Identifier => "Particle Identifier",
            Position => "Position",
            Velocity => "Velocity",
            Force => "Force",
            Mass => "Mass",
            Charge => "Charge",
            Radius => "Radius",
            Displacement => "Displacement",
            PeriodicImage => "Periodic Image",
        }
    }
}

/// Semantic identity of a collection member. Standard properties are looked
/// up by their type tag, user-defined properties and structural members by
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataKey {
    Standard(StandardType),
    Named(String),
}

impl Display for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataKey::Standard(t) => write!(f, "{}", t.display_name()),
            DataKey::Named(n) => write!(f, "{n}"),
        }
    }
}

/// Flat scalar buffer of a property. Also used as the initialization
/// payload when creating properties with data.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValues {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl PropertyValues {
    pub fn zeros(kind: DataKind, len: usize) -> Self {
        match kind {
            DataKind::Int => PropertyValues::Int(vec![0; len]),
            DataKind::Float => PropertyValues::Float(vec![0.0; len]),
        }
    }

    pub fn kind(&self) -> DataKind {
        match self {
            PropertyValues::Int(_) => DataKind::Int,
            PropertyValues::Float(_) => DataKind::Float,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PropertyValues::Int(v) => v.len(),
            PropertyValues::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<f32>> for PropertyValues {
    fn from(v: Vec<f32>) -> Self {
        PropertyValues::Float(v)
    }
}

impl From<&[f32]> for PropertyValues {
    fn from(v: &[f32]) -> Self {
        PropertyValues::Float(v.to_vec())
    }
}

impl From<Vec<i32>> for PropertyValues {
    fn from(v: Vec<i32>) -> Self {
        PropertyValues::Int(v)
    }
}

impl From<&[i32]> for PropertyValues {
    fn from(v: &[i32]) -> Self {
        PropertyValues::Int(v.to_vec())
    }
}

/// Named particle species attached to a type property.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleType {
    pub id: i32,
    pub name: String,
    pub color: [f32; 3],
    pub radius: f32,
}

impl ParticleType {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: [1.0, 1.0, 1.0],
            radius: 0.0,
        }
    }
}

/// Named, typed, fixed-arity-per-row data buffer holding one scalar row per
/// particle (or several components per row for vector properties).
///
/// Stores are shared between [DataCollection](super::DataCollection)
/// snapshots through [Shared](super::Shared) holders; any mutation goes
/// through a copy-on-write clone so older snapshots keep observing the
/// original values.
#[derive(Debug, Clone)]
pub struct PropertyStore {
    name: String,
    standard_type: StandardType,
    data_kind: DataKind,
    component_count: usize,
    row_count: usize,
    values: PropertyValues,
    revision: u64,
    types: Vec<ParticleType>,
}

impl PropertyStore {
    /// Creates a standard property with kind and component count implied by
    /// the type's registered schema. Initialized to zeros.
    pub fn new_standard(standard_type: StandardType, row_count: usize) -> Result<Self, DataError> {
        let (data_kind, component_count) = standard_type.schema().ok_or_else(|| {
            DataError::InvalidArgument(
                "the User sentinel has no registered schema, use new_user() instead".into(),
            )
        })?;
        Ok(Self {
            name: standard_type.display_name().to_owned(),
            standard_type,
            data_kind,
            component_count,
            row_count,
            values: PropertyValues::zeros(data_kind, row_count * component_count),
            revision: 0,
            types: Vec::new(),
        })
    }

    /// Creates a user-defined property identified by name. Initialized to
    /// zeros.
    pub fn new_user(
        name: impl Into<String>,
        data_kind: DataKind,
        row_count: usize,
        component_count: usize,
    ) -> Result<Self, DataError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DataError::InvalidArgument(
                "user property name can't be empty".into(),
            ));
        }
        if component_count < 1 {
            return Err(DataError::InvalidArgument(format!(
                "component count of property '{name}' must be positive"
            )));
        }
        Ok(Self {
            name,
            standard_type: StandardType::User,
            data_kind,
            component_count,
            row_count,
            values: PropertyValues::zeros(data_kind, row_count * component_count),
            revision: 0,
            types: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn standard_type(&self) -> StandardType {
        self.standard_type
    }

    pub fn data_kind(&self) -> DataKind {
        self.data_kind
    }

    pub fn component_count(&self) -> usize {
        self.component_count
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Revision counter bumped on every completed write. Downstream
    /// consumers compare revisions to detect staleness of derived data.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Semantic identity used for collection lookup: the standard type tag,
    /// or the name for user-defined properties.
    pub fn key(&self) -> DataKey {
        if self.standard_type != StandardType::User {
            DataKey::Standard(self.standard_type)
        } else {
            DataKey::Named(self.name.clone())
        }
    }

    pub fn values(&self) -> &PropertyValues {
        &self.values
    }

    /// Read-only view shaped `(row_count, component_count)` aliasing the
    /// store's buffer. No copy is made.
    pub fn floats(&self) -> Result<ArrayView2<'_, f32>, DataError> {
        match &self.values {
            PropertyValues::Float(v) => {
                Ok(ArrayView2::from_shape((self.row_count, self.component_count), v)
                    .expect("storage length matches row and component counts"))
            }
            PropertyValues::Int(_) => Err(DataError::InvalidArgument(format!(
                "property '{}' holds int data, not float",
                self.name
            ))),
        }
    }

    /// Read-only view shaped `(row_count, component_count)` aliasing the
    /// store's buffer. No copy is made.
    pub fn ints(&self) -> Result<ArrayView2<'_, i32>, DataError> {
        match &self.values {
            PropertyValues::Int(v) => {
                Ok(ArrayView2::from_shape((self.row_count, self.component_count), v)
                    .expect("storage length matches row and component counts"))
            }
            PropertyValues::Float(_) => Err(DataError::InvalidArgument(format!(
                "property '{}' holds float data, not int",
                self.name
            ))),
        }
    }

    /// One-dimensional view for scalar float properties.
    pub fn floats_1d(&self) -> Result<ArrayView1<'_, f32>, DataError> {
        if self.component_count != 1 {
            return Err(DataError::InvalidArgument(format!(
                "property '{}' has {} components per row, a 1-d view needs exactly one",
                self.name, self.component_count
            )));
        }
        match &self.values {
            PropertyValues::Float(v) => Ok(ArrayView1::from(v.as_slice())),
            PropertyValues::Int(_) => Err(DataError::InvalidArgument(format!(
                "property '{}' holds int data, not float",
                self.name
            ))),
        }
    }

    /// Begins a write transaction. The returned guard gives mutable views
    /// over the buffer and bumps the revision counter when dropped, so the
    /// change signal can't be forgotten.
    pub fn begin_write(&mut self) -> PropertyWriteGuard<'_> {
        PropertyWriteGuard { store: self }
    }

    /// Signals that the stored values were changed. Called automatically
    /// when a [PropertyWriteGuard] is dropped.
    pub fn mark_changed(&mut self) {
        self.revision += 1;
    }

    //----------------------------------------------------------------
    // Particle type metadata (index-based owner primitives; see TypeList)
    //----------------------------------------------------------------

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn get_type(&self, index: usize) -> Result<&ParticleType, DataError> {
        self.types.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.types.len(),
        })
    }

    pub fn find_type(&self, id: i32) -> Option<&ParticleType> {
        self.types.iter().find(|t| t.id == id)
    }

    pub fn insert_type(&mut self, index: usize, ptype: ParticleType) -> Result<(), DataError> {
        if index > self.types.len() {
            return Err(DataError::IndexOutOfRange {
                index,
                len: self.types.len(),
            });
        }
        self.types.insert(index, ptype);
        Ok(())
    }

    pub fn remove_type(&mut self, index: usize) -> Result<ParticleType, DataError> {
        if index >= self.types.len() {
            return Err(DataError::IndexOutOfRange {
                index,
                len: self.types.len(),
            });
        }
        Ok(self.types.remove(index))
    }

    pub fn push_type(&mut self, ptype: ParticleType) {
        self.types.push(ptype);
    }

    pub fn iter_types(&self) -> impl Iterator<Item = &ParticleType> {
        self.types.iter()
    }

    /// Mutable sequence adapter over the attached particle types.
    pub fn type_list(&mut self) -> TypeList<'_> {
        TypeList { owner: self }
    }
}

/// RAII write transaction over a [PropertyStore].
///
/// Dropping the guard bumps the store's revision counter. Mutations through
/// raw views can't be observed by the containers, so the completion signal
/// is tied to the guard's lifetime instead of a manual call.
pub struct PropertyWriteGuard<'a> {
    store: &'a mut PropertyStore,
}

impl PropertyWriteGuard<'_> {
    /// Mutable view shaped `(row_count, component_count)`.
    pub fn floats_mut(&mut self) -> Result<ArrayViewMut2<'_, f32>, DataError> {
        let (rows, comps) = (self.store.row_count, self.store.component_count);
        match &mut self.store.values {
            PropertyValues::Float(v) => Ok(ArrayViewMut2::from_shape((rows, comps), v)
                .expect("storage length matches row and component counts")),
            PropertyValues::Int(_) => Err(DataError::InvalidArgument(format!(
                "property '{}' holds int data, not float",
                self.store.name
            ))),
        }
    }

    /// Mutable view shaped `(row_count, component_count)`.
    pub fn ints_mut(&mut self) -> Result<ArrayViewMut2<'_, i32>, DataError> {
        let (rows, comps) = (self.store.row_count, self.store.component_count);
        match &mut self.store.values {
            PropertyValues::Int(v) => Ok(ArrayViewMut2::from_shape((rows, comps), v)
                .expect("storage length matches row and component counts")),
            PropertyValues::Float(_) => Err(DataError::InvalidArgument(format!(
                "property '{}' holds float data, not int",
                self.store.name
            ))),
        }
    }

    /// Whole-buffer in-place replacement. The source must match the store's
    /// data kind and total length exactly; on mismatch the values stay
    /// untouched.
    pub fn assign(&mut self, src: &PropertyValues) -> Result<(), DataError> {
        if src.kind() != self.store.data_kind {
            return Err(DataError::ShapeMismatch(format!(
                "source kind '{}' differs from destination kind '{}' of property '{}'",
                src.kind(),
                self.store.data_kind,
                self.store.name
            )));
        }
        if src.len() != self.store.values.len() {
            return Err(DataError::ShapeMismatch(format!(
                "source length {} does not fill {} rows x {} components of property '{}'",
                src.len(),
                self.store.row_count,
                self.store.component_count,
                self.store.name
            )));
        }
        match (&mut self.store.values, src) {
            (PropertyValues::Float(dst), PropertyValues::Float(s)) => dst.copy_from_slice(s),
            (PropertyValues::Int(dst), PropertyValues::Int(s)) => dst.copy_from_slice(s),
            _ => unreachable!("kinds were checked above"),
        }
        Ok(())
    }
}

impl Drop for PropertyWriteGuard<'_> {
    fn drop(&mut self) {
        self.store.mark_changed();
    }
}

/// List-like adapter over the particle types attached to a property,
/// delegating every operation to the owner's index-based primitives.
pub struct TypeList<'a> {
    owner: &'a mut PropertyStore,
}

impl TypeList<'_> {
    pub fn len(&self) -> usize {
        self.owner.type_count()
    }

    pub fn is_empty(&self) -> bool {
        self.owner.type_count() == 0
    }

    pub fn get(&self, index: usize) -> Result<&ParticleType, DataError> {
        self.owner.get_type(index)
    }

    /// Replaces the element at `index`.
    pub fn set(&mut self, index: usize, ptype: ParticleType) -> Result<(), DataError> {
        self.owner.remove_type(index)?;
        self.owner.insert_type(index, ptype)
    }

    pub fn insert(&mut self, index: usize, ptype: ParticleType) -> Result<(), DataError> {
        self.owner.insert_type(index, ptype)
    }

    pub fn remove(&mut self, index: usize) -> Result<ParticleType, DataError> {
        self.owner.remove_type(index)
    }

    pub fn push(&mut self, ptype: ParticleType) {
        self.owner.push_type(ptype);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleType> {
        self.owner.iter_types()
    }
}

impl Index<usize> for TypeList<'_> {
    type Output = ParticleType;

    fn index(&self, index: usize) -> &ParticleType {
        &self.owner.types[index]
    }
}
