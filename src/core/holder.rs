use std::ops::Deref;

use super::DataError;

/// Smart pointer for sharing data objects between collections and pipeline
/// snapshots.
///
/// Acts like an [Arc](std::sync::Arc) with copy-on-write semantics: readers
/// share the same allocation, while [make_mut](Self::make_mut) clones the
/// data first if it is referenced from more than one place. Mutations
/// therefore never become visible through older references.
#[derive(Debug)]
pub struct Shared<T: Clone>(triomphe::Arc<T>);

impl<T: Clone> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(triomphe::Arc::new(value))
    }

    /// Shallow-clones creating a new reference to the same data.
    pub fn new_ref(&self) -> Self {
        Self(triomphe::Arc::clone(&self.0))
    }

    pub fn ref_count(&self) -> usize {
        triomphe::Arc::count(&self.0)
    }

    /// Check if two holders point to the same data
    pub fn same_data(&self, other: &Self) -> bool {
        triomphe::Arc::ptr_eq(&self.0, &other.0)
    }

    /// Mutable access with copy-on-write: if the data is shared, a private
    /// clone is made first and this holder is switched to it.
    pub fn make_mut(&mut self) -> &mut T {
        if !self.0.is_unique() {
            self.0 = triomphe::Arc::new(T::clone(&self.0));
        }
        triomphe::Arc::get_mut(&mut self.0).expect("holder was just made unique")
    }

    /// Release the wrapped value if it is uniquely owned
    pub fn release(self) -> Result<T, DataError> {
        triomphe::Arc::try_unwrap(self.0).map_err(|arc| {
            DataError::PreconditionFailed(format!(
                "can't release data that is still shared by {} owners",
                triomphe::Arc::count(&arc)
            ))
        })
    }
}

impl<T: Clone> Clone for Shared<T> {
    fn clone(&self) -> Self {
        self.new_ref()
    }
}

impl<T: Clone> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// Holders are dereferenced as usual smart pointers
impl<T: Clone> Deref for Shared<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
