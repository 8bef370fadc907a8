use super::{DataError, Pos};

/// Triangle surface mesh produced by an upstream construction stage and
/// carried through the pipeline as a structural member of a collection.
#[derive(Debug, Default, Clone)]
pub struct SurfaceMesh {
    vertices: Vec<Pos>,
    faces: Vec<[usize; 3]>,
}

impl SurfaceMesh {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Appends a vertex and returns its index.
    pub fn add_vertex(&mut self, pos: Pos) -> usize {
        self.vertices.push(pos);
        self.vertices.len() - 1
    }

    pub fn add_face(&mut self, face: [usize; 3]) -> Result<(), DataError> {
        for v in face {
            if v >= self.vertices.len() {
                return Err(DataError::IndexOutOfRange {
                    index: v,
                    len: self.vertices.len(),
                });
            }
        }
        self.faces.push(face);
        Ok(())
    }

    pub fn get_vertex(&self, index: usize) -> Result<&Pos, DataError> {
        self.vertices.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.vertices.len(),
        })
    }

    pub fn get_face(&self, index: usize) -> Result<&[usize; 3], DataError> {
        self.faces.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.faces.len(),
        })
    }

    pub fn iter_vertices(&self) -> impl Iterator<Item = &Pos> {
        self.vertices.iter()
    }

    pub fn iter_faces(&self) -> impl Iterator<Item = &[usize; 3]> {
        self.faces.iter()
    }
}
