pub mod eigen;
pub mod embedding;

pub use eigen::{smallest_eigenvectors, sorted_eigenpairs, SortedEigen, SpdRoot};
pub use embedding::{EigenvectorCount, EmbeddingSolver, Normalization};
