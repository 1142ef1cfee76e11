pub mod annotations;
pub mod archive;
pub mod codec;
pub mod convolved;

pub use annotations::{AnnotationStorage, Annotations, FileAnnotationStore};
pub use codec::ArrayBundle;
pub use convolved::{ConvolvedStore, DirectoryStore, MemoryStore};
