pub mod backend;
pub mod chunk;
pub mod document;
pub mod error;
pub mod model;
pub mod params;
pub mod subject;
pub mod tokenizer;
pub mod train;
pub mod util;

pub use backend::{ClassifierBackend, Suggestion};
pub use document::{Document, DocumentFile};
pub use error::{Error, Result};
pub use model::{CentroidModel, SupervisedModel};
pub use params::TrainParams;
pub use subject::{Subject, SubjectCorpus, SubjectIndex};

/// Dense integer identifier of a subject; doubles as the classifier label id.
pub type SubjectId = u32;
