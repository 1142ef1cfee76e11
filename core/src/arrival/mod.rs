pub mod estimator;
pub mod port;
pub mod session;

pub use estimator::{mark_arrival, validity_score, Annotation};
pub use port::{AnnotationPort, AnnotationRequest, MarkedPoint, Trace};
pub use session::{AnnotationSession, SessionSummary};
