pub mod region;
pub mod result;
pub mod token;

pub use region::{Candidate, FieldRegion, RegionOrigin};
pub use result::{ExtractionRecord, ExtractionResult, FieldState, FieldValue, Status, Unresolved};
pub use token::{RotationTokens, Token};
