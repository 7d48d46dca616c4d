// Application layer: the expense store, the validation boundary in front of
// it, and the read-side summaries.

pub mod error;
pub mod reporting;
pub mod store;
pub mod validation;

pub use error::*;
pub use reporting::*;
pub use store::*;
pub use validation::*;
