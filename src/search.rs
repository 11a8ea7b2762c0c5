mod closed;
mod driver;
mod frontier;

pub use closed::{ClosedSet, Membership};
pub use driver::{OdSearch, SearchOptions, SearchStatus};
pub use frontier::Frontier;
