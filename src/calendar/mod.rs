mod cache;
mod error;
mod event;
mod extractor;
mod months;
mod normalize;
mod partition;
mod rate_limit;
mod scheduler;
mod source;
mod store;

pub mod extract;

pub use cache::*;
pub use error::*;
pub use event::*;
pub use extractor::*;
pub use months::*;
pub use normalize::*;
pub use partition::*;
pub use rate_limit::*;
pub use scheduler::*;
pub use source::*;
pub use store::*;
