pub mod event;
pub mod resolution;
pub mod session;
pub mod snapshot;
pub mod stage;

pub use event::*;
pub use resolution::*;
pub use session::*;
pub use snapshot::*;
pub use stage::*;
