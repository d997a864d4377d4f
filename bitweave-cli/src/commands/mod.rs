//! Command implementations for the bitweave CLI.

pub mod compose;
pub mod find;
pub mod grow;
pub mod locate;
pub mod slice;

pub use compose::cmd_compose;
pub use find::cmd_find;
pub use grow::cmd_grow;
pub use locate::{LocateQuery, cmd_locate};
pub use slice::cmd_slice;
