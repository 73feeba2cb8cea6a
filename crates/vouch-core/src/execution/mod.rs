pub mod account;
pub mod checkpoint;
pub mod proof;
pub mod slots;

pub use account::*;
pub use checkpoint::*;
pub use proof::*;
pub use slots::*;
