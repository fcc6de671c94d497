// clause-common: pure building blocks shared by the Clause editor core.

pub mod diff;
pub mod path;
pub mod protocol;
pub mod types;
