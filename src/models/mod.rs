pub mod appointment;
pub mod enums;
pub mod nurse;
pub mod report;
pub mod task;

pub use appointment::*;
pub use enums::*;
pub use nurse::*;
pub use report::*;
pub use task::*;
