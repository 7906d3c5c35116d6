pub mod enums;
pub mod product;
pub mod record;
pub mod survey;

pub use enums::*;
pub use product::*;
pub use record::*;
pub use survey::*;
