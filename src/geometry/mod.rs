mod point;
pub use point::*;

mod region;
pub use region::*;

mod shape;
pub use shape::*;

mod orthant;
pub use orthant::*;
