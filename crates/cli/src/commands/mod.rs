pub mod lookup;
pub mod resource;
pub mod sweep;
pub mod token;
