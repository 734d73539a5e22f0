pub mod value;
pub mod var;
