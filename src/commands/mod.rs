pub mod prep;
pub mod reduce;
