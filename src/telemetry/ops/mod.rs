pub mod sync;
pub mod ls;
