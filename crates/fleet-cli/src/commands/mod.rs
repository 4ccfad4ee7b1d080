pub mod converge;
pub mod expand;
pub mod status;
