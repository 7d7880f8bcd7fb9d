pub mod picogw;

pub use picogw::PicoGwReader;
