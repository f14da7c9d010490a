pub mod dna;
pub mod symbol;

pub use symbol::Symbol;
