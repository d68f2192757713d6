pub mod materials;

pub use materials::{Material, MaterialTable};
