pub mod analysis;
pub mod preference;
