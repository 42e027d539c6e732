pub mod bounds;
pub mod curve;
pub mod merit_order;
pub mod peak_shaving;
pub mod power_law;
pub mod root;
pub mod scaling;
pub mod water_filling;
