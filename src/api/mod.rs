pub mod models;
pub mod readout;
