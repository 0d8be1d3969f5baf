pub mod readout;
