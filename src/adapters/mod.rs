pub mod json_file;
pub mod messaging;
pub mod monitoring;
pub mod opt_out_store;
pub mod plant_store;
pub mod webhook;
