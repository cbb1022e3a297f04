pub mod config_ops;
pub mod state_ops;
pub mod translate_ops;
