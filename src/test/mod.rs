mod log_json;
mod properties;
mod seq;
mod simulator;
mod support;
