mod action;
pub use action::{Action, ActionParseError};

mod request;
pub use request::RunRequest;

mod config;
pub use config::DroneConfig;

mod param;
pub use param::{ParamParseError, ParamType, ParamValue, classify, parse_param_value};
