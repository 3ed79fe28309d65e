// Domain layer: portfolio models, ports (interfaces), and pure analysis services.

pub mod mock_data;
pub mod model;
pub mod ports;
pub mod services;
