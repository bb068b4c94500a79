// Domain layer: core models and ports (interfaces). No IO here; adapters implement the ports.

pub mod model;
pub mod ports;
