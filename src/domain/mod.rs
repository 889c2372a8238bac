// Domain layer: feature data, model artifact format and the ports between them.

pub mod estimator;
pub mod model;
pub mod ports;
