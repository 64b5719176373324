//! Sensor sources outside the raw counters: the privileged peer and the
//! unprivileged probe, plus the text parser both rely on.

pub mod args;
pub mod bridge;
pub mod parser;
pub mod probe;

pub use args::{validate_bridge_args, BridgeArgs, MAX_BRIDGE_ARGS};
pub use bridge::{
    connect_default, BridgeOutput, BridgeStatus, DirectBridge, PrivilegedSensorBridge,
    SensorBridgeClient, SocketBridge,
};
pub use parser::{parse_bridge_output, parse_labeled_values, BridgeReading, LabeledValue, ValueUnit};
pub use probe::{CommandProbe, SensorProbe};
