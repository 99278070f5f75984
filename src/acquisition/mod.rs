//! Sensor data acquisition
//!
//! Handles the byte stream from the sensor node: device lifecycle, line
//! setup and reads with timeouts, and reassembly of multi-line JSON frames.

pub mod device;
pub mod frame_assembler;
pub mod scanner;
pub mod serial;

pub use device::{DeviceError, DeviceSession, LineRead, LineSource};
pub use frame_assembler::{FrameAssembler, FrameError, RawFrame};
