#![cfg_attr(not(test), no_std)]

extern crate alloc;
#[macro_use]
extern crate log;

pub mod error;
pub mod hal;
pub mod sdhc;

pub use error::{SdError, SdResult};
pub use sdhc::{
    Command, Data, DataFlags, Ios, MmcResp, MmioPort, PowerMode, Request, SdhcClient, SdhcHost,
    SdhcPort, Segment,
};
