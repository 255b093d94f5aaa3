use crate::hal::PhysAddr;

mod cmd;
mod host;
mod port;
mod regs;
mod sg;

pub use cmd::*;
pub use host::*;
pub use port::*;
pub use regs::*;
pub use sg::*;

/// Card slot controller.
pub const SDHC0_BASE_ADDR: PhysAddr = 0x1000_6000;
/// Wifi module controller.
pub const SDHC1_BASE_ADDR: PhysAddr = 0x1000_7000;
pub const SDHC_MMIO_SIZE: usize = 0x1000;
/// The 32-bit FIFO sits apart from the register block, in the page after it.
pub const SDHC_FIFO_OFFSET: usize = 0x200c;
