use alloc::vec::Vec;

use super::sg::Segment;
use crate::error::SdError;

// Opcodes the controller special-cases. Everything else goes out untouched.
pub const MMC_STOP_TRANSMISSION: u32 = 12;
pub const SD_IO_RW_DIRECT: u32 = 52;
pub const SD_IO_RW_EXTENDED: u32 = 53;
pub const MMC_APP_CMD: u32 = 55;

bitflags::bitflags! {
    /// Expected response shape of a command.
    pub struct MmcResp: u32 {
        const PRESENT  = 1 << 0;
        const RESP_136 = 1 << 1;
        const CRC      = 1 << 2;
        const BUSY     = 1 << 3;
        const OPCODE   = 1 << 4;

        const NONE = 0;
        const R1 =
            MmcResp::PRESENT.bits |
            MmcResp::CRC.bits |
            MmcResp::OPCODE.bits;
        const R1B =
            MmcResp::R1.bits |
            MmcResp::BUSY.bits;
        const R2 =
            MmcResp::PRESENT.bits |
            MmcResp::RESP_136.bits |
            MmcResp::CRC.bits;
        const R3 = MmcResp::PRESENT.bits;
        const R6 = MmcResp::R1.bits;
        const R7 = MmcResp::R1.bits;
    }

    pub struct DataFlags: u32 {
        const READ  = 1 << 0;
        const WRITE = 1 << 1;
    }
}

#[derive(Debug, Clone)]
pub struct Command {
    pub opcode: u32,
    pub arg: u32,
    pub resptype: MmcResp,
    /// Filled in on completion. Short responses land in `resp[0]`.
    pub resp: [u32; 4],
    pub error: Option<SdError>,
}

impl Command {
    pub fn new(opcode: u32, arg: u32, resptype: MmcResp) -> Self {
        Self {
            opcode,
            arg,
            resptype,
            resp: [0; 4],
            error: None,
        }
    }
}

/// Data phase of a request.
#[derive(Debug)]
pub struct Data {
    pub flags: DataFlags,
    /// Block size in bytes, a multiple of 4, at most [`MAX_BLOCK_SIZE`].
    ///
    /// [`MAX_BLOCK_SIZE`]: super::MAX_BLOCK_SIZE
    pub blksz: u16,
    pub blocks: u16,
    pub sg: Vec<Segment>,
    /// Bytes actually moved, filled in on completion. Zero when the
    /// transfer failed.
    pub bytes_xfered: u32,
    pub error: Option<SdError>,
}

impl Data {
    pub fn new(flags: DataFlags, blksz: u16, blocks: u16, sg: Vec<Segment>) -> Self {
        Self {
            flags,
            blksz,
            blocks,
            sg,
            bytes_xfered: 0,
            error: None,
        }
    }

    pub fn is_read(&self) -> bool {
        self.flags.contains(DataFlags::READ)
    }
}

#[derive(Debug)]
pub struct Request {
    pub cmd: Command,
    pub data: Option<Data>,
}

impl Request {
    pub fn new(cmd: Command) -> Self {
        Self { cmd, data: None }
    }

    pub fn with_data(cmd: Command, data: Data) -> Self {
        Self {
            cmd,
            data: Some(data),
        }
    }
}

/// The controller latches 136-bit responses shifted right by one byte.
/// Shift each word back up and pull the missing byte out of the next lower
/// word. The lowest byte never made it into the registers and stays zero.
pub(crate) fn assemble_r2(raw: [u32; 4]) -> [u32; 4] {
    [
        (raw[3] << 8) | (raw[2] >> 24),
        (raw[2] << 8) | (raw[1] >> 24),
        (raw[1] << 8) | (raw[0] >> 24),
        raw[0] << 8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_response_reassembly() {
        let raw = [0xAABB_CCDD, 0x1122_3344, 0x5566_7788, 0x99AA_BBCC];
        let out = assemble_r2(raw);

        assert_eq!(out, [0xAABB_CC55, 0x6677_8811, 0x2233_44AA, 0xBBCC_DD00]);
        assert_eq!(out[3] & 0xff, 0);
    }

    #[test]
    fn response_classes() {
        assert!(MmcResp::R2.contains(MmcResp::RESP_136));
        assert!(!MmcResp::R1.contains(MmcResp::RESP_136));
        assert!(MmcResp::R1B.contains(MmcResp::BUSY));
        assert_eq!(MmcResp::R6, MmcResp::R1);
        assert_eq!(MmcResp::R7, MmcResp::R1);
        assert!(MmcResp::NONE.is_empty());
    }
}
