/* #REF: GBATEK "DSi SD/MMC Ports" register map, shared by this controller family */

use crate::hal::{Reg16, Reg32};
use static_assertions::const_assert_eq;

/// Register block of one controller instance.
///
/// The block mixes 16-bit and 32-bit registers. The 32-bit data FIFO is not
/// part of this block; it sits at its own mapped address.
#[repr(C)]
pub struct SdhcRegs {
    pub cmd: Reg16,            // 0x000
    pub portsel: Reg16,        // 0x002
    pub cmd_param: Reg32,      // 0x004
    pub stop_internal: Reg16,  // 0x008
    pub data16_blk_cnt: Reg16, // 0x00a
    pub response: [Reg32; 4],  // 0x00c
    pub irq_stat: Reg32,       // 0x01c
    pub irq_mask: Reg32,       // 0x020
    pub clk_ctl: Reg16,        // 0x024
    pub data16_blk_len: Reg16, // 0x026
    pub card_option: Reg16,    // 0x028
    pub res1: Reg16,           // 0x02a
    pub error_status: Reg32,   // 0x02c
    pub data16_fifo: Reg16,    // 0x030
    pub res2: Reg16,           // 0x032
    pub card_irq_stat: Reg16,  // 0x034
    pub card_irq_mask: Reg16,  // 0x036
    pub res3: [Reg16; 80],     // 0x038
    pub data_ctl: Reg16,       // 0x0d8
    pub res4: [Reg16; 3],      // 0x0da
    pub softreset: Reg16,      // 0x0e0
    pub version: Reg16,        // 0x0e2
    pub res5: [Reg16; 14],     // 0x0e4
    pub data32_ctl: Reg16,     // 0x100
    pub res6: Reg16,           // 0x102
    pub data32_blk_len: Reg16, // 0x104
    pub res7: Reg16,           // 0x106
    pub data32_blk_cnt: Reg16, // 0x108
    pub res8: Reg16,           // 0x10a
}

const_assert_eq!(core::mem::size_of::<SdhcRegs>(), 0x10c);

bitflags::bitflags! {
    /// Interrupt status word. Writing the complement of a bit acknowledges
    /// it; the presence and write-enable bits are level status and cannot be
    /// acknowledged away.
    pub struct IrqStat: u32 {
        const CMD_RESP_END   = 1 << 0;
        const DATA_END       = 1 << 2;
        const CARD_REMOVE    = 1 << 3;
        const CARD_INSERT    = 1 << 4;
        const CARD_PRESENT   = 1 << 5;
        const WRITE_ENABLE   = 1 << 7;
        const BAD_CMD        = 1 << 16;
        const CRC_FAIL       = 1 << 17;
        const STOP_BIT       = 1 << 18;
        const DATA_TIMEOUT   = 1 << 19;
        const TX_OVERFLOW    = 1 << 20;
        const RX_UNDERRUN    = 1 << 21;
        const CMD_TIMEOUT    = 1 << 22;
        const ILLEGAL_ACCESS = 1 << 31;

        const ERR_MASK =
            IrqStat::BAD_CMD.bits |
            IrqStat::CRC_FAIL.bits |
            IrqStat::STOP_BIT.bits |
            IrqStat::DATA_TIMEOUT.bits |
            IrqStat::TX_OVERFLOW.bits |
            IrqStat::RX_UNDERRUN.bits |
            IrqStat::CMD_TIMEOUT.bits |
            IrqStat::ILLEGAL_ACCESS.bits;

        const DEFAULT_MASK =
            IrqStat::CMD_RESP_END.bits |
            IrqStat::DATA_END.bits |
            IrqStat::CARD_REMOVE.bits |
            IrqStat::CARD_INSERT.bits |
            IrqStat::ERR_MASK.bits;
    }

    /// Command register word. Bits 0-5 carry the opcode index.
    pub struct CmdWord: u16 {
        const APP_CMD    = 1 << 6;
        const RESP_NONE  = 3 << 8;
        const RESP_R1    = 4 << 8;
        const RESP_R1B   = 5 << 8;
        const RESP_R2    = 6 << 8;
        const RESP_R3    = 7 << 8;
        const DATA_XFER  = 1 << 11;
        const DATA_READ  = 1 << 12;
        const DATA_MULTI = 1 << 13;
        const SECURE     = 1 << 14;
    }

    pub struct ClkCtl: u16 {
        // 7:0 - card clock divider
        const PIN_ENABLE = 1 << 8;
        const PIN_FREEZE = 1 << 9;
    }

    /// Word FIFO control and handshake status.
    pub struct Data32Ctl: u16 {
        const WORD_FIFO_EN  = 1 << 1;
        const WORD_FIFO_CLR = 1 << 2;
        const RXRDY         = 1 << 8;
        const NTXRQ         = 1 << 9;
    }
}

pub const DATA_CTL_WORD_FIFO_EN: u16 = 1 << 1;

pub const STOP_INTERNAL_ISSUE: u16 = 1 << 0;
pub const STOP_INTERNAL_ENABLE: u16 = 1 << 8;

pub const CARD_OPTION_NO_C2: u16 = 1 << 14;
pub const CARD_OPTION_BUS_1BIT: u16 = 1 << 15;

pub const fn card_option_retries(n: u16) -> u16 {
    n & 0xf
}

pub const fn card_option_timeout(exp: u16) -> u16 {
    (exp & 0xf) << 4
}

pub const DEFAULT_CARD_OPTION: u16 =
    card_option_retries(14) | card_option_timeout(14) | CARD_OPTION_NO_C2;
