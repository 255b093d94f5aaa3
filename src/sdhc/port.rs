use super::regs::*;
use crate::hal::{Mmio, Reg32, VirtAddr};

/// Everything the request machinery needs from the hardware.
///
/// One implementor per controller instance. Keeping this behind a trait
/// keeps the state machine independent of how the registers are reached.
pub trait SdhcPort {
    /// Soft reset followed by the full register init sequence. Leaves the
    /// clock off, the word FIFO enabled and all serviced interrupts
    /// unmasked.
    fn reset(&mut self);

    /// Program the clock control and card option registers, in that order.
    fn set_clk_opt(&mut self, clk: u16, opt: u16);

    /// Latch the argument, then the command word. Writing the command word
    /// starts the transaction.
    fn send_cmdarg(&mut self, cmd: u16, arg: u32);

    /// Program block geometry into both the 16-bit and 32-bit transfer
    /// register pairs. Must happen before the command is sent.
    fn set_blk_len_cnt(&mut self, len: u16, cnt: u16);

    /// Copy out as many raw response words as `resp` holds.
    fn read_resp(&self, resp: &mut [u32]);

    fn stop_internal(&mut self, val: u16);

    fn irqstat(&self) -> u32;

    /// Acknowledge the given status bits. Level status bits ignore this.
    fn irqstat_ack(&mut self, ack: u32);

    fn data32_ctl(&self) -> u16;

    fn read_fifo(&mut self, words: &mut [u32]);

    fn write_fifo(&mut self, words: &[u32]);

    /// Check for a pending card interrupt and clear it if set.
    fn sdio_irq_pending(&mut self) -> bool;

    fn sdio_irq_enable(&mut self, enable: bool);
}

/// Memory-mapped controller instance.
pub struct MmioPort {
    regs: Mmio<'static, SdhcRegs>,
    fifo: Mmio<'static, Reg32>,
}

impl MmioPort {
    /// # Safety
    ///
    /// Both addresses must point at mapped, live controller registers of the
    /// same instance and must not be aliased by another handle.
    pub unsafe fn new(regs_addr: VirtAddr, fifo_addr: VirtAddr) -> Self {
        Self {
            regs: Mmio::from_raw(regs_addr),
            fifo: Mmio::from_raw(fifo_addr),
        }
    }
}

impl SdhcPort for MmioPort {
    fn reset(&mut self) {
        self.regs.softreset.write(0);
        self.regs.softreset.write(1);
        self.regs.portsel.write(0);
        self.regs.clk_ctl.write(0);
        self.regs.error_status.write(0);
        self.regs.stop_internal.write(0);
        self.regs.data16_blk_cnt.write(0);
        self.regs.data16_blk_len.write(0);
        self.regs.data32_blk_cnt.write(0);
        self.regs.data32_blk_len.write(0);
        self.regs.data_ctl.write(DATA_CTL_WORD_FIFO_EN);
        self.regs.data32_ctl.write((Data32Ctl::WORD_FIFO_EN | Data32Ctl::WORD_FIFO_CLR).bits());
        self.regs.irq_mask.write(!IrqStat::DEFAULT_MASK.bits());
        self.irqstat_ack(IrqStat::DEFAULT_MASK.bits());
        self.regs.card_option.write(DEFAULT_CARD_OPTION);
    }

    fn set_clk_opt(&mut self, clk: u16, opt: u16) {
        self.regs.clk_ctl.write(clk);
        self.regs.card_option.write(opt);
    }

    fn send_cmdarg(&mut self, cmd: u16, arg: u32) {
        self.regs.cmd_param.write(arg);
        self.regs.cmd.write(cmd);
    }

    fn set_blk_len_cnt(&mut self, len: u16, cnt: u16) {
        self.regs.data16_blk_len.write(len);
        self.regs.data16_blk_cnt.write(cnt);
        self.regs.data32_blk_len.write(len);
        self.regs.data32_blk_cnt.write(cnt);
    }

    fn read_resp(&self, resp: &mut [u32]) {
        for (slot, reg) in resp.iter_mut().zip(self.regs.response.iter()) {
            *slot = reg.read();
        }
    }

    fn stop_internal(&mut self, val: u16) {
        self.regs.stop_internal.write(val);
    }

    fn irqstat(&self) -> u32 {
        self.regs.irq_stat.read()
    }

    fn irqstat_ack(&mut self, ack: u32) {
        // Zero acknowledges, so keep everything except the acked bits high.
        self.regs.irq_stat.write(!ack);
    }

    fn data32_ctl(&self) -> u16 {
        self.regs.data32_ctl.read()
    }

    fn read_fifo(&mut self, words: &mut [u32]) {
        for word in words.iter_mut() {
            *word = self.fifo.read();
        }
    }

    fn write_fifo(&mut self, words: &[u32]) {
        for word in words.iter() {
            self.fifo.write(*word);
        }
    }

    fn sdio_irq_pending(&mut self) -> bool {
        let state = self.regs.card_irq_stat.read();
        if state & 1 != 0 {
            self.regs.card_irq_stat.write(state & !1);
            return true;
        }
        false
    }

    fn sdio_irq_enable(&mut self, enable: bool) {
        self.regs.card_irq_stat.write(0);
        self.regs.card_irq_mask.write(if enable { !1 } else { !0 });
    }
}
