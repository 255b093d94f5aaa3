use alloc::sync::Arc;

use embedded_hal::blocking::delay::DelayMs;
use spin::Mutex;

use super::*;
use crate::error::{SdError, SdResult};

/// Largest transfer geometry the controller accepts.
pub const MAX_BLOCK_SIZE: u16 = 0x200;
pub const MAX_BLOCK_COUNT: u16 = 0xffff;
pub const MAX_SEGMENTS: usize = 1;

/// At rates this fast the clock pin is frozen while the bus idles.
const CLK_FREEZE_THRESHOLD: u32 = 5_000_000;
/// Settle time after reprogramming clock or bus width, in milliseconds.
const CLK_SETTLE_MS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    Off,
    Up,
    On,
}

/// Requested bus operating point, applied by [`SdhcHost::set_ios`].
#[derive(Debug, Clone, Copy)]
pub struct Ios {
    /// Target card clock in Hz. Zero gates the clock off.
    pub clock: u32,
    /// Data line count, 1 or 4.
    pub bus_width: u32,
    pub power: PowerMode,
}

/// Upcalls into the block-storage stack above the controller.
///
/// Every method is invoked with the host lock held. Implementations must
/// not call back into the host from inside them.
pub trait SdhcClient: Send + Sync {
    /// A request is finished and ownership moves back to the stack. The
    /// outcome sits in `cmd.error` and, for transfers, `data.error` and
    /// `data.bytes_xfered`.
    fn request_done(&self, mrq: Request);

    /// A card may have been inserted or removed.
    fn card_change(&self);

    /// The card raised its SDIO interrupt line.
    fn sdio_interrupt(&self);
}

/// One SD host controller instance.
///
/// A single lock covers the whole controller state. Both interrupt lines
/// and every caller-facing entry point funnel through it, so interrupt
/// handling never races request submission.
pub struct SdhcHost<P, D> {
    inner: Mutex<SdhcInner<P, D>>,
}

struct SdhcInner<P, D> {
    port: P,
    delay: D,
    clock_rate: u32,
    mrq: Option<Request>,
    cursor: SgCursor,
    client: Arc<dyn SdhcClient>,
}

impl<P: SdhcPort, D: DelayMs<u32>> SdhcHost<P, D> {
    /// `clock_rate` is the controller source clock in Hz, before the
    /// divider.
    pub fn new(port: P, delay: D, clock_rate: u32, client: Arc<dyn SdhcClient>) -> Self {
        Self {
            inner: Mutex::new(SdhcInner {
                port,
                delay,
                clock_rate,
                mrq: None,
                cursor: SgCursor::default(),
                client,
            }),
        }
    }

    /// Full controller reset. Call once before unmasking the interrupt
    /// lines, and again whenever the card slot needs a clean slate.
    pub fn reset(&self) {
        self.inner.lock().port.reset();
    }

    /// Fastest card clock the divider can produce.
    pub fn max_clock(&self) -> u32 {
        self.inner.lock().clock_rate / 2
    }

    /// Slowest card clock the divider can produce.
    pub fn min_clock(&self) -> u32 {
        self.inner.lock().clock_rate / 512
    }

    pub fn card_present(&self) -> bool {
        self.inner.lock().card_present()
    }

    /// The write-enable switch reads as set when the card is writable.
    pub fn write_protected(&self) -> bool {
        let inner = self.inner.lock();
        !IrqStat::from_bits_truncate(inner.port.irqstat()).contains(IrqStat::WRITE_ENABLE)
    }

    /// Submit a request. Completion is always reported through
    /// [`SdhcClient::request_done`], exactly once per request, including
    /// every rejection path.
    pub fn start(&self, mrq: Request) {
        self.inner.lock().start(mrq);
    }

    /// Apply a new bus operating point. Returns [`SdError::InvalidParam`]
    /// for a bus width the controller lacks, without touching the hardware.
    pub fn set_ios(&self, ios: &Ios) -> SdResult {
        self.inner.lock().set_ios(ios)
    }

    pub fn enable_sdio_irq(&self, enable: bool) {
        self.inner.lock().port.sdio_irq_enable(enable);
    }

    /// Service one assertion of the command/data interrupt line.
    pub fn handle_irq(&self) {
        self.inner.lock().handle_irq();
    }

    /// Service one assertion of the card interrupt line. Returns whether
    /// the card actually had an interrupt pending.
    pub fn handle_sdio_irq(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.port.sdio_irq_pending() {
            inner.client.sdio_interrupt();
            return true;
        }
        false
    }
}

impl<P: SdhcPort, D: DelayMs<u32>> SdhcInner<P, D> {
    fn card_present(&self) -> bool {
        IrqStat::from_bits_truncate(self.port.irqstat()).contains(IrqStat::CARD_PRESENT)
    }

    /// Complete a request that never made it into the in-flight slot.
    fn reject(&mut self, mut mrq: Request, err: SdError) {
        mrq.cmd.error = Some(err);
        self.client.request_done(mrq);
    }

    fn start(&mut self, mrq: Request) {
        if !self.card_present() {
            self.reject(mrq, SdError::NoMedium);
            return;
        }
        if self.mrq.is_some() {
            warn!(
                "CMD{} submitted while another request is in flight",
                mrq.cmd.opcode
            );
            self.reject(mrq, SdError::Busy);
            return;
        }
        self.mrq = Some(mrq);
        self.start_mrq();
    }

    fn start_mrq(&mut self) {
        let (opcode, arg, resptype, dataparm) = match self.mrq.as_ref() {
            Some(mrq) => (
                mrq.cmd.opcode,
                mrq.cmd.arg,
                mrq.cmd.resptype,
                mrq.data.as_ref().map(|d| (d.blksz, d.blocks, d.is_read())),
            ),
            None => return,
        };

        // The controller issues stop-transmission on its own. Sending it as
        // a real command confuses the state machine, so fake the response.
        if opcode == MMC_STOP_TRANSMISSION {
            self.port.stop_internal(STOP_INTERNAL_ISSUE);
            if let Some(mrq) = self.mrq.as_mut() {
                mrq.cmd.resp = [opcode, 0, 0, 0];
            }
            self.finish_request(None);
            return;
        }

        let mut c = CmdWord::empty();
        if resptype == MmcResp::NONE {
            c |= CmdWord::RESP_NONE;
        } else if resptype == MmcResp::R1 {
            c |= CmdWord::RESP_R1;
        } else if resptype == MmcResp::R1B {
            c |= CmdWord::RESP_R1B;
        } else if resptype == MmcResp::R2 {
            c |= CmdWord::RESP_R2;
        } else if resptype == MmcResp::R3 {
            c |= CmdWord::RESP_R3;
        } else {
            error!("unknown response type {:?}", resptype);
            self.finish_request(Some(SdError::InvalidParam));
            return;
        }

        if opcode == SD_IO_RW_DIRECT || opcode == SD_IO_RW_EXTENDED {
            c |= CmdWord::SECURE;
        }
        if opcode == MMC_APP_CMD {
            c |= CmdWord::APP_CMD;
        }

        if let Some((blksz, blocks, read)) = dataparm {
            c |= CmdWord::DATA_XFER;
            if blocks > 1 {
                self.port.stop_internal(STOP_INTERNAL_ENABLE);
                c |= CmdWord::DATA_MULTI;
            }
            if read {
                c |= CmdWord::DATA_READ;
            }
            debug!("data transfer: {} blocks of {} bytes", blocks, blksz);
            self.cursor.rewind();
            self.port.set_blk_len_cnt(blksz, blocks);
        }

        debug!("issuing CMD{}, arg 0x{:08x}", opcode, arg);
        self.port.send_cmdarg(c.bits() | opcode as u16, arg);
    }

    fn handle_irq(&mut self) {
        let raw = self.port.irqstat();
        let stat = IrqStat::from_bits_truncate(raw);
        debug!("IRQ status: 0x{:08x}", raw);
        self.port.irqstat_ack((stat & IrqStat::DEFAULT_MASK).bits());

        if self.hotplug_irq(stat) {
            return;
        }

        if self.mrq.is_none() {
            debug!("stale interrupt, no request in flight");
            return;
        }

        let error = if stat.contains(IrqStat::CMD_TIMEOUT) {
            Some(SdError::Timeout)
        } else if stat.contains(IrqStat::CRC_FAIL) {
            Some(SdError::DataCrc)
        } else if stat.intersects(IrqStat::ERR_MASK) {
            error!("buffer error: 0x{:08x}", (stat & IrqStat::ERR_MASK).bits());
            Some(SdError::Io)
        } else {
            None
        };

        if let Some(err) = error {
            if let Some(mrq) = self.mrq.as_mut() {
                mrq.cmd.error = Some(err);
            }
            // A timed out command can still carry its response end and data
            // end bits in this same status word.
            if err != SdError::Timeout {
                return;
            }
        }

        self.data_irq();
        self.respend_irq(stat);
        self.dataend_irq(stat);
    }

    fn hotplug_irq(&mut self, stat: IrqStat) -> bool {
        if !stat.intersects(IrqStat::CARD_REMOVE | IrqStat::CARD_INSERT) {
            return false;
        }
        debug!(
            "card hotplug, present: {}",
            stat.contains(IrqStat::CARD_PRESENT)
        );
        self.port.reset();
        if !stat.contains(IrqStat::CARD_PRESENT) {
            self.finish_request(Some(SdError::NoMedium));
        }
        self.client.card_change();
        true
    }

    /// Move at most one block between the FIFO and the current segment.
    fn data_irq(&mut self) {
        let SdhcInner {
            port, mrq, cursor, ..
        } = self;
        let data = match mrq.as_mut().and_then(|m| m.data.as_mut()) {
            Some(data) => data,
            None => return,
        };

        let fifo = Data32Ctl::from_bits_truncate(port.data32_ctl());
        if data.is_read() {
            if !fifo.contains(Data32Ctl::RXRDY) {
                return;
            }
        } else if fifo.contains(Data32Ctl::NTXRQ) {
            return;
        }

        let (addr, remaining) = match cursor.next(&data.sg) {
            Some(chunk) => chunk,
            None => return,
        };
        let count = remaining.min(data.blksz as usize);

        // Segment alignment and length guarantees make this a whole number
        // of live words.
        let words = unsafe { core::slice::from_raw_parts_mut(addr as *mut u32, count >> 2) };
        if data.is_read() {
            port.read_fifo(words);
        } else {
            port.write_fifo(words);
        }
        cursor.consume(count);
    }

    fn respend_irq(&mut self, stat: IrqStat) {
        if !stat.contains(IrqStat::CMD_RESP_END) {
            return;
        }
        let SdhcInner { port, mrq, .. } = self;
        let pending = match mrq.as_mut() {
            Some(pending) => pending,
            None => {
                error!("spurious command response interrupt");
                return;
            }
        };

        let cmd = &mut pending.cmd;
        if cmd.resptype.contains(MmcResp::PRESENT) {
            if cmd.resptype.contains(MmcResp::RESP_136) {
                let mut raw = [0u32; 4];
                port.read_resp(&mut raw);
                cmd.resp = assemble_r2(raw);
            } else {
                let mut first = [0u32; 1];
                port.read_resp(&mut first);
                cmd.resp[0] = first[0];
            }
        }
        debug!("CMD{} response: 0x{:08x}", cmd.opcode, cmd.resp[0]);

        if pending.data.is_some() {
            // completion belongs to the data end interrupt
            return;
        }
        self.finish_request(None);
    }

    fn dataend_irq(&mut self, stat: IrqStat) {
        if !stat.contains(IrqStat::DATA_END) {
            return;
        }
        let err = match self.mrq.as_mut().and_then(|m| m.data.as_mut()) {
            Some(data) => {
                data.bytes_xfered = if data.error.is_some() {
                    0
                } else {
                    u32::from(data.blocks) * u32::from(data.blksz)
                };
                debug!("data end, {} bytes transferred", data.bytes_xfered);
                data.error
            }
            None => {
                warn!("spurious data end interrupt");
                return;
            }
        };
        self.port.stop_internal(0);
        self.finish_request(err);
    }

    /// Single completion choke point. Harmless to call while idle; a
    /// request can only be handed back once because taking it empties the
    /// slot.
    fn finish_request(&mut self, err: Option<SdError>) {
        let mut mrq = match self.mrq.take() {
            Some(mrq) => mrq,
            None => return,
        };
        if let Some(err) = err {
            mrq.cmd.error = Some(err);
        }
        self.client.request_done(mrq);
    }

    fn set_ios(&mut self, ios: &Ios) -> SdResult {
        let mut clk_ctl: u16 = 0;
        if ios.clock != 0 {
            let clkdiv = self.clock_rate / ios.clock;
            if clkdiv > 1 {
                clk_ctl = (clkdiv.next_power_of_two() / 4) as u16;
            }
            clk_ctl |= ClkCtl::PIN_ENABLE.bits();
            if ios.clock >= CLK_FREEZE_THRESHOLD {
                clk_ctl |= ClkCtl::PIN_FREEZE.bits();
            }
        }

        let card_opt = match ios.bus_width {
            1 => DEFAULT_CARD_OPTION | CARD_OPTION_BUS_1BIT,
            4 => DEFAULT_CARD_OPTION,
            width => {
                error!("unsupported bus width {}", width);
                return Err(SdError::InvalidParam);
            }
        };

        if ios.power == PowerMode::Off {
            clk_ctl = 0;
        }

        debug!("clk_ctl 0x{:04x}, card_opt 0x{:04x}", clk_ctl, card_opt);
        self.port.set_clk_opt(clk_ctl, card_opt);
        self.delay.delay_ms(CLK_SETTLE_MS);
        Ok(())
    }
}
