use crate::hal::VirtAddr;

/// One contiguous piece of a transfer buffer.
///
/// The address must stay valid for the whole life of the request carrying
/// it, must be 4-byte aligned, and `len` must be a multiple of 4. The word
/// FIFO cannot move anything smaller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub addr: VirtAddr,
    pub len: usize,
}

impl Segment {
    pub fn new(addr: VirtAddr, len: usize) -> Self {
        Self { addr, len }
    }
}

/// Position inside a segment list. The pump moves one block per data
/// interrupt, so the position has to survive between interrupts.
#[derive(Debug, Default)]
pub(crate) struct SgCursor {
    seg: usize,
    offset: usize,
}

impl SgCursor {
    pub(crate) fn rewind(&mut self) {
        self.seg = 0;
        self.offset = 0;
    }

    /// Current unconsumed chunk: its base address and the bytes left in the
    /// segment holding it. Exhausted segments are skipped; `None` once the
    /// whole list is spent. Repeated calls without `consume` in between
    /// return the same chunk.
    pub(crate) fn next(&mut self, sg: &[Segment]) -> Option<(VirtAddr, usize)> {
        while self.seg < sg.len() && self.offset >= sg[self.seg].len {
            self.seg += 1;
            self.offset = 0;
        }
        let seg = sg.get(self.seg)?;
        Some((seg.addr + self.offset, seg.len - self.offset))
    }

    pub(crate) fn consume(&mut self, bytes: usize) {
        self.offset += bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_single_segment_in_block_steps() {
        let sg = [Segment::new(0x1000, 1024)];
        let mut cursor = SgCursor::default();

        assert_eq!(cursor.next(&sg), Some((0x1000, 1024)));
        cursor.consume(512);
        assert_eq!(cursor.next(&sg), Some((0x1200, 512)));
        cursor.consume(512);
        assert_eq!(cursor.next(&sg), None);
    }

    #[test]
    fn peek_is_stable_without_consume() {
        let sg = [Segment::new(0x2000, 64)];
        let mut cursor = SgCursor::default();

        assert_eq!(cursor.next(&sg), Some((0x2000, 64)));
        assert_eq!(cursor.next(&sg), Some((0x2000, 64)));
    }

    #[test]
    fn skips_exhausted_segments() {
        let sg = [Segment::new(0x1000, 512), Segment::new(0x8000, 512)];
        let mut cursor = SgCursor::default();

        cursor.next(&sg);
        cursor.consume(512);
        assert_eq!(cursor.next(&sg), Some((0x8000, 512)));
        cursor.consume(512);
        assert_eq!(cursor.next(&sg), None);
    }

    #[test]
    fn rewind_restarts_the_walk() {
        let sg = [Segment::new(0x1000, 512)];
        let mut cursor = SgCursor::default();

        cursor.next(&sg);
        cursor.consume(512);
        assert_eq!(cursor.next(&sg), None);

        cursor.rewind();
        assert_eq!(cursor.next(&sg), Some((0x1000, 512)));
    }
}
