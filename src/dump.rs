//! Dump / inspection: a read-only walk of the block list producing a
//! human-readable summary. Never mutates state, never fails.

use core::fmt;
use core::ptr::NonNull;

use crate::header::BlockHeader;

/// One row of a [`HeapDump`].
#[derive(Debug, Clone, Copy)]
pub struct BlockReport {
    /// 1-based position in the block list.
    pub ordinal: usize,
    pub busy: bool,
    pub payload_begin: usize,
    pub payload_end: usize,
    pub payload_size: usize,
    /// Payload size plus the header.
    pub total_size: usize,
    pub header_begin: usize,
}

/// A snapshot of every block in a [`crate::Heap`], for tests and ad hoc
/// diagnostics.
#[derive(Debug, Clone)]
pub struct HeapDump {
    pub blocks: Vec<BlockReport>,
    pub busy_bytes: usize,
    pub free_bytes: usize,
    pub total_bytes: usize,
}

/// Walks the block list from `head`, producing one [`BlockReport`] per
/// block.
///
/// # Safety
/// `head` must be the live head of a well-formed block list.
pub(crate) unsafe fn dump(head: NonNull<BlockHeader>) -> HeapDump {
    let mut blocks = Vec::new();
    let mut busy_bytes = 0usize;
    let mut free_bytes = 0usize;

    let mut current = Some(head);
    let mut ordinal = 1;
    while let Some(node) = current {
        // SAFETY: every node reachable from `head` is a live header.
        let block = unsafe { node.as_ref() };
        let header_begin = node.as_ptr() as usize;
        let payload_begin = header_begin + BlockHeader::HEADER_SIZE;
        let payload_size = block.payload_len();
        let payload_end = payload_begin + payload_size;
        let total_size = payload_size + BlockHeader::HEADER_SIZE;

        if block.is_free() {
            free_bytes += total_size;
        } else {
            busy_bytes += total_size;
        }

        blocks.push(BlockReport {
            ordinal,
            busy: !block.is_free(),
            payload_begin,
            payload_end,
            payload_size,
            total_size,
            header_begin,
        });

        ordinal += 1;
        current = block.next;
    }

    HeapDump {
        blocks,
        busy_bytes,
        free_bytes,
        total_bytes: busy_bytes + free_bytes,
    }
}

impl fmt::Display for HeapDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "************************************Block list***********************************"
        )?;
        writeln!(f, "No.\tStatus\tBegin\t\tEnd\t\tSize\tt_Size\tt_Begin")?;
        writeln!(
            f,
            "---------------------------------------------------------------------------------"
        )?;
        for block in &self.blocks {
            writeln!(
                f,
                "{}\t{}\t0x{:08x}\t0x{:08x}\t{}\t{}\t0x{:08x}",
                block.ordinal,
                if block.busy { "Busy" } else { "Free" },
                block.payload_begin,
                block.payload_end,
                block.payload_size,
                block.total_size,
                block.header_begin,
            )?;
        }
        writeln!(
            f,
            "---------------------------------------------------------------------------------"
        )?;
        writeln!(f, "Total busy size = {}", self.busy_bytes)?;
        writeln!(f, "Total free size = {}", self.free_bytes)?;
        writeln!(f, "Total size = {}", self.total_bytes)
    }
}
