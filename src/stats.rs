use std::fmt;

use crate::{block::HEADER_SIZE, heap::BlockInfo};

/// Totals over the block list at one point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
  pub blocks: usize,
  pub free_blocks: usize,
  /// Payload bytes of blocks currently handed out, slack included.
  pub used_bytes: usize,
  /// Payload bytes of blocks waiting to be reused.
  pub free_bytes: usize,
}

impl HeapStats {
  /// Bytes taken by headers.
  pub fn overhead_bytes(&self) -> usize {
    self.blocks * HEADER_SIZE
  }

  /// Everything the block list spans, headers included.
  pub fn heap_bytes(&self) -> usize {
    self.overhead_bytes() + self.used_bytes + self.free_bytes
  }
}

impl FromIterator<BlockInfo> for HeapStats {
  fn from_iter<I: IntoIterator<Item = BlockInfo>>(blocks: I) -> Self {
    blocks
      .into_iter()
      .fold(HeapStats::default(), |mut stats, block| {
        stats.blocks += 1;
        if block.is_free {
          stats.free_blocks += 1;
          stats.free_bytes += block.size;
        } else {
          stats.used_bytes += block.size;
        }
        stats
      })
  }
}

impl fmt::Display for HeapStats {
  fn fmt(
    &self,
    f: &mut fmt::Formatter,
  ) -> fmt::Result {
    write!(
      f,
      "{} blocks ({} free), {} bytes used, {} bytes free, {} bytes of headers",
      self.blocks,
      self.free_blocks,
      self.used_bytes,
      self.free_bytes,
      self.overhead_bytes()
    )
  }
}
