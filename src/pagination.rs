/// Offset/limit counter applied to the post-filter row stream.
///
/// Rows are first spent on the offset; once it is exhausted they are emitted while limit
/// remains. An unlimited controller has no offset and never runs out of limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationController {
    cur_offset: u64,
    cur_limit: Option<u64>,
}

impl PaginationController {
    /// `limit = None` means no cap. `Some(0)` emits nothing.
    pub fn new(offset: u64, limit: Option<u64>) -> Self {
        Self {
            cur_offset: offset,
            cur_limit: limit,
        }
    }

    pub const fn unlimited() -> Self {
        Self {
            cur_offset: 0,
            cur_limit: None,
        }
    }

    pub fn has_limit(&self) -> bool {
        self.cur_limit.is_some()
    }

    /// Remaining limit, if one is set.
    pub fn cur_limit(&self) -> Option<u64> {
        self.cur_limit
    }

    pub fn cur_offset(&self) -> u64 {
        self.cur_offset
    }

    #[inline]
    pub fn has_cur_offset(&self) -> bool {
        self.cur_offset > 0
    }

    #[inline]
    pub fn consume_offset(&mut self) {
        self.cur_offset = self.cur_offset.saturating_sub(1);
    }

    #[inline]
    pub fn has_cur_limit(&self) -> bool {
        self.cur_limit.map_or(true, |l| l > 0)
    }

    #[inline]
    pub fn consume_limit(&mut self) {
        if let Some(l) = self.cur_limit.as_mut() {
            *l = l.saturating_sub(1);
        }
    }
}

impl Default for PaginationController {
    fn default() -> Self {
        Self::unlimited()
    }
}
