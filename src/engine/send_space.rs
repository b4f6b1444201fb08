//      1         2          3          4
// ----------|----------|----------|----------
//         seqno    next_seqno   seqno
//                              +window
//
// 1 - old sequence numbers which have been acknowledged
// 2 - sequence numbers of unacknowledged data
// 3 - sequence numbers allowed for new data transmission
// 4 - future sequence numbers which are not yet allowed
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct SendSpace {
    /// Lowest unacknowledged byte we have sent
    pub seqno: u32,
    /// Sequence number for the next new byte to be transmitted; doubles as
    /// the cursor while the window is re-walked for retransmission
    pub next_seqno: u32,
    /// Maximum bytes outstanding at once
    pub window: u16,
    /// Bytes currently outstanding
    pub window_used: u16,
}

impl SendSpace {
    pub fn new(window: u16) -> Self {
        Self {
            seqno: 1,
            next_seqno: 1,
            window,
            window_used: 0,
        }
    }
}
