//     1          2          3
// ----------|----------|----------
//         ackno      ackno
//                   +window
//
// 1 - old sequence numbers which have been acknowledged
// 2 - sequence numbers allowed for new reception
// 3 - future sequence numbers which are not yet allowed
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct ReceiveSpace {
    /// Next in-order byte expected from the peer
    pub ackno: u32,
    /// The previous value of `ackno`, used to recognise a retransmit of the
    /// segment we most recently accepted
    pub last_ackno: u32,
    /// Maximum bytes buffered while awaiting the sink
    pub window: u16,
    /// Bytes currently buffered, delivered or not
    pub window_used: u16,
}

impl ReceiveSpace {
    pub fn new(window: u16) -> Self {
        Self {
            ackno: 1,
            last_ackno: 1,
            window,
            window_used: 0,
        }
    }
}
