//! Per-connection configuration.

use std::time::Duration;

/// Parameters fixed at connection creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum bytes sent but not yet acknowledged.
    pub send_window: u16,
    /// Maximum bytes buffered on the receive side awaiting the sink.
    pub recv_window: u16,
    /// The retransmission timeout.
    pub rt_timeout: Duration,
    /// The period of the host's timer tick.
    pub timer: Duration,
}

impl Config {
    /// The number of timer ticks that make up one retransmission timeout,
    /// rounded up.
    pub(crate) fn timer_overflow(&self) -> u32 {
        let rt_timeout = self.rt_timeout.as_millis().max(1) as u32;
        let timer = self.timer.as_millis().max(1) as u32;
        if rt_timeout % timer == 0 {
            rt_timeout / timer
        } else {
            rt_timeout / timer + 1
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            send_window: 2000,
            recv_window: 2000,
            rt_timeout: Duration::from_millis(200),
            timer: Duration::from_millis(40),
        }
    }
}
