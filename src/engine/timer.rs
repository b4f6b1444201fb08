/// The retransmission timer, measured in whole timer ticks rather than
/// wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetransmitTimer {
    /// Whether a retransmission is pending acknowledgement
    pub armed: bool,
    /// Ticks elapsed since the timer last expired or was acknowledged
    pub counter: u32,
    /// Consecutive full timeouts without an acknowledgement
    pub expirations: u32,
    /// Ticks per full timeout, fixed at connection creation
    overflow: u32,
}

impl RetransmitTimer {
    pub fn new(overflow: u32) -> Self {
        Self {
            armed: false,
            counter: 0,
            expirations: 0,
            overflow: overflow.max(1),
        }
    }

    /// Arms the timer. The running counter is preserved; only an
    /// acknowledgement resets it.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Records progress from the peer: the countdown starts over and the
    /// consecutive-timeout tally is cleared.
    pub fn acknowledge(&mut self) {
        self.counter = 0;
        self.expirations = 0;
    }

    /// Advances the timer by one tick. Returns true when a full timeout has
    /// elapsed, in which case `expirations` has been incremented.
    pub fn advance(&mut self) -> bool {
        self.counter += 1;
        if self.counter == self.overflow {
            self.counter = 0;
            self.expirations += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_every_overflow_ticks() {
        let mut timer = RetransmitTimer::new(5);
        timer.arm();
        for _ in 0..4 {
            assert!(!timer.advance());
        }
        assert!(timer.advance());
        assert_eq!(timer.expirations, 1);
        assert_eq!(timer.counter, 0);

        for _ in 0..4 {
            assert!(!timer.advance());
        }
        assert!(timer.advance());
        assert_eq!(timer.expirations, 2);
    }

    #[test]
    fn acknowledge_clears_progress() {
        let mut timer = RetransmitTimer::new(5);
        timer.arm();
        for _ in 0..7 {
            timer.advance();
        }
        assert_eq!(timer.expirations, 1);
        timer.acknowledge();
        assert_eq!(timer.counter, 0);
        assert_eq!(timer.expirations, 0);
        assert!(timer.armed);
    }

    #[test]
    fn zero_overflow_is_clamped() {
        let mut timer = RetransmitTimer::new(0);
        assert!(timer.advance());
    }
}
