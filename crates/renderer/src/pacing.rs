//! Per-slot fence value bookkeeping.
//!
//! [`FramePacer`] hands out strictly increasing fence values and remembers,
//! per in-flight frame slot, the value stamped by the slot's last submission.
//! Before reusing a slot's command recorder the frame loop waits on
//! [`FramePacer::reclaim_target`] for that slot only, so up to `slot_count`
//! frames of GPU work overlap with CPU recording. Configured with a single
//! slot the pacer degenerates to the serialized submit-then-wait baseline.

/// Fence value arena with one slot per frame in flight.
#[derive(Debug, Clone)]
pub struct FramePacer {
    /// Fence value each slot's last submission will signal. 0 = never
    /// submitted; real values start at 1.
    pending: Vec<u64>,
    /// Next value to hand out.
    next_value: u64,
}

impl FramePacer {
    /// Creates a pacer for `slot_count` in-flight frame slots.
    ///
    /// # Panics
    ///
    /// Panics if `slot_count` is zero.
    pub fn new(slot_count: usize) -> Self {
        assert!(slot_count > 0, "frame pacer needs at least one slot");
        Self {
            pending: vec![0; slot_count],
            next_value: 1,
        }
    }

    /// Returns the number of frame slots.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.pending.len()
    }

    /// Fence value that must have completed before `slot` may be reused.
    ///
    /// Zero means the slot has never been submitted and is free immediately.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    #[inline]
    pub fn reclaim_target(&self, slot: usize) -> u64 {
        self.pending[slot]
    }

    /// Stamps `slot` with the next fence value and returns it.
    ///
    /// The returned value is what the slot's submission must signal on the
    /// frame fence.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn stamp(&mut self, slot: usize) -> u64 {
        let value = self.next_value;
        self.next_value += 1;
        self.pending[slot] = value;
        value
    }

    /// Reserves the next fence value without binding it to a slot.
    ///
    /// Used for drains: signal the reserved value behind all submitted work
    /// and wait for it, covering every slot at once.
    pub fn reserve(&mut self) -> u64 {
        let value = self.next_value;
        self.next_value += 1;
        value
    }

    /// Highest fence value handed out so far (0 before the first).
    #[inline]
    pub fn last_issued(&self) -> u64 {
        self.next_value - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "at least one slot")]
    fn test_zero_slots_rejected() {
        FramePacer::new(0);
    }

    #[test]
    fn test_fresh_slots_are_free() {
        let pacer = FramePacer::new(2);
        assert_eq!(pacer.reclaim_target(0), 0);
        assert_eq!(pacer.reclaim_target(1), 0);
        assert_eq!(pacer.last_issued(), 0);
    }

    #[test]
    fn test_values_strictly_increase() {
        let mut pacer = FramePacer::new(2);
        let mut previous = 0;
        for frame in 0..10 {
            let value = pacer.stamp(frame % 2);
            assert!(value > previous);
            previous = value;
        }
        assert_eq!(pacer.last_issued(), 10);
    }

    #[test]
    fn test_first_stamped_value_is_one() {
        let mut pacer = FramePacer::new(2);
        assert_eq!(pacer.stamp(0), 1);
    }

    #[test]
    fn test_single_slot_serializes() {
        // With one slot every tick waits on the value stamped by the frame
        // just submitted, which is the signal-then-wait baseline.
        let mut pacer = FramePacer::new(1);
        for _ in 0..5 {
            let reclaim = pacer.reclaim_target(0);
            assert_eq!(reclaim, pacer.last_issued());
            pacer.stamp(0);
        }
    }

    #[test]
    fn test_two_slots_wait_one_frame_behind() {
        let mut pacer = FramePacer::new(2);

        // Frames 1 and 2 find free slots.
        assert_eq!(pacer.reclaim_target(0), 0);
        assert_eq!(pacer.stamp(0), 1);
        assert_eq!(pacer.reclaim_target(1), 0);
        assert_eq!(pacer.stamp(1), 2);

        // Frame 3 reclaims slot 0 and waits on value 1, not 2: the GPU may
        // still be working on frame 2 while frame 3 records.
        assert_eq!(pacer.reclaim_target(0), 1);
        assert_eq!(pacer.stamp(0), 3);
        assert_eq!(pacer.reclaim_target(1), 2);
    }

    #[test]
    fn test_reserve_covers_all_slots() {
        let mut pacer = FramePacer::new(2);
        pacer.stamp(0);
        pacer.stamp(1);

        let drain = pacer.reserve();
        assert!(drain > pacer.reclaim_target(0));
        assert!(drain > pacer.reclaim_target(1));
        assert_eq!(pacer.last_issued(), drain);
    }

    #[test]
    fn test_reserve_does_not_touch_slots() {
        let mut pacer = FramePacer::new(2);
        pacer.stamp(0);
        let before = (pacer.reclaim_target(0), pacer.reclaim_target(1));
        pacer.reserve();
        assert_eq!((pacer.reclaim_target(0), pacer.reclaim_target(1)), before);
    }
}
