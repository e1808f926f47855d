//! Viewport scroll state.
//!
//! The scroll origin is the buffer line shown in the top row of the view:
//! 0 is the live screen, negative values look back into scrollback. Pure
//! state transitions, no I/O.

/// Clamp a scroll origin into `[-history_line_count, 0]`.
#[inline]
pub fn clamp_scroll_origin(origin: i32, history_line_count: usize) -> i32 {
    let oldest = -(history_line_count.min(i32::MAX as usize) as i32);
    origin.clamp(oldest, 0)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScrollState {
    scroll_origin: i32,
    /// Sub-line drag distance not yet turned into whole lines.
    drag_remainder: f32,
    history_line_count: usize,
    alternate_screen: bool,
    reverse: bool,
}

impl ScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invert the drag direction (config `scroll-reverse`).
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn set_reverse(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    pub fn scroll_origin(&self) -> i32 {
        self.scroll_origin
    }

    pub fn drag_remainder(&self) -> f32 {
        self.drag_remainder
    }

    pub fn history_line_count(&self) -> usize {
        self.history_line_count
    }

    pub fn is_alternate_screen(&self) -> bool {
        self.alternate_screen
    }

    pub fn is_at_bottom(&self) -> bool {
        self.scroll_origin == 0
    }

    /// Entering the alternate screen snaps back to the live position.
    pub fn on_buffer_mode_changed(&mut self, alternate_screen: bool) {
        if alternate_screen && !self.alternate_screen {
            self.scroll_origin = 0;
            self.drag_remainder = 0.0;
        }
        self.alternate_screen = alternate_screen;
    }

    /// Re-clamp after the history grew or shrank. Keeps the drag remainder.
    pub fn on_history_length_changed(&mut self, history_line_count: usize) {
        self.history_line_count = history_line_count;
        self.scroll_origin = clamp_scroll_origin(self.scroll_origin, history_line_count);
    }

    /// Accumulate a vertical drag. Positive `delta_px` drags content downward,
    /// revealing older lines.
    ///
    /// Returns `true` if the origin moved.
    pub fn on_drag(&mut self, delta_px: f32, line_height_px: f32) -> bool {
        if self.alternate_screen
            || !delta_px.is_finite()
            || !line_height_px.is_finite()
            || line_height_px <= 0.0
        {
            return false;
        }
        let delta_px = if self.reverse { -delta_px } else { delta_px };

        let total = self.drag_remainder + delta_px;
        if !total.is_finite() {
            return false;
        }
        // `%` is exact, so the remainder stays under one line at any magnitude
        let remainder = total % line_height_px;
        let lines = ((total - remainder) / line_height_px).round();
        self.drag_remainder = remainder;
        if lines == 0.0 {
            return false;
        }

        let reach = self.history_line_count.min(i32::MAX as usize) as f32;
        let lines = lines.clamp(-reach, reach) as i32;
        let before = self.scroll_origin;
        self.scroll_by(lines.saturating_neg());
        self.scroll_origin != before
    }

    /// Scroll by whole lines. Positive `lines` moves toward older history.
    pub fn scroll_lines(&mut self, lines: i32) -> bool {
        if self.alternate_screen {
            return false;
        }
        let before = self.scroll_origin;
        self.scroll_by(lines.saturating_neg());
        self.scroll_origin != before
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_origin = 0;
        self.drag_remainder = 0.0;
    }

    fn scroll_by(&mut self, delta: i32) {
        self.scroll_origin = clamp_scroll_origin(
            self.scroll_origin.saturating_add(delta),
            self.history_line_count,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    fn with_history(lines: usize) -> ScrollState {
        let mut state = ScrollState::new();
        state.on_history_length_changed(lines);
        state
    }

    #[test_case(0, 100, 0 ; "live position")]
    #[test_case(-50, 100, -50 ; "inside history")]
    #[test_case(-150, 100, -100 ; "past oldest line")]
    #[test_case(7, 100, 0 ; "positive origin")]
    #[test_case(-3, 0, 0 ; "no history")]
    fn clamps_origin(origin: i32, history: usize, expected: i32) {
        assert_eq!(clamp_scroll_origin(origin, history), expected);
    }

    #[test]
    fn small_drags_accumulate_into_whole_lines() {
        let mut state = with_history(100);
        for _ in 0..5 {
            state.on_drag(5.0, 20.0);
        }
        assert_eq!(state.scroll_origin(), -1);
        assert_eq!(state.drag_remainder(), 5.0);
    }

    #[test]
    fn upward_drag_returns_toward_live_position() {
        let mut state = with_history(100);
        state.scroll_lines(10);
        assert_eq!(state.scroll_origin(), -10);
        assert!(state.on_drag(-45.0, 20.0));
        assert_eq!(state.scroll_origin(), -8);
        assert_eq!(state.drag_remainder(), -5.0);
    }

    #[test]
    fn reverse_inverts_drag_direction() {
        let mut state = with_history(100).with_reverse(true);
        state.scroll_lines(10);
        state.on_drag(40.0, 20.0);
        assert_eq!(state.scroll_origin(), -8);
    }

    #[test]
    fn drag_is_clamped_to_history() {
        let mut state = with_history(3);
        state.on_drag(200.0, 20.0);
        assert_eq!(state.scroll_origin(), -3);
        assert_eq!(state.drag_remainder(), 0.0);
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-4.0 ; "negative")]
    #[test_case(f32::NAN ; "nan")]
    #[test_case(f32::INFINITY ; "infinite")]
    fn drag_with_bad_line_height_is_ignored(line_height: f32) {
        let mut state = with_history(100);
        assert!(!state.on_drag(50.0, line_height));
        assert_eq!(state.scroll_origin(), 0);
        assert_eq!(state.drag_remainder(), 0.0);
    }

    #[test]
    fn nan_line_height_does_not_poison_later_drags() {
        let mut state = with_history(100);
        assert!(!state.on_drag(5.0, f32::NAN));
        assert!(state.on_drag(100.0, 20.0));
        assert_eq!(state.scroll_origin(), -5);
        assert_eq!(state.drag_remainder(), 0.0);
    }

    #[test_case(-1.0e10 ; "far toward live")]
    #[test_case(1.0e10 ; "far into history")]
    #[test_case(f32::MAX ; "largest finite")]
    #[test_case(f32::MIN ; "smallest finite")]
    fn huge_drags_clamp_without_overflow(delta: f32) {
        let mut state = with_history(50);
        state.scroll_lines(20);
        state.on_drag(delta, 1.0);
        let expected = if delta > 0.0 { -50 } else { 0 };
        assert_eq!(state.scroll_origin(), expected);
        assert!(state.drag_remainder().abs() < 1.0);
    }

    #[test_case(i32::MIN, 0 ; "min lines")]
    #[test_case(i32::MAX, -30 ; "max lines")]
    fn extreme_line_counts_clamp(lines: i32, expected: i32) {
        let mut state = with_history(30);
        state.scroll_lines(lines);
        assert_eq!(state.scroll_origin(), expected);
    }

    #[test]
    fn entering_alternate_screen_resets_origin_and_remainder() {
        let mut state = with_history(100);
        state.on_drag(50.0, 20.0);
        assert_eq!(state.scroll_origin(), -2);

        state.on_buffer_mode_changed(true);
        assert_eq!(state.scroll_origin(), 0);
        assert_eq!(state.drag_remainder(), 0.0);
        assert!(!state.on_drag(100.0, 20.0));
        assert!(!state.scroll_lines(5));
        assert_eq!(state.scroll_origin(), 0);
    }

    #[test]
    fn leaving_alternate_screen_keeps_origin() {
        let mut state = with_history(100);
        state.on_buffer_mode_changed(true);
        state.on_buffer_mode_changed(false);
        state.scroll_lines(4);
        state.on_buffer_mode_changed(false);
        assert_eq!(state.scroll_origin(), -4);
    }

    #[test]
    fn shrinking_history_reclamps_but_keeps_remainder() {
        let mut state = with_history(100);
        state.on_drag(210.0, 20.0);
        assert_eq!(state.scroll_origin(), -10);
        assert_eq!(state.drag_remainder(), 10.0);

        state.on_history_length_changed(4);
        assert_eq!(state.scroll_origin(), -4);
        assert_eq!(state.drag_remainder(), 10.0);
    }

    #[test]
    fn scroll_to_bottom_returns_to_live() {
        let mut state = with_history(100);
        state.scroll_lines(30);
        assert!(!state.is_at_bottom());
        state.scroll_to_bottom();
        assert!(state.is_at_bottom());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Drag(f32, f32),
        Lines(i32),
        History(usize),
        Mode(bool),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-500.0f32..500.0, -5.0f32..40.0).prop_map(|(d, h)| Op::Drag(d, h)),
            (-1.0e12f32..1.0e12, proptest::num::f32::ANY).prop_map(|(d, h)| Op::Drag(d, h)),
            (-200i32..200).prop_map(Op::Lines),
            any::<i32>().prop_map(Op::Lines),
            (0usize..300).prop_map(Op::History),
            any::<bool>().prop_map(Op::Mode),
        ]
    }

    proptest! {
        #[test]
        fn origin_always_within_history(ops in proptest::collection::vec(op(), 0..64)) {
            let mut state = ScrollState::new();
            for op in ops {
                match op {
                    Op::Drag(d, h) => { state.on_drag(d, h); }
                    Op::Lines(n) => { state.scroll_lines(n); }
                    Op::History(n) => state.on_history_length_changed(n),
                    Op::Mode(alt) => state.on_buffer_mode_changed(alt),
                }
                prop_assert!(state.scroll_origin() <= 0);
                prop_assert!(state.scroll_origin() >= -(state.history_line_count() as i32));
            }
        }

        #[test]
        fn remainder_stays_below_one_line(deltas in proptest::collection::vec(-1.0e9f32..1.0e9, 1..32)) {
            let mut state = with_history(10_000);
            for d in deltas {
                state.on_drag(d, 16.0);
                prop_assert!(state.drag_remainder().abs() < 16.0);
            }
        }
    }
}
