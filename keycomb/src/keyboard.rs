//! The polled keyboard: ties the sampler, the gesture classifier and the pattern engine
//! together and holds the event until the host acknowledges it.

use std::fmt::{Debug, Formatter};
use keycomb_gpio::GpioActiveLevel;
use log::{debug, error, info, warn};
use crate::classifier::{Classifier, KeyEdge, PressEvent};
use crate::clock::ClockSource;
use crate::config::{millis, KbdConfig};
use crate::debounce::Sampler;
use crate::error::{KbdError, KbdResult};
use crate::input::PinReader;
use crate::keymap::KeyMap;
use crate::pattern::{PatternEngine, PatternEvent, PatternInput, PatternState};

/// What the keyboard reports to the host.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KbdEvent {
    Press(PressEvent),
    Pattern(PatternEvent),
}

/// A keyboard of 1 to 8 keys, each on its own input pin.
///
/// Call [Keyboard::poll] on every iteration of the control loop, then check
/// [Keyboard::available] and [Keyboard::acknowledge] the event once handled.
pub struct Keyboard<R, C> {
    reader: R,
    clock: C,
    config: KbdConfig,
    keys: Option<KeyMap>,
    pattern_key_code: u8,
    sampler: Sampler,
    classifier: Classifier,
    pattern: PatternEngine,
    event: Option<KbdEvent>,
}

impl<R, C> Debug for Keyboard<R, C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.keys {
            Some(keys) => write!(f, "Keyboard({:?}, {:?})", keys.pins(), self.sampler.active_level()),
            None => write!(f, "Keyboard(uninitialized)"),
        }
    }
}

impl<R: PinReader, C: ClockSource> Keyboard<R, C> {
    /// Creates a keyboard with the default configuration. It does nothing until [Keyboard::begin] succeeds.
    pub fn new(reader: R, clock: C) -> Self {
        Keyboard {
            reader,
            clock,
            config: KbdConfig::default(),
            keys: None,
            pattern_key_code: 0,
            sampler: Sampler::default(),
            classifier: Classifier::default(),
            pattern: PatternEngine::default(),
            event: None,
        }
    }

    pub fn with_config(mut self, config: KbdConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets up the key pins, least significant bit first.
    ///
    /// The first key becomes the pattern key.
    ///
    /// # Errors
    /// - `KbdError::InvalidKeyCount` or `KbdError::DuplicatePin` for an invalid pin list.
    ///   The keyboard then stays disabled and [Keyboard::poll] does nothing.
    pub fn begin(&mut self, active_level: GpioActiveLevel, pins: &[u8]) -> KbdResult<()> {
        self.keys = None;
        self.event = None;
        self.sampler = Sampler::new(active_level);
        self.classifier.reset();
        self.pattern.reset();

        let keys = KeyMap::new(pins).inspect_err(|e| error!("Keyboard setup failed: {}", e))?;
        self.pattern_key_code = 1;
        debug!("Keyboard on pins {:?} ({:?}) initialized.", keys.pins(), active_level);
        self.keys = Some(keys);
        Ok(())
    }

    /// Samples the keys once and advances the gesture and pattern state machines.
    ///
    /// Does nothing before a successful [Keyboard::begin], or while an event waits for
    /// acknowledgment with [KbdConfig::wait_for_ack] set.
    ///
    /// # Errors
    /// - `KbdError::Gpio` if a pin read fails. The state is left as it was.
    pub fn poll(&mut self) -> KbdResult<()> {
        let Some(keys) = &self.keys else {
            return Ok(());
        };
        if self.config.wait_for_ack && self.event.is_some() {
            return Ok(());
        }

        let now = self.clock.now_ms();
        let digits = keys.digits_per_code();
        let sample = self.sampler.sample(&self.reader, keys, now, millis(self.config.bounce_time))?;

        if let Some(sample) = sample {
            if let Some(edge) = self.classifier.update(sample, now) {
                self.on_edge(edge, now, digits);
            }

            if self.pattern.state() == PatternState::Idle {
                if let Some(press) = self.classifier.take_completed(now, millis(self.config.double_click_time)) {
                    debug!("Key event {:?} available.", press);
                    self.event = Some(KbdEvent::Press(press));
                }
            }

            self.report_long_press(now);
        }

        if !self.classifier.is_held() && self.pattern.timed_out(now, millis(self.config.pattern_timeout)) {
            self.feed_pattern(PatternInput::Timeout, now, digits);
        }

        Ok(())
    }

    fn on_edge(&mut self, edge: KeyEdge, now: u32, digits: usize) {
        let input = match edge {
            KeyEdge::Pressed { .. } => PatternInput::Press,
            KeyEdge::Released { code, held_ms }
                if code == self.pattern_key_code
                    && self.config.pattern_hold_band().contains(&held_ms) =>
            {
                PatternInput::Trigger
            }
            KeyEdge::Released { code, .. } => PatternInput::Release { code },
        };

        let before = self.feed_pattern(input, now, digits);

        // A release that the pattern engine saw (or that started it) is consumed and
        // must not come back as a press event.
        let consumed = before != PatternState::Idle || self.pattern.state() != PatternState::Idle;
        if consumed && !matches!(input, PatternInput::Press) {
            self.classifier.reset();
        }
    }

    /// Feeds the pattern engine and returns the state it was in before.
    fn feed_pattern(&mut self, input: PatternInput, now: u32, digits: usize) -> PatternState {
        let before = self.pattern.state();
        let event = self.pattern.step(
            input,
            now,
            digits,
            self.config.pattern_len_limit(),
            self.config.report_pattern,
        );
        if let Some(event) = event {
            debug!("Pattern event {:?} available.", event);
            self.event = Some(KbdEvent::Pattern(event));
        }
        before
    }

    fn report_long_press(&mut self, now: u32) {
        if !matches!(self.pattern.state(), PatternState::Idle | PatternState::Running) {
            return;
        }
        if self.classifier.long_press_due(now, millis(self.config.long_press_report))
            && self.config.report_long_press
        {
            info!(
                "Key code {} long pressed for {} ms.",
                self.classifier.code(),
                self.classifier.duration_ms()
            );
        }
    }

    /// Checks whether a key or pattern event is waiting to be handled.
    pub fn available(&self) -> bool {
        self.event.is_some()
    }

    pub fn event(&self) -> Option<&KbdEvent> {
        self.event.as_ref()
    }

    /// Marks the current event as handled and gets ready for the next gesture.
    ///
    /// Does nothing if no event is available.
    pub fn acknowledge(&mut self) {
        let Some(event) = self.event.take() else {
            return;
        };
        debug!("Event {:?} handled.", event);
        self.pattern.reset();
        self.classifier.reset();
    }

    /// Enters pattern mode right away, as if the pattern key had been held.
    ///
    /// Does nothing if a pattern session is already in progress.
    pub fn start_pattern(&mut self) -> KbdResult<()> {
        let Some(keys) = &self.keys else {
            return Err(KbdError::NotInitialized);
        };
        if self.pattern.state() != PatternState::Idle {
            return Ok(());
        }
        let digits = keys.digits_per_code();
        let now = self.clock.now_ms();
        self.classifier.reset();
        self.feed_pattern(PatternInput::Start, now, digits);
        Ok(())
    }

    /// Gets the key code of the current event, or of the gesture in progress.
    pub fn key_code(&self) -> u8 {
        match &self.event {
            Some(KbdEvent::Press(press)) => press.key_code,
            Some(KbdEvent::Pattern(_)) => 0,
            None => self.classifier.code(),
        }
    }

    /// Gets the number of presses beyond the first one.
    pub fn repeat_count(&self) -> u8 {
        match &self.event {
            Some(KbdEvent::Press(press)) => press.repeat_count,
            Some(KbdEvent::Pattern(_)) => 0,
            None => self.classifier.repeat_count(),
        }
    }

    pub fn duration_ms(&self) -> u32 {
        match &self.event {
            Some(KbdEvent::Press(press)) => press.duration_ms,
            Some(KbdEvent::Pattern(_)) => 0,
            None => self.classifier.duration_ms(),
        }
    }

    /// Checks whether a pattern session is in progress or finished but not yet acknowledged.
    pub fn is_pattern(&self) -> bool {
        self.pattern.state() != PatternState::Idle
    }

    pub fn pattern_state(&self) -> PatternState {
        self.pattern.state()
    }

    /// Gets the pattern collected so far, lowercase hex.
    pub fn pattern_text(&self) -> &str {
        self.pattern.text()
    }

    /// Gets the key code of `pin`, or 0 if the pin is not a key.
    pub fn key_code_for_pin(&self, pin: u8) -> u8 {
        self.keys.as_ref().map_or(0, |keys| keys.code_for_pin(pin))
    }

    pub fn keys(&self) -> Option<&KeyMap> {
        self.keys.as_ref()
    }

    pub fn pattern_key_code(&self) -> u8 {
        self.pattern_key_code
    }

    /// Sets the key code (single key or combination) that starts and ends patterns.
    ///
    /// # Errors
    /// - `KbdError::NotInitialized` before [Keyboard::begin].
    /// - `KbdError::InvalidKeyCode` if the code is 0 or uses bits beyond the configured keys.
    pub fn set_pattern_key_code(&mut self, code: u8) -> KbdResult<()> {
        let keys = self.keys.as_ref().ok_or(KbdError::NotInitialized)?;
        if code == 0 || code & !keys.mask() != 0 {
            return Err(KbdError::InvalidKeyCode(code));
        }
        self.pattern_key_code = code;
        Ok(())
    }

    /// Sets the pattern key by pin.
    ///
    /// # Errors
    /// - `KbdError::NotInitialized` before [Keyboard::begin].
    /// - `KbdError::UnknownPin` if the pin is not a key. The first key is used instead.
    pub fn set_pattern_key_pin(&mut self, pin: u8) -> KbdResult<()> {
        let keys = self.keys.as_ref().ok_or(KbdError::NotInitialized)?;
        match keys.code_for_pin(pin) {
            0 => {
                warn!("Pattern key pin {} not found, using the first key.", pin);
                self.pattern_key_code = 1;
                Err(KbdError::UnknownPin(pin))
            }
            code => {
                self.pattern_key_code = code;
                Ok(())
            }
        }
    }

    pub fn config(&self) -> &KbdConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut KbdConfig {
        &mut self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::input::LevelTable;

    const PINS: [u8; 4] = [0, 2, 4, 36];

    /// Active-low key wiring: idle lines read high.
    struct Bench {
        table: LevelTable,
        clock: ManualClock,
    }

    type TestKeyboard<'a> = Keyboard<&'a LevelTable, &'a ManualClock>;

    impl Bench {
        fn new() -> Self {
            Bench {
                table: LevelTable::new(true),
                clock: ManualClock::new(1000),
            }
        }

        fn keyboard(&self, pins: &[u8]) -> TestKeyboard<'_> {
            let mut kbd = Keyboard::new(&self.table, &self.clock);
            kbd.begin(GpioActiveLevel::Low, pins).unwrap();
            self.run(&mut kbd, 100);
            kbd
        }

        fn run(&self, kbd: &mut TestKeyboard<'_>, ms: u32) {
            for _ in 0..ms {
                self.clock.advance(1);
                kbd.poll().unwrap();
            }
        }

        fn set_code(&self, pins: &[u8], code: u8) {
            for (i, &pin) in pins.iter().enumerate() {
                self.table.set(pin, code & (1 << i) == 0);
            }
        }

        /// Presses the keys of `code`, holds them `hold_ms`, releases and waits `gap_ms`.
        fn tap(&self, kbd: &mut TestKeyboard<'_>, pins: &[u8], code: u8, hold_ms: u32, gap_ms: u32) {
            self.set_code(pins, code);
            self.run(kbd, hold_ms);
            self.set_code(pins, 0);
            self.run(kbd, gap_ms);
        }
    }

    fn press(kbd: &TestKeyboard<'_>) -> PressEvent {
        match kbd.event() {
            Some(KbdEvent::Press(press)) => *press,
            other => panic!("expected a press event, got {:?}", other),
        }
    }

    fn pattern(kbd: &TestKeyboard<'_>) -> String {
        match kbd.event() {
            Some(KbdEvent::Pattern(pattern)) => pattern.text.to_string(),
            other => panic!("expected a pattern event, got {:?}", other),
        }
    }

    #[test]
    fn failed_begin_disables_polling() {
        let bench = Bench::new();
        let mut kbd = Keyboard::new(&bench.table, &bench.clock);
        assert_eq!(kbd.begin(GpioActiveLevel::Low, &[0, 2, 0]), Err(KbdError::DuplicatePin(0)));
        bench.tap(&mut kbd, &[0, 2], 1, 200, 500);
        assert!(!kbd.available());
        assert_eq!(kbd.key_code_for_pin(0), 0);
        assert_eq!(kbd.start_pattern(), Err(KbdError::NotInitialized));
    }

    #[test]
    fn single_press_is_reported_after_double_click_window() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        bench.set_code(&PINS, 4);
        bench.run(&mut kbd, 200);
        assert_eq!(kbd.key_code(), 4);
        bench.set_code(&PINS, 0);
        bench.run(&mut kbd, 300);
        assert!(!kbd.available());
        bench.run(&mut kbd, 100);
        assert_eq!(press(&kbd), PressEvent { key_code: 4, duration_ms: 200, repeat_count: 0 });
    }

    #[test]
    fn bounce_shorter_than_bounce_time_is_ignored() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        bench.tap(&mut kbd, &PINS, 2, 20, 1000);
        assert!(!kbd.available());
        assert_eq!(kbd.key_code(), 0);
    }

    #[test]
    fn double_press_counts_one_repeat() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        bench.tap(&mut kbd, &PINS, 2, 100, 100);
        bench.tap(&mut kbd, &PINS, 2, 100, 400);
        assert_eq!(press(&kbd), PressEvent { key_code: 2, duration_ms: 300, repeat_count: 1 });
    }

    #[test]
    fn slow_presses_are_separate_events() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        bench.tap(&mut kbd, &PINS, 2, 100, 400);
        assert_eq!(press(&kbd).repeat_count, 0);
        kbd.acknowledge();
        assert!(!kbd.available());
        bench.tap(&mut kbd, &PINS, 2, 100, 400);
        assert_eq!(press(&kbd), PressEvent { key_code: 2, duration_ms: 100, repeat_count: 0 });
    }

    #[test]
    fn unread_event_is_overwritten_without_wait_for_ack() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        bench.tap(&mut kbd, &PINS, 4, 100, 400);
        bench.tap(&mut kbd, &PINS, 8, 100, 400);
        assert_eq!(press(&kbd).key_code, 8);
    }

    #[test]
    fn wait_for_ack_pauses_polling() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        kbd.config_mut().wait_for_ack = true;
        bench.tap(&mut kbd, &PINS, 4, 100, 400);
        bench.tap(&mut kbd, &PINS, 8, 100, 400);
        assert_eq!(press(&kbd).key_code, 4);
        kbd.acknowledge();
        bench.run(&mut kbd, 500);
        assert!(!kbd.available());
    }

    #[test]
    fn acknowledge_without_event_is_a_no_op() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        kbd.acknowledge();
        kbd.acknowledge();
        assert!(!kbd.available());

        bench.tap(&mut kbd, &PINS, 1, 100, 400);
        kbd.acknowledge();
        kbd.acknowledge();
        assert!(!kbd.available());
        assert_eq!(kbd.pattern_state(), PatternState::Idle);
    }

    #[test]
    fn hold_just_above_minimum_starts_pattern() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        bench.tap(&mut kbd, &PINS, 1, 2501, 400);
        assert_eq!(kbd.pattern_state(), PatternState::Started);
        assert!(kbd.is_pattern());
        assert!(!kbd.available());
    }

    #[test]
    fn hold_above_maximum_is_a_plain_press() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        bench.tap(&mut kbd, &PINS, 1, 5001, 400);
        assert_eq!(kbd.pattern_state(), PatternState::Idle);
        assert_eq!(press(&kbd), PressEvent { key_code: 1, duration_ms: 5001, repeat_count: 0 });
    }

    #[test]
    fn long_hold_of_another_key_is_a_plain_press() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        bench.tap(&mut kbd, &PINS, 2, 3000, 400);
        assert_eq!(kbd.pattern_state(), PatternState::Idle);
        assert_eq!(press(&kbd).key_code, 2);
    }

    #[test]
    fn four_keys_write_one_digit_per_code() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        kbd.config_mut().max_pattern_len = 32;
        bench.tap(&mut kbd, &PINS, 1, 3000, 100);
        for code in 1..=15 {
            bench.tap(&mut kbd, &PINS, code, 100, 100);
            assert!(!kbd.available());
        }
        assert_eq!(kbd.pattern_text(), "123456789abcdef");
    }

    #[test]
    fn eight_keys_write_two_digits_per_code() {
        let pins = [0, 1, 2, 3, 4, 5, 6, 7];
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&pins);
        bench.tap(&mut kbd, &pins, 1, 3000, 100);
        bench.tap(&mut kbd, &pins, 0x81, 100, 100);
        bench.tap(&mut kbd, &pins, 0x05, 100, 100);
        assert_eq!(kbd.pattern_text(), "8105");
        bench.tap(&mut kbd, &pins, 0xff, 100, 100);
        assert!(!kbd.available());
        bench.tap(&mut kbd, &pins, 0x10, 100, 100);
        assert_eq!(pattern(&kbd), "8105ff10");
    }

    #[test]
    fn full_pattern_completes_without_terminator() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        bench.tap(&mut kbd, &PINS, 1, 3000, 100);
        for code in [1, 2, 4, 8, 1, 2, 4] {
            bench.tap(&mut kbd, &PINS, code, 100, 100);
        }
        assert!(!kbd.available());
        bench.tap(&mut kbd, &PINS, 8, 100, 100);
        assert_eq!(pattern(&kbd), "12481248");
        assert_eq!(kbd.pattern_state(), PatternState::Ready);
        kbd.acknowledge();
        assert_eq!(kbd.pattern_state(), PatternState::Idle);
        assert_eq!(kbd.pattern_text(), "");
    }

    #[test]
    fn idle_pattern_times_out_with_collected_keys() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        bench.tap(&mut kbd, &PINS, 1, 3000, 100);
        bench.tap(&mut kbd, &PINS, 2, 100, 100);
        bench.run(&mut kbd, 29_000);
        assert!(!kbd.available());
        bench.run(&mut kbd, 1_000);
        assert_eq!(pattern(&kbd), "2");
        kbd.acknowledge();
        assert!(!kbd.is_pattern());
    }

    #[test]
    fn pattern_key_hold_terminates_the_pattern() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        bench.tap(&mut kbd, &PINS, 1, 3000, 100);
        bench.tap(&mut kbd, &PINS, 4, 100, 100);
        bench.tap(&mut kbd, &PINS, 1, 100, 100);
        bench.tap(&mut kbd, &PINS, 1, 3000, 100);
        assert_eq!(pattern(&kbd), "41");
        assert_eq!(kbd.key_code(), 0);
    }

    #[test]
    fn combination_can_be_the_pattern_key() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        kbd.set_pattern_key_code(kbd.key_code_for_pin(0) | kbd.key_code_for_pin(2)).unwrap();
        bench.tap(&mut kbd, &PINS, 1, 3000, 400);
        assert_eq!(kbd.pattern_state(), PatternState::Idle);
        kbd.acknowledge();
        bench.tap(&mut kbd, &PINS, 3, 3000, 100);
        assert_eq!(kbd.pattern_state(), PatternState::Started);
    }

    #[test]
    fn invalid_pattern_key_settings() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        assert_eq!(kbd.set_pattern_key_code(0), Err(KbdError::InvalidKeyCode(0)));
        assert_eq!(kbd.set_pattern_key_code(0x10), Err(KbdError::InvalidKeyCode(0x10)));
        kbd.set_pattern_key_pin(36).unwrap();
        assert_eq!(kbd.pattern_key_code(), 8);
        assert_eq!(kbd.set_pattern_key_pin(39), Err(KbdError::UnknownPin(39)));
        assert_eq!(kbd.pattern_key_code(), 1);
    }

    #[test]
    fn started_pattern_abandoned_yields_empty_text() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        kbd.config_mut().pattern_timeout = std::time::Duration::from_secs(10);
        kbd.start_pattern().unwrap();
        assert_eq!(kbd.pattern_state(), PatternState::Started);
        bench.run(&mut kbd, 10_001);
        assert_eq!(pattern(&kbd), "");
    }

    #[test]
    fn started_pattern_collects_keys() {
        let bench = Bench::new();
        let mut kbd = bench.keyboard(&PINS);
        kbd.start_pattern().unwrap();
        bench.tap(&mut kbd, &PINS, 8, 100, 100);
        bench.tap(&mut kbd, &PINS, 4, 100, 100);
        bench.tap(&mut kbd, &PINS, 1, 3000, 100);
        assert_eq!(pattern(&kbd), "84");
    }

    #[test]
    fn pin_read_failure_is_reported_and_keeps_state() {
        use crate::input::GpioPinReader;
        use keycomb_gpio::GpioError;

        let clock = ManualClock::new(1000);
        let mut kbd = Keyboard::new(GpioPinReader::new(Vec::new()), &clock);
        kbd.begin(GpioActiveLevel::Low, &[4]).unwrap();
        clock.advance(10);
        assert_eq!(kbd.poll(), Err(KbdError::Gpio(GpioError::InvalidArgument)));
        assert!(!kbd.available());
        assert_eq!(kbd.pattern_state(), PatternState::Idle);
    }
}
