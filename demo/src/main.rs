mod app;
mod config;

use std::env::var;
use std::thread;
use std::time::Duration;
use dotenv::dotenv;
use log::{debug, info, warn};
use sysinfo::System;
use keycomb::{GpioPinReader, KeyMap, Keyboard, MonotonicClock};
use keycomb_gpio::{GpioDriver, GpioInput, GpioResult};
use keycomb_gpio::gpiod::GpiodDriver;
use crate::app::App;
use crate::config::Config;

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";
    info!(
        "keycomb demo starting on {} ({})...",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
    );

    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load() {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };

    // Reject bad pin lists before claiming any GPIO line.
    let keys = KeyMap::new(&config.key_pins)?;
    let active_level = config.active_level();
    info!("Keys @ {:?}, {:?}", keys.pins(), active_level);

    let chip_path = var("KEYCOMB_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());
    debug!("Initializing GPIO driver on {}...", chip_path);
    let gpio = GpiodDriver::open(&chip_path)?;
    debug!("{:?} initialized.", gpio);

    let mut pins = keys
        .pins()
        .iter()
        .map(|&pin| gpio.get_pin(pin as usize))
        .collect::<GpioResult<Vec<_>>>()?;
    for pin in pins.iter_mut() {
        pin.set_bias(active_level.idle_bias())?;
    }
    let inputs = keys
        .pins()
        .iter()
        .zip(pins.iter_mut())
        .map(|(&no, pin)| Ok((no, pin.as_input()?)))
        .collect::<GpioResult<Vec<(u8, Box<dyn GpioInput + '_>)>>>()?;
    let reader = GpioPinReader::new(inputs);
    debug!("{:?} initialized.", reader);

    let mut kbd = Keyboard::new(reader, MonotonicClock::new()).with_config(config.kbd_config());
    kbd.begin(active_level, keys.pins())?;

    if !config.pattern_key_pins.is_empty() {
        let code = config
            .pattern_key_pins
            .iter()
            .fold(0, |code, &pin| code | kbd.key_code_for_pin(pin));
        if let Err(e) = kbd.set_pattern_key_code(code) {
            warn!("Invalid pattern key pins {:?} ({}), using the first key.", config.pattern_key_pins, e);
        }
    }

    for &pin in keys.pins() {
        info!("KeyCode for pin {:>2} is {}", pin, kbd.key_code_for_pin(pin));
    }
    info!("Pattern key code is {}.", kbd.pattern_key_code());

    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let mut app = App::new(config);

    info!("Starting main loop...");
    loop {
        kbd.poll()?;
        app.update(&mut kbd)?;

        thread::sleep(poll_interval);
    }
}
