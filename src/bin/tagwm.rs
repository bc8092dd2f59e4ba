/// A default 'anyhow' based result type
type Result<T> = anyhow::Result<T>;

use std::env;

use simplelog::{LevelFilter, SimpleLogger};
use tagwm::{
    Config, WindowManager, XcbConnection,
    bindings::{Bindings, keycodes_from_xmodmap},
};

// TAGWM_LOG takes any log level name: error, warn, info, debug, trace
fn log_level() -> LevelFilter {
    env::var("TAGWM_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

fn main() -> Result<()> {
    // -- logging --
    SimpleLogger::init(log_level(), simplelog::Config::default())?;

    let config = Config::default();
    let tags = config.tags.len();

    let conn = XcbConnection::new()?;
    let mut wm = WindowManager::new(&conn, config)?;

    let keycodes = keycodes_from_xmodmap()?;
    wm.grab_keys(Bindings::from_defaults(&keycodes, tags)?);
    wm.run();

    Ok(())
}
