pub mod browser;
pub mod session;

pub use browser::{BrowserActor, BrowserCommand};
pub use session::BrowserSession;

use chromiumoxide::browser::HeadlessMode;
use chromiumoxide::BrowserConfig;

use crate::config::BrowserSection;
use crate::error::{PilotError, PilotResult};

const LAUNCH_ARGS: &[&str] = &[
    "--start-maximized",
    "--disable-blink-features=AutomationControlled",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-infobars",
];

pub fn browser_config(section: &BrowserSection) -> PilotResult<BrowserConfig> {
    let mode = if section.headless { HeadlessMode::True } else { HeadlessMode::False };
    let mut builder = BrowserConfig::builder()
        .user_data_dir(&section.profile_dir)
        .headless_mode(mode);
    for arg in LAUNCH_ARGS.iter().copied().map(str::to_string).chain(section.extra_args.iter().cloned()) {
        builder = builder.arg(arg);
    }
    builder.build().map_err(PilotError::Browser)
}
