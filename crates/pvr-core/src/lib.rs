pub mod config;
pub mod logging;

pub mod dispatch;
pub mod extract;
pub mod fetch;
pub mod recover;
pub mod sanitize;
pub mod stabilize;
pub mod webdriver;
