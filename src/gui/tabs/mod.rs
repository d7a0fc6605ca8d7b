mod browser_tab;
mod connection_tab;

pub use browser_tab::BrowserTab;
pub use connection_tab::{ConnectionAction, ConnectionTab};
