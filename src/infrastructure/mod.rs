pub mod logging;
pub mod ui_channel;

pub use ui_channel::{DeviceId, UiChannel, UiHost, UiMessage, UiResponse};
