//! # vibesy-map
//!
//! The two map backends: a retained map widget that is driven directly
//! and a Leaflet document running inside a web view.

pub mod embedded;
pub mod webview;

pub use self::{
    embedded::{EmbeddedMap, MapWidget, WidgetEvent, WidgetEvents},
    webview::{BridgeError, BridgeInbox, WebViewBridge, WebViewMap},
};
