//! snapdriver
//!
//! Drives static HTML pages the way a browser automation client drives a
//! real browser, minus JavaScript, styles and layout. Pages are fetched over
//! HTTP, parsed with html5ever and kept as an arena tree; clicks, typing and
//! form submission are emulated by editing that tree or by loading the next
//! page.
//!
//! ```no_run
//! use snap_driver::{By, Driver};
//!
//! # fn main() -> Result<(), snap_driver::DriverError> {
//! let driver = Driver::new()?;
//! driver.get("http://localhost:8080/login")?;
//! driver.find_element(&By::name("user"))?.send_keys("admin")?;
//! driver.find_element(&By::css("button[type=submit]"))?.click()?;
//! println!("{}", driver.title());
//! # Ok(())
//! # }
//! ```

mod attributes;
mod click;
mod config;
mod driver;
mod editing;
mod element;
mod error;
mod form;
mod locator;
mod options;
mod page;
mod selection;

pub use attributes::BOOLEAN_ATTRIBUTES;
pub use config::{DriverConfig, BLANK_URL};
pub use driver::Driver;
pub use editing::Keys;
pub use element::Element;
pub use error::DriverError;
pub use locator::By;
pub use options::{Dimension, LogEntry, Logs, Options, Point, Rect, Timeouts, Window};
pub use page::{Page, PageId};

pub use snap_net::{ClientConfig, Cookie, NetError, Request, Response, SameSite, SharedCookieJar, Transport};
