//! Driver options
//!
//! Cookie management over the shared jar, plus timeouts, window and log
//! settings that have nothing behind them: there is no renderer, no script
//! engine and no log sink, so setters change nothing and getters return
//! fixed values.

use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use snap_net::{Cookie, NetError, Url};

use crate::driver::Session;
use crate::DriverError;

/// Returned by [`crate::Driver::manage`]
#[derive(Debug)]
pub struct Options {
    session: Rc<Session>,
}

impl Options {
    pub(crate) fn new(session: Rc<Session>) -> Self {
        Self { session }
    }

    fn current_url(&self) -> Result<Url, DriverError> {
        let url = self.session.current().url();
        Url::parse(&url).map_err(|e| NetError::InvalidUrl(format!("{url}: {e}")).into())
    }

    fn check_name(name: &str) -> Result<(), DriverError> {
        if name.trim().is_empty() {
            return Err(DriverError::InvalidArgument("Cookie name cannot be blank.".into()));
        }
        Ok(())
    }

    // ========================================================================
    // Cookies
    // ========================================================================

    /// Store a cookie; missing domain and path default to the current host and `/`
    pub fn add_cookie(&self, mut cookie: Cookie) -> Result<(), DriverError> {
        if cookie.domain.is_empty() {
            let url = self.current_url()?;
            let Some(host) = url.host_str() else {
                return Err(DriverError::InvalidArgument(format!(
                    "cookie {} needs a domain on {url}",
                    cookie.name
                )));
            };
            cookie.domain = host.to_string();
        }
        if cookie.path.is_empty() {
            cookie.path = "/".to_string();
        }
        self.session.cookies().write().add(cookie);
        Ok(())
    }

    /// Every cookie in the jar
    pub fn cookies(&self) -> Vec<Cookie> {
        self.session.cookies().read().all().into_iter().cloned().collect()
    }

    /// Cookie `name` as it would be sent to the current URL
    pub fn cookie_named(&self, name: &str) -> Result<Option<Cookie>, DriverError> {
        Self::check_name(name)?;
        let url = self.current_url()?;
        Ok(self.session.cookies().read().named(&url, name).cloned())
    }

    pub fn delete_cookie_named(&self, name: &str) -> Result<(), DriverError> {
        Self::check_name(name)?;
        let url = self.current_url()?;
        self.session.cookies().write().remove_named(&url, name);
        Ok(())
    }

    pub fn delete_cookie(&self, cookie: &Cookie) -> Result<(), DriverError> {
        self.delete_cookie_named(&cookie.name)
    }

    /// Remove every cookie visible to the current URL
    pub fn delete_all_cookies(&self) -> Result<(), DriverError> {
        let url = self.current_url()?;
        let removed = self.session.cookies().write().remove_matching(&url);
        tracing::debug!("Deleted {} cookies for {}", removed, url);
        Ok(())
    }

    // ========================================================================
    // Inert settings
    // ========================================================================

    pub fn timeouts(&self) -> Timeouts {
        Timeouts
    }

    pub fn window(&self) -> Window {
        Window
    }

    pub fn logs(&self) -> Logs {
        Logs
    }
}

/// Wait and timeout settings; always zero
#[derive(Debug, Clone, Copy, Default)]
pub struct Timeouts;

impl Timeouts {
    pub fn implicitly_wait(&self, _timeout: Duration) -> &Self {
        self
    }

    pub fn implicit_wait_timeout(&self) -> Duration {
        Duration::ZERO
    }

    pub fn set_script_timeout(&self, _timeout: Duration) -> &Self {
        self
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::ZERO
    }

    pub fn set_page_load_timeout(&self, _timeout: Duration) -> &Self {
        self
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::ZERO
    }
}

/// Window geometry; unbounded and fixed at the origin
#[derive(Debug, Clone, Copy, Default)]
pub struct Window;

impl Window {
    pub fn size(&self) -> Dimension {
        Dimension {
            width: i32::MAX,
            height: i32::MAX,
        }
    }

    pub fn set_size(&self, _size: Dimension) {}

    pub fn position(&self) -> Point {
        Point::default()
    }

    pub fn set_position(&self, _position: Point) {}

    pub fn maximize(&self) {}

    pub fn minimize(&self) {}

    pub fn fullscreen(&self) {}
}

/// Browser logs; there are none
#[derive(Debug, Clone, Copy, Default)]
pub struct Logs;

impl Logs {
    pub fn get(&self, _log_type: &str) -> Vec<LogEntry> {
        Vec::new()
    }

    pub fn available_log_types(&self) -> HashSet<String> {
        HashSet::new()
    }
}

/// One browser log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inert_settings() {
        let timeouts = Timeouts;
        assert_eq!(
            timeouts
                .implicitly_wait(Duration::from_secs(5))
                .set_page_load_timeout(Duration::from_secs(1))
                .implicit_wait_timeout(),
            Duration::ZERO
        );
        assert_eq!(timeouts.script_timeout(), Duration::ZERO);

        let window = Window;
        window.set_size(Dimension { width: 10, height: 10 });
        window.maximize();
        assert_eq!(window.size().width, i32::MAX);
        assert_eq!(window.position(), Point { x: 0, y: 0 });

        assert!(Logs.get("browser").is_empty());
        assert!(Logs.available_log_types().is_empty());
    }
}
