//! Browser session management for headless Chrome.
//!
//! Each Chrome process consumes ~100-300 MB RAM, so a global counting
//! semaphore caps concurrent instances independently of the worker pool
//! size. Uses std::sync primitives so it works in both async and sync
//! (spawn_blocking) contexts.
//!
//! The automation driver itself is abstracted behind the [`PageDriver`]
//! trait: the crawl and extraction layers only see navigate/query/click
//! primitives, never headless_chrome types, so they can run against a
//! scripted driver in tests.

use std::ffi::OsStr;
use std::time::Duration;

use headless_chrome::protocol::cdp::DOM::NodeId;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use thiserror::Error;
use tracing::debug;

use crate::config::BrowserConfig;

/// Maximum concurrent headless Chrome instances, regardless of the
/// configured worker count.
const MAX_BROWSER_INSTANCES: usize = 8;

/// Global counting semaphore for browser instances.
static BROWSER_SEMAPHORE: once_cell::sync::Lazy<BrowserSemaphore> =
    once_cell::sync::Lazy::new(|| BrowserSemaphore::new(MAX_BROWSER_INSTANCES));

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to initialize browser session: {0}")]
    Init(String),

    #[error("Navigation to {url} failed or timed out")]
    NavigationTimeout { url: String },

    #[error("Element is not interactable: {0}")]
    NotInteractable(String),

    #[error("Driver call failed: {0}")]
    Driver(String),
}

/// Capability interface over the page automation driver.
///
/// Absence is not an error: `query` returns an empty sequence when nothing
/// matches. Only genuine driver failures (lost session, stale node the
/// fallback cannot recover) surface as `SessionError`.
pub trait PageDriver {
    type Node: Clone;

    fn navigate(&self, url: &str) -> Result<(), SessionError>;
    fn query(&self, selector: &str) -> Vec<Self::Node>;
    fn query_within(&self, scope: &Self::Node, selector: &str) -> Vec<Self::Node>;
    fn text(&self, node: &Self::Node) -> Result<String, SessionError>;
    fn attr(&self, node: &Self::Node, name: &str) -> Result<Option<String>, SessionError>;
    fn click(&self, node: &Self::Node) -> Result<(), SessionError>;
    fn scroll_into_view(&self, node: &Self::Node) -> Result<(), SessionError>;
    fn scroll_to_bottom(&self, scope: Option<&Self::Node>);
    fn back(&self);
    fn current_url(&self) -> String;

    fn settle(&self, wait: Duration) {
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}

/// A simple counting semaphore using std::sync primitives.
struct BrowserSemaphore {
    state: std::sync::Mutex<usize>,
    condvar: std::sync::Condvar,
    max: usize,
}

impl BrowserSemaphore {
    fn new(max: usize) -> Self {
        Self {
            state: std::sync::Mutex::new(0),
            condvar: std::sync::Condvar::new(),
            max,
        }
    }

    /// Acquire a permit, blocking until one is available.
    fn acquire(&self) -> BrowserPermit<'_> {
        let mut count = self.state.lock().unwrap();
        while *count >= self.max {
            count = self.condvar.wait(count).unwrap();
        }
        *count += 1;
        BrowserPermit { semaphore: self }
    }

    fn release(&self) {
        let mut count = self.state.lock().unwrap();
        *count -= 1;
        self.condvar.notify_one();
    }
}

/// RAII guard that releases a browser semaphore permit on drop.
struct BrowserPermit<'a> {
    semaphore: &'a BrowserSemaphore,
}

impl<'a> Drop for BrowserPermit<'a> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

/// Opaque handle to a DOM node. Node identities are invalidated by
/// navigation round trips; callers re-query by position after navigating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomNode(NodeId);

/// One headless Chrome instance bound to a single worker slot for the
/// slot's lifetime. Never shared between workers.
///
/// Dropping the session kills the Chrome process AND releases the semaphore
/// permit, so sessions cannot leak across panics or cancellation.
pub struct RenderSession {
    tab: std::sync::Arc<Tab>,
    browser: Browser,
    _permit: BrowserPermit<'static>,
}

impl RenderSession {
    /// Launch headless Chrome and open a tab, gated by the global semaphore.
    /// Blocks until a permit is available. Automatically disables the
    /// sandbox when running inside a container (detected via /.dockerenv or
    /// MAPREVIEWS_CONTAINER env var).
    pub fn open(config: &BrowserConfig) -> Result<Self, SessionError> {
        let permit = BROWSER_SEMAPHORE.acquire();

        let is_container = std::env::var("MAPREVIEWS_CONTAINER").is_ok()
            || std::path::Path::new("/.dockerenv").exists();

        let chrome_path: Option<std::path::PathBuf> =
            std::env::var("CHROME_PATH").ok().map(std::path::PathBuf::from);

        // Assign a unique debug port per browser instance to avoid port
        // conflicts. Uses an atomic counter starting at Chrome's default
        // debug port.
        static PORT_COUNTER: std::sync::atomic::AtomicU16 = std::sync::atomic::AtomicU16::new(9222);
        let debug_port = PORT_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if debug_port > 9322 {
            PORT_COUNTER.store(9222, std::sync::atomic::Ordering::Relaxed);
        }

        let user_agent_arg = format!("--user-agent={}", config.user_agent);
        let extra_args: Vec<&OsStr> = if config.user_agent.is_empty() {
            Vec::new()
        } else {
            vec![OsStr::new(&user_agent_arg)]
        };

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(!is_container)
            .path(chrome_path)
            .port(Some(debug_port))
            .window_size(Some((config.window_width, config.window_height)))
            .idle_browser_timeout(Duration::from_secs(config.nav_timeout_secs.max(60)))
            .args(extra_args)
            .build()
            .map_err(|e| SessionError::Init(format!("Failed to build Chrome launch options: {}", e)))?;

        let browser = Browser::new(options)
            .map_err(|e| SessionError::Init(format!("Failed to launch headless Chrome: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| SessionError::Init(format!("Failed to create browser tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_secs(config.nav_timeout_secs));

        debug!("Browser session ready on debug port {}", debug_port);

        Ok(Self {
            tab,
            browser,
            _permit: permit,
        })
    }

    fn element(&self, node: DomNode) -> Result<Element<'_>, SessionError> {
        Element::new(&self.tab, node.0)
            .map_err(|e| SessionError::NotInteractable(format!("stale node {}: {}", node.0, e)))
    }
}

impl PageDriver for RenderSession {
    type Node = DomNode;

    fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.tab
            .navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| {
                debug!("Navigation failed for {}: {}", url, e);
                SessionError::NavigationTimeout { url: url.to_string() }
            })?;
        Ok(())
    }

    fn query(&self, selector: &str) -> Vec<DomNode> {
        match self.tab.find_elements(selector) {
            Ok(elements) => elements.iter().map(|e| DomNode(e.node_id)).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn query_within(&self, scope: &DomNode, selector: &str) -> Vec<DomNode> {
        let Ok(element) = self.element(*scope) else {
            return Vec::new();
        };
        match element.find_elements(selector) {
            Ok(elements) => elements.iter().map(|e| DomNode(e.node_id)).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn text(&self, node: &DomNode) -> Result<String, SessionError> {
        let element = self.element(*node)?;
        element
            .get_inner_text()
            .map(|t| t.trim().to_string())
            .map_err(|e| SessionError::Driver(format!("get_inner_text failed: {}", e)))
    }

    fn attr(&self, node: &DomNode, name: &str) -> Result<Option<String>, SessionError> {
        let element = self.element(*node)?;
        let attributes = element
            .get_attributes()
            .map_err(|e| SessionError::Driver(format!("get_attributes failed: {}", e)))?;

        // Attributes arrive as a flat [name, value, name, value, ...] list.
        if let Some(flat) = attributes {
            for pair in flat.chunks(2) {
                if pair.len() == 2 && pair[0] == name {
                    return Ok(Some(pair[1].clone()));
                }
            }
        }
        Ok(None)
    }

    fn click(&self, node: &DomNode) -> Result<(), SessionError> {
        let element = self.element(*node)?;
        if element.click().is_ok() {
            return Ok(());
        }

        // Direct click intercepted or element moved; fall back to a
        // scripted click, which bypasses hit testing.
        debug!("Direct click failed for node {}, trying scripted click", node.0);
        element
            .call_js_fn("function() { this.click(); }", vec![], false)
            .map(|_| ())
            .map_err(|e| SessionError::NotInteractable(format!("scripted click failed: {}", e)))
    }

    fn scroll_into_view(&self, node: &DomNode) -> Result<(), SessionError> {
        let element = self.element(*node)?;
        element
            .scroll_into_view()
            .map(|_| ())
            .map_err(|e| SessionError::Driver(format!("scroll_into_view failed: {}", e)))
    }

    fn scroll_to_bottom(&self, scope: Option<&DomNode>) {
        let result = match scope {
            Some(node) => self.element(*node).and_then(|element| {
                element
                    .call_js_fn(
                        "function() { this.scrollTop = this.scrollHeight; }",
                        vec![],
                        false,
                    )
                    .map(|_| ())
                    .map_err(|e| SessionError::Driver(e.to_string()))
            }),
            None => self
                .tab
                .evaluate("window.scrollTo(0, document.body.scrollHeight);", false)
                .map(|_| ())
                .map_err(|e| SessionError::Driver(e.to_string())),
        };

        if let Err(e) = result {
            debug!("scroll_to_bottom failed: {}", e);
        }
    }

    fn back(&self) {
        if let Err(e) = self.tab.evaluate("history.back();", false) {
            debug!("history.back() failed: {}", e);
            return;
        }
        let _ = self.tab.wait_until_navigated();
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }
}

// Field order matters: the tab and browser shut down before the permit is
// released, so a freed slot never races a still-dying Chrome process.
impl Drop for RenderSession {
    fn drop(&mut self) {
        debug!("Closing browser session");
    }
}
