//! Scripted in-memory page driver for integration tests.
//!
//! Selectors are matched by exact string against the keys a fixture
//! registers, which is all the production registries need: they always
//! query with the same literal selector strings.

use std::collections::HashMap;
use std::sync::Mutex;

use mapreviews::session::{PageDriver, SessionError};

#[derive(Debug, Clone, Default)]
pub struct NodeData {
    pub text: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<(String, Vec<usize>)>,
}

/// A scripted site: an arena of nodes plus per-URL root selectors.
#[derive(Debug, Clone, Default)]
pub struct MockSite {
    pub nodes: Vec<NodeData>,
    pub pages: HashMap<String, Vec<(String, Vec<usize>)>>,
}

impl MockSite {
    pub fn add_node(&mut self, text: &str) -> usize {
        self.nodes.push(NodeData {
            text: text.to_string(),
            ..Default::default()
        });
        self.nodes.len() - 1
    }

    pub fn add_node_with_attr(&mut self, text: &str, attr: &str, value: &str) -> usize {
        let id = self.add_node(text);
        self.nodes[id].attrs.push((attr.to_string(), value.to_string()));
        id
    }

    pub fn add_child(&mut self, parent: usize, selector: &str, child: usize) {
        let children = &mut self.nodes[parent].children;
        match children.iter_mut().find(|(s, _)| s == selector) {
            Some((_, ids)) => ids.push(child),
            None => children.push((selector.to_string(), vec![child])),
        }
    }

    pub fn add_page_root(&mut self, url: &str, selector: &str, node: usize) {
        let roots = self.pages.entry(url.to_string()).or_default();
        match roots.iter_mut().find(|(s, _)| s == selector) {
            Some((_, ids)) => ids.push(node),
            None => roots.push((selector.to_string(), vec![node])),
        }
    }
}

type BackHook = Box<dyn Fn() + Send + Sync>;

pub struct MockPage {
    site: MockSite,
    current: Mutex<String>,
    history: Mutex<Vec<String>>,
    on_back: Option<BackHook>,
}

impl MockPage {
    pub fn new(site: MockSite) -> Self {
        Self {
            site,
            current: Mutex::new("about:blank".to_string()),
            history: Mutex::new(Vec::new()),
            on_back: None,
        }
    }

    /// Install a hook invoked on every history-back navigation. Used to
    /// deliver an interrupt signal mid-unit.
    pub fn with_back_hook(site: MockSite, hook: BackHook) -> Self {
        let mut page = Self::new(site);
        page.on_back = Some(hook);
        page
    }
}

impl PageDriver for MockPage {
    type Node = usize;

    fn navigate(&self, url: &str) -> Result<(), SessionError> {
        let mut current = self.current.lock().unwrap();
        self.history.lock().unwrap().push(current.clone());
        *current = url.to_string();
        Ok(())
    }

    fn query(&self, selector: &str) -> Vec<usize> {
        let current = self.current.lock().unwrap().clone();
        self.site
            .pages
            .get(&current)
            .and_then(|roots| roots.iter().find(|(s, _)| s == selector))
            .map(|(_, ids)| ids.clone())
            .unwrap_or_default()
    }

    fn query_within(&self, scope: &usize, selector: &str) -> Vec<usize> {
        self.site
            .nodes
            .get(*scope)
            .and_then(|node| node.children.iter().find(|(s, _)| s == selector))
            .map(|(_, ids)| ids.clone())
            .unwrap_or_default()
    }

    fn text(&self, node: &usize) -> Result<String, SessionError> {
        self.site
            .nodes
            .get(*node)
            .map(|n| n.text.clone())
            .ok_or_else(|| SessionError::Driver(format!("unknown node {}", node)))
    }

    fn attr(&self, node: &usize, name: &str) -> Result<Option<String>, SessionError> {
        let data = self
            .site
            .nodes
            .get(*node)
            .ok_or_else(|| SessionError::Driver(format!("unknown node {}", node)))?;
        Ok(data
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone()))
    }

    fn click(&self, node: &usize) -> Result<(), SessionError> {
        // A data-href attribute makes a click behave as a navigation, the
        // way listing tiles do.
        if let Ok(Some(href)) = self.attr(node, "data-href") {
            self.navigate(&href)?;
        }
        Ok(())
    }

    fn scroll_into_view(&self, _node: &usize) -> Result<(), SessionError> {
        Ok(())
    }

    fn scroll_to_bottom(&self, _scope: Option<&usize>) {}

    fn back(&self) {
        if let Some(previous) = self.history.lock().unwrap().pop() {
            *self.current.lock().unwrap() = previous;
        }
        if let Some(hook) = &self.on_back {
            hook();
        }
    }

    fn current_url(&self) -> String {
        self.current.lock().unwrap().clone()
    }

    fn settle(&self, _wait: std::time::Duration) {}
}
