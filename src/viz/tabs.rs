//! Tab switch over several charts, one shown at a time.

use super::error::ChartError;

#[derive(Debug, Clone, PartialEq)]
pub struct Tab<T> {
    pub label: String,
    pub content: T,
}

impl<T> Tab<T> {
    pub fn new(label: impl Into<String>, content: T) -> Self {
        Self {
            label: label.into(),
            content,
        }
    }
}

/// Labeled contents with exactly one active; the first starts active.
#[derive(Debug, Clone, PartialEq)]
pub struct Tabs<T> {
    tabs: Vec<Tab<T>>,
    active: usize,
}

impl<T> Tabs<T> {
    pub fn new(tabs: Vec<Tab<T>>) -> Result<Self, ChartError> {
        if tabs.is_empty() {
            return Err(ChartError::NoTabs);
        }
        Ok(Self { tabs, active: 0 })
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.tabs.iter().map(|t| t.label.as_str())
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn active_tab(&self) -> &Tab<T> {
        &self.tabs[self.active]
    }

    pub fn active_content_mut(&mut self) -> &mut T {
        &mut self.tabs[self.active].content
    }

    /// Activate tab `idx`. Selecting the active tab or an index past the end
    /// changes nothing and returns `false`.
    pub fn select(&mut self, idx: usize) -> bool {
        if idx == self.active || idx >= self.tabs.len() {
            return false;
        }
        self.active = idx;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tabs() -> Tabs<&'static str> {
        Tabs::new(vec![Tab::new("Total Emissions", "total"), Tab::new("Emissions Per Capita", "per-capita")]).unwrap()
    }

    #[test]
    fn empty_list_is_an_error() {
        assert_eq!(Tabs::<()>::new(Vec::new()).err(), Some(ChartError::NoTabs));
        assert_eq!(ChartError::NoTabs.to_string(), "Please provide at least one component");
    }

    #[test]
    fn selecting_the_active_tab_is_a_no_op() {
        let mut t = tabs();
        assert_eq!(t.active_tab().content, "total");
        assert!(!t.select(0));
        assert!(t.select(1));
        assert_eq!(t.active(), 1);
        assert!(!t.select(1));
        assert!(!t.select(2));
        assert_eq!(t.active_tab().label, "Emissions Per Capita");
        assert_eq!(t.labels().collect::<Vec<_>>(), vec!["Total Emissions", "Emissions Per Capita"]);
    }
}
