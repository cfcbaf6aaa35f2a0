//! Scripted in-memory driver for exercising the engine without a browser.
//!
//! Pages are static element lists; navigation bumps a document generation
//! and every element id issued before the bump answers with a stale
//! reference, like a real driver after the document is replaced.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use neptun_engine::driver::Driver;
use neptun_engine::error::DriverError;
use neptun_engine::protocol::{ElementId, StrategyKind};

pub type PageId = &'static str;

#[derive(Debug, Clone)]
pub enum ClickEffect {
    None,
    GoTo(PageId),
    /// Replace the document without a history entry, so `back` skips it.
    Swap(PageId),
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub selectors: Vec<(StrategyKind, String)>,
    pub text: String,
    pub class: String,
    pub displayed: bool,
    pub enabled: bool,
    pub on_click: ClickEffect,
}

impl FakeElement {
    pub fn new(kind: StrategyKind, selector: &str) -> Self {
        Self {
            selectors: vec![(kind, selector.to_string())],
            text: String::new(),
            class: String::new(),
            displayed: true,
            enabled: true,
            on_click: ClickEffect::None,
        }
    }

    pub fn css(selector: &str) -> Self {
        Self::new(StrategyKind::Css, selector)
    }

    pub fn xpath(selector: &str) -> Self {
        Self::new(StrategyKind::XPath, selector)
    }

    pub fn also(mut self, kind: StrategyKind, selector: &str) -> Self {
        self.selectors.push((kind, selector.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.class = class.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn goes_to(mut self, page: PageId) -> Self {
        self.on_click = ClickEffect::GoTo(page);
        self
    }

    pub fn swaps_to(mut self, page: PageId) -> Self {
        self.on_click = ClickEffect::Swap(page);
        self
    }
}

#[derive(Debug, Default)]
pub struct FakeDriver {
    pages: HashMap<PageId, Vec<FakeElement>>,
    start: PageId,
    current: PageId,
    history: Vec<PageId>,
    generation: u64,
    next_id: ElementId,
    issued: HashMap<ElementId, (u64, PageId, usize)>,
    /// Errors popped one per click call before any real click handling.
    pub fail_clicks: VecDeque<DriverError>,
    /// Text of every element actually clicked, in order.
    pub clicks: Mutex<Vec<String>>,
    /// Text typed via send_keys, in order.
    pub typed: Mutex<Vec<String>>,
    pub navigations: u32,
}

impl FakeDriver {
    pub fn new(start: PageId) -> Self {
        Self {
            start,
            current: start,
            generation: 1,
            next_id: 1,
            ..Self::default()
        }
    }

    pub fn page(mut self, id: PageId, elements: Vec<FakeElement>) -> Self {
        self.pages.insert(id, elements);
        self
    }

    pub fn current_page(&self) -> PageId {
        self.current
    }

    pub fn clicked(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }

    fn go(&mut self, page: PageId, push_history: bool) {
        if push_history {
            self.history.push(self.current);
        }
        self.current = page;
        self.generation += 1;
    }

    fn element(&self, id: ElementId) -> Result<&FakeElement, DriverError> {
        let (generation, page, idx) = self
            .issued
            .get(&id)
            .ok_or_else(|| DriverError::NoSuchElement(format!("unknown id {id}")))?;
        if *generation != self.generation {
            return Err(DriverError::StaleReference(format!(
                "id {id} issued for an earlier document"
            )));
        }
        Ok(&self.pages[page][*idx])
    }

    fn matches(element: &FakeElement, kind: StrategyKind, expression: &str) -> bool {
        if kind == StrategyKind::TextContains {
            return element.text.contains(expression);
        }
        element
            .selectors
            .iter()
            .any(|(k, s)| *k == kind && s == expression)
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn navigate(&mut self, _url: &str) -> Result<(), DriverError> {
        self.navigations += 1;
        self.history.clear();
        self.go(self.start, false);
        Ok(())
    }

    async fn back(&mut self) -> Result<(), DriverError> {
        let previous = self
            .history
            .pop()
            .ok_or_else(|| DriverError::Session("no history to go back to".into()))?;
        self.go(previous, false);
        Ok(())
    }

    async fn find_all(
        &mut self,
        kind: StrategyKind,
        expression: &str,
    ) -> Result<Vec<ElementId>, DriverError> {
        let page = self.current;
        let indices: Vec<usize> = self.pages[page]
            .iter()
            .enumerate()
            .filter(|(_, e)| Self::matches(e, kind, expression))
            .map(|(i, _)| i)
            .collect();
        let generation = self.generation;
        Ok(indices
            .into_iter()
            .map(|idx| {
                let id = self.next_id;
                self.next_id += 1;
                self.issued.insert(id, (generation, page, idx));
                id
            })
            .collect())
    }

    async fn click(&mut self, id: ElementId) -> Result<(), DriverError> {
        if let Some(err) = self.fail_clicks.pop_front() {
            return Err(err);
        }
        let element = self.element(id)?.clone();
        self.clicks.lock().unwrap().push(element.text.clone());
        match element.on_click {
            ClickEffect::None => {}
            ClickEffect::GoTo(page) => self.go(page, true),
            ClickEffect::Swap(page) => self.go(page, false),
        }
        Ok(())
    }

    async fn text(&mut self, id: ElementId) -> Result<String, DriverError> {
        Ok(self.element(id)?.text.clone())
    }

    async fn attribute(
        &mut self,
        id: ElementId,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let element = self.element(id)?;
        Ok(match name {
            "class" if !element.class.is_empty() => Some(element.class.clone()),
            _ => None,
        })
    }

    async fn send_keys(&mut self, id: ElementId, text: &str) -> Result<(), DriverError> {
        self.element(id)?;
        self.typed.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn clear(&mut self, id: ElementId) -> Result<(), DriverError> {
        self.element(id)?;
        Ok(())
    }

    async fn is_displayed(&mut self, id: ElementId) -> Result<bool, DriverError> {
        Ok(self.element(id)?.displayed)
    }

    async fn is_enabled(&mut self, id: ElementId) -> Result<bool, DriverError> {
        Ok(self.element(id)?.enabled)
    }
}
