//! In-memory [`Driver`] for exercising wallet routines without a browser.
//!
//! Elements are keyed by locator and shared by all windows. Clicks and
//! refreshes can be scripted to show, hide or relabel other elements.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use metamask_core::{Driver, ElementState, Locator, WaitPolicies, WaitPolicy, WindowHandle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const EXTENSION_URL: &str = "chrome-extension://nkbihfbeogaeaoehlefnkodbefgpgknn/home.html";

/// Waits short enough for tests that run into their timeouts.
pub fn quick_waits() -> WaitPolicies {
    WaitPolicies {
        fast: WaitPolicy::new(Duration::from_millis(30), Duration::from_millis(5)),
        default: WaitPolicy::new(Duration::from_millis(60), Duration::from_millis(5)),
        slow: WaitPolicy::new(Duration::from_millis(120), Duration::from_millis(5)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Switch(WindowHandle),
    Open(String),
    Navigate(String),
    Refresh,
    Click(Locator, usize),
    Type(Locator, usize, String),
    Select(Locator, String),
    Close,
}

#[derive(Debug, Clone)]
pub enum Effect {
    Show(Locator),
    Hide(Locator),
    SetText(Locator, String),
}

#[derive(Debug, Clone)]
struct FakeElement {
    state: ElementState,
    text: String,
}

#[derive(Default)]
struct State {
    windows: Vec<(WindowHandle, String)>,
    focused: usize,
    elements: HashMap<Locator, Vec<FakeElement>>,
    on_click: HashMap<Locator, Vec<Effect>>,
    on_refresh: Vec<Effect>,
    failing: Vec<Locator>,
    events: Vec<Event>,
}

impl State {
    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Show(locator) => {
                    self.elements.insert(
                        locator,
                        vec![FakeElement {
                            state: ElementState::READY,
                            text: String::new(),
                        }],
                    );
                }
                Effect::Hide(locator) => {
                    self.elements.remove(&locator);
                }
                Effect::SetText(locator, text) => {
                    let element = self.elements.entry(locator).or_insert_with(|| {
                        vec![FakeElement {
                            state: ElementState::READY,
                            text: String::new(),
                        }]
                    });
                    element[0].text = text;
                }
            }
        }
    }

    fn target(&self, locator: &Locator, nth: usize) -> Result<&FakeElement> {
        if self.failing.contains(locator) {
            bail!("Element {} is detached", locator);
        }
        self.elements
            .get(locator)
            .and_then(|all| all.get(nth))
            .ok_or_else(|| anyhow!("Element not found '{}' (index {})", locator, nth))
    }
}

#[derive(Clone, Default)]
pub struct FakeDriver {
    state: Arc<Mutex<State>>,
}

impl FakeDriver {
    /// A browser with one window per `(handle, url)`, the first focused.
    pub fn with_windows(windows: &[(&str, &str)]) -> Self {
        let driver = Self::default();
        {
            let mut state = driver.state.lock().unwrap();
            state.windows = windows
                .iter()
                .map(|(handle, url)| (WindowHandle::new(*handle), url.to_string()))
                .collect();
        }
        driver
    }

    /// A dApp window in focus and the extension window behind it.
    pub fn dapp_and_extension() -> Self {
        Self::with_windows(&[("dapp", "https://dapp.example/"), ("ext", EXTENSION_URL)])
    }

    pub fn add_window(&self, handle: &str, url: &str) {
        let mut state = self.state.lock().unwrap();
        state.windows.push((WindowHandle::new(handle), url.to_string()));
    }

    pub fn ready(&self, locator: &Locator) -> &Self {
        self.ready_n(locator, 1)
    }

    pub fn ready_all<'a>(&self, locators: impl IntoIterator<Item = &'a Locator>) -> &Self {
        for locator in locators {
            self.ready(locator);
        }
        self
    }

    pub fn ready_n(&self, locator: &Locator, count: usize) -> &Self {
        self.set(locator, vec![ElementState::READY; count])
    }

    pub fn set(&self, locator: &Locator, states: Vec<ElementState>) -> &Self {
        let elements = states
            .into_iter()
            .map(|state| FakeElement {
                state,
                text: String::new(),
            })
            .collect();
        self.state
            .lock()
            .unwrap()
            .elements
            .insert(locator.clone(), elements);
        self
    }

    pub fn label(&self, locator: &Locator, text: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .apply(vec![Effect::SetText(locator.clone(), text.to_string())]);
        self
    }

    pub fn on_click(&self, locator: &Locator, effects: Vec<Effect>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .on_click
            .insert(locator.clone(), effects);
        self
    }

    pub fn on_refresh(&self, effects: Vec<Effect>) -> &Self {
        self.state.lock().unwrap().on_refresh = effects;
        self
    }

    /// Commands against `locator` fail as a broken browser connection would.
    pub fn fail_on(&self, locator: &Locator) -> &Self {
        self.state.lock().unwrap().failing.push(locator.clone());
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn focused(&self) -> WindowHandle {
        let state = self.state.lock().unwrap();
        state.windows[state.focused].0.clone()
    }

    pub fn clicks(&self, locator: &Locator) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Click(l, _) if l == locator))
            .count()
    }

    /// Text typed into matches of `locator`, in order.
    pub fn typed_into(&self, locator: &Locator) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Type(l, _, text) if &l == locator => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn refreshes(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Refresh))
            .count()
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn window_handles(&self) -> Result<Vec<WindowHandle>> {
        let state = self.state.lock().unwrap();
        Ok(state.windows.iter().map(|(h, _)| h.clone()).collect())
    }

    async fn current_window(&self) -> Result<WindowHandle> {
        Ok(self.focused())
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let index = state
            .windows
            .iter()
            .position(|(h, _)| h == handle)
            .ok_or_else(|| anyhow!("No such window: {}", handle))?;
        state.focused = index;
        state.events.push(Event::Switch(handle.clone()));
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<WindowHandle> {
        let mut state = self.state.lock().unwrap();
        let handle = WindowHandle::new(format!("window-{}", state.windows.len()));
        state.windows.push((handle.clone(), url.to_string()));
        state.focused = state.windows.len() - 1;
        state.events.push(Event::Open(url.to_string()));
        Ok(handle)
    }

    async fn current_url(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        Ok(state.windows[state.focused].1.clone())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let focused = state.focused;
        state.windows[focused].1 = url.to_string();
        state.events.push(Event::Navigate(url.to_string()));
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Refresh);
        let effects = state.on_refresh.clone();
        state.apply(effects);
        Ok(())
    }

    async fn inspect(&self, locator: &Locator) -> Result<Vec<ElementState>> {
        let state = self.state.lock().unwrap();
        if state.failing.contains(locator) {
            bail!("Element {} is detached", locator);
        }
        Ok(state
            .elements
            .get(locator)
            .map(|all| all.iter().map(|e| e.state).collect())
            .unwrap_or_default())
    }

    async fn click(&self, locator: &Locator, nth: usize) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.target(locator, nth)?.state.clickable() {
            bail!("Element {} is not clickable", locator);
        }
        state.events.push(Event::Click(locator.clone(), nth));
        if let Some(effects) = state.on_click.get(locator).cloned() {
            state.apply(effects);
        }
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, nth: usize, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.target(locator, nth)?;
        state
            .events
            .push(Event::Type(locator.clone(), nth, text.to_string()));
        Ok(())
    }

    async fn select_value(&self, locator: &Locator, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.target(locator, 0)?;
        state
            .events
            .push(Event::Select(locator.clone(), value.to_string()));
        Ok(())
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .elements
            .get(locator)
            .and_then(|all| all.first())
            .map(|e| e.text.clone()))
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().events.push(Event::Close);
        Ok(())
    }
}

impl FakeDriver {
    pub fn hide(&self, locator: &Locator) {
        self.state
            .lock()
            .unwrap()
            .apply(vec![Effect::Hide(locator.clone())]);
    }
}

/// Log lines written while the returned guard is alive.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_target(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn lines_at(&self, level: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(level))
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
