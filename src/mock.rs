//! An in-memory XConn that records every outbound request, for tests.
use std::{cell::RefCell, collections::HashMap};

use anyhow::{Result, anyhow};
use xcb::{Atom, Window};

use crate::{
    geometry::Rectangle,
    xconnection::{Prop, WindowType, XConn, XEvent, XcbKey},
};

const WINDOW_TYPES: [WindowType; 9] = [
    WindowType::Desktop,
    WindowType::Dock,
    WindowType::Toolbar,
    WindowType::Menu,
    WindowType::Utility,
    WindowType::Splash,
    WindowType::Dialog,
    WindowType::Notification,
    WindowType::Normal,
];

/// The fake atom standing for a window type
pub fn type_atom(t: WindowType) -> Atom {
    let index = WINDOW_TYPES.iter().position(|&known| known == t).unwrap_or(0);
    100 + index as Atom
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Map(Window),
    Unmap(Window),
    Configure {
        win: Window,
        region: Option<Rectangle>,
        border_width: Option<u32>,
        stack_above: bool,
    },
    ConfigureNotify {
        win: Window,
        region: Rectangle,
        border_width: u32,
    },
    BorderColor(Window, u32),
    Focus(Window),
    FocusNothing,
    Delete(Window),
    GrabKey(XcbKey),
    MarkNew(Window),
}

#[derive(Debug, Default)]
pub struct MockConn {
    calls: RefCell<Vec<Call>>,
    cardinals: RefCell<HashMap<(Window, Prop), Vec<u32>>>,
    bytes: RefCell<HashMap<(Window, Prop), Vec<u8>>>,
    geometries: RefCell<HashMap<Window, Rectangle>>,
    monitors: RefCell<Vec<Rectangle>>,
}

impl MockConn {
    pub fn new(monitors: Vec<Rectangle>) -> MockConn {
        MockConn {
            monitors: RefCell::new(monitors),
            ..MockConn::default()
        }
    }

    /// Pretend the outputs changed to `monitors`
    pub fn set_monitors(&self, monitors: Vec<Rectangle>) {
        *self.monitors.borrow_mut() = monitors;
    }

    pub fn set_cardinals(&self, win: Window, prop: Prop, raw: Vec<u32>) {
        self.cardinals.borrow_mut().insert((win, prop), raw);
    }

    pub fn set_bytes(&self, win: Window, prop: Prop, raw: &[u8]) {
        self.bytes.borrow_mut().insert((win, prop), raw.to_vec());
    }

    pub fn set_geometry(&self, win: Window, r: Rectangle) {
        self.geometries.borrow_mut().insert(win, r);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// The calls recorded so far, clearing the log
    pub fn take_calls(&self) -> Vec<Call> {
        self.calls.borrow_mut().drain(..).collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl XConn for MockConn {
    fn register_wm(&self) -> Result<()> {
        Ok(())
    }

    fn flush(&self) -> bool {
        true
    }

    fn wait_for_event(&self) -> Option<XEvent> {
        None
    }

    fn grab_key(&self, key: &XcbKey) {
        self.record(Call::GrabKey(*key));
    }

    fn monitor_regions(&self) -> Vec<Rectangle> {
        self.monitors.borrow().clone()
    }

    fn window_geometry(&self, win: Window) -> Result<Rectangle> {
        self.geometries
            .borrow()
            .get(&win)
            .copied()
            .ok_or_else(|| anyhow!("no geometry for {}", win))
    }

    fn get_cardinals(&self, win: Window, prop: Prop) -> Result<Vec<u32>> {
        self.cardinals
            .borrow()
            .get(&(win, prop))
            .cloned()
            .ok_or_else(|| anyhow!("no {:?} on {}", prop, win))
    }

    fn get_bytes(&self, win: Window, prop: Prop) -> Result<Vec<u8>> {
        self.bytes
            .borrow()
            .get(&(win, prop))
            .cloned()
            .ok_or_else(|| anyhow!("no {:?} on {}", prop, win))
    }

    fn window_type(&self, atom: Atom) -> Option<WindowType> {
        WINDOW_TYPES.iter().copied().find(|&t| type_atom(t) == atom)
    }

    fn mark_new_window(&self, win: Window) {
        self.record(Call::MarkNew(win));
    }

    fn map_window(&self, win: Window) {
        self.record(Call::Map(win));
    }

    fn unmap_window(&self, win: Window) {
        self.record(Call::Unmap(win));
    }

    fn configure_window(
        &self,
        win: Window,
        region: Option<Rectangle>,
        border_width: Option<u32>,
        stack_above: bool,
    ) {
        self.record(Call::Configure {
            win,
            region,
            border_width,
            stack_above,
        });
    }

    fn send_configure_notify(&self, win: Window, region: Rectangle, border_width: u32) {
        self.record(Call::ConfigureNotify {
            win,
            region,
            border_width,
        });
    }

    fn set_window_border_color(&self, win: Window, color: u32) {
        self.record(Call::BorderColor(win, color));
    }

    fn focus_window(&self, win: Window) {
        self.record(Call::Focus(win));
    }

    fn focus_nothing(&self) {
        self.record(Call::FocusNothing);
    }

    fn signal_delete_window(&self, win: Window) {
        self.record(Call::Delete(win));
    }

    fn cleanup(&self) {}
}
