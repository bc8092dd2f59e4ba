use anyhow::{Result, anyhow, bail};
use bitflags::bitflags;
use xcb::Window;

use crate::{
    Context,
    arena::Link,
    config::Config,
    geometry::{Rectangle, Strut},
    hints::{SizeHints, WmHints},
    monitor::{Monitor, MonitorId},
    xconnection::{Prop, WindowType},
};

/// Longest WM_CLASS instance / class name we keep, in bytes
pub const MAX_CLASS_LEN: usize = 255;

/// How a client's geometry is decided
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Mode {
    /// Placed by the monitor layout
    Tiled,
    /// Placed wherever the user (or the client) wants
    Floating,
    /// Covers the whole monitor, no border
    Fullscreen,
}

impl Default for Mode {
    fn default() -> Mode {
        Mode::Tiled
    }
}

/// A Mode pattern used when walking the client list
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ModeFilter {
    Any,
    Only(Mode),
}

impl ModeFilter {
    pub fn matches(self, mode: Mode) -> bool {
        match self {
            ModeFilter::Any => true,
            ModeFilter::Only(m) => m == mode,
        }
    }
}

impl From<Mode> for ModeFilter {
    fn from(mode: Mode) -> ModeFilter {
        ModeFilter::Only(mode)
    }
}

bitflags! {
    /// Independent client flags
    #[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy)]
    pub struct State: u8 {
        /// The client takes keyboard focus
        const ACCEPT_FOCUS = 1 << 0;
        /// Shown whatever tags its monitor displays
        const STICKY = 1 << 1;
        /// Asking for the user's attention
        const URGENT = 1 << 2;
    }
}

impl State {
    /// As a traversal filter: matches every client
    pub const ANY: State = State::empty();
}

/**
 * A top level window we manage.
 *
 * A client keeps two remembered rectangles: the one the layout gave it
 * (`tiling_geometry`) and the one it floats at (`floating_geometry`). The
 * rectangle actually on screen (`geometry`) is derived from whichever one the
 * current mode uses, so flipping modes back and forth never loses either.
 */
#[derive(Debug)]
pub struct Client {
    window: Window,
    mode: Mode,
    saved_mode: Mode,
    window_type: Option<WindowType>,
    instance: String,
    class: String,
    tiling_geometry: Rectangle,
    floating_geometry: Rectangle,
    geometry: Rectangle,
    border_width: u32,
    border_color: u32,
    state: State,
    strut: Strut,
    size_hints: SizeHints,
    transient: Option<Window>,
    monitor: MonitorId,
    tagset: u32,
    saved_tagset: u32,
    mapped: bool,
    // UnmapNotify events caused by our own hide() that are still to come
    pending_unmaps: u32,
    pub(crate) link: Option<Link>,
}

impl Client {
    /// Track a new window on the given monitor, showing the monitor's current
    /// tags. Nothing is sent to the X server.
    pub fn new(window: Window, monitor: &Monitor, config: &Config) -> Client {
        Client {
            window,
            mode: Mode::Tiled,
            saved_mode: Mode::Tiled,
            window_type: None,
            instance: String::new(),
            class: String::new(),
            tiling_geometry: Rectangle::default(),
            floating_geometry: Rectangle::default(),
            geometry: Rectangle::default(),
            border_width: config.border_width_px,
            border_color: config.unfocused_border_color,
            state: State::ACCEPT_FOCUS,
            strut: Strut::default(),
            size_hints: SizeHints::default(),
            transient: None,
            monitor: monitor.id(),
            tagset: monitor.tagset(),
            saved_tagset: monitor.tagset(),
            mapped: false,
            pending_unmaps: 0,
            link: None,
        }
    }

    /// The X window ID of this client
    pub fn window(&self) -> Window {
        self.window
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The mode `set_fullscreen(false)` goes back to
    pub fn saved_mode(&self) -> Mode {
        self.saved_mode
    }

    pub fn window_type(&self) -> Option<WindowType> {
        self.window_type
    }

    /// The WM_CLASS instance name
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// The WM_CLASS class name
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn tiling_geometry(&self) -> Rectangle {
        self.tiling_geometry
    }

    pub fn floating_geometry(&self) -> Rectangle {
        self.floating_geometry
    }

    /// Where the client currently is on screen
    pub fn geometry(&self) -> Rectangle {
        self.geometry
    }

    pub fn border_width(&self) -> u32 {
        self.border_width
    }

    pub fn border_color(&self) -> u32 {
        self.border_color
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn strut(&self) -> Strut {
        self.strut
    }

    pub fn size_hints(&self) -> &SizeHints {
        &self.size_hints
    }

    /// The window this one is a transient for (dialogs...)
    pub fn transient(&self) -> Option<Window> {
        self.transient
    }

    pub fn monitor(&self) -> MonitorId {
        self.monitor
    }

    /// 0 for sticky clients
    pub fn tagset(&self) -> u32 {
        self.tagset
    }

    pub fn saved_tagset(&self) -> u32 {
        self.saved_tagset
    }

    pub fn accepts_focus(&self) -> bool {
        self.state.contains(State::ACCEPT_FOCUS)
    }

    pub fn is_sticky(&self) -> bool {
        self.state.contains(State::STICKY)
    }

    pub fn is_urgent(&self) -> bool {
        self.state.contains(State::URGENT)
    }

    /// True if the size hints leave no room for resizing
    pub fn is_fixed(&self) -> bool {
        self.size_hints.is_fixed()
    }

    /// Whether we last asked for the window to be shown
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// True while the client sits in a monitor's client list
    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    /// Sticky clients are visible whatever the monitor shows.
    pub fn is_visible(&self, monitor: &Monitor) -> bool {
        self.tagset == 0 || self.tagset & monitor.tagset() != 0
    }

    /// Whether this client passes a traversal filter on `monitor`
    pub fn matches(&self, mode: ModeFilter, state: State, monitor: &Monitor) -> bool {
        mode.matches(self.mode) && self.state.contains(state) && self.is_visible(monitor)
    }

    pub(crate) fn set_monitor(&mut self, monitor: MonitorId) {
        self.monitor = monitor;
    }

    /// Transients open where their owner lives, sticky if the owner is.
    /// Only meant for clients that are not linked into a monitor yet: nothing
    /// is sent to the X server.
    pub(crate) fn follow(&mut self, owner: &Client) {
        self.monitor = owner.monitor;
        self.saved_tagset = owner.saved_tagset;
        if owner.is_sticky() {
            self.state.insert(State::STICKY);
        }
        self.tagset = if self.is_sticky() { 0 } else { owner.tagset };
    }

    /// Account for an UnmapNotify on our window. True if it came from one of
    /// our own `hide` calls, false if the client withdrew the window.
    pub(crate) fn unmapped_by_us(&mut self) -> bool {
        if self.pending_unmaps > 0 {
            self.pending_unmaps -= 1;
            return true;
        }
        self.mapped = false;
        false
    }

    /// The client asked for its window to be mapped again: the window is
    /// unmapped on the server whatever we last did with it.
    pub(crate) fn map_requested(&mut self, ctx: &Context, monitor: &Monitor) {
        self.mapped = false;
        self.pending_unmaps = 0;
        self.show_or_hide(ctx, monitor);
    }

    // Clients the user has not placed yet float instead of tiling
    fn float_by_default(&mut self) {
        if self.mode == Mode::Tiled {
            self.mode = Mode::Floating;
            if self.floating_geometry.is_empty() {
                self.floating_geometry = self.tiling_geometry;
            }
        }
    }

    fn is_panel(&self) -> bool {
        match self.window_type {
            Some(WindowType::Dock) | Some(WindowType::Desktop) => true,
            _ => false,
        }
    }

    fn effective_border_width(&self) -> u32 {
        if self.mode == Mode::Fullscreen {
            0
        } else {
            self.border_width
        }
    }

    /*
     * Property updates: read one property, merge it in. On error the client is
     * left untouched and nothing is sent to the X server.
     */

    /// Reload _NET_WM_STRUT_PARTIAL, falling back to _NET_WM_STRUT
    pub fn update_strut(&mut self, ctx: &Context) -> Result<()> {
        let raw = ctx
            .conn
            .get_cardinals(self.window, Prop::StrutPartial)
            .or_else(|_| ctx.conn.get_cardinals(self.window, Prop::Strut))?;
        self.strut = Strut::from_raw(&raw)?;
        Ok(())
    }

    /// Reload WM_NORMAL_HINTS. Clients that can not be resized float.
    pub fn update_size_hints(&mut self, ctx: &Context) -> Result<()> {
        let raw = ctx.conn.get_cardinals(self.window, Prop::NormalHints)?;
        self.size_hints = SizeHints::from_raw(&raw)?;
        if self.is_fixed() {
            self.float_by_default();
        }
        Ok(())
    }

    /// Reload WM_HINTS: the input and urgency flags
    pub fn update_wm_hints(&mut self, ctx: &Context) -> Result<()> {
        let raw = ctx.conn.get_cardinals(self.window, Prop::WmHints)?;
        let hints = WmHints::from_raw(&raw)?;
        let input = hints.input.unwrap_or(true) && !self.is_panel();
        self.state.set(State::ACCEPT_FOCUS, input);
        self.state.set(State::URGENT, hints.urgent);
        Ok(())
    }

    /// Reload _NET_WM_WINDOW_TYPE. Docks and desktops become sticky,
    /// borderless floating clients that never take focus; the types listed
    /// in the config float.
    pub fn update_window_type(&mut self, ctx: &Context) -> Result<()> {
        let raw = ctx.conn.get_cardinals(self.window, Prop::WindowType)?;
        let window_type = raw
            .iter()
            .find_map(|&atom| ctx.conn.window_type(atom))
            .ok_or_else(|| anyhow!("window {} has no known window type", self.window))?;

        self.window_type = Some(window_type);
        if self.is_panel() {
            self.state.remove(State::ACCEPT_FOCUS);
            if !self.is_sticky() {
                self.state.insert(State::STICKY);
                self.saved_tagset = self.tagset;
                self.tagset = 0;
            }
            self.border_width = 0;
            self.float_by_default();
        } else if ctx.config.floats(window_type) {
            self.float_by_default();
        }
        Ok(())
    }

    /// Reload WM_TRANSIENT_FOR. Transient clients float.
    pub fn update_transient(&mut self, ctx: &Context) -> Result<()> {
        let raw = ctx.conn.get_cardinals(self.window, Prop::TransientFor)?;
        let owner = match raw.first() {
            Some(&w) if w != xcb::NONE && w != self.window => w,
            _ => bail!("window {} is not a transient", self.window),
        };
        self.transient = Some(owner);
        self.float_by_default();
        Ok(())
    }

    /// Reload WM_CLASS
    pub fn update_class(&mut self, ctx: &Context) -> Result<()> {
        let raw = ctx.conn.get_bytes(self.window, Prop::WmClass)?;
        let (instance, class) = parse_wm_class(&raw)?;
        self.instance = instance;
        self.class = class;
        Ok(())
    }

    /*
     * Geometry
     */

    /// The rectangle the size hints allow for `r`.
    pub fn apply_size_hints(&self, r: Rectangle) -> Rectangle {
        self.size_hints.apply(r)
    }

    /// Tell the client where it is with a synthetic ConfigureNotify
    pub fn notify(&self, ctx: &Context) {
        ctx.conn
            .send_configure_notify(self.window, self.geometry, self.effective_border_width());
    }

    /// Remember `r` as the tiling rectangle, moving there if tiled.
    pub fn set_tiling(&mut self, ctx: &Context, r: Rectangle) {
        self.tiling_geometry = r;
        if self.mode == Mode::Tiled {
            let g = self.apply_size_hints(r);
            self.place(ctx, g);
        }
    }

    /// Remember `r` as the floating rectangle, moving there if floating.
    pub fn set_floating(&mut self, ctx: &Context, r: Rectangle) {
        self.floating_geometry = r;
        if self.mode == Mode::Floating {
            let g = self.apply_size_hints(r);
            self.place(ctx, g);
        }
    }

    /// Switch to `mode` and move to the matching rectangle in a single
    /// configure request. Leaving a non fullscreen mode remembers it in
    /// `saved_mode`.
    pub fn set_mode(&mut self, ctx: &Context, mode: Mode, monitor: &Monitor) {
        if mode == self.mode {
            return;
        }
        if self.mode != Mode::Fullscreen {
            self.saved_mode = self.mode;
        }
        self.mode = mode;
        if mode == Mode::Floating && self.floating_geometry.is_empty() {
            self.floating_geometry = self.tiling_geometry;
        }
        self.reapply(ctx, monitor);
    }

    /// Move to the rectangle the current mode calls for. Used when the
    /// monitor or the size hints changed under the client.
    pub fn reapply(&mut self, ctx: &Context, monitor: &Monitor) {
        let g = match self.mode {
            Mode::Tiled => self.apply_size_hints(self.tiling_geometry),
            Mode::Floating => self.apply_size_hints(self.floating_geometry),
            Mode::Fullscreen => monitor.geometry(),
        };
        self.place(ctx, g);
    }

    pub fn set_fullscreen(&mut self, ctx: &Context, fullscreen: bool, monitor: &Monitor) {
        if fullscreen {
            self.set_mode(ctx, Mode::Fullscreen, monitor);
        } else if self.mode == Mode::Fullscreen {
            let mode = self.saved_mode;
            self.set_mode(ctx, mode, monitor);
        }
    }

    fn place(&mut self, ctx: &Context, g: Rectangle) {
        self.geometry = g;
        ctx.conn.configure_window(
            self.window,
            Some(g),
            Some(self.effective_border_width()),
            self.mode != Mode::Tiled,
        );
    }

    /*
     * Tags & visibility
     */

    /// Move to `tagset` and map or unmap the window to match what `monitor`
    /// (the client's own monitor) displays. A tagset of 0 makes the client
    /// sticky, any other one unsticks it.
    pub fn set_tagset(&mut self, ctx: &Context, tagset: u32, monitor: &Monitor) {
        if tagset == self.tagset {
            return;
        }
        if tagset == 0 {
            self.set_sticky(ctx, true, monitor);
            return;
        }
        self.state.remove(State::STICKY);
        self.tagset = tagset;
        self.saved_tagset = tagset;
        self.show_or_hide(ctx, monitor);
    }

    /// Sticky clients get tagset 0; unsticking restores the previous tagset.
    pub fn set_sticky(&mut self, ctx: &Context, sticky: bool, monitor: &Monitor) {
        if sticky == self.is_sticky() {
            return;
        }
        if sticky {
            self.state.insert(State::STICKY);
            self.saved_tagset = self.tagset;
            self.tagset = 0;
        } else {
            self.state.remove(State::STICKY);
            self.tagset = self.saved_tagset;
        }
        self.show_or_hide(ctx, monitor);
    }

    pub fn show(&mut self, ctx: &Context) {
        if !self.mapped {
            ctx.conn.map_window(self.window);
            self.mapped = true;
        }
    }

    pub fn hide(&mut self, ctx: &Context) {
        if self.mapped {
            ctx.conn.unmap_window(self.window);
            self.mapped = false;
            self.pending_unmaps += 1;
        }
    }

    pub fn show_or_hide(&mut self, ctx: &Context, monitor: &Monitor) {
        if self.is_visible(monitor) {
            self.show(ctx);
        } else {
            self.hide(ctx);
        }
    }

    /*
     * Focus & decoration
     */

    /// Set up the border of a freshly managed window
    pub fn decorate(&self, ctx: &Context) {
        ctx.conn
            .configure_window(self.window, None, Some(self.effective_border_width()), false);
        ctx.conn.set_window_border_color(self.window, self.border_color);
    }

    /// Take the input focus. Returns false, doing nothing, if the client
    /// does not accept focus.
    pub fn receive_focus(&mut self, ctx: &Context) -> bool {
        if !self.accepts_focus() {
            return false;
        }
        self.state.remove(State::URGENT);
        self.set_border_color(ctx, ctx.config.focused_border_color);
        ctx.conn.focus_window(self.window);
        true
    }

    /// Drop back to the unfocused (or urgent) border.
    pub fn loose_focus(&mut self, ctx: &Context) {
        let color = self.border_color_for(ctx, false);
        self.set_border_color(ctx, color);
    }

    /// Raise or clear the urgency flag. The focused client already has the
    /// user's attention: it is never urgent and keeps its focused border.
    pub fn set_urgent(&mut self, ctx: &Context, urgent: bool, focused: bool) {
        self.state.set(State::URGENT, urgent && !focused);
        let color = self.border_color_for(ctx, focused);
        if color != self.border_color {
            self.set_border_color(ctx, color);
        }
    }

    fn border_color_for(&self, ctx: &Context, focused: bool) -> u32 {
        if focused {
            ctx.config.focused_border_color
        } else if self.is_urgent() {
            ctx.config.urgent_border_color
        } else {
            ctx.config.unfocused_border_color
        }
    }

    fn set_border_color(&mut self, ctx: &Context, color: u32) {
        self.border_color = color;
        ctx.conn.set_window_border_color(self.window, color);
    }
}

// WM_CLASS is two consecutive null terminated strings: instance then class
fn parse_wm_class(raw: &[u8]) -> Result<(String, String)> {
    let mut parts = raw.split(|&b| b == 0);
    match (parts.next(), parts.next()) {
        (Some(instance), Some(class)) => Ok((bounded(instance), bounded(class))),
        _ => Err(anyhow!("WM_CLASS needs an instance and a class name")),
    }
}

fn bounded(bytes: &[u8]) -> String {
    let mut s = String::from_utf8_lossy(bytes).into_owned();
    if s.len() > MAX_CLASS_LEN {
        let mut end = MAX_CLASS_LEN;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}
