use anyhow::{Result, bail};
use xcb::Window;

use crate::{
    Context,
    arena::{ClientArena, ClientId},
    bindings::Bindings,
    client::{Client, Mode, ModeFilter, State},
    config::{Config, MAX_TAGS},
    geometry::{Direction, Rectangle, Strut},
    layout::Layout,
    monitor::{Monitor, MonitorId},
    xconnection::{Prop, XConn, XEvent, XcbKey},
};

/**
 * The window manager: owns every client and monitor and turns X events and
 * user commands into client operations.
 *
 * All display server access goes through `conn`; a `Context` pairing it with
 * the config is built for each operation that needs one.
 */
pub struct WindowManager<'a> {
    conn: &'a dyn XConn,
    config: Config,
    bindings: Bindings,
    clients: ClientArena,
    monitors: Vec<Monitor>,
    focused_monitor: MonitorId,
    focused: Option<ClientId>,
    running: bool,
}

impl<'a> WindowManager<'a> {
    pub fn new(conn: &'a dyn XConn, config: Config) -> Result<WindowManager<'a>> {
        if config.tags.is_empty() || config.tags.len() > MAX_TAGS {
            bail!("need between 1 and {} tags, got {}", MAX_TAGS, config.tags.len());
        }
        conn.register_wm()?;

        let regions = conn.monitor_regions();
        if regions.is_empty() {
            bail!("No active monitor detected");
        }
        info!("Got active monitors: {:?}", regions);

        // Use tags starting from 0 to fill the monitors
        let monitors = regions
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                let tagset = config.tag_mask(i % config.tags.len()).unwrap_or(1);
                Monitor::new(MonitorId(i), r, tagset, config.main_views)
            })
            .collect();

        let wm = WindowManager {
            conn,
            config,
            bindings: Bindings::new(),
            clients: ClientArena::new(),
            monitors,
            focused_monitor: MonitorId(0),
            focused: None,
            running: false,
        };

        wm.conn.flush();

        Ok(wm)
    }

    /// Grab every key in `bindings` and dispatch them from now on
    pub fn grab_keys(&mut self, bindings: Bindings) {
        for key in bindings.keys() {
            self.conn.grab_key(key);
        }
        info!("grabbed {} key bindings", bindings.len());
        self.bindings = bindings;
    }

    pub fn run(&mut self) {
        self.running = true;
        while self.running {
            if let Some(event) = self.conn.wait_for_event() {
                debug!("got XEvent: {:?}", event);
                match event {
                    XEvent::KeyPress { code } => self.handle_key_press(code),
                    XEvent::MapRequest { id, ignore } => self.handle_map_request(id, ignore),
                    XEvent::UnmapNotify { id } => self.handle_unmap_notify(id),
                    XEvent::ButtonPress { x, y } => self.focus_clicked_monitor(x, y),
                    XEvent::ScreenChange => self.handle_screen_change(),
                    XEvent::DestroyNotify { id } => self.handle_destroy_notify(id),
                    XEvent::ConfigureRequest { id, r } => self.handle_configure_request(id, r),
                    XEvent::PropertyNotify { id, prop, is_root } => {
                        self.handle_property_notify(id, prop, is_root)
                    }
                }
                self.conn.flush();
            }
        }
    }

    /// Shut down the WindowManager, running any required cleanup
    pub fn exit(&mut self) {
        self.conn.cleanup();
        self.running = false;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clients(&self) -> &ClientArena {
        &self.clients
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn focused_monitor(&self) -> MonitorId {
        self.focused_monitor
    }

    pub fn focused_client(&self) -> Option<ClientId> {
        self.focused
    }

    /*
     * X Event handler functions
     * These are called in response to incoming XEvents so calling them directly should
     * only be done if the intent is to act as if the corresponding XEvent had been
     * received from the X event loop.
     */
    fn handle_key_press(&mut self, key: XcbKey) {
        if let Some(action) = self.bindings.get_action(&key) {
            debug!("handling key code: {:?}", key);
            action(self);
        }
    }

    fn handle_map_request(&mut self, win: Window, override_redirect: bool) {
        if override_redirect {
            return;
        }
        let id = match self.clients.lookup(win) {
            Some(id) => id,
            None => {
                self.manage(win);
                return;
            }
        };

        let ctx = Context::new(self.conn, &self.config);
        if let Some(c) = self.clients.get_mut(id) {
            let mon = c.monitor();
            c.map_requested(&ctx, &self.monitors[mon.index()]);
        }
    }

    // Our own hide() calls unmap too: only a client initiated unmap (a
    // withdraw) ends management.
    fn handle_unmap_notify(&mut self, win: Window) {
        let withdrawn = match self.clients.lookup(win).and_then(|id| self.clients.get_mut(id)) {
            Some(c) => !c.unmapped_by_us(),
            None => return,
        };
        if withdrawn {
            debug!("window {} was withdrawn", win);
            self.forget(win);
        }
    }

    fn handle_destroy_notify(&mut self, win: Window) {
        if self.lookup(win).is_some() {
            self.forget(win);
        }
    }

    fn handle_configure_request(&mut self, win: Window, r: Rectangle) {
        let id = match self.clients.lookup(win) {
            Some(id) => id,
            None => {
                // Not ours: grant it unchanged
                self.conn.configure_window(win, Some(r), None, false);
                return;
            }
        };

        let ctx = Context::new(self.conn, &self.config);
        if let Some(c) = self.clients.get_mut(id) {
            if c.mode() == Mode::Floating {
                c.set_floating(&ctx, r);
            } else {
                c.notify(&ctx);
            }
        }
    }

    fn handle_property_notify(&mut self, win: Window, prop: Prop, is_root: bool) {
        if is_root {
            return;
        }
        let id = match self.clients.lookup(win) {
            Some(id) => id,
            None => return,
        };

        let focused = self.focused == Some(id);
        let ctx = Context::new(self.conn, &self.config);
        let client = match self.clients.get_mut(id) {
            Some(c) => c,
            None => return,
        };
        let mon = client.monitor();
        let monitor = &self.monitors[mon.index()];

        let result = match prop {
            Prop::NormalHints => client
                .update_size_hints(&ctx)
                .map(|_| client.reapply(&ctx, monitor)),
            Prop::WmHints => client.update_wm_hints(&ctx).map(|_| {
                let urgent = client.is_urgent();
                client.set_urgent(&ctx, urgent, focused);
            }),
            Prop::WmClass => client.update_class(&ctx),
            Prop::TransientFor => client
                .update_transient(&ctx)
                .map(|_| client.reapply(&ctx, monitor)),
            Prop::WindowType => client.update_window_type(&ctx).map(|_| {
                client.decorate(&ctx);
                client.reapply(&ctx, monitor);
                client.show_or_hide(&ctx, monitor);
            }),
            Prop::Strut | Prop::StrutPartial => client.update_strut(&ctx),
        };

        if let Err(e) = result {
            debug!("ignoring {:?} change on window {}: {}", prop, win, e);
            return;
        }

        match prop {
            Prop::Strut | Prop::StrutPartial => {
                self.update_workarea(mon);
                self.arrange(mon);
            }
            Prop::NormalHints | Prop::TransientFor | Prop::WindowType => self.arrange(mon),
            _ => (),
        }
    }

    /*
     * Client lifecycle
     */

    /// Start managing `win` on the focused monitor (or its owner's monitor for
    /// transients). Returns the existing client if `win` is already managed.
    pub fn manage(&mut self, win: Window) -> Option<ClientId> {
        if let Some(id) = self.clients.lookup(win) {
            debug!("window {} is already managed", win);
            return Some(id);
        }

        let mut client = Client::new(
            win,
            &self.monitors[self.focused_monitor.index()],
            &self.config,
        );
        let ctx = Context::new(self.conn, &self.config);
        let updates: [(&str, fn(&mut Client, &Context) -> Result<()>); 6] = [
            ("WM_CLASS", Client::update_class),
            ("WM_NORMAL_HINTS", Client::update_size_hints),
            ("WM_HINTS", Client::update_wm_hints),
            ("WM_TRANSIENT_FOR", Client::update_transient),
            ("_NET_WM_WINDOW_TYPE", Client::update_window_type),
            ("_NET_WM_STRUT", Client::update_strut),
        ];
        for (name, update) in updates.iter() {
            if let Err(e) = update(&mut client, &ctx) {
                debug!("window {} has no usable {}: {}", win, name, e);
            }
        }

        if let Some(owner) = client
            .transient()
            .and_then(|t| self.clients.lookup(t))
            .and_then(|id| self.clients.get(id))
        {
            client.follow(owner);
        }

        let mon = client.monitor();
        if let Ok(r) = self.conn.window_geometry(win) {
            client.set_floating(&ctx, place_floating(r, &self.monitors[mon.index()]));
        }
        client.decorate(&ctx);
        self.conn.mark_new_window(win);

        info!(
            "managing window {} ({}) on monitor {}",
            win,
            client.class(),
            mon.index()
        );
        let has_strut = !client.strut().is_empty();
        let detached = match self.clients.insert(client) {
            Ok(d) => d,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };
        let id = self.clients.link(detached, &mut self.monitors[mon.index()]);

        if has_strut {
            self.update_workarea(mon);
        }
        self.arrange(mon);

        let ctx = Context::new(self.conn, &self.config);
        let monitor = &self.monitors[mon.index()];
        let mut focusable = false;
        if let Some(c) = self.clients.get_mut(id) {
            c.show_or_hide(&ctx, monitor);
            focusable = c.is_visible(monitor) && c.accepts_focus();
        }
        if focusable && mon == self.focused_monitor {
            self.focus(Some(id));
        }
        Some(id)
    }

    /// The client managing `win`
    pub fn lookup(&self, win: Window) -> Option<ClientId> {
        self.clients.lookup(win)
    }

    /// Stop managing `win`. Focus moves to the previous focusable client.
    pub fn forget(&mut self, win: Window) {
        let id = match self.clients.lookup(win) {
            Some(id) => id,
            None => {
                warn!("attempt to remove unknown window {}", win);
                return;
            }
        };
        let mon = match self.clients.get(id) {
            Some(c) => c.monitor(),
            None => return,
        };

        let was_focused = self.focused == Some(id);
        let successor = if was_focused {
            self.clients
                .previous(id, ModeFilter::Any, State::ACCEPT_FOCUS, &self.monitors[mon.index()])
                .filter(|&other| other != id)
        } else {
            None
        };

        let detached = match self.clients.unlink(id, &mut self.monitors[mon.index()]) {
            Some(d) => d,
            None => {
                warn!("window {} is missing from its monitor", win);
                return;
            }
        };
        let client = self.clients.remove(detached);
        debug!("removing client {} ({})", client.window(), client.class());

        if was_focused {
            self.focused = None;
            self.focus(successor);
        }
        if !client.strut().is_empty() {
            self.update_workarea(mon);
        }
        self.arrange(mon);
    }

    /*
     * Focus
     */

    /// Give the input focus to `target`, or to nothing. Clients that do not
    /// accept focus are refused and the focus stays where it was.
    pub fn focus(&mut self, target: Option<ClientId>) {
        if target.is_some() && target == self.focused {
            return;
        }
        if let Some(id) = target {
            match self.clients.get(id) {
                Some(c) if c.accepts_focus() => (),
                Some(c) => {
                    debug!("window {} does not take focus", c.window());
                    return;
                }
                None => {
                    warn!("attempt to focus a removed client {:?}", id);
                    return;
                }
            }
        }

        let ctx = Context::new(self.conn, &self.config);
        if let Some(old) = self.focused.take() {
            if let Some(c) = self.clients.get_mut(old) {
                c.loose_focus(&ctx);
            }
        }
        match target {
            Some(id) => {
                if let Some(c) = self.clients.get_mut(id) {
                    c.receive_focus(&ctx);
                    self.focused_monitor = c.monitor();
                }
                self.focused = target;
            }
            None => self.conn.focus_nothing(),
        }
    }

    pub fn focus_next_client(&mut self) {
        self.cycle_focus(true);
    }

    pub fn focus_previous_client(&mut self) {
        self.cycle_focus(false);
    }

    fn cycle_focus(&mut self, forward: bool) {
        let monitor = &self.monitors[self.focused_monitor.index()];
        let target = match self.focused {
            Some(id) if forward => {
                self.clients.next(id, ModeFilter::Any, State::ACCEPT_FOCUS, monitor)
            }
            Some(id) => self.clients.previous(id, ModeFilter::Any, State::ACCEPT_FOCUS, monitor),
            None => self.clients.first(ModeFilter::Any, State::ACCEPT_FOCUS, monitor),
        };
        if target.is_some() {
            self.focus(target);
        }
    }

    pub fn focus_next_monitor(&mut self) {
        let mon = self.neighbour_monitor(true);
        self.focus_monitor(mon);
    }

    pub fn focus_previous_monitor(&mut self) {
        let mon = self.neighbour_monitor(false);
        self.focus_monitor(mon);
    }

    fn neighbour_monitor(&self, forward: bool) -> MonitorId {
        let n = self.monitors.len();
        let i = self.focused_monitor.index();
        MonitorId(if forward { (i + 1) % n } else { (i + n - 1) % n })
    }

    /// Focus the monitor showing the point (x, y), as clicked by the user
    pub fn focus_clicked_monitor(&mut self, x: i32, y: i32) {
        let clicked = self
            .monitors
            .iter()
            .find(|m| m.contains_point(x, y))
            .map(|m| m.id());
        match clicked {
            Some(mon) => self.focus_monitor(mon),
            None => debug!("no monitor at ({}, {})", x, y),
        }
    }

    fn focus_monitor(&mut self, mon: MonitorId) {
        if mon == self.focused_monitor {
            return;
        }
        self.focused_monitor = mon;
        let target = self
            .clients
            .first(ModeFilter::Any, State::ACCEPT_FOCUS, &self.monitors[mon.index()]);
        self.focus(target);
    }

    // Keep the focus on a visible client of the focused monitor
    fn refocus(&mut self) {
        let monitor = &self.monitors[self.focused_monitor.index()];
        let keep = match self.focused.and_then(|id| self.clients.get(id)) {
            Some(c) => c.is_visible(monitor),
            None => false,
        };
        if !keep {
            let target = self.clients.first(ModeFilter::Any, State::ACCEPT_FOCUS, monitor);
            self.focus(target);
        }
    }

    /*
     * Focused monitor
     */

    fn tag_mask(&self, tag: usize) -> Option<u32> {
        let mask = self.config.tag_mask(tag);
        if mask.is_none() {
            warn!("there is no tag {}", tag);
        }
        mask
    }

    /// Show only `tag` on the focused monitor
    pub fn focused_monitor_set_tag(&mut self, tag: usize) {
        if let Some(mask) = self.tag_mask(tag) {
            self.set_monitor_tagset(self.focused_monitor, mask);
        }
    }

    /// Add or remove `tag` from the focused monitor. The last tag stays.
    pub fn focused_monitor_toggle_tag(&mut self, tag: usize) {
        if let Some(mask) = self.tag_mask(tag) {
            let mon = self.focused_monitor;
            let tagset = self.monitors[mon.index()].tagset() ^ mask;
            if tagset == 0 {
                debug!("not removing the last tag of monitor {}", mon.index());
                return;
            }
            self.set_monitor_tagset(mon, tagset);
        }
    }

    fn set_monitor_tagset(&mut self, mon: MonitorId, tagset: u32) {
        if !self.monitors[mon.index()].set_tagset(tagset) {
            return;
        }
        debug!("monitor {} now shows tagset {:#b}", mon.index(), tagset);
        self.show_hide(mon);
        self.arrange(mon);
        self.refocus();
    }

    pub fn focused_monitor_update_main_views(&mut self, by: i32) {
        let mon = self.focused_monitor;
        self.monitors[mon.index()].update_main_views(by);
        self.arrange(mon);
    }

    pub fn focused_monitor_set_layout(&mut self, layout: Box<dyn Layout>) {
        let mon = self.focused_monitor;
        self.monitors[mon.index()].set_layout(layout);
        self.arrange(mon);
    }

    /// Rotate the tiling order of the focused monitor by one client
    pub fn focused_monitor_rotate(&mut self, forward: bool) {
        let mon = self.focused_monitor;
        self.clients.rotate(&mut self.monitors[mon.index()], forward);
        self.arrange(mon);
    }

    /*
     * Focused client
     */

    // Run `f` on the focused client, returning its monitor if there was one
    fn update_focused_client<F>(&mut self, f: F) -> Option<MonitorId>
    where
        F: FnOnce(&mut Client, &Context, &Monitor),
    {
        let id = self.focused?;
        let ctx = Context::new(self.conn, &self.config);
        let client = self.clients.get_mut(id)?;
        let mon = client.monitor();
        f(client, &ctx, &self.monitors[mon.index()]);
        Some(mon)
    }

    /// Close the focused client
    pub fn focused_client_kill(&mut self) {
        if let Some(c) = self.focused.and_then(|id| self.clients.get(id)) {
            self.conn.signal_delete_window(c.window());
        }
    }

    /// Tiled <-> floating. A fullscreen client goes back to its saved mode.
    pub fn focused_client_toggle_mode(&mut self) {
        let toggled = self.update_focused_client(|c, ctx, monitor| match c.mode() {
            Mode::Tiled => c.set_mode(ctx, Mode::Floating, monitor),
            Mode::Floating => c.set_mode(ctx, Mode::Tiled, monitor),
            Mode::Fullscreen => c.set_fullscreen(ctx, false, monitor),
        });
        if let Some(mon) = toggled {
            self.arrange(mon);
        }
    }

    pub fn focused_client_toggle_fullscreen(&mut self) {
        let toggled = self.update_focused_client(|c, ctx, monitor| {
            let fullscreen = c.mode() != Mode::Fullscreen;
            c.set_fullscreen(ctx, fullscreen, monitor);
        });
        if let Some(mon) = toggled {
            self.arrange(mon);
        }
    }

    pub fn focused_client_toggle_sticky(&mut self) {
        let toggled = self.update_focused_client(|c, ctx, monitor| {
            let sticky = !c.is_sticky();
            c.set_sticky(ctx, sticky, monitor);
        });
        if let Some(mon) = toggled {
            self.arrange(mon);
            self.refocus();
        }
    }

    /// Move the focused client to `tag` only. Sticky clients are left alone.
    pub fn focused_client_set_tag(&mut self, tag: usize) {
        if let Some(mask) = self.tag_mask(tag) {
            self.retag_focused_client(|_| mask);
        }
    }

    /// Add or remove `tag` from the focused client. Sticky clients are left
    /// alone and a client always keeps at least one tag.
    pub fn focused_client_toggle_tag(&mut self, tag: usize) {
        if let Some(mask) = self.tag_mask(tag) {
            self.retag_focused_client(|tagset| tagset ^ mask);
        }
    }

    fn retag_focused_client<F>(&mut self, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let retagged = self.update_focused_client(|c, ctx, monitor| {
            if c.is_sticky() {
                debug!("window {} is sticky: ignoring tag change", c.window());
                return;
            }
            let tagset = f(c.tagset());
            if tagset == 0 {
                debug!("not removing the last tag of window {}", c.window());
                return;
            }
            c.set_tagset(ctx, tagset, monitor);
        });
        if let Some(mon) = retagged {
            self.arrange(mon);
            self.refocus();
        }
    }

    /// Move the focused client a step in `direction`. Tiled clients start
    /// floating where they last floated; fullscreen ones stay put.
    pub fn focused_client_move(&mut self, direction: Direction) {
        let step = self.config.move_step_px;
        self.reshape_focused_client(|r| r.moved(direction, step));
    }

    /// Grow the focused client by `width` x `height` pixels (shrink it for
    /// negative values). It floats from then on, as with moves.
    pub fn focused_client_resize(&mut self, width: i32, height: i32) {
        self.reshape_focused_client(|r| r.resized(width, height));
    }

    fn reshape_focused_client<F>(&mut self, f: F)
    where
        F: FnOnce(Rectangle) -> Rectangle,
    {
        let reshaped = self.update_focused_client(|c, ctx, monitor| {
            match c.mode() {
                Mode::Fullscreen => return,
                Mode::Tiled => c.set_mode(ctx, Mode::Floating, monitor),
                Mode::Floating => (),
            }
            let r = f(c.floating_geometry());
            c.set_floating(ctx, r);
        });
        if let Some(mon) = reshaped {
            self.arrange(mon);
        }
    }

    pub fn focused_client_to_next_monitor(&mut self) {
        let mon = self.neighbour_monitor(true);
        self.focused_client_to_monitor(mon);
    }

    pub fn focused_client_to_previous_monitor(&mut self) {
        let mon = self.neighbour_monitor(false);
        self.focused_client_to_monitor(mon);
    }

    // The client keeps the focus and takes the tags shown by its new monitor
    fn focused_client_to_monitor(&mut self, target: MonitorId) {
        let id = match self.focused {
            Some(id) => id,
            None => return,
        };
        let from = match self.clients.get(id) {
            Some(c) => c.monitor(),
            None => return,
        };
        if from == target {
            return;
        }

        let detached = match self.clients.unlink(id, &mut self.monitors[from.index()]) {
            Some(d) => d,
            None => {
                warn!("client {:?} is missing from monitor {}", id, from.index());
                return;
            }
        };
        let id = self.clients.link(detached, &mut self.monitors[target.index()]);

        let ctx = Context::new(self.conn, &self.config);
        let old = &self.monitors[from.index()];
        let new = &self.monitors[target.index()];
        if let Some(c) = self.clients.get_mut(id) {
            if !c.is_sticky() {
                c.set_tagset(&ctx, new.tagset(), new);
            }
            match c.mode() {
                Mode::Floating => {
                    let r = c.floating_geometry();
                    let (dx, dy) = (
                        new.geometry().x - old.geometry().x,
                        new.geometry().y - old.geometry().y,
                    );
                    c.set_floating(&ctx, Rectangle::new(r.x + dx, r.y + dy, r.w, r.h));
                }
                Mode::Fullscreen => c.reapply(&ctx, new),
                Mode::Tiled => (),
            }
        }

        self.update_workarea(from);
        self.update_workarea(target);
        self.arrange(from);
        self.arrange(target);
        self.focused_monitor = target;
    }

    /*
     * Layout
     */

    /// Hand every visible tiled client of `mon` its layout region, minus
    /// the border.
    pub fn arrange(&mut self, mon: MonitorId) {
        let monitor = &self.monitors[mon.index()];
        let tiled: Vec<ClientId> = self
            .clients
            .iter(monitor)
            .filter(|&id| {
                self.clients.get(id).map_or(false, |c| {
                    c.matches(ModeFilter::Only(Mode::Tiled), State::ANY, monitor)
                })
            })
            .collect();
        let regions = monitor.tile(tiled.len());
        debug!(
            "arranging {} clients on monitor {} ({})",
            tiled.len(),
            mon.index(),
            monitor.layout().name()
        );

        let ctx = Context::new(self.conn, &self.config);
        for (id, r) in tiled.into_iter().zip(regions) {
            if let Some(c) = self.clients.get_mut(id) {
                let border = 2 * c.border_width();
                let r = Rectangle::new(
                    r.x,
                    r.y,
                    r.w.saturating_sub(border),
                    r.h.saturating_sub(border),
                );
                c.set_tiling(&ctx, r);
            }
        }
    }

    fn show_hide(&mut self, mon: MonitorId) {
        let ctx = Context::new(self.conn, &self.config);
        let monitor = &self.monitors[mon.index()];
        let ids: Vec<ClientId> = self.clients.iter(monitor).collect();
        for id in ids {
            if let Some(c) = self.clients.get_mut(id) {
                c.show_or_hide(&ctx, monitor);
            }
        }
    }

    // Fullscreen clients cover whatever their monitor now is
    fn reapply_fullscreen(&mut self, mon: MonitorId) {
        let ctx = Context::new(self.conn, &self.config);
        let monitor = &self.monitors[mon.index()];
        let ids: Vec<ClientId> = self.clients.iter(monitor).collect();
        for id in ids {
            if let Some(c) = self.clients.get_mut(id) {
                if c.mode() == Mode::Fullscreen {
                    c.reapply(&ctx, monitor);
                }
            }
        }
    }

    /*
     * Outputs
     */

    /// Outputs were added, removed or resized. Clients of outputs that went
    /// away move to the first monitor and take its tags.
    fn handle_screen_change(&mut self) {
        let regions = self.conn.monitor_regions();
        if regions.is_empty() {
            warn!("no active monitor left: keeping the current layout");
            return;
        }
        info!("active monitors changed: {:?}", regions);

        while self.monitors.len() > regions.len() {
            let mut gone = match self.monitors.pop() {
                Some(m) => m,
                None => break,
            };
            let ctx = Context::new(self.conn, &self.config);
            let ids: Vec<ClientId> = self.clients.iter(&gone).collect();
            for id in ids {
                let detached = match self.clients.unlink(id, &mut gone) {
                    Some(d) => d,
                    None => continue,
                };
                let id = self.clients.link(detached, &mut self.monitors[0]);
                let first = &self.monitors[0];
                if let Some(c) = self.clients.get_mut(id) {
                    if !c.is_sticky() {
                        c.set_tagset(&ctx, first.tagset(), first);
                    }
                }
            }
        }

        for (i, r) in regions.into_iter().enumerate() {
            match self.monitors.get_mut(i) {
                Some(monitor) => monitor.set_geometry(r),
                None => {
                    let tagset = self.config.tag_mask(i % self.config.tags.len()).unwrap_or(1);
                    let monitor = Monitor::new(MonitorId(i), r, tagset, self.config.main_views);
                    self.monitors.push(monitor);
                }
            }
        }
        if self.focused_monitor.index() >= self.monitors.len() {
            self.focused_monitor = MonitorId(0);
        }

        for i in 0..self.monitors.len() {
            let mon = MonitorId(i);
            self.update_workarea(mon);
            self.reapply_fullscreen(mon);
            self.show_hide(mon);
            self.arrange(mon);
        }
        self.refocus();
    }

    fn update_workarea(&mut self, mon: MonitorId) {
        let struts: Vec<Strut> = self
            .clients
            .iter(&self.monitors[mon.index()])
            .filter_map(|id| self.clients.get(id))
            .map(|c| c.strut())
            .collect();
        let monitor = &mut self.monitors[mon.index()];
        monitor.update_workarea(struts);
        debug!("monitor {} work area: {:?}", mon.index(), monitor.workarea());
    }
}

// Keep a floating window where it asked to be unless that is off the monitor
fn place_floating(r: Rectangle, monitor: &Monitor) -> Rectangle {
    if monitor.contains_point(r.x, r.y) {
        return r;
    }
    let area = monitor.workarea();
    let (w, h) = (r.w.min(area.w), r.h.min(area.h));
    Rectangle::new(
        area.x + ((area.w - w) / 2) as i32,
        area.y + ((area.h - h) / 2) as i32,
        w,
        h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bindings::Command,
        mock::{Call, MockConn, type_atom},
        xconnection::WindowType,
    };

    fn screens() -> Vec<Rectangle> {
        vec![Rectangle::new(0, 0, 1920, 1080), Rectangle::new(1920, 0, 1280, 1024)]
    }

    fn geometry(wm: &WindowManager, id: ClientId) -> Rectangle {
        wm.client(id).unwrap().geometry()
    }

    #[test]
    fn monitors_start_on_their_own_tag() {
        let conn = MockConn::new(screens());
        let wm = WindowManager::new(&conn, Config::default()).unwrap();
        assert_eq!(wm.monitors().len(), 2);
        assert_eq!(wm.monitors()[0].tagset(), 0b01);
        assert_eq!(wm.monitors()[1].tagset(), 0b10);
    }

    #[test]
    fn no_monitor_is_an_error() {
        let conn = MockConn::new(vec![]);
        assert!(WindowManager::new(&conn, Config::default()).is_err());

        let conn = MockConn::new(screens());
        let config = Config {
            tags: vec![],
            ..Config::default()
        };
        assert!(WindowManager::new(&conn, config).is_err());
    }

    #[test]
    fn managed_clients_are_tiled_and_focused() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();
        let b = wm.manage(11).unwrap();

        assert_eq!(geometry(&wm, a), Rectangle::new(0, 0, 956, 1076));
        assert_eq!(geometry(&wm, b), Rectangle::new(960, 0, 956, 1076));
        assert_eq!(wm.focused_client(), Some(b));
        assert_eq!(wm.manage(10), Some(a));
        assert_eq!(wm.lookup(11), Some(b));

        let calls = conn.calls();
        assert!(calls.contains(&Call::Map(10)));
        assert!(calls.contains(&Call::MarkNew(11)));
        assert!(calls.contains(&Call::Focus(11)));
    }

    #[test]
    fn forget_moves_focus_to_the_previous_client() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        wm.manage(10);
        let b = wm.manage(11).unwrap();
        wm.manage(12);

        wm.forget(12);
        assert_eq!(wm.focused_client(), Some(b));
        assert_eq!(wm.lookup(12), None);
        assert_eq!(geometry(&wm, b), Rectangle::new(960, 0, 956, 1076));

        wm.forget(10);
        wm.forget(11);
        assert_eq!(wm.focused_client(), None);
        assert_eq!(conn.calls().last(), Some(&Call::FocusNothing));
        assert!(wm.clients().is_empty());
    }

    #[test]
    fn focus_cycles_through_the_monitor_list() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();
        let b = wm.manage(11).unwrap();

        wm.focus_next_client();
        assert_eq!(wm.focused_client(), Some(a));
        wm.focus_next_client();
        assert_eq!(wm.focused_client(), Some(b));
        wm.focus_previous_client();
        assert_eq!(wm.focused_client(), Some(a));
        assert_eq!(wm.client(b).unwrap().border_color(), wm.config().unfocused_border_color);
    }

    #[test]
    fn docks_reserve_space_and_never_take_focus() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        conn.set_cardinals(20, Prop::WindowType, vec![type_atom(WindowType::Dock)]);
        conn.set_cardinals(20, Prop::StrutPartial, vec![0, 0, 30, 0, 0, 0, 0, 0, 0, 1919, 0, 0]);

        let dock = wm.manage(20).unwrap();
        assert_eq!(wm.focused_client(), None);
        assert_eq!(wm.monitors()[0].workarea(), Rectangle::new(0, 30, 1920, 1050));

        let a = wm.manage(10).unwrap();
        assert_eq!(geometry(&wm, a), Rectangle::new(0, 30, 1916, 1046));
        wm.focus(Some(dock));
        assert_eq!(wm.focused_client(), Some(a));

        wm.forget(20);
        assert_eq!(geometry(&wm, a), Rectangle::new(0, 0, 1916, 1076));
    }

    #[test]
    fn switching_tags_hides_and_refocuses() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();
        conn.take_calls();

        wm.focused_monitor_set_tag(2);
        assert!(conn.calls().contains(&Call::Unmap(10)));
        assert_eq!(wm.focused_client(), None);

        wm.focused_monitor_set_tag(0);
        assert!(conn.calls().contains(&Call::Map(10)));
        assert_eq!(wm.focused_client(), Some(a));

        wm.focused_monitor_set_tag(42);
        assert_eq!(wm.monitors()[0].tagset(), 0b1);
    }

    #[test]
    fn monitor_toggles_keep_one_tag() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        wm.focused_monitor_toggle_tag(0);
        assert_eq!(wm.monitors()[0].tagset(), 0b1);
        wm.focused_monitor_toggle_tag(2);
        assert_eq!(wm.monitors()[0].tagset(), 0b101);
        wm.focused_monitor_toggle_tag(0);
        assert_eq!(wm.monitors()[0].tagset(), 0b100);
    }

    #[test]
    fn client_toggles_keep_one_tag() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();

        wm.focused_client_toggle_tag(0);
        assert_eq!(wm.client(a).unwrap().tagset(), 0b1);

        wm.focused_client_toggle_tag(3);
        assert_eq!(wm.client(a).unwrap().tagset(), 0b1001);

        wm.focused_client_toggle_tag(0);
        assert_eq!(wm.client(a).unwrap().tagset(), 0b1000);
        assert!(!wm.client(a).unwrap().is_visible(&wm.monitors()[0]));
        assert_eq!(wm.focused_client(), None);
    }

    #[test]
    fn sticky_clients_ignore_tag_changes() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();

        wm.focused_client_toggle_sticky();
        assert_eq!(wm.client(a).unwrap().tagset(), 0);
        wm.focused_client_set_tag(4);
        wm.focused_client_toggle_tag(4);
        assert_eq!(wm.client(a).unwrap().tagset(), 0);

        wm.focused_monitor_set_tag(5);
        assert_eq!(wm.focused_client(), Some(a));

        wm.focused_client_toggle_sticky();
        assert_eq!(wm.client(a).unwrap().tagset(), 0b1);
        assert_eq!(wm.focused_client(), None);
    }

    #[test]
    fn clients_move_between_monitors() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();

        wm.focused_client_to_next_monitor();
        let c = wm.client(a).unwrap();
        assert_eq!(c.monitor(), MonitorId(1));
        assert_eq!(c.tagset(), 0b10);
        assert_eq!(c.geometry(), Rectangle::new(1920, 0, 1276, 1020));
        assert_eq!(wm.focused_monitor(), MonitorId(1));
        assert_eq!(wm.focused_client(), Some(a));
        assert!(wm.monitors()[0].is_empty());

        wm.focus_previous_monitor();
        assert_eq!(wm.focused_monitor(), MonitorId(0));
        assert_eq!(wm.focused_client(), None);
    }

    #[test]
    fn mode_toggles_keep_both_rectangles() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();
        let tiled = geometry(&wm, a);

        wm.focused_client_toggle_mode();
        assert_eq!(wm.client(a).unwrap().mode(), Mode::Floating);
        assert_eq!(geometry(&wm, a), tiled);

        wm.focused_client_toggle_fullscreen();
        assert_eq!(geometry(&wm, a), Rectangle::new(0, 0, 1920, 1080));
        wm.focused_client_toggle_mode();
        assert_eq!(wm.client(a).unwrap().mode(), Mode::Floating);

        wm.focused_client_toggle_mode();
        assert_eq!(wm.client(a).unwrap().mode(), Mode::Tiled);
        assert_eq!(geometry(&wm, a), tiled);
    }

    #[test]
    fn configure_requests() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let r = Rectangle::new(5, 5, 300, 200);

        wm.handle_configure_request(99, r);
        assert_eq!(
            conn.take_calls(),
            vec![Call::Configure {
                win: 99,
                region: Some(r),
                border_width: None,
                stack_above: false
            }]
        );

        let a = wm.manage(10).unwrap();
        conn.take_calls();
        wm.handle_configure_request(10, r);
        assert_eq!(
            conn.take_calls(),
            vec![Call::ConfigureNotify {
                win: 10,
                region: geometry(&wm, a),
                border_width: 2
            }]
        );

        wm.focused_client_toggle_mode();
        wm.handle_configure_request(10, r);
        assert_eq!(geometry(&wm, a), r);
    }

    #[test]
    fn urgency_hints_color_unfocused_clients() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();
        let b = wm.manage(11).unwrap();
        let urgent = vec![1 << 8];

        conn.set_cardinals(10, Prop::WmHints, urgent.clone());
        wm.handle_property_notify(10, Prop::WmHints, false);
        assert!(wm.client(a).unwrap().is_urgent());
        assert_eq!(wm.client(a).unwrap().border_color(), wm.config().urgent_border_color);

        conn.set_cardinals(11, Prop::WmHints, urgent);
        conn.take_calls();
        wm.handle_property_notify(11, Prop::WmHints, false);
        assert!(!wm.client(b).unwrap().is_urgent());
        assert_eq!(wm.client(b).unwrap().border_color(), wm.config().focused_border_color);
        // the focused client is not focused a second time
        assert!(conn.take_calls().is_empty());
    }

    #[test]
    fn transients_open_next_to_their_owner() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        wm.manage(10);
        wm.focus_next_monitor();

        conn.set_cardinals(30, Prop::TransientFor, vec![10]);
        let popup = wm.manage(30).unwrap();
        let c = wm.client(popup).unwrap();
        assert_eq!(c.monitor(), MonitorId(0));
        assert_eq!(c.tagset(), 0b1);
        assert_eq!(c.mode(), Mode::Floating);
    }

    #[test]
    fn key_presses_run_their_binding() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();
        wm.manage(11);

        let key = XcbKey { mod_mask: 0, code: 44 };
        let mut bindings = Bindings::new();
        bindings.bind(key, Command::FocusNext);
        wm.grab_keys(bindings);
        assert!(conn.calls().contains(&Call::GrabKey(key)));

        wm.handle_key_press(key);
        assert_eq!(wm.focused_client(), Some(a));

        wm.handle_key_press(XcbKey { mod_mask: 0, code: 45 });
        assert_eq!(wm.focused_client(), Some(a));
    }

    #[test]
    fn kill_asks_the_focused_client_to_close() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        wm.manage(10);
        wm.focused_client_kill();
        assert_eq!(conn.calls().last(), Some(&Call::Delete(10)));
    }

    #[test]
    fn rotating_and_main_views_rearrange() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();
        let b = wm.manage(11).unwrap();

        wm.focused_monitor_rotate(true);
        assert_eq!(geometry(&wm, b).x, 0);
        assert_eq!(geometry(&wm, a).x, 960);

        wm.focused_monitor_update_main_views(-3);
        assert_eq!(wm.monitors()[0].main_views(), 0);
    }

    #[test]
    fn withdrawn_windows_are_forgotten() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();
        wm.manage(11);

        // unmapped by a tag switch: still managed
        wm.focused_monitor_set_tag(1);
        wm.handle_unmap_notify(10);
        wm.handle_unmap_notify(11);
        assert_eq!(wm.clients().len(), 2);

        wm.focused_monitor_set_tag(0);
        wm.handle_unmap_notify(11);
        assert_eq!(wm.lookup(11), None);
        assert_eq!(wm.focused_client(), Some(a));
        assert_eq!(geometry(&wm, a), Rectangle::new(0, 0, 1916, 1076));

        // mapping it again manages it from scratch
        conn.take_calls();
        wm.handle_map_request(11, false);
        assert!(wm.lookup(11).is_some());
        assert!(conn.calls().contains(&Call::Map(11)));
    }

    #[test]
    fn map_requests_for_managed_windows_map_them_again() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        wm.manage(10);
        conn.take_calls();

        wm.handle_map_request(10, false);
        assert_eq!(conn.take_calls(), vec![Call::Map(10)]);
    }

    #[test]
    fn floating_rectangles_come_from_the_window() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let asked = Rectangle::new(100, 100, 640, 480);
        conn.set_geometry(10, asked);
        conn.set_geometry(11, Rectangle::new(-5000, 0, 640, 480));

        let a = wm.manage(10).unwrap();
        let b = wm.manage(11).unwrap();
        assert_eq!(wm.client(a).unwrap().mode(), Mode::Tiled);
        assert_eq!(wm.client(a).unwrap().floating_geometry(), asked);
        assert_eq!(
            wm.client(b).unwrap().floating_geometry(),
            Rectangle::new(640, 300, 640, 480)
        );

        wm.focus(Some(a));
        wm.focused_client_toggle_mode();
        assert_eq!(geometry(&wm, a), asked);
    }

    #[test]
    fn moving_and_resizing_float_the_focused_client() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();
        let b = wm.manage(11).unwrap();

        wm.focused_client_move(Direction::Right);
        assert_eq!(wm.client(b).unwrap().mode(), Mode::Floating);
        assert_eq!(geometry(&wm, b), Rectangle::new(980, 0, 956, 1076));
        // the remaining tiled client takes the whole monitor
        assert_eq!(geometry(&wm, a), Rectangle::new(0, 0, 1916, 1076));

        wm.focused_client_resize(-100, -50);
        assert_eq!(geometry(&wm, b), Rectangle::new(980, 0, 856, 1026));

        wm.focused_client_toggle_fullscreen();
        wm.focused_client_move(Direction::Up);
        wm.focused_client_resize(10, 10);
        assert_eq!(geometry(&wm, b), Rectangle::new(0, 0, 1920, 1080));
    }

    #[test]
    fn clicks_focus_the_monitor_under_the_pointer() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();

        wm.focus_clicked_monitor(2000, 10);
        assert_eq!(wm.focused_monitor(), MonitorId(1));
        assert_eq!(wm.focused_client(), None);

        wm.focus_clicked_monitor(-10, -10);
        assert_eq!(wm.focused_monitor(), MonitorId(1));

        wm.focus_clicked_monitor(5, 5);
        assert_eq!(wm.focused_monitor(), MonitorId(0));
        assert_eq!(wm.focused_client(), Some(a));
    }

    #[test]
    fn screen_changes_resize_and_merge_monitors() {
        let conn = MockConn::new(screens());
        let mut wm = WindowManager::new(&conn, Config::default()).unwrap();
        let a = wm.manage(10).unwrap();
        wm.focus_next_monitor();
        let b = wm.manage(11).unwrap();
        wm.focused_client_toggle_fullscreen();
        assert_eq!(geometry(&wm, b), Rectangle::new(1920, 0, 1280, 1024));

        conn.set_monitors(vec![Rectangle::new(0, 0, 2560, 1440)]);
        wm.handle_screen_change();
        assert_eq!(wm.monitors().len(), 1);
        assert_eq!(wm.focused_monitor(), MonitorId(0));
        let moved = wm.client(b).unwrap();
        assert_eq!(moved.monitor(), MonitorId(0));
        assert_eq!(moved.tagset(), 0b1);
        assert_eq!(moved.geometry(), Rectangle::new(0, 0, 2560, 1440));
        assert_eq!(geometry(&wm, a), Rectangle::new(0, 0, 2556, 1436));

        conn.set_monitors(screens());
        wm.handle_screen_change();
        assert_eq!(wm.monitors().len(), 2);
        assert_eq!(wm.monitors()[1].tagset(), 0b10);
        assert_eq!(geometry(&wm, a), Rectangle::new(0, 0, 1916, 1076));
        assert_eq!(geometry(&wm, b), Rectangle::new(0, 0, 1920, 1080));
    }

    #[test]
    fn floating_windows_stay_on_their_monitor() {
        let monitor = Monitor::new(MonitorId(0), Rectangle::new(0, 0, 1920, 1080), 1, 1);
        let inside = Rectangle::new(100, 100, 640, 480);
        assert_eq!(place_floating(inside, &monitor), inside);
        assert_eq!(
            place_floating(Rectangle::new(-5000, 0, 640, 480), &monitor),
            Rectangle::new(640, 300, 640, 480)
        );
    }
}
