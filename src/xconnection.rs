use anyhow::{Context, Result, anyhow, bail};

use xcb::{Atom, Window, randr, xinerama};
use xcb_util::{ewmh, icccm};

use crate::geometry::Rectangle;

// Mask out the most significant bit, which is set on events generated by a
// SendEvent request
const XCB_RESPONSE_TYPE_MASK: u8 = 0x7F;
const GRAB_MODE_ASYNC: u8 = xcb::GRAB_MODE_ASYNC as u8;
const ROOT_EVENT_MASK: &[(u32, u32)] = &[(
    xcb::CW_EVENT_MASK,
    xcb::EVENT_MASK_PROPERTY_CHANGE
        | xcb::EVENT_MASK_SUBSTRUCTURE_REDIRECT
        | xcb::EVENT_MASK_SUBSTRUCTURE_NOTIFY
        | xcb::EVENT_MASK_BUTTON_PRESS,
)];
const NEW_WINDOW_MASK: &[(u32, u32)] = &[(
    xcb::CW_EVENT_MASK,
    xcb::EVENT_MASK_ENTER_WINDOW | xcb::EVENT_MASK_LEAVE_WINDOW | xcb::EVENT_MASK_PROPERTY_CHANGE,
)];
const INPUT_FOCUS_POINTER_ROOT: u8 = xcb::INPUT_FOCUS_POINTER_ROOT as u8;

const CONFIG_WINDOW_BORDER_WIDTH: u16 = xcb::CONFIG_WINDOW_BORDER_WIDTH as u16;
const CONFIG_WINDOW_HEIGHT: u16 = xcb::CONFIG_WINDOW_HEIGHT as u16;
const CONFIG_WINDOW_WIDTH: u16 = xcb::CONFIG_WINDOW_WIDTH as u16;
const CONFIG_WINDOW_X: u16 = xcb::CONFIG_WINDOW_X as u16;
const CONFIG_WINDOW_Y: u16 = xcb::CONFIG_WINDOW_Y as u16;
const CONFIG_WINDOW_STACK_MODE: u16 = xcb::CONFIG_WINDOW_STACK_MODE as u16;
const CONFIG_WINDOW_STACK_ABOVE: u32 = xcb::STACK_MODE_ABOVE as u32;

// Longest property we ever read, in 32bit words
const MAX_PROPERTY_LEN: u32 = 1024;

macro_rules! atoms {
    ( $( $name:ident ),+ ) => {
        #[allow(non_snake_case)]
        pub struct InternedAtoms {
            $(
                pub $name: xcb::Atom
            ),*
        }

        impl InternedAtoms {
            pub fn new(conn: &xcb::Connection) -> Result<InternedAtoms> {
                Ok(InternedAtoms {
                    $(
                        $name: xcb::intern_atom(conn, false, stringify!($name)).get_reply()?.atom()
                    ),*
                })
            }
        }
    };
    // Allow trailing comma:
    ( $( $name:ident ),+ , ) => (atoms!($( $name ),+);)
}

// Intern atoms that are not built-in in the core protocol
atoms!(
    WM_DELETE_WINDOW,
    WM_TAKE_FOCUS,
    _NET_WM_STRUT,
    _NET_WM_STRUT_PARTIAL,
    _NET_WM_WINDOW_TYPE,
    _NET_WM_WINDOW_TYPE_DESKTOP,
    _NET_WM_WINDOW_TYPE_DOCK,
    _NET_WM_WINDOW_TYPE_TOOLBAR,
    _NET_WM_WINDOW_TYPE_MENU,
    _NET_WM_WINDOW_TYPE_UTILITY,
    _NET_WM_WINDOW_TYPE_SPLASH,
    _NET_WM_WINDOW_TYPE_DIALOG,
    _NET_WM_WINDOW_TYPE_NOTIFICATION,
    _NET_WM_WINDOW_TYPE_NORMAL,
);

/// An X key-code along with a modifier mask
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct XcbKey {
    /// Modifier key bit mask
    pub mod_mask: u16,
    /// X key code
    pub code: xcb::Keycode,
}

impl XcbKey {
    /// Build a new XcbKey from an XCB KeyPressEvent
    pub fn from_key_press(k: &xcb::KeyPressEvent) -> XcbKey {
        XcbKey {
            mod_mask: k.state(),
            code: k.detail(),
        }
    }
}

/// Window properties the client core knows how to decode
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Prop {
    /// WM_NORMAL_HINTS
    NormalHints,
    /// WM_HINTS
    WmHints,
    /// WM_CLASS
    WmClass,
    /// WM_TRANSIENT_FOR
    TransientFor,
    /// _NET_WM_STRUT
    Strut,
    /// _NET_WM_STRUT_PARTIAL
    StrutPartial,
    /// _NET_WM_WINDOW_TYPE
    WindowType,
}

/// _NET_WM_WINDOW_TYPE_XXX values
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum WindowType {
    Desktop,
    Dock,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Dialog,
    Notification,
    Normal,
}

/**
 * Wrapper around the low level XCB event types that require casting to work with.
 * Not all event fields are extracted so check the XCB documentation and update
 * accordingly if you need access to something that isn't currently passed through
 * to the WindowManager event loop.
 *
 * https://tronche.com/gui/x/xlib/events/types.html
 * https://github.com/rtbo/rust-xcb/xml/xproto.xml
 *
 * ### XCB Level events
 *
 * *MapRequest* - a client asked for one of its top level windows to be mapped
 *   - _parent_ (Window):
 *     The root window when we hold SubstructureRedirect on it.
 *   - _window_ (Window):
 *     The window that wants to be mapped.
 *
 * *UnmapNotify* - a window was unmapped
 *   - _event_ (Window):
 *     The root window, as we only select SubstructureNotify there.
 *   - _window_ (Window):
 *     The window that was unmapped.
 *
 * *DestroyNotify* - a window has been destroyed
 *   - _event_ (Window):
 *     The reconfigured window or its parent, depending on whether
 *     `StructureNotify` or `SubstructureNotify` was selected.
 *   - _window_ (Window):
 *     The window that was destroyed.
 *
 * *ConfigureRequest* - a client asked to be moved / resized
 *   - _window_ (Window):
 *     The window being configured.
 *   - _x, y, width, height_ (i16, i16, u16, u16):
 *     The requested geometry, only meaningful for the bits set in _value-mask_.
 *
 * *PropertyNotify* - a property of a window changed
 *   - _window_ (Window):
 *     The window whose property changed.
 *   - _atom_ (Atom):
 *     The property that changed.
 *
 * *ButtonPress* - a mouse button was pressed
 *   - _root_x, root_y_ (i16):
 *     Pointer position relative to the root window.
 *
 * *KeyPress* - a keyboard key was pressed / released
 *   - _detail_ (u8):
 *     Keycode of the key that was pressed
 *   - _event_ (u16):
 *     The modifier masks being held when the key was pressed
 */
#[derive(Debug, Clone)]
pub enum XEvent {
    /// xcb docs: https://www.mankier.com/3/xcb_input_device_key_press_event_t
    KeyPress {
        /// The X11 key code that was received along with any modifiers that were held
        code: XcbKey,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_map_request_event_t
    MapRequest {
        /// The ID of the window that wants to be mapped
        id: Window,
        /// Whether or not the WindowManager should handle this window.
        ignore: bool,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_unmap_notify_event_t
    UnmapNotify {
        /// The ID of the window that was unmapped
        id: Window,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_button_press_event_t
    ButtonPress {
        /// Pointer position, relative to the root window
        x: i32,
        y: i32,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_randr_screen_change_notify_event_t
    ScreenChange,

    /// xcb docs: https://www.mankier.com/3/xcb_destroy_notify_event_t
    DestroyNotify {
        /// The ID of the window being destroyed
        id: Window,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_configure_request_event_t
    ConfigureRequest {
        /// The ID of the window asking to be configured
        id: Window,
        /// The geometry the window asked for
        r: Rectangle,
    },

    /// xcb docs: https://www.mankier.com/3/xcb_property_notify_event_t
    PropertyNotify {
        /// The ID of the window that had a property changed
        id: Window,
        /// The property that changed
        prop: Prop,
        /// Is this window the root window?
        is_root: bool,
    },
}

/// Everything the window manager needs from the display server.
///
/// There is exactly one of these per running window manager. It is handed to
/// every operation that talks to the X server instead of living in a global.
pub trait XConn {
    /// Ask for SubstructureRedirect on the root window: fails if another
    /// window manager is running.
    fn register_wm(&self) -> Result<()>;

    fn flush(&self) -> bool;

    /// Block until the next event we care about (None for events we ignore)
    fn wait_for_event(&self) -> Option<XEvent>;

    fn grab_key(&self, key: &XcbKey);

    /// The regions of the currently active outputs
    fn monitor_regions(&self) -> Vec<Rectangle>;

    /// The current geometry of a window as known by the X server
    fn window_geometry(&self, win: Window) -> Result<Rectangle>;

    /// Fetch a format 32 property (CARDINAL, ATOM, WINDOW...) as raw words.
    /// Errors if the property is absent.
    fn get_cardinals(&self, win: Window, prop: Prop) -> Result<Vec<u32>>;

    /// Fetch a format 8 property as raw bytes. Errors if the property is absent.
    fn get_bytes(&self, win: Window, prop: Prop) -> Result<Vec<u8>>;

    /// Classify a _NET_WM_WINDOW_TYPE atom
    fn window_type(&self, atom: Atom) -> Option<WindowType>;

    /// Select the events we want from a window we are about to manage
    fn mark_new_window(&self, win: Window);

    fn map_window(&self, win: Window);

    fn unmap_window(&self, win: Window);

    /// Move / resize / restack a window in a single request
    fn configure_window(
        &self,
        win: Window,
        region: Option<Rectangle>,
        border_width: Option<u32>,
        stack_above: bool,
    );

    /// Send a synthetic ConfigureNotify telling the client where it really is
    fn send_configure_notify(&self, win: Window, region: Rectangle, border_width: u32);

    fn set_window_border_color(&self, win: Window, color: u32);

    fn focus_window(&self, win: Window);

    fn focus_nothing(&self);

    /// Politely (or not) ask a window to close
    fn signal_delete_window(&self, win: Window);

    /// Release everything we hold on the X server before exiting
    fn cleanup(&self);
}

/// Handles communication with an X server via xcb
pub struct XcbConnection {
    conn: ewmh::Connection,
    preferred_screen: i32,
    root: Window,
    atoms: InternedAtoms,
    randr_base: u8,
}

impl XcbConnection {
    pub fn new() -> Result<XcbConnection> {
        let (conn, preferred_screen) = xcb::Connection::connect(None)
            .context("Unable to connection to X server")?;
        let conn = ewmh::Connection::connect(conn).map_err(|(e, _)| e)?;

        let root = conn
            .get_setup()
            .roots()
            .nth(preferred_screen as usize)
            .context("Unable to get the root window of the preferred screen")?
            .root();

        let atoms = InternedAtoms::new(&conn).context("Failed to intern atoms")?;

        // Output changes arrive as randr events, numbered from the extension base
        let randr_base = conn
            .get_extension_data(&mut randr::id())
            .context("The RandR extension is not available")?
            .first_event();
        randr::select_input(&conn, root, randr::NOTIFY_MASK_SCREEN_CHANGE as u16);

        Ok(XcbConnection {
            conn,
            preferred_screen,
            root,
            atoms,
            randr_base,
        })
    }

    fn prop_atom(&self, prop: Prop) -> Atom {
        match prop {
            Prop::NormalHints => xcb::ATOM_WM_NORMAL_HINTS,
            Prop::WmHints => xcb::ATOM_WM_HINTS,
            Prop::WmClass => xcb::ATOM_WM_CLASS,
            Prop::TransientFor => xcb::ATOM_WM_TRANSIENT_FOR,
            Prop::Strut => self.atoms._NET_WM_STRUT,
            Prop::StrutPartial => self.atoms._NET_WM_STRUT_PARTIAL,
            Prop::WindowType => self.atoms._NET_WM_WINDOW_TYPE,
        }
    }

    fn atom_prop(&self, atom: Atom) -> Option<Prop> {
        [
            Prop::NormalHints,
            Prop::WmHints,
            Prop::WmClass,
            Prop::TransientFor,
            Prop::Strut,
            Prop::StrutPartial,
            Prop::WindowType,
        ]
        .iter()
        .find(|&&p| self.prop_atom(p) == atom)
        .copied()
    }

    fn get_property(&self, win: Window, prop: Prop) -> Result<xcb::GetPropertyReply> {
        // xcb docs: https://www.mankier.com/3/xcb_get_property
        let reply = xcb::get_property(
            &self.conn,           // xcb connection to X11
            false,                // should the property be deleted
            win,                  // target window to query
            self.prop_atom(prop), // the property we want
            xcb::ATOM_ANY,        // the type of the property
            0,                    // offset in the property to retrieve data from
            MAX_PROPERTY_LEN,     // how many 32bit multiples of data to retrieve
        )
        .get_reply()
        .with_context(|| format!("Failed to read {:?} of window {}", prop, win))?;

        if reply.value_len() == 0 {
            bail!("property {:?} was empty for window {}", prop, win);
        }
        Ok(reply)
    }

    /// Queries the WM_PROTOCOLS property of a window, returning a list of the
    /// protocols that it supports.
    fn get_wm_protocols(&self, id: Window) -> Result<Vec<xcb::Atom>> {
        let reply = icccm::get_wm_protocols(&self.conn, id, self.conn.WM_PROTOCOLS())
            .get_reply()?;
        Ok(reply.atoms().to_vec())
    }

    fn supports_protocol(&self, id: Window, atom: Atom) -> bool {
        self.get_wm_protocols(id)
            .map(|protocols| protocols.contains(&atom))
            .unwrap_or(false)
    }

    fn send_client_message_event(&self, win: Window, atom: Atom) {
        let data = xcb::ClientMessageData::from_data32([atom, xcb::CURRENT_TIME, 0, 0, 0]);
        let event = xcb::ClientMessageEvent::new(32, win, self.conn.WM_PROTOCOLS(), data);
        xcb::send_event(&self.conn, false, win, xcb::EVENT_MASK_NO_EVENT, &event);
    }

    fn get_xinerama_screens(&self) -> Result<Vec<Rectangle>> {
        let screens = xinerama::query_screens(&self.conn)
            .get_reply()
            .context("Xinerama query screens error")?;
        Ok(screens
            .screen_info()
            .map(|s| {
                Rectangle::new(
                    s.x_org() as i32,
                    s.y_org() as i32,
                    s.width() as u32,
                    s.height() as u32,
                )
            })
            .collect())
    }

    fn get_randr_monitors(&self) -> Result<Vec<Rectangle>> {
        let resources = randr::get_screen_resources(&self.conn, self.root)
            .get_reply()
            .context("Failed to read randr screen resources")?;
        Ok(resources
            .crtcs()
            .iter()
            .flat_map(|c| randr::get_crtc_info(&self.conn, *c, 0).get_reply())
            .map(|c| {
                Rectangle::new(c.x() as i32, c.y() as i32, c.width() as u32, c.height() as u32)
            })
            .filter(|r| !r.is_empty())
            .collect())
    }

    fn get_root_region(&self) -> Result<Rectangle> {
        let screen = self
            .conn
            .get_setup()
            .roots()
            .nth(self.preferred_screen as usize)
            .ok_or_else(|| anyhow!("Invalid screen {}", self.preferred_screen))?;
        Ok(Rectangle::new(
            0,
            0,
            screen.width_in_pixels() as u32,
            screen.height_in_pixels() as u32,
        ))
    }
}

impl XConn for XcbConnection {
    fn register_wm(&self) -> Result<()> {
        // Register for substructure redirection
        // https://jichu4n.com/posts/how-x-window-managers-work-and-how-to-write-one-part-i/#substructure-redirection
        xcb::change_window_attributes_checked(&self.conn, self.root, ROOT_EVENT_MASK)
            .request_check()
            .context("Could not register SUBSTRUCTURE_NOTIFY/REDIRECT")?;
        Ok(())
    }

    fn flush(&self) -> bool {
        self.conn.flush()
    }

    fn wait_for_event(&self) -> Option<XEvent> {
        self.conn.wait_for_event().and_then(|event| {
            let etype = event.response_type() & XCB_RESPONSE_TYPE_MASK;
            // TODO: Check for error for requests which have no reply
            // https://www.x.org/releases/X11R7.7/doc/man/man3/xcb-requests.3.xhtml#heading5

            // Extension events are offset by a base known at runtime: no match arm
            if etype == self.randr_base + randr::SCREEN_CHANGE_NOTIFY {
                return Some(XEvent::ScreenChange);
            }

            match etype {
                xcb::KEY_PRESS => {
                    let e: &xcb::KeyPressEvent = unsafe { xcb::cast_event(&event) };
                    Some(XEvent::KeyPress {
                        code: XcbKey::from_key_press(e),
                    })
                }

                xcb::MAP_REQUEST => {
                    let e: &xcb::MapRequestEvent = unsafe { xcb::cast_event(&event) };
                    let id = e.window();
                    xcb::xproto::get_window_attributes(&self.conn, id)
                        .get_reply()
                        .ok()
                        .map(|r| XEvent::MapRequest {
                            id,
                            ignore: r.override_redirect(),
                        })
                }

                xcb::UNMAP_NOTIFY => {
                    let e: &xcb::UnmapNotifyEvent = unsafe { xcb::cast_event(&event) };
                    Some(XEvent::UnmapNotify { id: e.window() })
                }

                xcb::BUTTON_PRESS => {
                    let e: &xcb::ButtonPressEvent = unsafe { xcb::cast_event(&event) };
                    Some(XEvent::ButtonPress {
                        x: i32::from(e.root_x()),
                        y: i32::from(e.root_y()),
                    })
                }

                xcb::DESTROY_NOTIFY => {
                    let e: &xcb::DestroyNotifyEvent = unsafe { xcb::cast_event(&event) };
                    Some(XEvent::DestroyNotify { id: e.window() })
                }

                xcb::CONFIGURE_REQUEST => {
                    let e: &xcb::ConfigureRequestEvent = unsafe { xcb::cast_event(&event) };
                    // Fields missing from the value mask keep their current value
                    let mask = e.value_mask();
                    let current = self.window_geometry(e.window()).unwrap_or_default();
                    let pick = |bit: u16, requested: u32, current: u32| {
                        if mask & bit != 0 {
                            requested
                        } else {
                            current
                        }
                    };
                    Some(XEvent::ConfigureRequest {
                        id: e.window(),
                        r: Rectangle::new(
                            pick(CONFIG_WINDOW_X, e.x() as u32, current.x as u32) as i32,
                            pick(CONFIG_WINDOW_Y, e.y() as u32, current.y as u32) as i32,
                            pick(CONFIG_WINDOW_WIDTH, e.width() as u32, current.w),
                            pick(CONFIG_WINDOW_HEIGHT, e.height() as u32, current.h),
                        ),
                    })
                }

                xcb::PROPERTY_NOTIFY => {
                    let e: &xcb::PropertyNotifyEvent = unsafe { xcb::cast_event(&event) };
                    let is_root = e.window() == self.root;
                    self.atom_prop(e.atom()).map(|prop| XEvent::PropertyNotify {
                        id: e.window(),
                        prop,
                        is_root,
                    })
                }

                // NOTE: ignoring other event types
                _ => None,
            }
        })
    }

    fn grab_key(&self, key: &XcbKey) {
        // xcb docs: https://www.mankier.com/3/xcb_grab_key
        xcb::grab_key(
            &self.conn,      // xcb connection to X11
            false,           // don't pass grabbed events through to the window
            self.root,       // the window to grab: in this case the root window
            key.mod_mask,    // modifiers to grab
            key.code,        // keycode to grab
            GRAB_MODE_ASYNC, // don't lock pointer input while grabbing
            GRAB_MODE_ASYNC, // don't lock keyboard input while grabbing
        );
        self.conn.flush();
    }

    fn monitor_regions(&self) -> Vec<Rectangle> {
        let non_empty = |regions: Vec<Rectangle>| {
            if regions.is_empty() {
                Err(anyhow!("no active output"))
            } else {
                Ok(regions)
            }
        };
        let regions = self
            .get_randr_monitors()
            .and_then(non_empty)
            .or_else(|e| {
                warn!("randr failed ({}), falling back to xinerama", e);
                self.get_xinerama_screens().and_then(non_empty)
            })
            .or_else(|e| {
                warn!("xinerama failed ({}), using the whole root window", e);
                self.get_root_region().map(|r| vec![r])
            });
        match regions {
            Ok(regions) => regions,
            Err(e) => {
                error!("Unable to detect any monitor: {}", e);
                Vec::new()
            }
        }
    }

    fn window_geometry(&self, win: Window) -> Result<Rectangle> {
        let g = xcb::get_geometry(&self.conn, win)
            .get_reply()
            .with_context(|| format!("Failed to read geometry of window {}", win))?;
        Ok(Rectangle::new(
            g.x() as i32,
            g.y() as i32,
            g.width() as u32,
            g.height() as u32,
        ))
    }

    fn get_cardinals(&self, win: Window, prop: Prop) -> Result<Vec<u32>> {
        let reply = self.get_property(win, prop)?;
        if reply.format() != 32 {
            bail!("{:?} of window {} has format {}, expected 32", prop, win, reply.format());
        }
        Ok(reply.value::<u32>().to_vec())
    }

    fn get_bytes(&self, win: Window, prop: Prop) -> Result<Vec<u8>> {
        let reply = self.get_property(win, prop)?;
        if reply.format() != 8 {
            bail!("{:?} of window {} has format {}, expected 8", prop, win, reply.format());
        }
        Ok(reply.value::<u8>().to_vec())
    }

    fn window_type(&self, atom: Atom) -> Option<WindowType> {
        let a = &self.atoms;
        let known = [
            (a._NET_WM_WINDOW_TYPE_DESKTOP, WindowType::Desktop),
            (a._NET_WM_WINDOW_TYPE_DOCK, WindowType::Dock),
            (a._NET_WM_WINDOW_TYPE_TOOLBAR, WindowType::Toolbar),
            (a._NET_WM_WINDOW_TYPE_MENU, WindowType::Menu),
            (a._NET_WM_WINDOW_TYPE_UTILITY, WindowType::Utility),
            (a._NET_WM_WINDOW_TYPE_SPLASH, WindowType::Splash),
            (a._NET_WM_WINDOW_TYPE_DIALOG, WindowType::Dialog),
            (a._NET_WM_WINDOW_TYPE_NOTIFICATION, WindowType::Notification),
            (a._NET_WM_WINDOW_TYPE_NORMAL, WindowType::Normal),
        ];
        known.iter().find(|(known_atom, _)| *known_atom == atom).map(|(_, t)| *t)
    }

    fn mark_new_window(&self, win: Window) {
        xcb::change_window_attributes(&self.conn, win, NEW_WINDOW_MASK);
    }

    fn map_window(&self, win: Window) {
        xcb::map_window(&self.conn, win);
    }

    fn unmap_window(&self, win: Window) {
        xcb::unmap_window(&self.conn, win);
    }

    fn configure_window(
        &self,
        win: Window,
        region: Option<Rectangle>,
        border_width: Option<u32>,
        stack_above: bool,
    ) {
        let mut args = vec![];
        if let Some(r) = region {
            args.append(&mut vec![
                (CONFIG_WINDOW_X, r.x as u32),
                (CONFIG_WINDOW_Y, r.y as u32),
                (CONFIG_WINDOW_WIDTH, r.w),
                (CONFIG_WINDOW_HEIGHT, r.h),
            ])
        }
        if let Some(bw) = border_width {
            args.push((CONFIG_WINDOW_BORDER_WIDTH, bw));
        }
        if stack_above {
            args.push((CONFIG_WINDOW_STACK_MODE, CONFIG_WINDOW_STACK_ABOVE));
        }
        xcb::configure_window(&self.conn, win, &args);
    }

    fn send_configure_notify(&self, win: Window, region: Rectangle, border_width: u32) {
        // ICCCM 4.1.5: the coordinates are relative to the root window
        let event = xcb::ConfigureNotifyEvent::new(
            win,                 // event window
            win,                 // window that was configured
            xcb::NONE,           // above sibling
            region.x as i16,
            region.y as i16,
            region.w as u16,
            region.h as u16,
            border_width as u16,
            false,               // override redirect
        );
        xcb::send_event(&self.conn, false, win, xcb::EVENT_MASK_STRUCTURE_NOTIFY, &event);
    }

    fn set_window_border_color(&self, win: Window, color: u32) {
        xcb::change_window_attributes(&self.conn, win, &[(xcb::CW_BORDER_PIXEL, color)]);
    }

    fn focus_window(&self, id: Window) {
        xcb::set_input_focus(
            &self.conn,               // xcb connection to X11
            INPUT_FOCUS_POINTER_ROOT, // revert to the pointer root when focus is lost
            id,                       // window to focus
            xcb::CURRENT_TIME,        // current time to avoid network race conditions
        );
        if self.supports_protocol(id, self.atoms.WM_TAKE_FOCUS) {
            self.send_client_message_event(id, self.atoms.WM_TAKE_FOCUS);
        }
        ewmh::set_active_window(&self.conn, self.preferred_screen, id);
    }

    /// Unsets EWMH's _NET_ACTIVE_WINDOW to indicate there is no active window.
    fn focus_nothing(&self) {
        xcb::set_input_focus(
            &self.conn,
            INPUT_FOCUS_POINTER_ROOT,
            self.root,
            xcb::CURRENT_TIME,
        );
        ewmh::set_active_window(&self.conn, self.preferred_screen, xcb::NONE);
    }

    /// Closes a window.
    ///
    /// The window will be closed gracefully using the ICCCM WM_DELETE_WINDOW
    /// protocol if it is supported.
    fn signal_delete_window(&self, id: Window) {
        if self.supports_protocol(id, self.atoms.WM_DELETE_WINDOW) {
            info!("Closing window {} using WM_DELETE", id);
            self.send_client_message_event(id, self.atoms.WM_DELETE_WINDOW);
        } else {
            info!("Closing window {} using xcb::destroy_window()", id);
            xcb::destroy_window(&self.conn, id);
        }
    }

    // - Release all of the keybindings we are holding on to
    // - mark ourselves as no longer being the active root window
    fn cleanup(&self) {
        // xcb docs: https://www.mankier.com/3/xcb_ungrab_key
        xcb::ungrab_key(
            &self.conn, // xcb connection to X11
            xcb::GRAB_ANY as u8,
            self.root, // the window to ungrab keys for
            xcb::MOD_MASK_ANY as u16,
        );
        self.focus_nothing();
        self.conn.flush();
    }
}
