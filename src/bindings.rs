use std::{
    collections::HashMap,
    process::{Command as Process, Stdio},
    rc::Rc,
};

use anyhow::{Context, Result, anyhow, bail};

use crate::{
    geometry::Direction,
    layout::{Columns, Monocle},
    wm::WindowManager,
    xconnection::XcbKey,
};

/// Some action to be run by a user key binding
pub type Action = Rc<dyn for<'a, 'b> Fn(&'a mut WindowManager<'b>)>;

/// Map xmodmap key names to their X key code so that we can bind them by name
pub type KeymapTable = HashMap<String, u8>;

fn action<F>(f: F) -> Action
where
    F: for<'a, 'b> Fn(&'a mut WindowManager<'b>) + 'static,
{
    Rc::new(f)
}

/// Everything a key can be bound to
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Command {
    Exec(&'static str),
    Kill,
    FocusNext,
    FocusPrevious,
    FocusNextMonitor,
    FocusPreviousMonitor,
    ClientToNextMonitor,
    ClientToPreviousMonitor,
    ToggleMode,
    ToggleFullscreen,
    ToggleSticky,
    /// Step the focused client in a direction, floating it
    Move(Direction),
    /// Grow the focused client by (width, height) pixels, floating it
    Resize(i32, i32),
    ViewTag(usize),
    ToggleViewTag(usize),
    SetClientTag(usize),
    ToggleClientTag(usize),
    IncMainViews,
    DecMainViews,
    RotateForward,
    RotateBackward,
    LayoutColumns,
    LayoutMonocle,
    Quit,
}

impl Command {
    pub fn into_action(self) -> Action {
        match self {
            Command::Exec(cmd) => action(move |_| spawn(cmd)),
            Command::Kill => action(|wm| wm.focused_client_kill()),
            Command::FocusNext => action(|wm| wm.focus_next_client()),
            Command::FocusPrevious => action(|wm| wm.focus_previous_client()),
            Command::FocusNextMonitor => action(|wm| wm.focus_next_monitor()),
            Command::FocusPreviousMonitor => action(|wm| wm.focus_previous_monitor()),
            Command::ClientToNextMonitor => action(|wm| wm.focused_client_to_next_monitor()),
            Command::ClientToPreviousMonitor => {
                action(|wm| wm.focused_client_to_previous_monitor())
            }
            Command::ToggleMode => action(|wm| wm.focused_client_toggle_mode()),
            Command::ToggleFullscreen => action(|wm| wm.focused_client_toggle_fullscreen()),
            Command::ToggleSticky => action(|wm| wm.focused_client_toggle_sticky()),
            Command::Move(direction) => action(move |wm| wm.focused_client_move(direction)),
            Command::Resize(w, h) => action(move |wm| wm.focused_client_resize(w, h)),
            Command::ViewTag(tag) => action(move |wm| wm.focused_monitor_set_tag(tag)),
            Command::ToggleViewTag(tag) => action(move |wm| wm.focused_monitor_toggle_tag(tag)),
            Command::SetClientTag(tag) => action(move |wm| wm.focused_client_set_tag(tag)),
            Command::ToggleClientTag(tag) => action(move |wm| wm.focused_client_toggle_tag(tag)),
            Command::IncMainViews => action(|wm| wm.focused_monitor_update_main_views(1)),
            Command::DecMainViews => action(|wm| wm.focused_monitor_update_main_views(-1)),
            Command::RotateForward => action(|wm| wm.focused_monitor_rotate(true)),
            Command::RotateBackward => action(|wm| wm.focused_monitor_rotate(false)),
            Command::LayoutColumns => action(|wm| wm.focused_monitor_set_layout(Box::new(Columns))),
            Command::LayoutMonocle => action(|wm| wm.focused_monitor_set_layout(Box::new(Monocle))),
            Command::Quit => action(|wm| wm.exit()),
        }
    }
}

static DEFAULT_BINDINGS: &[(&str, Command)] = &[
    ("M-Return", Command::Exec("alacritty")),
    ("M-S-q", Command::Kill),
    ("M-j", Command::FocusNext),
    ("M-k", Command::FocusPrevious),
    ("M-period", Command::FocusNextMonitor),
    ("M-comma", Command::FocusPreviousMonitor),
    ("M-S-period", Command::ClientToNextMonitor),
    ("M-S-comma", Command::ClientToPreviousMonitor),
    ("M-space", Command::ToggleMode),
    ("M-f", Command::ToggleFullscreen),
    ("M-s", Command::ToggleSticky),
    ("M-Up", Command::Move(Direction::Up)),
    ("M-Down", Command::Move(Direction::Down)),
    ("M-Left", Command::Move(Direction::Left)),
    ("M-Right", Command::Move(Direction::Right)),
    ("M-C-Up", Command::Resize(0, -20)),
    ("M-C-Down", Command::Resize(0, 20)),
    ("M-C-Left", Command::Resize(-20, 0)),
    ("M-C-Right", Command::Resize(20, 0)),
    ("M-i", Command::IncMainViews),
    ("M-d", Command::DecMainViews),
    ("M-S-j", Command::RotateForward),
    ("M-S-k", Command::RotateBackward),
    ("M-t", Command::LayoutColumns),
    ("M-m", Command::LayoutMonocle),
    ("M-S-e", Command::Quit),
];

const TAG_KEYS: [&str; 9] = ["1", "2", "3", "4", "5", "6", "7", "8", "9"];

/// User key bindings, ready to be grabbed
#[derive(Default)]
pub struct Bindings {
    bindings: HashMap<XcbKey, Action>,
}

impl Bindings {
    pub fn new() -> Bindings {
        Bindings::default()
    }

    /// The default bindings, with the first `tags` number keys bound to
    /// viewing / tagging.
    pub fn from_defaults(keycodes: &KeymapTable, tags: usize) -> Result<Bindings> {
        let mut bindings = Bindings::new();
        for (pattern, command) in DEFAULT_BINDINGS.iter() {
            bindings.bind_str(pattern, *command, keycodes)?;
        }
        for (tag, key) in TAG_KEYS.iter().enumerate().take(tags) {
            bindings.bind_str(&format!("M-{}", key), Command::ViewTag(tag), keycodes)?;
            bindings.bind_str(&format!("M-C-{}", key), Command::ToggleViewTag(tag), keycodes)?;
            bindings.bind_str(&format!("M-S-{}", key), Command::SetClientTag(tag), keycodes)?;
            bindings.bind_str(&format!("M-C-S-{}", key), Command::ToggleClientTag(tag), keycodes)?;
        }
        Ok(bindings)
    }

    pub fn bind(&mut self, key: XcbKey, command: Command) {
        if self.bindings.insert(key, command.into_action()).is_some() {
            warn!("rebinding {:?} to {:?}", key, command);
        }
    }

    /// Bind a user friendly pattern such as "M-S-Return"
    pub fn bind_str(
        &mut self,
        pattern: &str,
        command: Command,
        keycodes: &KeymapTable,
    ) -> Result<()> {
        let key = parse_key_binding(pattern, keycodes)?;
        self.bind(key, command);
        Ok(())
    }

    pub fn get_action(&self, key: &XcbKey) -> Option<Action> {
        self.bindings.get(key).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &XcbKey> {
        self.bindings.keys()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/**
 * Run the xmodmap command to dump the system keymap table.
 *
 * This is done in a form that we can load in and convert back to key
 * codes. This lets the user define key bindings in the way that they
 * would expect while also ensuring that it is east to debug any odd
 * issues with bindings by referring the user to the xmodmap output.
 */
pub fn keycodes_from_xmodmap() -> Result<KeymapTable> {
    let output = Process::new("xmodmap")
        .arg("-pke")
        .output()
        .context("unable to fetch keycodes via xmodmap")?;
    let s = String::from_utf8(output.stdout).context("invalid utf8 from xmodmap")?;
    Ok(parse_keymap(&s))
}

// keycode <code> = <names ...>
fn parse_keymap(s: &str) -> KeymapTable {
    s.lines()
        .flat_map(|l| {
            let mut words = l.split_whitespace();
            let key_code = words.nth(1).and_then(|w| w.parse::<u8>().ok());
            words
                .skip(1)
                .filter_map(move |name| key_code.map(|code| (name.to_string(), code)))
        })
        .collect()
}

/**
 * Convert user friendly key bindings into X keycodes.
 *
 * Bindings are of the form '<MOD>-<key name>' with multiple modifiers being
 * allowed, and key names being taken from the output of 'xmodmap -pke'.
 *
 * Allowed modifiers are:
 *   M - Super
 *   A - Alt
 *   C - Ctrl
 *   S - Shift
 */
pub fn parse_key_binding(pattern: &str, known_codes: &KeymapTable) -> Result<XcbKey> {
    let mut parts: Vec<&str> = pattern.split('-').collect();
    let name = parts.pop().unwrap_or_default();
    let code = known_codes
        .get(name)
        .ok_or_else(|| anyhow!("unknown key '{}' in binding {}", name, pattern))?;

    let mut mask = 0;
    for part in parts {
        mask |= match part {
            "A" => xcb::MOD_MASK_1,
            "M" => xcb::MOD_MASK_4,
            "S" => xcb::MOD_MASK_SHIFT,
            "C" => xcb::MOD_MASK_CONTROL,
            _ => bail!("invalid key binding prefix '{}' in {}", part, pattern),
        };
    }

    Ok(XcbKey {
        mod_mask: mask as u16,
        code: *code,
    })
}

/**
 * Run an external command
 *
 * This redirects the process stdout and stderr to /dev/null.
 * Logs a warning if there were any errors in kicking off the process.
 */
pub fn spawn(cmd: &str) {
    let mut parts = cmd.split_whitespace();
    let program = match parts.next() {
        Some(p) => p,
        None => {
            warn!("refusing to spawn an empty command");
            return;
        }
    };
    let result = Process::new(program)
        .args(parts)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    if let Err(e) = result {
        warn!("error spawning external program: {}", e);
    }
}
