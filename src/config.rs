use crate::xconnection::WindowType;

/// The maximum number of tags: one bit each in a u32 tagset
pub const MAX_TAGS: usize = 32;

/// The main user facing configuration details
#[derive(Debug, Clone)]
pub struct Config {
    /// Tag names, in bit order. Must have between one and MAX_TAGS elements.
    pub tags: Vec<String>,
    /// _NET_WM_WINDOW_TYPE_XXX values that should always be treated as floating.
    pub floating_window_types: &'static [WindowType],
    /// Focused border color
    pub focused_border_color: u32,
    /// Unfocused border color
    pub unfocused_border_color: u32,
    /// Border color of clients asking for attention
    pub urgent_border_color: u32,
    /// The width of window borders in pixels
    pub border_width_px: u32,
    /// How many clients a new monitor shows in its main area
    pub main_views: usize,
    /// How far a floating window moves per step, in pixels
    pub move_step_px: u32,
}

macro_rules! vec_of_strings {
    ($($x:expr),*) => (vec![$($x.to_string()),*]);
}

impl Default for Config {
    /// Sensible (but minimal) values for all fields.
    fn default() -> Config {
        Config {
            tags: vec_of_strings!["1", "2", "3", "4", "5", "6", "7", "8", "9"],
            floating_window_types: &[
                WindowType::Dialog,
                WindowType::Utility,
                WindowType::Splash,
                WindowType::Toolbar,
                WindowType::Menu,
                WindowType::Notification,
            ],
            focused_border_color: 0xcc241d,   // #cc241d
            unfocused_border_color: 0x3c3836, // #3c3836
            urgent_border_color: 0xd79921,    // #d79921
            border_width_px: 2,
            main_views: 1,
            move_step_px: 20,
        }
    }
}

impl Config {
    /// The tagset bit of the tag at `index`, if there is such a tag
    pub fn tag_mask(&self, index: usize) -> Option<u32> {
        if index < self.tags.len().min(MAX_TAGS) {
            Some(1 << index)
        } else {
            None
        }
    }

    /// A tagset with every configured tag set
    pub fn all_tags(&self) -> u32 {
        match self.tags.len() {
            0 => 0,
            n if n >= MAX_TAGS => u32::MAX,
            n => (1 << n) - 1,
        }
    }

    pub fn floats(&self, window_type: WindowType) -> bool {
        self.floating_window_types.contains(&window_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_masks_follow_tag_order() {
        let config = Config::default();
        assert_eq!(config.tag_mask(0), Some(0b1));
        assert_eq!(config.tag_mask(8), Some(0b1_0000_0000));
        assert_eq!(config.tag_mask(9), None);
        assert_eq!(config.all_tags(), 0b1_1111_1111);
    }

    #[test]
    fn dialogs_float_by_default() {
        let config = Config::default();
        assert!(config.floats(WindowType::Dialog));
        assert!(!config.floats(WindowType::Normal));
    }
}
