use crate::{
    arena::ClientId,
    geometry::{Rectangle, Strut},
    layout::{Columns, Layout},
};

/// Index of a monitor in the window manager's monitor list
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct MonitorId(pub(crate) usize);

impl MonitorId {
    pub fn index(self) -> usize {
        self.0
    }
}

/**
 * One physical output.
 *
 * Owns the head of its circular client list (see `ClientArena`), the set of
 * tags it currently displays and the layout used to tile its work area.
 */
#[derive(Debug)]
pub struct Monitor {
    id: MonitorId,
    geometry: Rectangle,
    workarea: Rectangle,
    tagset: u32,
    head: Option<ClientId>,
    main_views: usize,
    layout: Box<dyn Layout>,
}

impl Monitor {
    /// A monitor showing `tagset`, tiling with `Columns` until told otherwise
    pub fn new(id: MonitorId, geometry: Rectangle, tagset: u32, main_views: usize) -> Monitor {
        Monitor {
            id,
            geometry,
            workarea: geometry,
            tagset,
            head: None,
            main_views,
            layout: Box::new(Columns),
        }
    }

    pub fn id(&self) -> MonitorId {
        self.id
    }

    /// The full output region
    pub fn geometry(&self) -> Rectangle {
        self.geometry
    }

    /// The output region minus the space reserved by struts
    pub fn workarea(&self) -> Rectangle {
        self.workarea
    }

    /// The tags currently displayed. Never 0.
    pub fn tagset(&self) -> u32 {
        self.tagset
    }

    pub fn head(&self) -> Option<ClientId> {
        self.head
    }

    pub(crate) fn set_head(&mut self, head: Option<ClientId>) {
        self.head = head;
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn main_views(&self) -> usize {
        self.main_views
    }

    pub fn layout(&self) -> &dyn Layout {
        self.layout.as_ref()
    }

    /// Display `tagset` instead. Returns false, changing nothing, if `tagset`
    /// is empty or already displayed.
    pub fn set_tagset(&mut self, tagset: u32) -> bool {
        if tagset == 0 || tagset == self.tagset {
            return false;
        }
        self.tagset = tagset;
        true
    }

    /// Grow or shrink the main area by `by` clients, stopping at 0.
    pub fn update_main_views(&mut self, by: i32) {
        let n = self.main_views as i64 + i64::from(by);
        self.main_views = n.max(0) as usize;
    }

    pub fn set_layout(&mut self, layout: Box<dyn Layout>) {
        info!("monitor {} now uses the {} layout", self.id.0, layout.name());
        self.layout = layout;
    }

    /// The output was resized or moved: struts need recomputing afterwards.
    pub fn set_geometry(&mut self, geometry: Rectangle) {
        self.geometry = geometry;
        self.workarea = geometry;
    }

    /// Recompute the work area from the struts of the clients on this monitor.
    pub fn update_workarea<I>(&mut self, struts: I)
    where
        I: IntoIterator<Item = Strut>,
    {
        let strut = struts.into_iter().fold(Strut::default(), Strut::union);
        self.workarea = self.geometry.shrink(&strut);
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.geometry.contains_point(x, y)
    }

    /// Regions for `count` tiled clients, borders included
    pub fn tile(&self, count: usize) -> Vec<Rectangle> {
        self.layout.arrange(self.workarea, count, self.main_views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Monocle;

    fn monitor() -> Monitor {
        Monitor::new(MonitorId(0), Rectangle::new(0, 0, 1920, 1080), 0b1, 1)
    }

    #[test]
    fn tagset_is_never_empty() {
        let mut m = monitor();
        assert!(!m.set_tagset(0));
        assert!(!m.set_tagset(0b1));
        assert!(m.set_tagset(0b110));
        assert_eq!(m.tagset(), 0b110);
    }

    #[test]
    fn main_views_stop_at_zero() {
        let mut m = monitor();
        m.update_main_views(2);
        assert_eq!(m.main_views(), 3);
        m.update_main_views(-5);
        assert_eq!(m.main_views(), 0);
    }

    #[test]
    fn workarea_uses_the_largest_strut_per_edge() {
        let mut m = monitor();
        m.update_workarea(vec![
            Strut::new(0, 0, 20, 0),
            Strut::new(0, 0, 30, 0),
            Strut::new(0, 40, 0, 0),
        ]);
        assert_eq!(m.workarea(), Rectangle::new(0, 30, 1880, 1050));

        m.update_workarea(Vec::new());
        assert_eq!(m.workarea(), m.geometry());
    }

    #[test]
    fn tile_uses_the_workarea() {
        let mut m = monitor();
        m.update_workarea(vec![Strut::new(0, 0, 30, 0)]);
        m.set_layout(Box::new(Monocle));
        assert_eq!(m.layout().name(), "monocle");
        assert_eq!(m.tile(2), vec![Rectangle::new(0, 30, 1920, 1050); 2]);
    }
}
