// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use crate::builder;
use crate::error::Error;
use crate::fitter::PathFitter;
use crate::flatten;
use crate::geom::{Decomposed, Rect, Transform, Vec2};
use crate::paint::{Gradient, Paint};
use crate::path::{CurveLocation, Path, Segment, Smoothing, StrokeStyle};
use crate::winding::{self, MonoLoop};
use crate::{ItemType, StrokeCap, StrokeJoin, WindingRule, KAPPA};

/// A stable handle to an item owned by a [`Document`].
///
/// Handles stay valid until the item is removed; using a removed item's
/// handle is a programming error and panics.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ItemId(u32);

impl ItemId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The style defaults every lookup falls back to.
pub mod defaults {
    use super::*;

    /// The default stroke join.
    pub fn stroke_join() -> StrokeJoin {
        StrokeJoin::Bevel
    }

    /// The default stroke cap.
    pub fn stroke_cap() -> StrokeCap {
        StrokeCap::Butt
    }

    /// The default stroke width.
    pub fn stroke_width() -> f32 {
        1.0
    }

    /// The default miter limit.
    pub fn miter_limit() -> f32 {
        4.0
    }

    /// The default dash offset.
    pub fn dash_offset() -> f32 {
        0.0
    }

    /// The default dash array.
    pub fn dash_array() -> Vec<f32> {
        Vec::new()
    }

    /// The default winding rule.
    pub fn winding_rule() -> WindingRule {
        WindingRule::EvenOdd
    }

    /// Whether strokes scale with the item transform by default.
    pub fn scale_stroke() -> bool {
        true
    }

    /// The default fill.
    pub fn fill() -> Paint {
        Paint::None
    }

    /// The default stroke.
    pub fn stroke() -> Paint {
        Paint::None
    }
}

// Per-item style storage. The same shape serves as the local overrides
// and as the cache of resolved values.
#[derive(Clone, Debug, Default)]
pub(crate) struct Style {
    pub fill: Option<Paint>,
    pub stroke: Option<Paint>,
    pub stroke_width: Option<f32>,
    pub stroke_join: Option<StrokeJoin>,
    pub stroke_cap: Option<StrokeCap>,
    pub scale_stroke: Option<bool>,
    pub miter_limit: Option<f32>,
    pub dash_array: Option<Vec<f32>>,
    pub dash_offset: Option<f32>,
    pub winding_rule: Option<WindingRule>,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub(crate) enum BoundsKind {
    Fill,
    Stroke,
    Handle,
}

#[derive(Debug)]
enum ItemKind {
    Document,
    Group { clipped: bool },
    Path(Path),
    Symbol { target: ItemId },
}

#[derive(Debug)]
struct ItemData {
    kind: ItemKind,
    parent: Option<ItemId>,
    children: Vec<ItemId>,
    // Symbols referencing this item, for cache invalidation.
    symbols: Vec<ItemId>,
    name: String,
    visible: bool,
    transform: Option<Transform>,
    pivot: Option<Vec2>,
    style: Style,
    resolved: RefCell<Style>,
    abs_transform: Cell<Option<Transform>>,
    decomposed: Cell<Option<Decomposed>>,
    abs_decomposed: Cell<Option<Decomposed>>,
    fill_bounds: Cell<Option<Rect>>,
    stroke_bounds: Cell<Option<Rect>>,
    handle_bounds: Cell<Option<Rect>>,
}

impl ItemData {
    fn new(kind: ItemKind, name: &str) -> Self {
        ItemData {
            kind,
            parent: None,
            children: Vec::new(),
            symbols: Vec::new(),
            name: name.to_string(),
            visible: true,
            transform: None,
            pivot: None,
            style: Style::default(),
            resolved: RefCell::new(Style::default()),
            abs_transform: Cell::new(None),
            decomposed: Cell::new(None),
            abs_decomposed: Cell::new(None),
            fill_bounds: Cell::new(None),
            stroke_bounds: Cell::new(None),
            handle_bounds: Cell::new(None),
        }
    }
}

/// A scene document: the root of the item tree and the arena owning every
/// item in it.
#[derive(Debug)]
pub struct Document {
    items: Vec<Option<ItemData>>,
    free: Vec<u32>,
    size: Vec2,
}

macro_rules! style_property {
    ($(#[$get_doc:meta])* $get:ident,
     $(#[$set_doc:meta])* $set:ident,
     $(#[$has_doc:meta])* $has:ident,
     $field:ident: $ty:ty = $default:expr) => {
        $(#[$get_doc])*
        pub fn $get(&self, id: ItemId) -> $ty {
            if let Some(v) = self.item(id).resolved.borrow().$field.clone() {
                return v;
            }
            let v = self
                .lookup_style(id, |s| s.$field.clone())
                .unwrap_or_else(|| $default);
            self.item(id).resolved.borrow_mut().$field = Some(v.clone());
            v
        }

        $(#[$set_doc])*
        pub fn $set(&mut self, id: ItemId, value: $ty) {
            self.item_mut(id).style.$field = Some(value);
            self.clear_resolved_style(id, |s| s.$field = None);
            self.mark_style_bounds_dirty(id);
        }

        $(#[$has_doc])*
        pub fn $has(&self, id: ItemId) -> bool {
            self.item(id).style.$field.is_some()
        }
    };
}

impl Document {
    /// Creates an empty document of zero size.
    pub fn new() -> Self {
        let mut doc = Document {
            items: Vec::new(),
            free: Vec::new(),
            size: Vec2::ZERO,
        };
        doc.alloc(ItemData::new(ItemKind::Document, "Document"));
        doc
    }

    /// The root document item.
    #[inline]
    pub fn root(&self) -> ItemId {
        ItemId(0)
    }

    /// Sets the document size in document units.
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width, height);
    }

    /// Document width.
    #[inline]
    pub fn width(&self) -> f32 {
        self.size.x
    }

    /// Document height.
    #[inline]
    pub fn height(&self) -> f32 {
        self.size.y
    }

    // ------------------------------------------------------------------
    // Arena plumbing

    fn item(&self, id: ItemId) -> &ItemData {
        self.items[id.index()].as_ref().expect("stale item id")
    }

    fn item_mut(&mut self, id: ItemId) -> &mut ItemData {
        self.items[id.index()].as_mut().expect("stale item id")
    }

    fn alloc(&mut self, data: ItemData) -> ItemId {
        match self.free.pop() {
            Some(slot) => {
                self.items[slot as usize] = Some(data);
                ItemId(slot)
            }
            None => {
                self.items.push(Some(data));
                ItemId((self.items.len() - 1) as u32)
            }
        }
    }

    /// Returns `true` while `id` refers to a live item.
    pub fn is_alive(&self, id: ItemId) -> bool {
        self.items
            .get(id.index())
            .map_or(false, |slot| slot.is_some())
    }

    // ------------------------------------------------------------------
    // Factories

    fn attach_new(&mut self, kind: ItemKind, name: &str) -> ItemId {
        let id = self.alloc(ItemData::new(kind, name));
        let root = self.root();
        self.item_mut(root).children.push(id);
        self.item_mut(id).parent = Some(root);
        self.mark_bounds_dirty(root, false);
        id
    }

    /// Creates an empty path as a child of the document.
    pub fn create_path(&mut self, name: &str) -> ItemId {
        self.attach_new(ItemKind::Path(Path::new()), name)
    }

    /// Creates an empty group as a child of the document.
    pub fn create_group(&mut self, name: &str) -> ItemId {
        self.attach_new(ItemKind::Group { clipped: false }, name)
    }

    /// Creates a symbol instancing `target`. Documents cannot be
    /// instanced.
    pub fn create_symbol(&mut self, target: ItemId, name: &str) -> Option<ItemId> {
        if self.item_type(target) == ItemType::Document {
            log::warn!("a document cannot be referenced by a symbol");
            return None;
        }
        let id = self.attach_new(ItemKind::Symbol { target }, name);
        self.item_mut(target).symbols.push(id);
        Some(id)
    }

    /// Creates an ellipse path centered at `center` with full diameters
    /// `size`.
    pub fn create_ellipse(&mut self, center: Vec2, size: Vec2, name: &str) -> ItemId {
        let id = self.create_path(name);
        self.make_ellipse(id, center, size);
        id
    }

    /// Creates a circle path.
    pub fn create_circle(&mut self, center: Vec2, radius: f32, name: &str) -> ItemId {
        self.create_ellipse(center, Vec2::new(radius, radius) * 2.0, name)
    }

    /// Creates an axis-aligned rectangle path.
    pub fn create_rectangle(&mut self, from: Vec2, to: Vec2, name: &str) -> ItemId {
        let id = self.create_path(name);
        self.make_rectangle(id, from, to);
        id
    }

    /// Creates a rounded rectangle path.
    pub fn create_rounded_rectangle(
        &mut self,
        min: Vec2,
        max: Vec2,
        radius: Vec2,
        name: &str,
    ) -> ItemId {
        let id = self.create_path(name);
        self.make_rounded_rectangle(id, min, max, radius);
        id
    }

    /// Creates a linear gradient. Assign it to any number of items.
    pub fn create_linear_gradient(&mut self, origin: Vec2, destination: Vec2) -> Rc<Gradient> {
        Gradient::linear(origin, destination)
    }

    /// Creates a radial gradient.
    pub fn create_radial_gradient(&mut self, origin: Vec2, destination: Vec2) -> Rc<Gradient> {
        Gradient::radial(origin, destination)
    }

    /// Replaces the segments of `id` with an ellipse outline.
    pub fn make_ellipse(&mut self, id: ItemId, center: Vec2, size: Vec2) {
        // Unit circle anchors at the compass points, handles a kappa
        // fraction of the radius away.
        const UNIT: [[f32; 6]; 4] = [
            [0.0, KAPPA, -1.0, 0.0, 0.0, -KAPPA],
            [-KAPPA, 0.0, 0.0, -1.0, KAPPA, 0.0],
            [0.0, -KAPPA, 1.0, 0.0, 0.0, KAPPA],
            [KAPPA, 0.0, 0.0, 1.0, -KAPPA, 0.0],
        ];

        let radius = size * 0.5;
        let mut segs = Vec::with_capacity(4);
        for unit in &UNIT {
            let position = Vec2::new(unit[2] * radius.x, unit[3] * radius.y) + center;
            segs.push(Segment {
                handle_in: position + Vec2::new(unit[0] * radius.x, unit[1] * radius.y),
                position,
                handle_out: position + Vec2::new(unit[4] * radius.x, unit[5] * radius.y),
            });
        }

        self.with_path(id, |p| p.swap_segments(&mut segs, true));
    }

    /// Replaces the segments of `id` with a circle outline.
    pub fn make_circle(&mut self, id: ItemId, center: Vec2, radius: f32) {
        self.make_ellipse(id, center, Vec2::new(radius, radius) * 2.0);
    }

    /// Replaces the segments of `id` with a rectangle outline.
    pub fn make_rectangle(&mut self, id: ItemId, from: Vec2, to: Vec2) {
        let mut segs = vec![
            Segment::point(Vec2::new(to.x, from.y)),
            Segment::point(to),
            Segment::point(Vec2::new(from.x, to.y)),
            Segment::point(from),
        ];
        self.with_path(id, |p| p.swap_segments(&mut segs, true));
    }

    /// Replaces the segments of `id` with a rounded rectangle outline.
    pub fn make_rounded_rectangle(&mut self, id: ItemId, min: Vec2, max: Vec2, radius: Vec2) {
        let rx = radius.x.min((max.x - min.x).abs() * 0.5);
        let ry = radius.y.min((max.y - min.y).abs() * 0.5);
        if rx <= 0.0 && ry <= 0.0 {
            self.make_rectangle(id, min, max);
            return;
        }

        let hx = rx * KAPPA;
        let hy = ry * KAPPA;
        let (x0, y0, x1, y1) = (min.x, min.y, max.x, max.y);
        let rel = Segment::with_relative_handles;
        let mut segs = vec![
            rel(Vec2::new(x0, y1 - ry), Vec2::new(0.0, hy), Vec2::ZERO),
            rel(Vec2::new(x0, y0 + ry), Vec2::ZERO, Vec2::new(0.0, -hy)),
            rel(Vec2::new(x0 + rx, y0), Vec2::new(-hx, 0.0), Vec2::ZERO),
            rel(Vec2::new(x1 - rx, y0), Vec2::ZERO, Vec2::new(hx, 0.0)),
            rel(Vec2::new(x1, y0 + ry), Vec2::new(0.0, -hy), Vec2::ZERO),
            rel(Vec2::new(x1, y1 - ry), Vec2::ZERO, Vec2::new(0.0, hy)),
            rel(Vec2::new(x1 - rx, y1), Vec2::new(hx, 0.0), Vec2::ZERO),
            rel(Vec2::new(x0 + rx, y1), Vec2::ZERO, Vec2::new(-hx, 0.0)),
        ];
        self.with_path(id, |p| p.swap_segments(&mut segs, true));
    }

    // ------------------------------------------------------------------
    // Tree structure

    /// The kind of the item.
    pub fn item_type(&self, id: ItemId) -> ItemType {
        match self.item(id).kind {
            ItemKind::Document => ItemType::Document,
            ItemKind::Group { .. } => ItemType::Group,
            ItemKind::Path(_) => ItemType::Path,
            ItemKind::Symbol { .. } => ItemType::Symbol,
        }
    }

    /// The item's parent, if it is attached to one.
    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.item(id).parent
    }

    /// The ordered children of the item; later children draw on top.
    pub fn children(&self, id: ItemId) -> &[ItemId] {
        &self.item(id).children
    }

    /// The item's name.
    pub fn name(&self, id: ItemId) -> &str {
        &self.item(id).name
    }

    /// Renames the item.
    pub fn set_name(&mut self, id: ItemId, name: &str) {
        self.item_mut(id).name = name.to_string();
    }

    /// The item's visibility flag.
    pub fn is_visible(&self, id: ItemId) -> bool {
        self.item(id).visible
    }

    /// Shows or hides the item.
    pub fn set_visible(&mut self, id: ItemId, visible: bool) {
        self.item_mut(id).visible = visible;
    }

    /// Marks a group as clipped: its first child becomes the clipping
    /// mask for the remaining children. No-op on non-groups.
    pub fn set_clipped(&mut self, id: ItemId, value: bool) {
        let is_group = match self.item_mut(id).kind {
            ItemKind::Group { ref mut clipped } => {
                *clipped = value;
                true
            }
            _ => false,
        };
        if is_group {
            self.mark_bounds_dirty(id, true);
        } else {
            log::warn!("only groups can be clipped");
        }
    }

    /// Returns `true` when the group clips with its first child.
    pub fn is_clipped(&self, id: ItemId) -> bool {
        matches!(self.item(id).kind, ItemKind::Group { clipped: true })
    }

    /// The item a symbol references.
    pub fn symbol_target(&self, id: ItemId) -> Option<ItemId> {
        match self.item(id).kind {
            ItemKind::Symbol { target } => Some(target),
            _ => None,
        }
    }

    fn is_ancestor_of(&self, maybe_ancestor: ItemId, id: ItemId) -> bool {
        let mut cursor = self.item(id).parent;
        while let Some(p) = cursor {
            if p == maybe_ancestor {
                return true;
            }
            cursor = self.item(p).parent;
        }
        false
    }

    fn can_add_child(&self, parent: ItemId, child: ItemId) -> bool {
        if self.item_type(child) == ItemType::Document {
            return false;
        }
        if child == parent || self.is_ancestor_of(child, parent) {
            return false;
        }
        match self.item(parent).kind {
            // Compound paths: only paths below paths.
            ItemKind::Path(_) => self.item_type(child) == ItemType::Path,
            _ => true,
        }
    }

    fn detach(&mut self, id: ItemId) {
        if let Some(parent) = self.item(id).parent {
            let pos = self.item(parent).children.iter().position(|&c| c == id);
            if let Some(pos) = pos {
                self.item_mut(parent).children.remove(pos);
            }
            self.item_mut(id).parent = None;
            self.mark_bounds_dirty(parent, true);
        }
    }

    // A reparented subtree re-inherits styles and transforms.
    fn reparented(&self, id: ItemId) {
        self.clear_resolved_style(id, |s| *s = Style::default());
        self.mark_subtree_transforms_dirty(id);
    }

    fn mark_subtree_transforms_dirty(&self, id: ItemId) {
        let it = self.item(id);
        it.abs_transform.set(None);
        it.abs_decomposed.set(None);
        it.fill_bounds.set(None);
        it.stroke_bounds.set(None);
        it.handle_bounds.set(None);
        if let ItemKind::Path(ref path) = it.kind {
            path.mono.borrow_mut().clear();
        }
        for &child in &it.children {
            self.mark_subtree_transforms_dirty(child);
        }
    }

    /// Appends `child` to `parent`'s children. Returns `false` when the
    /// parenting is not allowed.
    pub fn add_child(&mut self, parent: ItemId, child: ItemId) -> bool {
        if !self.can_add_child(parent, child) {
            return false;
        }

        self.detach(child);
        self.item_mut(parent).children.push(child);
        self.item_mut(child).parent = Some(parent);
        self.reparented(child);
        self.mark_bounds_dirty(parent, true);
        true
    }

    fn insert_helper(&mut self, id: ItemId, sibling: ItemId, above: bool) -> bool {
        if id == sibling {
            return false;
        }
        let parent = match self.item(sibling).parent {
            Some(p) => p,
            None => return false,
        };
        if !self.can_add_child(parent, id) {
            return false;
        }

        self.detach(id);
        let pos = match self.item(parent).children.iter().position(|&c| c == sibling) {
            Some(pos) => pos,
            None => return false,
        };
        let pos = if above { pos + 1 } else { pos };
        self.item_mut(parent).children.insert(pos, id);
        self.item_mut(id).parent = Some(parent);
        self.reparented(id);
        self.mark_bounds_dirty(parent, true);
        true
    }

    /// Places `id` immediately after `sibling` in its parent, so it draws
    /// on top of it.
    pub fn insert_above(&mut self, id: ItemId, sibling: ItemId) -> bool {
        self.insert_helper(id, sibling, true)
    }

    /// Places `id` immediately before `sibling` in its parent.
    pub fn insert_below(&mut self, id: ItemId, sibling: ItemId) -> bool {
        self.insert_helper(id, sibling, false)
    }

    /// Moves the item to the end of its parent's child list.
    pub fn send_to_front(&mut self, id: ItemId) -> bool {
        let parent = match self.item(id).parent {
            Some(p) => p,
            None => return false,
        };
        let children = &mut self.item_mut(parent).children;
        if let Some(pos) = children.iter().position(|&c| c == id) {
            children.remove(pos);
        }
        self.item_mut(parent).children.push(id);
        true
    }

    /// Moves the item to the start of its parent's child list.
    pub fn send_to_back(&mut self, id: ItemId) -> bool {
        let parent = match self.item(id).parent {
            Some(p) => p,
            None => return false,
        };
        let children = &mut self.item_mut(parent).children;
        if let Some(pos) = children.iter().position(|&c| c == id) {
            children.remove(pos);
        }
        self.item_mut(parent).children.insert(0, id);
        true
    }

    /// Reverses the draw order of the item's children.
    pub fn reverse_children(&mut self, id: ItemId) {
        self.item_mut(id).children.reverse();
    }

    /// Finds a descendant by name, depth first.
    pub fn find_child(&self, id: ItemId, name: &str) -> Option<ItemId> {
        for &child in &self.item(id).children {
            if self.item(child).name == name {
                return Some(child);
            }
            if let Some(found) = self.find_child(child, name) {
                return Some(found);
            }
        }
        None
    }

    fn destroy_subtree(&mut self, id: ItemId) {
        let children = self.item(id).children.clone();
        for child in children {
            self.destroy_subtree(child);
        }

        let sym_target = self.symbol_target(id);
        if let Some(target) = sym_target {
            if self.is_alive(target) {
                self.item_mut(target).symbols.retain(|&s| s != id);
            }
        }

        self.items[id.index()] = None;
        self.free.push(id.0);
    }

    /// Destroys the item and its whole subtree. The document root cannot
    /// be removed.
    pub fn remove(&mut self, id: ItemId) -> bool {
        if id == self.root() {
            return false;
        }
        self.detach(id);
        self.destroy_subtree(id);
        true
    }

    /// Destroys all children of the item.
    pub fn remove_children(&mut self, id: ItemId) {
        let children = std::mem::take(&mut self.item_mut(id).children);
        for child in children {
            self.destroy_subtree(child);
        }
        self.mark_bounds_dirty(id, true);
    }

    fn clone_subtree(&mut self, id: ItemId) -> ItemId {
        let data = {
            let src = self.item(id);
            ItemData {
                kind: match &src.kind {
                    ItemKind::Document => unreachable!("documents cannot be cloned"),
                    ItemKind::Group { clipped } => ItemKind::Group { clipped: *clipped },
                    ItemKind::Path(path) => ItemKind::Path(path.clone()),
                    ItemKind::Symbol { target } => ItemKind::Symbol { target: *target },
                },
                parent: None,
                children: Vec::new(),
                symbols: Vec::new(),
                name: src.name.clone(),
                visible: src.visible,
                transform: src.transform,
                pivot: src.pivot,
                style: src.style.clone(),
                resolved: RefCell::new(Style::default()),
                abs_transform: Cell::new(None),
                decomposed: Cell::new(None),
                abs_decomposed: Cell::new(None),
                fill_bounds: Cell::new(None),
                stroke_bounds: Cell::new(None),
                handle_bounds: Cell::new(None),
            }
        };

        let copy = self.alloc(data);
        let sym_target = self.symbol_target(copy);
        if let Some(target) = sym_target {
            self.item_mut(target).symbols.push(copy);
        }

        let children = self.item(id).children.clone();
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.item_mut(child_copy).parent = Some(copy);
            self.item_mut(copy).children.push(child_copy);
        }
        copy
    }

    /// Deep-copies the item and inserts the copy immediately above it.
    /// Documents cannot be cloned.
    pub fn clone_item(&mut self, id: ItemId) -> Option<ItemId> {
        if self.item_type(id) == ItemType::Document {
            return None;
        }
        let copy = self.clone_subtree(id);
        if !self.insert_above(copy, id) {
            let root = self.root();
            self.add_child(root, copy);
        }
        Some(copy)
    }

    // ------------------------------------------------------------------
    // Style properties

    // The raw local overrides, for the serializers.
    pub(crate) fn style_locals(&self, id: ItemId) -> &Style {
        &self.item(id).style
    }

    fn lookup_style<T>(&self, id: ItemId, select: impl Fn(&Style) -> Option<T>) -> Option<T> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let item = self.item(current);
            if let Some(v) = select(&item.style) {
                return Some(v);
            }
            cursor = item.parent;
        }
        None
    }

    fn clear_resolved_style<F: Fn(&mut Style) + Copy>(&self, id: ItemId, clear: F) {
        clear(&mut self.item(id).resolved.borrow_mut());
        for &child in &self.item(id).children {
            self.clear_resolved_style(child, clear);
        }
    }

    /// The effective fill paint, resolved through the parent chain.
    pub fn fill(&self, id: ItemId) -> Paint {
        if let Some(v) = self.item(id).resolved.borrow().fill.clone() {
            return v;
        }
        let v = self
            .lookup_style(id, |s| s.fill.clone())
            .unwrap_or_else(defaults::fill);
        self.item(id).resolved.borrow_mut().fill = Some(v.clone());
        v
    }

    /// Sets the local fill paint and re-inherits all descendants.
    pub fn set_fill<P: Into<Paint>>(&mut self, id: ItemId, paint: P) {
        self.item_mut(id).style.fill = Some(paint.into());
        self.clear_resolved_style(id, |s| s.fill = None);
        self.mark_style_bounds_dirty(id);
    }

    /// Returns `true` when the item has a local fill override.
    pub fn has_fill(&self, id: ItemId) -> bool {
        self.item(id).style.fill.is_some()
    }

    /// Overrides the fill with an explicit "no paint", still shadowing
    /// inherited values.
    pub fn remove_fill(&mut self, id: ItemId) {
        self.set_fill(id, Paint::None);
    }

    /// The effective stroke paint, resolved through the parent chain.
    pub fn stroke(&self, id: ItemId) -> Paint {
        if let Some(v) = self.item(id).resolved.borrow().stroke.clone() {
            return v;
        }
        let v = self
            .lookup_style(id, |s| s.stroke.clone())
            .unwrap_or_else(defaults::stroke);
        self.item(id).resolved.borrow_mut().stroke = Some(v.clone());
        v
    }

    /// Sets the local stroke paint and re-inherits all descendants.
    pub fn set_stroke<P: Into<Paint>>(&mut self, id: ItemId, paint: P) {
        self.item_mut(id).style.stroke = Some(paint.into());
        self.clear_resolved_style(id, |s| s.stroke = None);
        self.mark_style_bounds_dirty(id);
    }

    /// Returns `true` when the item has a local stroke override.
    pub fn has_stroke(&self, id: ItemId) -> bool {
        self.item(id).style.stroke.is_some()
    }

    /// Overrides the stroke with an explicit "no paint".
    pub fn remove_stroke(&mut self, id: ItemId) {
        self.set_stroke(id, Paint::None);
    }

    style_property! {
        /// The effective stroke width.
        stroke_width,
        /// Sets the local stroke width.
        set_stroke_width,
        /// Returns `true` when the item has a local stroke width.
        has_stroke_width,
        stroke_width: f32 = defaults::stroke_width()
    }

    style_property! {
        /// The effective stroke join.
        stroke_join,
        /// Sets the local stroke join.
        set_stroke_join,
        /// Returns `true` when the item has a local stroke join.
        has_stroke_join,
        stroke_join: StrokeJoin = defaults::stroke_join()
    }

    style_property! {
        /// The effective stroke cap.
        stroke_cap,
        /// Sets the local stroke cap.
        set_stroke_cap,
        /// Returns `true` when the item has a local stroke cap.
        has_stroke_cap,
        stroke_cap: StrokeCap = defaults::stroke_cap()
    }

    style_property! {
        /// Whether the stroke scales with the item transform.
        scale_stroke,
        /// Sets the local scale-stroke flag.
        set_scale_stroke,
        /// Returns `true` when the item has a local scale-stroke flag.
        has_scale_stroke,
        scale_stroke: bool = defaults::scale_stroke()
    }

    style_property! {
        /// The effective miter limit.
        miter_limit,
        /// Sets the local miter limit.
        set_miter_limit,
        /// Returns `true` when the item has a local miter limit.
        has_miter_limit,
        miter_limit: f32 = defaults::miter_limit()
    }

    style_property! {
        /// The effective dash array.
        dash_array,
        /// Sets the local dash array.
        set_dash_array,
        /// Returns `true` when the item has a local dash array.
        has_dash_array,
        dash_array: Vec<f32> = defaults::dash_array()
    }

    style_property! {
        /// The effective dash offset.
        dash_offset,
        /// Sets the local dash offset.
        set_dash_offset,
        /// Returns `true` when the item has a local dash offset.
        has_dash_offset,
        dash_offset: f32 = defaults::dash_offset()
    }

    style_property! {
        /// The effective winding rule.
        winding_rule,
        /// Sets the local winding rule.
        set_winding_rule,
        /// Returns `true` when the item has a local winding rule.
        has_winding_rule,
        winding_rule: WindingRule = defaults::winding_rule()
    }

    // ------------------------------------------------------------------
    // Transforms

    /// The local transform, or identity when none is set.
    pub fn transform(&self, id: ItemId) -> Transform {
        self.item(id).transform.unwrap_or_default()
    }

    /// Returns `true` when the item has a local transform.
    pub fn has_transform(&self, id: ItemId) -> bool {
        self.item(id).transform.is_some()
    }

    /// Returns `true` when the item or any ancestor is transformed.
    pub fn is_transformed(&self, id: ItemId) -> bool {
        if self.item(id).transform.is_some() {
            return true;
        }
        match self.item(id).parent {
            Some(p) => self.is_transformed(p),
            None => false,
        }
    }

    fn transform_changed(&self, id: ItemId, from_parent: bool) {
        self.mark_bounds_dirty(id, !from_parent);
        if !from_parent {
            self.clear_ancestor_mono(id);
        }
        let item = self.item(id);
        item.abs_transform.set(None);
        item.abs_decomposed.set(None);
        if let ItemKind::Path(ref path) = item.kind {
            path.mono.borrow_mut().clear();
        }
        for &symbol in &item.symbols {
            self.item(symbol).abs_transform.set(None);
            self.mark_bounds_dirty(symbol, true);
        }
        for &child in &item.children {
            self.transform_changed(child, true);
        }
    }

    /// Replaces the local transform.
    pub fn set_transform(&mut self, id: ItemId, ts: Transform) {
        {
            let item = self.item_mut(id);
            item.transform = Some(ts);
            item.decomposed.set(None);
        }
        self.transform_changed(id, false);
    }

    /// Drops the local transform, making it identity again.
    pub fn remove_transform(&mut self, id: ItemId) {
        {
            let item = self.item_mut(id);
            item.transform = None;
            item.decomposed.set(None);
        }
        self.transform_changed(id, false);
    }

    /// Multiplies `m` onto the local transform.
    pub fn transform_by(&mut self, id: ItemId, m: Transform) {
        let current = self.transform(id);
        self.set_transform(id, m * current);
    }

    /// Translates the local transform.
    pub fn translate(&mut self, id: ItemId, delta: Vec2) {
        self.transform_by(id, Transform::from_translation(delta));
    }

    /// Scales the local transform about the item pivot.
    pub fn scale(&mut self, id: ItemId, scale: Vec2) {
        let center = self.pivot(id).unwrap_or(Vec2::ZERO);
        self.scale_around(id, scale, center);
    }

    /// Scales the local transform about `center`.
    pub fn scale_around(&mut self, id: ItemId, scale: Vec2, center: Vec2) {
        self.transform_by(
            id,
            Transform::around(center, Transform::from_scale(scale.x, scale.y)),
        );
    }

    /// Rotates the local transform about the item pivot. Radians.
    pub fn rotate(&mut self, id: ItemId, radians: f32) {
        let center = self.pivot(id).unwrap_or(Vec2::ZERO);
        self.rotate_around(id, radians, center);
    }

    /// Rotates the local transform about `center`. Radians.
    pub fn rotate_around(&mut self, id: ItemId, radians: f32, center: Vec2) {
        self.transform_by(id, Transform::around(center, Transform::from_rotation(radians)));
    }

    /// Skews the local transform about the item pivot. Radians.
    pub fn skew(&mut self, id: ItemId, angles: Vec2) {
        let center = self.pivot(id).unwrap_or(Vec2::ZERO);
        self.skew_around(id, angles, center);
    }

    /// Skews the local transform about `center`. Radians.
    pub fn skew_around(&mut self, id: ItemId, angles: Vec2, center: Vec2) {
        self.transform_by(id, Transform::around(center, Transform::from_skew(angles)));
    }

    /// Bakes `m` into the geometry of the item and its subtree instead of
    /// storing it as a transform.
    pub fn apply_transform(&mut self, id: ItemId, m: Transform) {
        self.apply_transform_impl(id, &m, true);
    }

    fn apply_transform_impl(&mut self, id: ItemId, m: &Transform, mark_parents: bool) {
        {
            let item = self.item_mut(id);
            if let Some(pivot) = item.pivot {
                item.pivot = Some(m.apply(pivot));
            }
            if let ItemKind::Path(ref mut path) = item.kind {
                for seg in &mut path.segments {
                    *seg = seg.transformed(m);
                }
                for data in path.curves.borrow_mut().iter_mut() {
                    *data = Default::default();
                }
                path.mark_dirty(true);
            }
        }
        self.mark_bounds_dirty(id, mark_parents);
        self.mark_symbols_dirty(id);

        let children = self.item(id).children.clone();
        for child in children {
            self.apply_transform_impl(child, m, false);
        }
    }

    /// The absolute transform: the product of all ancestor transforms and
    /// the local one. Cached.
    pub fn absolute_transform(&self, id: ItemId) -> Transform {
        let item = self.item(id);
        if let Some(ts) = item.abs_transform.get() {
            return ts;
        }

        let ts = match item.kind {
            ItemKind::Symbol { target } => {
                // A symbol composes its own transform on top of the
                // referenced item's local one.
                if self.is_transformed(id) {
                    let parent_abs = match item.parent {
                        Some(p) => self.absolute_transform(p),
                        None => Transform::identity(),
                    };
                    parent_abs * self.transform(id) * self.transform(target)
                } else {
                    self.transform(target)
                }
            }
            _ => match (item.parent, item.transform) {
                (Some(p), Some(local)) => self.absolute_transform(p) * local,
                (Some(p), None) => self.absolute_transform(p),
                (None, _) => self.transform(id),
            },
        };

        item.abs_transform.set(Some(ts));
        ts
    }

    fn decomposed(&self, id: ItemId) -> Decomposed {
        let item = self.item(id);
        if let Some(dec) = item.decomposed.get() {
            return dec;
        }
        let dec = self.transform(id).decompose();
        item.decomposed.set(Some(dec));
        dec
    }

    fn absolute_decomposed(&self, id: ItemId) -> Decomposed {
        let item = self.item(id);
        if let Some(dec) = item.abs_decomposed.get() {
            return dec;
        }
        let dec = self.absolute_transform(id).decompose();
        item.abs_decomposed.set(Some(dec));
        dec
    }

    /// The rotation of the local transform in radians.
    pub fn rotation(&self, id: ItemId) -> f32 {
        self.decomposed(id).rotation
    }

    /// The scaling of the local transform.
    pub fn scaling(&self, id: ItemId) -> Vec2 {
        self.decomposed(id).scaling
    }

    /// The translation of the local transform.
    pub fn translation(&self, id: ItemId) -> Vec2 {
        self.transform(id).translation()
    }

    /// The rotation of the absolute transform in radians.
    pub fn absolute_rotation(&self, id: ItemId) -> f32 {
        self.absolute_decomposed(id).rotation
    }

    /// The scaling of the absolute transform.
    pub fn absolute_scaling(&self, id: ItemId) -> Vec2 {
        self.absolute_decomposed(id).scaling
    }

    /// The translation of the absolute transform.
    pub fn absolute_translation(&self, id: ItemId) -> Vec2 {
        self.absolute_transform(id).translation()
    }

    // ------------------------------------------------------------------
    // Pivot and position

    /// The explicit pivot, or the item's position when none is set.
    /// `None` for items without bounds.
    pub fn pivot(&self, id: ItemId) -> Option<Vec2> {
        match self.item(id).pivot {
            Some(p) => Some(p),
            None => self.position(id),
        }
    }

    /// The explicit pivot only, without the position fallback.
    pub fn explicit_pivot(&self, id: ItemId) -> Option<Vec2> {
        self.item(id).pivot
    }

    /// Sets an explicit pivot point.
    pub fn set_pivot(&mut self, id: ItemId, pivot: Vec2) {
        self.item_mut(id).pivot = Some(pivot);
    }

    /// Clears the explicit pivot.
    pub fn remove_pivot(&mut self, id: ItemId) {
        self.item_mut(id).pivot = None;
    }

    /// The center of the item's fill bounds, or `None` when it has none.
    pub fn position(&self, id: ItemId) -> Option<Vec2> {
        let bounds = self.bounds(id);
        if bounds.is_no_bounds() {
            None
        } else {
            Some(bounds.center())
        }
    }

    /// Moves the item so its pivot lands on `position`.
    pub fn set_position(&mut self, id: ItemId, position: Vec2) {
        if let Some(pivot) = self.pivot(id) {
            self.translate(id, position - pivot);
        }
    }

    // ------------------------------------------------------------------
    // Bounds

    fn mark_bounds_dirty(&self, id: ItemId, notify_parent: bool) {
        let item = self.item(id);
        item.fill_bounds.set(None);
        item.stroke_bounds.set(None);
        item.handle_bounds.set(None);
        if notify_parent {
            if let Some(p) = item.parent {
                self.mark_bounds_dirty(p, true);
            }
        }
    }

    fn mark_symbols_dirty(&self, id: ItemId) {
        for &symbol in &self.item(id).symbols {
            self.item(symbol).abs_transform.set(None);
            self.mark_bounds_dirty(symbol, true);
        }
    }

    // Style changes never move anchors, so fill bounds survive, but the
    // stroke and handle bounds of the whole subtree may change.
    fn mark_style_bounds_dirty(&self, id: ItemId) {
        let item = self.item(id);
        item.stroke_bounds.set(None);
        item.handle_bounds.set(None);
        for &child in &item.children {
            self.mark_style_bounds_dirty(child);
        }

        let mut cursor = item.parent;
        while let Some(p) = cursor {
            let it = self.item(p);
            it.stroke_bounds.set(None);
            it.handle_bounds.set(None);
            cursor = it.parent;
        }
    }

    // A compound path caches the monotone curves of its whole subtree;
    // editing a child must drop the caches up the path chain.
    fn clear_ancestor_mono(&self, id: ItemId) {
        let mut cursor = self.item(id).parent;
        while let Some(p) = cursor {
            if let ItemKind::Path(ref path) = self.item(p).kind {
                path.mono.borrow_mut().clear();
            }
            cursor = self.item(p).parent;
        }
    }

    // Called after any path geometry mutation.
    fn post_geometry_change(&self, id: ItemId) {
        self.mark_bounds_dirty(id, true);
        self.mark_symbols_dirty(id);
        self.clear_ancestor_mono(id);
    }

    fn merged_children_bounds(
        &self,
        base: Option<Rect>,
        id: ItemId,
        ts: Option<&Transform>,
        kind: BoundsKind,
    ) -> Option<Rect> {
        let mut ret = base;
        for &child in &self.item(id).children {
            // An explicit transform must be threaded down manually; the
            // cached absolute transforms don't apply to it.
            let tmp = ts.map(|m| *m * self.transform(child));
            if let Some(b) = self.compute_item_bounds(child, tmp.as_ref(), kind) {
                ret = Some(match ret {
                    Some(r) => r.merged(&b),
                    None => b,
                });
            }
        }
        ret
    }

    pub(crate) fn compute_item_bounds(
        &self,
        id: ItemId,
        ts: Option<&Transform>,
        kind: BoundsKind,
    ) -> Option<Rect> {
        match self.item(id).kind {
            ItemKind::Document => self.merged_children_bounds(None, id, ts, kind),
            ItemKind::Group { clipped } => {
                if clipped {
                    if let Some(&mask) = self.item(id).children.first() {
                        let tmp = ts.map(|m| *m * self.transform(mask));
                        return self.compute_item_bounds(mask, tmp.as_ref(), kind);
                    }
                }
                self.merged_children_bounds(None, id, ts, kind)
            }
            ItemKind::Path(ref path) => {
                let abs;
                let resolved_ts = match ts {
                    Some(m) => Some(m),
                    None => {
                        if self.is_transformed(id) {
                            abs = self.absolute_transform(id);
                            Some(&abs)
                        } else {
                            None
                        }
                    }
                };

                let stroke_style = if kind != BoundsKind::Fill && !self.stroke(id).is_none() {
                    Some(StrokeStyle {
                        width: self.stroke_width(id),
                        join: self.stroke_join(id),
                        cap: self.stroke_cap(id),
                        miter_limit: self.miter_limit(id),
                        scale_stroke: self.scale_stroke(id),
                    })
                } else {
                    None
                };

                let own = match kind {
                    BoundsKind::Fill => path.compute_fill_bounds(resolved_ts, 0.0),
                    BoundsKind::Stroke => {
                        path.compute_stroke_bounds(resolved_ts, stroke_style.as_ref())
                    }
                    BoundsKind::Handle => {
                        path.compute_handle_bounds(resolved_ts, stroke_style.as_ref())
                    }
                };

                self.merged_children_bounds(own, id, ts, kind)
            }
            ItemKind::Symbol { target } => {
                if self.is_transformed(id) {
                    let abs = self.absolute_transform(id);
                    self.compute_item_bounds(target, Some(&abs), kind)
                } else {
                    // Untransformed symbols reuse the target's caches.
                    let r = match kind {
                        BoundsKind::Fill => self.bounds(target),
                        BoundsKind::Stroke => self.stroke_bounds(target),
                        BoundsKind::Handle => self.handle_bounds(target),
                    };
                    if r.is_no_bounds() {
                        None
                    } else {
                        Some(r)
                    }
                }
            }
        }
    }

    /// The item's fill bounds in document space. Returns the
    /// all-infinity sentinel for items without bounds.
    pub fn bounds(&self, id: ItemId) -> Rect {
        if let Some(r) = self.item(id).fill_bounds.get() {
            return r;
        }
        let r = self
            .compute_item_bounds(id, None, BoundsKind::Fill)
            .unwrap_or_else(Rect::no_bounds);
        self.item(id).fill_bounds.set(Some(r));
        r
    }

    /// The item's stroke bounds: fill bounds extended by stroke caps,
    /// joins and the miter limit.
    pub fn stroke_bounds(&self, id: ItemId) -> Rect {
        if let Some(r) = self.item(id).stroke_bounds.get() {
            return r;
        }
        let r = self
            .compute_item_bounds(id, None, BoundsKind::Stroke)
            .unwrap_or_else(Rect::no_bounds);
        self.item(id).stroke_bounds.set(Some(r));
        r
    }

    /// The stroke bounds extended to every segment handle.
    pub fn handle_bounds(&self, id: ItemId) -> Rect {
        if let Some(r) = self.item(id).handle_bounds.get() {
            return r;
        }
        let r = self
            .compute_item_bounds(id, None, BoundsKind::Handle)
            .unwrap_or_else(Rect::no_bounds);
        self.item(id).handle_bounds.set(Some(r));
        r
    }

    // ------------------------------------------------------------------
    // Path access and construction

    /// The path geometry of a path item.
    pub fn path(&self, id: ItemId) -> Option<&Path> {
        match self.item(id).kind {
            ItemKind::Path(ref path) => Some(path),
            _ => None,
        }
    }

    fn with_path<R>(&mut self, id: ItemId, f: impl FnOnce(&mut Path) -> R) -> Option<R> {
        let ret = match self.item_mut(id).kind {
            ItemKind::Path(ref mut path) => Some(f(path)),
            _ => {
                log::warn!("item is not a path");
                None
            }
        };
        if ret.is_some() {
            self.post_geometry_change(id);
        }
        ret
    }

    /// Appends a handle-free segment.
    pub fn add_point(&mut self, id: ItemId, to: Vec2) {
        self.with_path(id, |p| {
            builder::add_point(&mut p.segments, to);
            p.appended_segments();
        });
    }

    /// Appends a cubic curve through two absolute handles.
    pub fn cubic_curve_to(&mut self, id: ItemId, handle1: Vec2, handle2: Vec2, to: Vec2) {
        self.with_path(id, |p| {
            builder::cubic_curve_to(&mut p.segments, handle1, handle2, to);
            p.appended_segments();
        });
    }

    /// Appends a quadratic curve, converted to a cubic.
    pub fn quadratic_curve_to(&mut self, id: ItemId, handle: Vec2, to: Vec2) {
        self.with_path(id, |p| {
            builder::quadratic_curve_to(&mut p.segments, handle, to);
            p.appended_segments();
        });
    }

    /// Appends a curve passing through `through` at parameter `t`.
    pub fn curve_through(&mut self, id: ItemId, through: Vec2, to: Vec2, t: f32) {
        self.with_path(id, |p| {
            builder::curve_through(&mut p.segments, through, to, t);
            p.appended_segments();
        });
    }

    fn arc_result(&mut self, id: ItemId, r: Option<Result<(), Error>>) -> Result<(), Error> {
        match r {
            Some(r) => r,
            None => Err(Error::InvalidOperation(format!(
                "item '{}' is not a path",
                self.name(id)
            ))),
        }
    }

    /// Appends a circular arc through `through` to `to`.
    pub fn arc_through(&mut self, id: ItemId, through: Vec2, to: Vec2) -> Result<(), Error> {
        let r = self.with_path(id, |p| {
            let r = builder::arc_through(&mut p.segments, through, to);
            if r.is_ok() {
                p.appended_segments();
            }
            r
        });
        self.arc_result(id, r)
    }

    /// Appends an arc sweeping to `to` in the given direction.
    pub fn arc_to(&mut self, id: ItemId, to: Vec2, clockwise: bool) -> Result<(), Error> {
        let r = self.with_path(id, |p| {
            let r = builder::arc_to(&mut p.segments, to, clockwise);
            if r.is_ok() {
                p.appended_segments();
            }
            r
        });
        self.arc_result(id, r)
    }

    /// Appends an SVG-style elliptical arc.
    pub fn arc_to_with_radii(
        &mut self,
        id: ItemId,
        to: Vec2,
        radii: Vec2,
        rotation: f32,
        clockwise: bool,
        large: bool,
    ) -> Result<(), Error> {
        let r = self.with_path(id, |p| {
            let r = builder::arc_to_with_radii(&mut p.segments, to, radii, rotation, clockwise, large);
            if r.is_ok() {
                p.appended_segments();
            }
            r
        });
        self.arc_result(id, r)
    }

    /// Relative form of [`Document::cubic_curve_to`].
    pub fn cubic_curve_by(&mut self, id: ItemId, handle1: Vec2, handle2: Vec2, by: Vec2) {
        self.with_path(id, |p| {
            builder::cubic_curve_by(&mut p.segments, handle1, handle2, by);
            p.appended_segments();
        });
    }

    /// Relative form of [`Document::quadratic_curve_to`].
    pub fn quadratic_curve_by(&mut self, id: ItemId, handle: Vec2, by: Vec2) {
        self.with_path(id, |p| {
            builder::quadratic_curve_by(&mut p.segments, handle, by);
            p.appended_segments();
        });
    }

    /// Relative form of [`Document::curve_through`].
    pub fn curve_through_by(&mut self, id: ItemId, through: Vec2, by: Vec2, t: f32) {
        self.with_path(id, |p| {
            builder::curve_through_by(&mut p.segments, through, by, t);
            p.appended_segments();
        });
    }

    /// Relative form of [`Document::arc_through`].
    pub fn arc_through_by(&mut self, id: ItemId, through: Vec2, by: Vec2) -> Result<(), Error> {
        let r = self.with_path(id, |p| {
            let r = builder::arc_through_by(&mut p.segments, through, by);
            if r.is_ok() {
                p.appended_segments();
            }
            r
        });
        self.arc_result(id, r)
    }

    /// Relative form of [`Document::arc_to`].
    pub fn arc_by(&mut self, id: ItemId, by: Vec2, clockwise: bool) -> Result<(), Error> {
        let r = self.with_path(id, |p| {
            let r = builder::arc_by(&mut p.segments, by, clockwise);
            if r.is_ok() {
                p.appended_segments();
            }
            r
        });
        self.arc_result(id, r)
    }

    /// Closes the path.
    pub fn close_path(&mut self, id: ItemId) {
        self.with_path(id, |p| p.close());
    }

    /// Appends a segment with handles relative to the anchor.
    pub fn add_segment(&mut self, id: ItemId, position: Vec2, handle_in: Vec2, handle_out: Vec2) {
        self.with_path(id, |p| {
            p.segments
                .push(Segment::with_relative_handles(position, handle_in, handle_out));
            p.appended_segments();
        });
    }

    /// Appends raw segments with absolute handles.
    pub fn add_segments(&mut self, id: ItemId, segments: &[Segment]) {
        self.with_path(id, |p| p.add_segments(segments));
    }

    /// Inserts a segment at `index`.
    pub fn insert_segment(&mut self, id: ItemId, index: usize, segment: Segment) {
        self.with_path(id, |p| p.insert_segments(index, &[segment]));
    }

    /// Removes the segment at `index`.
    pub fn remove_segment(&mut self, id: ItemId, index: usize) {
        self.with_path(id, |p| p.remove_segments(index, index + 1));
    }

    /// Removes all segments.
    pub fn clear_segments(&mut self, id: ItemId) {
        self.with_path(id, |p| p.clear_segments());
    }

    /// A copy of the segment at `index`.
    pub fn segment(&self, id: ItemId, index: usize) -> Option<Segment> {
        self.path(id)?.segments().get(index).copied()
    }

    /// Moves a segment anchor, dragging its handles along.
    pub fn set_segment_position(&mut self, id: ItemId, index: usize, position: Vec2) {
        self.with_path(id, |p| {
            if let Some(seg) = p.segments.get_mut(index) {
                let delta = position - seg.position;
                seg.position = position;
                seg.handle_in += delta;
                seg.handle_out += delta;
                p.segment_changed(index);
            }
        });
    }

    /// Moves a segment's incoming handle (absolute position).
    pub fn set_segment_handle_in(&mut self, id: ItemId, index: usize, handle: Vec2) {
        self.with_path(id, |p| {
            if let Some(seg) = p.segments.get_mut(index) {
                seg.handle_in = handle;
                p.segment_changed(index);
            }
        });
    }

    /// Moves a segment's outgoing handle (absolute position).
    pub fn set_segment_handle_out(&mut self, id: ItemId, index: usize, handle: Vec2) {
        self.with_path(id, |p| {
            if let Some(seg) = p.segments.get_mut(index) {
                seg.handle_out = handle;
                p.segment_changed(index);
            }
        });
    }

    /// Reverses the path direction, including compound children.
    pub fn reverse(&mut self, id: ItemId) {
        self.with_path(id, |p| p.reverse());
        let children = self.item(id).children.clone();
        for child in children {
            if self.item_type(child) == ItemType::Path {
                self.reverse(child);
            }
        }
    }

    /// The signed area of a path plus its compound children.
    pub fn area(&self, id: ItemId) -> f32 {
        let mut area = match self.path(id) {
            Some(path) => path.area(),
            None => 0.0,
        };
        for &child in &self.item(id).children {
            if self.item_type(child) == ItemType::Path {
                area += self.area(child);
            }
        }
        area
    }

    /// Returns `true` when the path winds clockwise.
    pub fn is_clockwise(&self, id: ItemId) -> bool {
        self.area(id) >= 0.0
    }

    /// Reverses the path when needed so it winds in the given direction.
    pub fn set_clockwise(&mut self, id: ItemId, clockwise: bool) {
        if self.is_clockwise(id) != clockwise {
            self.reverse(id);
        }
    }

    /// Replaces the path with a least-squares Bézier fit of its anchors.
    pub fn simplify(&mut self, id: ItemId, tolerance: f32) {
        let fitted = match self.path(id) {
            Some(path) => PathFitter::new(path, tolerance).fit(),
            None => None,
        };
        if let Some(mut segs) = fitted {
            self.with_path(id, |p| {
                let closed = p.is_closed();
                p.swap_segments(&mut segs, closed);
            });
        }
    }

    /// Replaces curves by line segments within the given tolerances.
    pub fn flatten(
        &mut self,
        id: ItemId,
        angle_tolerance: f32,
        flatten_children: bool,
        min_distance: f32,
        max_recursion: usize,
    ) {
        let positions = match self.path(id) {
            Some(path) => flatten::flatten_path(path, angle_tolerance, min_distance, max_recursion),
            None => return,
        };
        let mut segs: Vec<Segment> = positions.into_iter().map(Segment::point).collect();
        self.with_path(id, |p| {
            let closed = p.is_closed();
            p.swap_segments(&mut segs, closed);
        });

        if flatten_children {
            let children = self.item(id).children.clone();
            for child in children {
                if self.item_type(child) == ItemType::Path {
                    self.flatten(child, angle_tolerance, true, min_distance, max_recursion);
                }
            }
        }
    }

    /// Replaces curves by positions spaced by a regular arc-length step.
    pub fn flatten_regular(&mut self, id: ItemId, max_distance: f32, flatten_children: bool) {
        let positions = match self.path(id) {
            Some(path) => flatten::flatten_path_regular(path, max_distance),
            None => return,
        };
        let mut segs: Vec<Segment> = positions.into_iter().map(Segment::point).collect();
        self.with_path(id, |p| {
            let closed = p.is_closed();
            p.swap_segments(&mut segs, closed);
        });

        if flatten_children {
            let children = self.item(id).children.clone();
            for child in children {
                if self.item_type(child) == ItemType::Path {
                    self.flatten_regular(child, max_distance, true);
                }
            }
        }
    }

    /// Smooths all segment handles.
    pub fn smooth(&mut self, id: ItemId, kind: Smoothing, smooth_children: bool) {
        let count = match self.path(id) {
            Some(path) => path.segment_count() as i64,
            None => return,
        };
        self.with_path(id, |p| p.smooth_range(0, count - 1, kind));

        if smooth_children {
            let children = self.item(id).children.clone();
            for child in children {
                if self.item_type(child) == ItemType::Path {
                    self.smooth(child, kind, true);
                }
            }
        }
    }

    /// Smooths the segment handles in an index range.
    pub fn smooth_range(&mut self, id: ItemId, from: i64, to: i64, kind: Smoothing) {
        self.with_path(id, |p| p.smooth_range(from, to, kind));
    }

    /// Splits a curve by inserting a segment at curve time `t`.
    pub fn divide_curve_at_time(&mut self, id: ItemId, curve: usize, t: f32) -> Option<usize> {
        self.with_path(id, |p| p.divide_curve_at_time(curve, t)).flatten()
    }

    /// Cuts out the part of the path between two arc-length offsets as a
    /// new open path, inserted right above the source.
    pub fn slice(&mut self, id: ItemId, from: f32, to: f32) -> Option<ItemId> {
        let segs = {
            let path = self.path(id)?;
            let from = path.location_at(from)?;
            let to = path.location_at(to)?;
            path.sliced_segments(from, to)?
        };

        let copy = self.clone_item(id)?;
        self.with_path(copy, |p| {
            let mut segs = segs;
            p.swap_segments(&mut segs, false);
        });
        Some(copy)
    }

    /// The total arc length of a path.
    pub fn path_length(&self, id: ItemId) -> f32 {
        self.path(id).map_or(0.0, |p| p.length())
    }

    /// The position on a path at arc-length `offset`.
    pub fn position_at(&self, id: ItemId, offset: f32) -> Option<Vec2> {
        self.path(id)?.position_at(offset)
    }

    /// The unit tangent on a path at arc-length `offset`.
    pub fn tangent_at(&self, id: ItemId, offset: f32) -> Option<Vec2> {
        self.path(id)?.tangent_at(offset)
    }

    /// The unit normal on a path at arc-length `offset`.
    pub fn normal_at(&self, id: ItemId, offset: f32) -> Option<Vec2> {
        self.path(id)?.normal_at(offset)
    }

    /// The curvature on a path at arc-length `offset`.
    pub fn curvature_at(&self, id: ItemId, offset: f32) -> Option<f32> {
        self.path(id)?.curvature_at(offset)
    }

    /// The tangent angle on a path at arc-length `offset`.
    pub fn angle_at(&self, id: ItemId, offset: f32) -> Option<f32> {
        self.path(id)?.angle_at(offset)
    }

    /// The location on a path at arc-length `offset`.
    pub fn curve_location_at(&self, id: ItemId, offset: f32) -> Option<CurveLocation> {
        self.path(id)?.location_at(offset)
    }

    /// The location on a path closest to `point`, with the distance.
    pub fn closest_curve_location(&self, id: ItemId, point: Vec2) -> Option<(CurveLocation, f32)> {
        self.path(id)?.closest_location(point)
    }

    /// Returns whether the path geometry changed since the last call.
    /// Meant for renderers.
    pub fn clean_dirty_geometry(&self, id: ItemId) -> bool {
        self.path(id).map_or(false, |p| p.clean_dirty_geometry())
    }

    // ------------------------------------------------------------------
    // Hit testing

    pub(crate) fn mono_loops(&self, id: ItemId) -> Option<Ref<Vec<MonoLoop>>> {
        let path = self.path(id)?;
        if path.mono.borrow().is_empty() {
            let mut loops = Vec::new();
            self.collect_mono_loops(id, &mut loops);
            *path.mono.borrow_mut() = loops;
        }
        Some(path.mono.borrow())
    }

    fn collect_mono_loops(&self, id: ItemId, out: &mut Vec<MonoLoop>) {
        if let Some(path) = self.path(id) {
            let inverse = if self.is_transformed(id) {
                self.absolute_transform(id).inverse()
            } else {
                None
            };
            out.push(winding::build_loop(path, inverse));
        }
        for &child in &self.item(id).children {
            if self.item_type(child) == ItemType::Path {
                self.collect_mono_loops(child, out);
            }
        }
    }

    /// The winding number of `point` against a path (including compound
    /// children).
    pub fn winding_at(&self, id: ItemId, point: Vec2) -> i32 {
        match self.mono_loops(id) {
            Some(loops) => winding::winding(point, &loops, false),
            None => 0,
        }
    }

    /// Point-in-path test honoring the path's winding rule.
    pub fn contains(&self, id: ItemId, point: Vec2) -> bool {
        if self.item_type(id) != ItemType::Path {
            return false;
        }
        if !self.handle_bounds(id).contains(point) {
            return false;
        }

        let w = self.winding_at(id, point);
        match self.winding_rule(id) {
            WindingRule::EvenOdd => (w & 1) != 0,
            WindingRule::NonZero => w > 0,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{vec2, Color, FuzzyEq};

    #[test]
    fn tree_insertion_order() {
        let mut doc = Document::new();
        let grp = doc.create_group("Group");
        assert_eq!(doc.children(doc.root()).len(), 1);
        assert_eq!(doc.name(grp), "Group");
        assert_eq!(doc.parent(grp), Some(doc.root()));

        let grp2 = doc.create_group("");
        assert_eq!(doc.children(doc.root()).len(), 2);
        assert!(doc.add_child(grp, grp2));
        assert_eq!(doc.parent(grp2), Some(grp));
        assert_eq!(doc.children(doc.root()).len(), 1);

        let grp3 = doc.create_group("Group3");
        let grp4 = doc.create_group("Group4");
        assert!(doc.add_child(grp, grp4));
        assert!(doc.insert_below(grp3, grp2));
        assert_eq!(doc.children(grp), &[grp3, grp2, grp4]);
        assert!(doc.insert_above(grp3, grp4));
        assert_eq!(doc.children(grp), &[grp2, grp4, grp3]);

        assert!(doc.send_to_front(grp2));
        assert_eq!(doc.children(grp), &[grp4, grp3, grp2]);
        assert!(doc.send_to_back(grp2));
        assert_eq!(doc.children(grp), &[grp2, grp4, grp3]);

        assert!(doc.insert_above(grp2, grp));
        assert_eq!(doc.parent(grp2), Some(doc.root()));
        assert!(doc.remove(grp2));
        assert_eq!(doc.children(doc.root()).len(), 1);
    }

    #[test]
    fn illegal_parenting_is_rejected() {
        let mut doc = Document::new();
        let grp = doc.create_group("");
        let path = doc.create_path("");
        let root = doc.root();

        // Documents can never become children.
        assert!(!doc.add_child(grp, root));
        // Only paths go below paths.
        assert!(!doc.add_child(path, grp));
        // No cycles.
        assert!(doc.add_child(grp, path));
        assert!(!doc.add_child(path, grp));
    }

    #[test]
    fn style_inheritance() {
        let mut doc = Document::new();
        let grp = doc.create_group("");
        let child = doc.create_path("");
        doc.add_child(grp, child);

        assert!(!doc.has_fill(child));
        let red = Color::new(1.0, 0.0, 0.0, 1.0);
        let blue = Color::new(0.0, 0.0, 1.0, 1.0);

        doc.set_fill(grp, red);
        assert_eq!(doc.fill(child).as_color(), Some(red));
        assert!(!doc.has_fill(child));

        doc.set_fill(child, blue);
        assert_eq!(doc.fill(child).as_color(), Some(blue));
        assert_eq!(doc.fill(grp).as_color(), Some(red));

        doc.remove_fill(child);
        assert!(doc.has_fill(child));
        assert!(doc.fill(child).is_none());

        doc.remove_fill(grp);
        assert!(doc.fill(grp).is_none());
    }

    #[test]
    fn style_defaults() {
        let mut doc = Document::new();
        let path = doc.create_path("");
        assert_eq!(doc.stroke_width(path), 1.0);
        assert_eq!(doc.stroke_join(path), StrokeJoin::Bevel);
        assert_eq!(doc.stroke_cap(path), StrokeCap::Butt);
        assert_eq!(doc.miter_limit(path), 4.0);
        assert!(doc.scale_stroke(path));
        assert!(doc.dash_array(path).is_empty());
        assert_eq!(doc.dash_offset(path), 0.0);
        assert_eq!(doc.winding_rule(path), WindingRule::EvenOdd);
    }

    #[test]
    fn absolute_transform_composes() {
        let mut doc = Document::new();
        let grp = doc.create_group("");
        let path = doc.create_path("");
        doc.add_child(grp, path);

        doc.set_transform(grp, Transform::from_translation(vec2(10.0, 0.0)));
        doc.set_transform(path, Transform::from_translation(vec2(0.0, 5.0)));

        let abs = doc.absolute_transform(path);
        assert!(abs.fuzzy_eq(&Transform::from_translation(vec2(10.0, 5.0))));

        // Changing the parent invalidates the cached value.
        doc.set_transform(grp, Transform::from_translation(vec2(20.0, 0.0)));
        let abs = doc.absolute_transform(path);
        assert!(abs.fuzzy_eq(&Transform::from_translation(vec2(20.0, 5.0))));
    }

    #[test]
    fn transformed_path_bounds() {
        let mut doc = Document::new();
        let p = doc.create_rectangle(vec2(0.0, 0.0), vec2(100.0, 100.0), "");
        assert_eq!(doc.position(p), Some(vec2(50.0, 50.0)));

        doc.translate(p, vec2(100.0, 150.0));
        let b = doc.bounds(p);
        assert!(b.min.is_close(vec2(100.0, 150.0), 1e-3));
        assert!((b.width() - 100.0).abs() < 1e-3);

        let diagonal = (2.0f32).sqrt() * 100.0;
        doc.rotate(p, std::f32::consts::FRAC_PI_4);
        let b = doc.bounds(p);
        assert!(doc.position(p).unwrap().is_close(vec2(150.0, 200.0), 1e-2));
        assert!((b.width() - diagonal).abs() < 1e-2);
        assert!((b.height() - diagonal).abs() < 1e-2);
    }

    #[test]
    fn stroke_bounds_of_rotated_square() {
        let mut doc = Document::new();
        let p = doc.create_rectangle(vec2(0.0, 0.0), vec2(100.0, 100.0), "");
        doc.rotate(p, std::f32::consts::FRAC_PI_4);
        doc.set_stroke(p, Color::white());
        doc.set_stroke_width(p, 20.0);
        doc.set_stroke_join(p, StrokeJoin::Round);
        doc.set_stroke_cap(p, StrokeCap::Round);

        // Rotating the stroke circle changes nothing: the outline grows
        // by one stroke radius on every side.
        let b = doc.stroke_bounds(p);
        let expected = (2.0f32).sqrt() * 100.0 + 20.0;
        assert!((b.width() - expected).abs() < 1e-2, "{}", b.width());
        assert!((b.height() - expected).abs() < 1e-2, "{}", b.height());
    }

    #[test]
    fn miter_join_extends_bounds() {
        // A v-shape pointing right; the apex of its miter sticks out
        // beyond the radius-padded fill bounds.
        let mut doc = Document::new();
        let p = doc.create_path("");
        doc.add_point(p, vec2(0.0, 0.0));
        doc.add_point(p, vec2(100.0, 50.0));
        doc.add_point(p, vec2(0.0, 100.0));
        doc.set_stroke(p, Color::black());
        doc.set_stroke_width(p, 20.0);
        doc.set_stroke_join(p, StrokeJoin::Miter);
        doc.set_miter_limit(p, 4.0);

        // miter ratio = 1/sin(half angle) = sqrt(5) here.
        let b = doc.stroke_bounds(p);
        let expected = 100.0 + 10.0 * 5.0f32.sqrt();
        assert!((b.max.x - expected).abs() < 1e-2, "{:?}", b);
    }

    #[test]
    fn bevel_join_is_tighter_than_miter() {
        let mut doc = Document::new();
        let mk = |doc: &mut Document, join| {
            let p = doc.create_path("");
            doc.add_point(p, vec2(0.0, 0.0));
            doc.add_point(p, vec2(100.0, 50.0));
            doc.add_point(p, vec2(0.0, 100.0));
            doc.set_stroke(p, Color::black());
            doc.set_stroke_width(p, 20.0);
            doc.set_stroke_join(p, join);
            doc.stroke_bounds(p)
        };
        let bevel = mk(&mut doc, StrokeJoin::Bevel);
        let miter = mk(&mut doc, StrokeJoin::Miter);
        assert!(miter.max.x > bevel.max.x + 5.0);
    }

    #[test]
    fn miter_over_the_limit_falls_back_to_bevel() {
        let mut doc = Document::new();
        let mk = |doc: &mut Document, limit| {
            let p = doc.create_path("");
            doc.add_point(p, vec2(0.0, 0.0));
            doc.add_point(p, vec2(100.0, 50.0));
            doc.add_point(p, vec2(0.0, 100.0));
            doc.set_stroke(p, Color::black());
            doc.set_stroke_width(p, 20.0);
            doc.set_stroke_join(p, StrokeJoin::Miter);
            doc.set_miter_limit(p, limit);
            doc.stroke_bounds(p)
        };
        // The ratio is sqrt(5) ~ 2.236: just over a limit of 2.
        let clamped = mk(&mut doc, 2.0);
        let free = mk(&mut doc, 4.0);
        assert!(free.max.x > clamped.max.x + 5.0);
    }

    #[test]
    fn non_scaling_stroke_keeps_document_width() {
        let mut doc = Document::new();
        let p = doc.create_rectangle(vec2(0.0, 0.0), vec2(100.0, 100.0), "");
        doc.scale(p, vec2(3.0, 3.0));
        doc.set_stroke(p, Color::black());
        doc.set_stroke_width(p, 10.0);
        doc.set_scale_stroke(p, false);

        // Width 300 plus one stroke width (two half-widths), not three.
        let b = doc.stroke_bounds(p);
        assert!((b.width() - 310.0).abs() < 0.5, "{}", b.width());
    }

    #[test]
    fn circle_scenario() {
        let mut doc = Document::new();
        let c = doc.create_circle(vec2(0.0, 0.0), 100.0, "");
        let path = doc.path(c).unwrap();
        assert_eq!(path.segment_count(), 4);
        assert!((path.length() - 2.0 * std::f32::consts::PI * 100.0).abs() < 0.1);

        let b = doc.bounds(c);
        assert!(b.min.is_close(vec2(-100.0, -100.0), 1e-2));
        assert!(b.max.is_close(vec2(100.0, 100.0), 1e-2));

        assert!(doc.contains(c, vec2(0.0, 0.0)));
        assert!(doc.contains(c, vec2(99.0, 0.0)));
        assert!(!doc.contains(c, vec2(101.0, 0.0)));
    }

    #[test]
    fn contains_respects_transform() {
        let mut doc = Document::new();
        let c = doc.create_circle(vec2(0.0, 0.0), 50.0, "");
        doc.translate(c, vec2(200.0, 0.0));
        assert!(doc.contains(c, vec2(200.0, 0.0)));
        assert!(!doc.contains(c, vec2(0.0, 0.0)));
    }

    #[test]
    fn winding_rule_affects_containment() {
        let mut doc = Document::new();
        // Two concentric circles as a compound path: a ring.
        let outer = doc.create_circle(vec2(0.0, 0.0), 100.0, "");
        let inner = doc.create_circle(vec2(0.0, 0.0), 50.0, "");
        doc.reverse(inner);
        doc.add_child(outer, inner);

        doc.set_winding_rule(outer, WindingRule::EvenOdd);
        assert!(!doc.contains(outer, vec2(0.0, 0.0)));
        assert!(doc.contains(outer, vec2(75.0, 0.0)));

        doc.set_winding_rule(outer, WindingRule::NonZero);
        assert!(doc.contains(outer, vec2(75.0, 0.0)));
    }

    #[test]
    fn clone_inserts_above_source() {
        let mut doc = Document::new();
        let grp = doc.create_group("grp");
        let p = doc.create_path("child");
        doc.add_point(p, vec2(100.0, 30.0));
        doc.add_point(p, vec2(200.0, 30.0));
        doc.set_stroke(p, Color::new(1.0, 0.5, 0.75, 0.75));
        doc.add_child(grp, p);
        doc.set_fill(grp, Color::new(0.25, 0.33, 0.44, 1.0));

        let p2 = doc.clone_item(p).unwrap();
        assert_eq!(doc.name(p2), "child");
        assert_eq!(doc.parent(p2), Some(grp));
        assert_eq!(doc.children(grp), &[p, p2]);
        assert_eq!(doc.path(p2).unwrap().segment_count(), 2);
        // Inherited values resolve the same.
        assert_eq!(
            doc.fill(p2).as_color(),
            Some(Color::new(0.25, 0.33, 0.44, 1.0))
        );

        let grp2 = doc.clone_item(grp).unwrap();
        assert_eq!(doc.children(grp2).len(), 2);
        assert_eq!(doc.parent(grp2), Some(doc.root()));
    }

    #[test]
    fn symbol_bounds_follow_target() {
        let mut doc = Document::new();
        let rect = doc.create_rectangle(vec2(0.0, 0.0), vec2(50.0, 50.0), "");
        let sym = doc.create_symbol(rect, "").unwrap();
        doc.set_transform(sym, Transform::from_translation(vec2(100.0, 0.0)));

        let b = doc.bounds(sym);
        assert!(b.min.is_close(vec2(100.0, 0.0), 1e-3));
        assert!(b.max.is_close(vec2(150.0, 50.0), 1e-3));
    }

    #[test]
    fn clipped_group_bounds_are_the_mask_bounds() {
        let mut doc = Document::new();
        let grp = doc.create_group("");
        let mask = doc.create_rectangle(vec2(0.0, 0.0), vec2(10.0, 10.0), "");
        let content = doc.create_rectangle(vec2(-100.0, -100.0), vec2(100.0, 100.0), "");
        doc.add_child(grp, mask);
        doc.add_child(grp, content);
        doc.set_clipped(grp, true);

        let b = doc.bounds(grp);
        assert!(b.max.is_close(vec2(10.0, 10.0), 1e-3));
    }

    #[test]
    fn empty_path_has_no_position() {
        let mut doc = Document::new();
        let p = doc.create_path("");
        assert!(doc.bounds(p).is_no_bounds());
        assert_eq!(doc.position(p), None);
        assert_eq!(doc.pivot(p), None);
    }

    #[test]
    fn apply_transform_bakes_geometry() {
        let mut doc = Document::new();
        let p = doc.create_rectangle(vec2(0.0, 0.0), vec2(10.0, 10.0), "");
        doc.apply_transform(p, Transform::from_translation(vec2(5.0, 0.0)));
        assert!(!doc.has_transform(p));
        let b = doc.bounds(p);
        assert!(b.min.is_close(vec2(5.0, 0.0), 1e-4));
    }

    #[test]
    fn length_and_area_of_rectangle() {
        let mut doc = Document::new();
        let p = doc.create_path("");
        doc.add_point(p, vec2(0.0, 0.0));
        doc.add_point(p, vec2(200.0, 0.0));
        doc.add_point(p, vec2(200.0, 100.0));
        doc.add_point(p, vec2(0.0, 100.0));
        doc.close_path(p);

        assert!((doc.path_length(p) - 600.0).abs() < 1e-2);
        assert!((doc.area(p).abs() - 20000.0).abs() < 1.0);
        let b = doc.bounds(p);
        assert!(b.min.is_close(vec2(0.0, 0.0), 1e-4));
        assert!(b.max.is_close(vec2(200.0, 100.0), 1e-4));
    }
}
