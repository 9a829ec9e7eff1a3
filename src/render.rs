// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::geom::Transform;
use crate::tree::{Document, ItemId};
use crate::ItemType;

/// The contract a rendering backend implements to draw a document.
///
/// [`Document::draw`] performs the traversal; the backend only has to
/// rasterize individual paths and maintain the clip stack.
pub trait RenderBackend {
    /// Called once before a document is first drawn.
    fn init(&mut self, _doc: &Document) -> Result<(), Error> {
        Ok(())
    }

    /// Sets the pixel viewport to render into.
    fn set_viewport(&mut self, x: f32, y: f32, width_px: f32, height_px: f32);

    /// Sets the size of the render area in document units.
    fn set_size(&mut self, width: f32, height: f32);

    /// Called before the traversal of a frame.
    fn prepare_drawing(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Called after the traversal of a frame.
    fn finish_drawing(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Draws one path under the given absolute transform.
    fn draw_path(&mut self, doc: &Document, path: ItemId, transform: &Transform)
        -> Result<(), Error>;

    /// Pushes `mask` onto the clip stack.
    fn begin_clipping(
        &mut self,
        doc: &Document,
        mask: ItemId,
        transform: &Transform,
    ) -> Result<(), Error>;

    /// Pops the innermost clip.
    fn end_clipping(&mut self) -> Result<(), Error>;
}

impl Document {
    /// Draws the document depth first: back-to-front children, clipped
    /// groups bracketed by `begin_clipping`/`end_clipping`, symbols as
    /// their referenced item under the symbol transform.
    pub fn draw(&self, backend: &mut dyn RenderBackend) -> Result<(), Error> {
        backend.prepare_drawing()?;
        self.draw_children(self.root(), None, false, backend)?;
        backend.finish_drawing()
    }

    fn draw_children(
        &self,
        id: ItemId,
        transform: Option<&Transform>,
        skip_first: bool,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), Error> {
        for &child in self.children(id).iter().skip(skip_first as usize) {
            let tmp = transform.map(|m| *m * self.transform(child));
            self.draw_item(child, tmp.as_ref(), backend)?;
        }
        Ok(())
    }

    fn draw_item(
        &self,
        id: ItemId,
        transform: Option<&Transform>,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), Error> {
        if !self.is_visible(id) {
            return Ok(());
        }

        match self.item_type(id) {
            ItemType::Group => {
                if self.is_clipped(id) {
                    let mask = match self.children(id).first() {
                        Some(&mask) => mask,
                        None => return Ok(()),
                    };
                    let mask_ts = match transform {
                        Some(m) => *m * self.transform(mask),
                        None => self.absolute_transform(mask),
                    };
                    backend.begin_clipping(self, mask, &mask_ts)?;
                    self.draw_children(id, transform, true, backend)?;
                    backend.end_clipping()
                } else {
                    self.draw_children(id, transform, false, backend)
                }
            }
            ItemType::Path => {
                let path = self.path(id).unwrap();
                if path.segment_count() > 1 {
                    let ts = match transform {
                        Some(m) => *m,
                        None => self.absolute_transform(id),
                    };
                    backend.draw_path(self, id, &ts)
                } else {
                    Ok(())
                }
            }
            ItemType::Symbol => {
                let target = match self.symbol_target(id) {
                    Some(t) => t,
                    None => return Ok(()),
                };
                let ts = match transform {
                    Some(m) => *m,
                    None => self.absolute_transform(id),
                };
                self.draw_item(target, Some(&ts), backend)
            }
            ItemType::Document => self.draw_children(id, transform, false, backend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{vec2, Vec2};

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        positions: Vec<Vec2>,
    }

    impl RenderBackend for Recorder {
        fn set_viewport(&mut self, _: f32, _: f32, _: f32, _: f32) {}
        fn set_size(&mut self, _: f32, _: f32) {}

        fn draw_path(
            &mut self,
            doc: &Document,
            path: ItemId,
            transform: &Transform,
        ) -> Result<(), Error> {
            self.events.push(format!("path:{}", doc.name(path)));
            let p = doc.path(path).unwrap();
            self.positions
                .push(transform.apply(p.segments()[0].position));
            Ok(())
        }

        fn begin_clipping(
            &mut self,
            doc: &Document,
            mask: ItemId,
            _: &Transform,
        ) -> Result<(), Error> {
            self.events.push(format!("clip:{}", doc.name(mask)));
            Ok(())
        }

        fn end_clipping(&mut self) -> Result<(), Error> {
            self.events.push("endclip".to_string());
            Ok(())
        }
    }

    #[test]
    fn traversal_order_and_clipping() {
        let mut doc = Document::new();
        let grp = doc.create_group("");
        let mask = doc.create_rectangle(vec2(0.0, 0.0), vec2(10.0, 10.0), "mask");
        let a = doc.create_rectangle(vec2(0.0, 0.0), vec2(5.0, 5.0), "a");
        let b = doc.create_rectangle(vec2(0.0, 0.0), vec2(5.0, 5.0), "b");
        doc.add_child(grp, mask);
        doc.add_child(grp, a);
        doc.add_child(grp, b);
        doc.set_clipped(grp, true);

        let hidden = doc.create_path("hidden");
        doc.add_point(hidden, vec2(0.0, 0.0));
        doc.add_point(hidden, vec2(1.0, 1.0));
        doc.set_visible(hidden, false);

        let mut rec = Recorder::default();
        doc.draw(&mut rec).unwrap();
        assert_eq!(
            rec.events,
            vec!["clip:mask", "path:a", "path:b", "endclip"]
        );
    }

    #[test]
    fn single_segment_paths_are_skipped() {
        let mut doc = Document::new();
        let p = doc.create_path("p");
        doc.add_point(p, vec2(0.0, 0.0));

        let mut rec = Recorder::default();
        doc.draw(&mut rec).unwrap();
        assert!(rec.events.is_empty());
    }

    #[test]
    fn symbols_draw_their_target_with_own_transform() {
        let mut doc = Document::new();
        let rect = doc.create_rectangle(vec2(0.0, 0.0), vec2(10.0, 10.0), "target");
        let sym = doc.create_symbol(rect, "").unwrap();
        doc.set_transform(sym, Transform::from_translation(vec2(100.0, 0.0)));

        let mut rec = Recorder::default();
        doc.draw(&mut rec).unwrap();

        // The target is drawn twice: once as itself, once through the
        // symbol's transform.
        assert_eq!(rec.events, vec!["path:target", "path:target"]);
        assert!(rec.positions[1].is_close(rec.positions[0] + vec2(100.0, 0.0), 1e-4));
    }
}
