// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! SVG reading and writing over an XML tree.

mod export;
mod import;

pub use export::{export, XmlOptions};
pub use import::{import, SvgImportResult};

use crate::error::Error;
use crate::tree::{Document, ItemId};

impl Document {
    /// Renders the document as an SVG string.
    pub fn to_svg_string(&self, opt: &XmlOptions) -> String {
        export(self, self.root(), opt)
    }

    /// Parses an SVG string into this document.
    ///
    /// The imported elements end up in a fresh group; see
    /// [`SvgImportResult`].
    pub fn parse_svg(&mut self, text: &str, dpi: f32) -> Result<SvgImportResult, Error> {
        import(self, text, dpi)
    }

    /// Renders a single item (with its subtree) as an SVG string.
    pub fn item_to_svg_string(&self, item: ItemId, opt: &XmlOptions) -> String {
        export(self, item, opt)
    }
}
