//! Append-only output document assembly

use crate::types::Rect;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Builds the composed document one page at a time, strictly in order.
///
/// Pages are appended and never revisited; [`DocumentBuilder::finish`]
/// writes the page tree and catalog exactly once.
pub struct DocumentBuilder {
    output: Document,
    pages_tree_id: ObjectId,
    page_refs: Vec<Object>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut output = Document::with_version("1.7");
        let pages_tree_id = output.new_object_id();
        Self {
            output,
            pages_tree_id,
            page_refs: Vec::new(),
        }
    }

    /// The document under construction, for adding shared objects
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.output
    }

    /// Append a page drawing `content` with the given XObjects.
    pub fn append_page(
        &mut self,
        media_box: Rect,
        xobjects: Vec<(String, ObjectId)>,
        content: String,
    ) -> ObjectId {
        let mut xobject_dict = Dictionary::new();
        for (name, id) in xobjects {
            xobject_dict.set(name.into_bytes(), Object::Reference(id));
        }
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobject_dict));

        let content_id = self
            .output
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let page_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_tree_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Real(media_box.x),
                    Object::Real(media_box.y),
                    Object::Real(media_box.right()),
                    Object::Real(media_box.top()),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
        ]);

        let page_id = self.output.add_object(page_dict);
        self.page_refs.push(Object::Reference(page_id));
        page_id
    }

    /// Create pages tree and catalog, finalize document structure
    pub fn finish(mut self) -> Document {
        let count = self.page_refs.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.page_refs)),
            ("Count", Object::Integer(count)),
        ]);
        self.output
            .objects
            .insert(self.pages_tree_id, Object::Dictionary(pages_dict));

        let catalog_id = self.output.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_tree_id)),
        ]));
        self.output.trailer.set("Root", catalog_id);

        // Drop objects left behind by labels that failed to embed
        self.output.prune_objects();
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_yields_valid_zero_page_document() {
        let mut doc = DocumentBuilder::new().finish();
        assert_eq!(doc.get_pages().len(), 0);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        let reloaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 0);
    }

    #[test]
    fn test_pages_keep_append_order() {
        let mut builder = DocumentBuilder::new();
        let first = builder.append_page(Rect::new(0.0, 0.0, 100.0, 100.0), vec![], String::new());
        let second = builder.append_page(Rect::new(0.0, 0.0, 200.0, 100.0), vec![], String::new());
        let doc = builder.finish();
        let ids: Vec<_> = doc.get_pages().values().copied().collect();
        assert_eq!(ids, vec![first, second]);
    }
}
