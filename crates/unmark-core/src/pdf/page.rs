//! Owned page snapshots and their write-back into a `lopdf` document.

use std::collections::{BTreeMap, BTreeSet};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, trace, warn};

use super::{ColorSpace, FormXObject, ImageXObject, Result, XObject};
use crate::error::PdfError;

/// Snapshot of one page: its XObject mapping and, once loaded, its content
/// operations.
///
/// Transformers consume a `PageView` and return a new one; the document is
/// only touched by [`PageView::write_back`].
#[derive(Debug, Clone)]
pub struct PageView {
    /// Page number (1-indexed).
    pub number: u32,
    /// Page object id in the source document.
    pub id: ObjectId,
    /// XObjects reachable from the page resources, by name.
    pub xobjects: BTreeMap<String, XObject>,
    operations: Option<Vec<Operation>>,
    content_modified: bool,
}

impl PageView {
    /// Load the XObject mapping of page `number`.
    pub fn load(doc: &Document, number: u32) -> Result<Self> {
        let id = page_id(doc, number)?;
        let mut xobjects = BTreeMap::new();

        if let Some(dict) = xobject_dictionary(doc, id) {
            for (name, value) in dict.iter() {
                let name = String::from_utf8_lossy(name).into_owned();
                let Ok((_, object)) = doc.dereference(value) else {
                    warn!("Page {}: XObject {} cannot be resolved", number, name);
                    continue;
                };
                if let Object::Stream(stream) = object {
                    trace!("Page {}: found XObject {}", number, name);
                    xobjects.insert(name, classify(doc, stream));
                }
            }
        } else {
            debug!("Page {} has no XObject resources", number);
        }

        Ok(Self {
            number,
            id,
            xobjects,
            operations: None,
            content_modified: false,
        })
    }

    /// Decode the page content stream if it has not been loaded yet.
    pub fn load_content(&mut self, doc: &Document) -> Result<()> {
        if self.operations.is_none() {
            self.operations = Some(decode_content(doc, self.id, self.number)?);
        }
        Ok(())
    }

    /// Loaded content operations.
    pub fn operations(&self) -> Option<&[Operation]> {
        self.operations.as_deref()
    }

    /// Replace the content operations, marking the content as modified.
    pub fn set_operations(&mut self, operations: Vec<Operation>) {
        self.operations = Some(operations);
        self.content_modified = true;
    }

    /// Whether the content must be re-encoded on write-back.
    pub fn content_modified(&self) -> bool {
        self.content_modified
    }

    /// Image XObjects, in name order.
    pub fn images(&self) -> impl Iterator<Item = (&str, &ImageXObject)> {
        self.xobjects.iter().filter_map(|(name, xobject)| match xobject {
            XObject::Image(image) => Some((name.as_str(), image)),
            _ => None,
        })
    }

    /// Names present in `original` but no longer in `self`.
    pub fn removed_since(&self, original: &PageView) -> BTreeSet<String> {
        original
            .xobjects
            .keys()
            .filter(|name| !self.xobjects.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Write the differences against `original` back into `doc`.
    ///
    /// Removed XObjects are dropped from a page-local copy of the resources.
    /// With `strip_dangling`, `Do` operators naming them are dropped as well.
    /// Nothing is written when the page is unchanged.
    pub fn write_back(
        &self,
        doc: &mut Document,
        original: &PageView,
        strip_dangling: bool,
    ) -> Result<()> {
        let removed = self.removed_since(original);
        let mut operations = self.operations.clone().filter(|_| self.content_modified);
        let mut content_dirty = self.content_modified;

        if !removed.is_empty() {
            remove_xobjects(doc, self.id, &removed)
                .map_err(|_| PdfError::InvalidPage(self.number))?;
            debug!("Page {}: removed XObjects {:?}", self.number, removed);

            if strip_dangling {
                let current = match operations.take().or_else(|| self.operations.clone()) {
                    Some(ops) => Some(ops),
                    None => match decode_content(doc, self.id, self.number) {
                        Ok(ops) => Some(ops),
                        Err(e) => {
                            warn!("Page {}: leaving Do operators in place: {}", self.number, e);
                            None
                        }
                    },
                };
                if let Some(ops) = current {
                    let before = ops.len();
                    let kept: Vec<Operation> = ops
                        .into_iter()
                        .filter(|op| !invokes_any(op, &removed))
                        .collect();
                    content_dirty |= kept.len() != before;
                    operations = Some(kept);
                }
            }
        }

        if content_dirty {
            if let Some(operations) = operations {
                replace_content(doc, self.id, self.number, operations)?;
            }
        }
        Ok(())
    }
}

/// Resolve the object id of page `number`.
pub fn page_id(doc: &Document, number: u32) -> Result<ObjectId> {
    doc.get_pages()
        .get(&number)
        .copied()
        .ok_or(PdfError::InvalidPage(number))
}

/// Resources of a page, following `/Parent` inheritance.
pub fn effective_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    loop {
        if let Ok(resources) = node.get(b"Resources") {
            if let Ok((_, Object::Dictionary(dict))) = doc.dereference(resources) {
                return Some(dict);
            }
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
}

fn xobject_dictionary(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let resources = effective_resources(doc, page_id)?;
    match doc.dereference(resources.get(b"XObject").ok()?) {
        Ok((_, Object::Dictionary(dict))) => Some(dict),
        _ => None,
    }
}

fn classify(doc: &Document, stream: &Stream) -> XObject {
    let dict = &stream.dict;
    let subtype = dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .unwrap_or_default();

    match subtype.as_str() {
        "Image" => XObject::Image(image_xobject(doc, stream)),
        "Form" => XObject::Form(form_xobject(doc, dict)),
        _ => XObject::Other { subtype },
    }
}

fn image_xobject(doc: &Document, stream: &Stream) -> ImageXObject {
    let dict = &stream.dict;
    let integer = |key: &[u8]| {
        dict.get(key)
            .ok()
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_i64().ok())
    };

    let filter = dict
        .get(b"Filter")
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .map(|name| String::from_utf8_lossy(name).into_owned());

    let color_space = dict
        .get(b"ColorSpace")
        .map(|o| color_space(doc, o))
        .unwrap_or(ColorSpace::Gray);

    let payload = match filter.as_deref() {
        None | Some("FlateDecode") => stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone()),
        Some(_) => stream.content.clone(),
    };

    ImageXObject {
        width: integer(b"Width").unwrap_or(0).max(0) as u32,
        height: integer(b"Height").unwrap_or(0).max(0) as u32,
        bits_per_component: integer(b"BitsPerComponent").unwrap_or(8).clamp(0, 255) as u8,
        color_space,
        filter,
        payload,
    }
}

fn color_space(doc: &Document, object: &Object) -> ColorSpace {
    let Ok((_, object)) = doc.dereference(object) else {
        return ColorSpace::Other("unresolved".to_string());
    };
    match object {
        Object::Name(name) => ColorSpace::from_name(name),
        Object::Array(arr) => {
            let family = arr.first().and_then(|o| o.as_name().ok()).unwrap_or(b"");
            match family {
                b"Indexed" | b"I" => indexed_color_space(doc, arr),
                b"ICCBased" => {
                    let components = arr
                        .get(1)
                        .and_then(|o| doc.dereference(o).ok())
                        .and_then(|(_, o)| o.as_stream().ok())
                        .and_then(|s| s.dict.get(b"N").and_then(Object::as_i64).ok());
                    match components {
                        Some(3) => ColorSpace::Rgb,
                        Some(1) => ColorSpace::Gray,
                        _ => ColorSpace::Other("ICCBased".to_string()),
                    }
                }
                other => ColorSpace::from_name(other),
            }
        }
        _ => ColorSpace::Other("invalid".to_string()),
    }
}

fn indexed_color_space(doc: &Document, arr: &[Object]) -> ColorSpace {
    let base = arr.get(1).map(|o| color_space(doc, o));
    let lookup = arr
        .get(3)
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| match o {
            Object::String(bytes, _) => Some(bytes.clone()),
            Object::Stream(s) => {
                Some(s.decompressed_content().unwrap_or_else(|_| s.content.clone()))
            }
            _ => None,
        });

    let palette = match (base, lookup) {
        (Some(ColorSpace::Rgb), Some(table)) => table
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect(),
        (Some(ColorSpace::Gray), Some(table)) => table.iter().map(|&g| [g, g, g]).collect(),
        _ => return ColorSpace::Other("Indexed".to_string()),
    };
    ColorSpace::Indexed { palette }
}

fn form_xobject(doc: &Document, dict: &Dictionary) -> FormXObject {
    let bbox = dict
        .get(b"BBox")
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_array().ok())
        .and_then(|arr| {
            let values: Vec<f32> = arr.iter().filter_map(number).collect();
            <[f32; 4]>::try_from(values).ok()
        });

    let proc_set = dict
        .get(b"Resources")
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_dict().ok())
        .and_then(|res| res.get(b"ProcSet").ok())
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_array().ok())
        .map(|arr| {
            arr.iter()
                .filter_map(|o| o.as_name().ok())
                .map(|name| String::from_utf8_lossy(name).into_owned())
                .collect()
        })
        .unwrap_or_default();

    FormXObject { bbox, proc_set }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn decode_content(doc: &Document, page_id: ObjectId, number: u32) -> Result<Vec<Operation>> {
    let data = doc
        .get_page_content(page_id)
        .map_err(|e| PdfError::MalformedContent {
            page: number,
            reason: e.to_string(),
        })?;
    let content = Content::decode(&data).map_err(|e| PdfError::MalformedContent {
        page: number,
        reason: e.to_string(),
    })?;
    Ok(content.operations)
}

fn replace_content(
    doc: &mut Document,
    page_id: ObjectId,
    number: u32,
    operations: Vec<Operation>,
) -> Result<()> {
    let data = Content { operations }
        .encode()
        .map_err(|e| PdfError::MalformedContent {
            page: number,
            reason: e.to_string(),
        })?;
    let stream_id = doc.add_object(Stream::new(dictionary! {}, data));
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| PdfError::InvalidPage(number))?
        .set("Contents", Object::Reference(stream_id));
    trace!("Page {}: content replaced by stream {:?}", number, stream_id);
    Ok(())
}

fn remove_xobjects(
    doc: &mut Document,
    page_id: ObjectId,
    removed: &BTreeSet<String>,
) -> lopdf::Result<()> {
    let mut resources = effective_resources(doc, page_id)
        .cloned()
        .unwrap_or_else(Dictionary::new);
    let mut xobjects = xobject_dictionary(doc, page_id)
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let doomed: Vec<Vec<u8>> = xobjects
        .iter()
        .map(|(name, _)| name.clone())
        .filter(|name| removed.contains(&*String::from_utf8_lossy(name)))
        .collect();
    for name in doomed {
        xobjects.remove(&name);
    }

    resources.set("XObject", Object::Dictionary(xobjects));
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn invokes_any(op: &Operation, names: &BTreeSet<String>) -> bool {
    op.operator == "Do"
        && op
            .operands
            .first()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|name| names.contains(&*String::from_utf8_lossy(name)))
}
