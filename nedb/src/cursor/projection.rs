use crate::common::{Value, DOC_ID};
use crate::document::Document;
use crate::errors::{ErrorKind, NedbError, NedbResult};
use crate::update::modify;

/// A validated projection document such as `{ name: 1, "address.city": 1, _id: 0 }`.
///
/// Either every non-`_id` field is kept (pick mode) or every one is omitted
/// (omit mode); `_id` is kept unless it is explicitly set to a falsy value.
#[derive(Debug, Clone)]
pub struct Projection {
    keep_id: bool,
    pick: bool,
    fields: Vec<String>,
}

impl Projection {
    /// Parses a projection; an empty document projects nothing and yields `None`.
    pub fn parse(spec: &Document) -> NedbResult<Option<Projection>> {
        if spec.is_empty() {
            return Ok(None);
        }

        let keep_id = spec.get(DOC_ID).map(Value::is_truthy).unwrap_or(true);
        let mut pick = None;
        let mut fields = Vec::with_capacity(spec.len());
        for (field, flag) in spec.iter().filter(|(field, _)| field.as_str() != DOC_ID) {
            let keep = flag.is_truthy();
            if pick.is_some_and(|mode| mode != keep) {
                log::error!("Can't both keep and omit fields except for _id");
                return Err(NedbError::new(
                    "Can't both keep and omit fields except for _id",
                    ErrorKind::InvalidProjection,
                ));
            }
            pick = Some(keep);
            fields.push(field.clone());
        }

        Ok(Some(Projection {
            keep_id,
            pick: pick.unwrap_or(false),
            fields,
        }))
    }

    pub fn apply(&self, doc: &Document) -> NedbResult<Document> {
        let mut projected = if self.pick {
            let mut set = Document::new();
            for field in &self.fields {
                if let Some(value) = doc.get_dot_value(field) {
                    set.put(field.as_str(), value);
                }
            }
            let mut update = Document::new();
            update.put("$set", set);
            modify(&Document::new(), &update)?
        } else {
            let mut unset = Document::new();
            for field in &self.fields {
                unset.put(field.as_str(), true);
            }
            let mut update = Document::new();
            update.put("$unset", unset);
            modify(doc, &update)?
        };

        match (self.keep_id, doc.id()) {
            (true, Some(id)) => projected.put(DOC_ID, id.clone()),
            _ => {
                projected.remove(DOC_ID);
            }
        }
        Ok(projected)
    }
}
