//! Ownership-gated update coordinator
//!
//! These functions run inside a single [`UnitOfWork`]; the caller decides the
//! transaction boundary. Any error they return must abort that transaction,
//! which is how a rejected update leaves no partial writes.

use crate::error::{CoreError, CoreResult};
use crate::filter::ElementFilter;
use crate::model::{Element, ElementId, NewElement, Ownership, Principal};
use crate::storage::{ElementQuery, UnitOfWork};
use crate::transfer::{ElementCreate, ElementUpdate, TagOp};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Insert a new element and attach its tags in list order
pub fn create_element(
    uow: &mut dyn UnitOfWork,
    ownership: Ownership,
    request: &ElementCreate,
    now: DateTime<Utc>,
) -> CoreResult<Element> {
    let names = request.validate()?;

    let id = uow.insert_element(&NewElement {
        title: request.title.clone(),
        description: request.description.clone(),
        ownership,
        created_at: now,
    })?;

    for name in &names {
        let tag = uow.get_or_create_tag(name, now)?;
        uow.attach(id, &tag, now)?;
    }

    debug!(element = %id, tags = names.len(), "element created");
    require_element(uow, id)
}

/// Apply a partial update on behalf of `principal`.
///
/// The payload is validated first, then ownership is checked, then scalar
/// fields are written and tag operations applied in list order. Later
/// operations on the same name win because each one is idempotent on its own.
pub fn update_element(
    uow: &mut dyn UnitOfWork,
    principal: Option<&Principal>,
    id: ElementId,
    update: &ElementUpdate,
    now: DateTime<Utc>,
) -> CoreResult<Element> {
    let ops = update.validate()?;

    let mut record = uow
        .element(id)?
        .ok_or_else(|| CoreError::not_found(format!("element {id}")))?;
    record.ownership.authorize(principal)?;

    let mut touched = !ops.is_empty();
    if let Some(title) = &update.title {
        record.title = title.clone();
        touched = true;
    }
    if let Some(description) = &update.description {
        record.description = description.clone();
        touched = true;
    }

    for op in &ops {
        apply_tag_op(uow, id, op, now)?;
    }

    if touched {
        record.updated_at = now;
        uow.save_element(&record)?;
    }

    debug!(element = %id, ops = ops.len(), "element updated");
    require_element(uow, id)
}

/// Apply one validated tag operation to `id`
pub fn apply_tag_op(
    uow: &mut dyn UnitOfWork,
    id: ElementId,
    op: &TagOp,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    match op {
        TagOp::Attach(name) => {
            let tag = uow.get_or_create_tag(name, now)?;
            uow.attach(id, &tag, now)
        }
        TagOp::Detach(name) => match uow.find_tag(name.as_str())? {
            Some(tag) => uow.detach(id, &tag),
            None => {
                debug!(element = %id, tag = %name, "detach of unknown tag ignored");
                Ok(())
            }
        },
    }
}

/// Delete an element on behalf of `principal`; its taggings go with it
pub fn delete_element(
    uow: &mut dyn UnitOfWork,
    principal: Option<&Principal>,
    id: ElementId,
) -> CoreResult<()> {
    let record = uow
        .element(id)?
        .ok_or_else(|| CoreError::not_found(format!("element {id}")))?;
    record.ownership.authorize(principal)?;
    uow.delete_element(id)?;
    debug!(element = %id, "element deleted");
    Ok(())
}

/// Load an element together with its tags
pub fn load_element(uow: &mut dyn UnitOfWork, id: ElementId) -> CoreResult<Option<Element>> {
    match uow.element(id)? {
        Some(record) => {
            let tags = uow.tags_of(id)?;
            Ok(Some(Element::from_record(record, tags)))
        }
        None => Ok(None),
    }
}

fn require_element(uow: &mut dyn UnitOfWork, id: ElementId) -> CoreResult<Element> {
    load_element(uow, id)?.ok_or_else(|| CoreError::not_found(format!("element {id}")))
}

/// Elements matching `filter`, ordered by id
pub fn list_elements(uow: &mut dyn UnitOfWork, filter: &ElementFilter) -> CoreResult<Vec<Element>> {
    let records = uow.query_elements(&ElementQuery {
        tags: filter.tags(),
        combinator: filter.combinator,
        search: filter.search(),
        limit: filter.limit,
    })?;

    records
        .into_iter()
        .map(|record| {
            let tags = uow.tags_of(record.id)?;
            Ok(Element::from_record(record, tags))
        })
        .collect()
}
