//! Drag-and-drop style reordering of ordered lists.

use uuid::Uuid;

use crate::error::DashboardError;
use crate::models::OrderUpdate;

/// Moves the element at `from` so that it ends up at index `to`.
///
/// `to` past the end is clamped to the last position. `from` out of range
/// is an error and leaves `list` untouched.
pub fn move_item<T>(list: &mut Vec<T>, from: usize, to: usize) -> Result<(), DashboardError> {
    if from >= list.len() {
        return Err(DashboardError::InvalidMove(format!(
            "index {} out of range for {} items",
            from,
            list.len()
        )));
    }
    let item = list.remove(from);
    let to = to.min(list.len());
    list.insert(to, item);
    Ok(())
}

/// Sequential `order_index` values (0, 1, 2, ...) for the given id order.
pub fn order_updates<I>(ids: I) -> Vec<OrderUpdate>
where
    I: IntoIterator<Item = Uuid>,
{
    ids.into_iter()
        .enumerate()
        .map(|(i, id)| OrderUpdate {
            id,
            order_index: i as i32,
        })
        .collect()
}

/// Places `id` at `index` within `ids`, inserting it if absent.
pub fn place_at(ids: &mut Vec<Uuid>, id: Uuid, index: usize) {
    ids.retain(|x| *x != id);
    let index = index.min(ids.len());
    ids.insert(index, id);
}
