use std::collections::HashSet;

use crate::{NodeId, SceneError};

/// Upper bound on child slots, so a wild index fails instead of allocating.
pub const MAX_CHILD_SLOTS: usize = 1 << 20;

/// How a group's child storage may be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildAccess {
    /// Edits go through the scene, which keeps parent links, pick hosts and
    /// bounds consistent.
    Tracked,
    /// Edits touch the slots directly. Children are referenced, not owned:
    /// their parent link is left alone.
    Raw,
}

/// Ordered, growable child slots of a group.
///
/// `len` is one past the last occupied slot. Attaching beyond `len` leaves
/// vacant slots in between, which iteration skips. Growing never moves an
/// existing child.
#[derive(Debug, Clone)]
pub struct ChildList {
    access: ChildAccess,
    slots: Vec<Option<NodeId>>,
    len: usize,
}

impl ChildList {
    pub(crate) fn new(access: ChildAccess, capacity: usize) -> Self {
        Self {
            access,
            slots: vec![None; capacity],
            len: 0,
        }
    }

    pub fn access(&self) -> ChildAccess {
        self.access
    }

    /// Logical length, including vacant slots before the last child.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots[..self.len].iter().flatten().count()
    }

    /// Occupant of slot `index`, `None` if vacant or out of range.
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.slots.get(index).copied().flatten()
    }

    /// The slots in sequence order, vacancies included.
    pub fn slots(&self) -> &[Option<NodeId>] {
        &self.slots[..self.len]
    }

    /// Occupants in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots().iter().flatten().copied()
    }

    pub fn position(&self, child: NodeId) -> Option<usize> {
        self.slots().iter().position(|slot| *slot == Some(child))
    }

    pub fn contains(&self, child: NodeId) -> bool {
        self.position(child).is_some()
    }

    fn grow_for(&mut self, index: usize) {
        let needed = (index + 1).max(self.len + 1);
        if needed <= self.slots.len() {
            return;
        }
        let new_capacity = needed.max(self.slots.len() * 2).min(MAX_CHILD_SLOTS);
        tracing::trace!(
            from = self.slots.len(),
            to = new_capacity,
            "growing child storage"
        );
        self.slots.resize(new_capacity, None);
    }

    /// Insert at `index`, shifting later children right.
    pub(crate) fn insert(&mut self, index: usize, child: NodeId) -> Result<(), SceneError> {
        if index >= MAX_CHILD_SLOTS || self.len >= MAX_CHILD_SLOTS {
            return Err(SceneError::IndexOutOfRange {
                index,
                len: MAX_CHILD_SLOTS,
            });
        }
        self.grow_for(index);
        if index < self.len {
            self.slots[index..=self.len].rotate_right(1);
            self.len += 1;
        } else {
            self.len = index + 1;
        }
        self.slots[index] = Some(child);
        Ok(())
    }

    /// Put `child` into slot `index`, returning the previous occupant.
    pub(crate) fn replace(
        &mut self,
        index: usize,
        child: NodeId,
    ) -> Result<Option<NodeId>, SceneError> {
        if index >= self.len {
            return Err(SceneError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(self.slots[index].replace(child))
    }

    /// Take slot `index` out and close the gap.
    pub(crate) fn remove(&mut self, index: usize) -> Result<Option<NodeId>, SceneError> {
        if index >= self.len {
            return Err(SceneError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        let removed = self.slots[index].take();
        self.slots[index..self.len].rotate_left(1);
        self.len -= 1;
        while self.len > 0 && self.slots[self.len - 1].is_none() {
            self.len -= 1;
        }
        Ok(removed)
    }

    /// Direct slot access, available only on raw lists. Nodes in `refused`
    /// can never be placed in a slot.
    pub(crate) fn raw<'a>(&'a mut self, refused: &'a HashSet<NodeId>) -> Option<RawSlots<'a>> {
        match self.access {
            ChildAccess::Raw => Some(RawSlots {
                list: self,
                refused,
            }),
            ChildAccess::Tracked => None,
        }
    }
}

/// Mutable view over a raw child list. Edits do not touch the children
/// themselves: no parent links, no bounds invalidation.
///
/// Dummy groups are refused, so references never form a loop.
#[derive(Debug)]
pub struct RawSlots<'a> {
    list: &'a mut ChildList,
    refused: &'a HashSet<NodeId>,
}

impl RawSlots<'_> {
    fn check(&self, child: NodeId) -> Result<(), SceneError> {
        if self.refused.contains(&child) {
            tracing::warn!(?child, "rejected raw reference to a dummy group");
            return Err(SceneError::InvalidStructure(
                "a dummy group cannot reference a dummy group".into(),
            ));
        }
        Ok(())
    }

    pub fn attach(&mut self, child: NodeId, index: usize) -> Result<(), SceneError> {
        self.check(child)?;
        self.list.insert(index, child)
    }

    /// Append after the last slot.
    pub fn push(&mut self, child: NodeId) -> Result<(), SceneError> {
        self.check(child)?;
        let end = self.list.len();
        self.list.insert(end, child)
    }

    pub fn replace(&mut self, child: NodeId, index: usize) -> Result<Option<NodeId>, SceneError> {
        self.check(child)?;
        self.list.replace(index, child)
    }

    pub fn remove(&mut self, index: usize) -> Result<Option<NodeId>, SceneError> {
        self.list.remove(index)
    }

    pub fn clear(&mut self) {
        self.list.slots.iter_mut().for_each(|slot| *slot = None);
        self.list.len = 0;
    }

    pub fn list(&self) -> &ChildList {
        self.list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<NodeId> {
        let mut map: SlotMap<NodeId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn insert_shifts_right() {
        let n = ids(3);
        let mut list = ChildList::new(ChildAccess::Tracked, 4);
        list.insert(0, n[0]).unwrap();
        list.insert(1, n[1]).unwrap();
        list.insert(0, n[2]).unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![n[2], n[0], n[1]]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn insert_beyond_capacity_grows_without_reordering() {
        let n = ids(4);
        let mut list = ChildList::new(ChildAccess::Tracked, 3);
        for (i, id) in n[..3].iter().enumerate() {
            list.insert(i, *id).unwrap();
        }
        list.insert(5, n[3]).unwrap();
        assert!(list.capacity() >= 6);
        assert_eq!(&list.slots()[..3], &[Some(n[0]), Some(n[1]), Some(n[2])]);
        assert_eq!(list.get(5), Some(n[3]));
        assert_eq!(list.get(3), None);
        assert_eq!(list.len(), 6);
        assert_eq!(list.occupied(), 4);
    }

    #[test]
    fn full_list_grows_for_middle_insert() {
        let n = ids(3);
        let mut list = ChildList::new(ChildAccess::Tracked, 2);
        list.insert(0, n[0]).unwrap();
        list.insert(1, n[1]).unwrap();
        list.insert(1, n[2]).unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![n[0], n[2], n[1]]);
    }

    #[test]
    fn remove_compacts_left() {
        let n = ids(3);
        let mut list = ChildList::new(ChildAccess::Tracked, 4);
        for (i, id) in n.iter().enumerate() {
            list.insert(i, *id).unwrap();
        }
        assert_eq!(list.remove(0).unwrap(), Some(n[0]));
        assert_eq!(list.slots(), &[Some(n[1]), Some(n[2])]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_trims_trailing_vacancies() {
        let n = ids(2);
        let mut list = ChildList::new(ChildAccess::Tracked, 1);
        list.insert(0, n[0]).unwrap();
        list.insert(3, n[1]).unwrap();
        assert_eq!(list.remove(3).unwrap(), Some(n[1]));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn out_of_range_is_reported_not_clamped() {
        let n = ids(1);
        let mut list = ChildList::new(ChildAccess::Tracked, 4);
        assert_eq!(
            list.remove(0),
            Err(SceneError::IndexOutOfRange { index: 0, len: 0 })
        );
        assert!(list.replace(2, n[0]).is_err());
        assert!(list.insert(MAX_CHILD_SLOTS, n[0]).is_err());
    }

    #[test]
    fn raw_view_only_on_raw_lists() {
        let n = ids(2);
        let refused = HashSet::new();
        let mut tracked = ChildList::new(ChildAccess::Tracked, 2);
        assert!(tracked.raw(&refused).is_none());

        let mut raw = ChildList::new(ChildAccess::Raw, 2);
        let mut view = raw.raw(&refused).unwrap();
        view.push(n[0]).unwrap();
        view.push(n[1]).unwrap();
        assert_eq!(view.replace(n[0], 1).unwrap(), Some(n[1]));
        assert_eq!(view.list().occupied(), 2);
        view.clear();
        assert!(raw.is_empty());
    }

    #[test]
    fn raw_view_refuses_listed_nodes() {
        let n = ids(3);
        let refused: HashSet<NodeId> = [n[0]].into_iter().collect();
        let mut raw = ChildList::new(ChildAccess::Raw, 2);
        let mut view = raw.raw(&refused).unwrap();
        assert!(matches!(view.push(n[0]), Err(SceneError::InvalidStructure(_))));
        assert!(view.attach(n[0], 0).is_err());
        view.push(n[1]).unwrap();
        assert!(view.replace(n[0], 0).is_err());
        view.replace(n[2], 0).unwrap();
        assert_eq!(raw.iter().collect::<Vec<_>>(), vec![n[2]]);
    }
}
