//! Handoff of the lists of entities that take part in simulation.
//!
//! A producer (typically whatever owns entity lifecycle) replaces the active lists
//! wholesale through an [`ActiveSetSender`], from any thread. The world takes a
//! [`ActiveSnapshot`] exactly once at the start of each sub-step, so a sub-step never
//! observes a half-replaced list.

use std::sync::Arc;

use crate::store::EntityId;

/// A list of entity ids, shared without copying between the producer and the world.
pub type IdList = Arc<[EntityId]>;

/// Which list an [`ActiveSetSender::push()`] replaces.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[expect(clippy::exhaustive_enums)]
pub enum ActiveKind {
    /// Entities whose [`Body`](crate::physics::Body) is integrated.
    Bodies,
    /// Entities whose [`Collider`](crate::physics::Collider) takes part in collision detection.
    Colliders,
}

/// Error returned when the world an [`ActiveSetSender`] feeds no longer exists.
#[derive(Clone, Copy, Debug, Eq, PartialEq, displaydoc::Display)]
#[displaydoc("the world receiving active sets has been dropped")]
#[expect(clippy::exhaustive_structs)]
pub struct Disconnected;

impl std::error::Error for Disconnected {}

/// Sends replacement active lists to a [`World`](crate::physics::World).
///
/// Obtain one from [`World::active_set_sender()`](crate::physics::World::active_set_sender).
#[derive(Clone, Debug)]
pub struct ActiveSetSender {
    sender: flume::Sender<(ActiveKind, IdList)>,
}

impl ActiveSetSender {
    /// Replaces the list of the given kind. The world sees the new list at the start of its
    /// next sub-step; if several lists of the same kind are pushed in between, the last wins.
    pub fn push(&self, kind: ActiveKind, ids: impl Into<IdList>) -> Result<(), Disconnected> {
        self.sender
            .send((kind, ids.into()))
            .map_err(|flume::SendError(_)| Disconnected)
    }
}

/// The lists used by one sub-step.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct ActiveSnapshot {
    /// Entities to integrate.
    pub bodies: IdList,
    /// Entities to test for collisions.
    pub colliders: IdList,
}

/// Receiving end of the handoff, owned by the world.
#[derive(Debug)]
pub(crate) struct ActiveSets {
    receiver: flume::Receiver<(ActiveKind, IdList)>,
    sender: flume::Sender<(ActiveKind, IdList)>,
    current: ActiveSnapshot,
}

impl ActiveSets {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            receiver,
            sender,
            current: ActiveSnapshot::default(),
        }
    }

    pub(crate) fn sender(&self) -> ActiveSetSender {
        ActiveSetSender {
            sender: self.sender.clone(),
        }
    }

    /// Applies every pending replacement, then returns the resulting lists.
    ///
    /// Does not allocate: the returned lists share their storage with the pushed ones.
    pub(crate) fn snapshot(&mut self) -> ActiveSnapshot {
        self.drain();
        self.current.clone()
    }

    /// Replaces a list immediately, after any replacements already sent.
    pub(crate) fn replace(&mut self, kind: ActiveKind, ids: IdList) {
        self.drain();
        self.set(kind, ids);
    }

    fn drain(&mut self) {
        while let Ok((kind, ids)) = self.receiver.try_recv() {
            self.set(kind, ids);
        }
    }

    fn set(&mut self, kind: ActiveKind, ids: IdList) {
        match kind {
            ActiveKind::Bodies => self.current.bodies = ids,
            ActiveKind::Colliders => self.current.colliders = ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntityStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn last_push_wins() {
        let mut store = EntityStore::new();
        let [a, b, c] = [(); 3].map(|()| store.spawn());
        let mut sets = ActiveSets::new();
        let sender = sets.sender();

        assert_eq!(sets.snapshot(), ActiveSnapshot::default());

        sender.push(ActiveKind::Bodies, vec![a]).unwrap();
        sender.push(ActiveKind::Bodies, vec![b, c]).unwrap();
        sender.push(ActiveKind::Colliders, vec![a]).unwrap();
        let snapshot = sets.snapshot();
        assert_eq!(&*snapshot.bodies, &[b, c]);
        assert_eq!(&*snapshot.colliders, &[a]);

        // Unchanged lists persist.
        sender.push(ActiveKind::Colliders, Vec::<EntityId>::new()).unwrap();
        let snapshot = sets.snapshot();
        assert_eq!(&*snapshot.bodies, &[b, c]);
        assert!(snapshot.colliders.is_empty());
    }

    #[test]
    fn push_from_other_thread() {
        let mut store = EntityStore::new();
        let a = store.spawn();
        let mut sets = ActiveSets::new();
        let sender = sets.sender();
        std::thread::spawn(move || sender.push(ActiveKind::Bodies, vec![a]))
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(&*sets.snapshot().bodies, &[a]);
    }

    #[test]
    fn replace_applies_after_pending() {
        let mut store = EntityStore::new();
        let [a, b] = [(); 2].map(|()| store.spawn());
        let mut sets = ActiveSets::new();
        sets.sender().push(ActiveKind::Bodies, vec![a]).unwrap();
        sets.replace(ActiveKind::Bodies, vec![b].into());
        assert_eq!(&*sets.snapshot().bodies, &[b]);
    }

    #[test]
    fn disconnected() {
        let sender = ActiveSets::new().sender();
        assert_eq!(sender.push(ActiveKind::Bodies, Vec::<EntityId>::new()), Err(Disconnected));
    }

    #[test]
    fn sender_is_send_sync() {
        crate::util::assert_send_sync::<ActiveSetSender>();
    }
}
