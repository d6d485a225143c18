use core::fmt;

use euclid::Vector3D;
use manyfmt::Refmt as _;

use crate::math::{FreeCoordinate, FreePoint, PositiveSign, ZeroOne};
use crate::physics::Velocity;
use crate::store::EntityId;
use crate::util::ConciseDebug;

/// Rigid-body state of an entity: how it moves and how it responds to contact.
///
/// Position is not part of the body; it lives in the entity's [`Transform`].
#[derive(Clone, PartialEq)]
#[non_exhaustive]
pub struct Body {
    /// Velocity, in world units per second.
    pub velocity: Vector3D<FreeCoordinate, Velocity>,
    /// Constant contribution to movement, added to the velocity when integrating.
    pub acceleration: Vector3D<FreeCoordinate, Velocity>,
    /// Transient contribution to movement, which decays over about one second.
    pub impulse: Vector3D<FreeCoordinate, Velocity>,

    /// Mass. Zero is treated as a very small mass during contact resolution.
    pub mass: PositiveSign,
    /// Fraction of velocity lost per second.
    pub drag: PositiveSign,
    /// Fraction of gravity which this body does not feel.
    pub resistance: ZeroOne,
    /// Bounciness: scales both the velocity response and the positional push-out of a
    /// contact.
    pub restitution: PositiveSign,
    // When adding a field, don't forget to expand the Debug impl.
}

impl Body {
    /// Constructs a resting [`Body`] of the given mass, with no drag, full gravity, and
    /// restitution 1.
    pub fn new(mass: PositiveSign) -> Self {
        Self {
            velocity: Vector3D::zero(),
            acceleration: Vector3D::zero(),
            impulse: Vector3D::zero(),
            mass,
            drag: PositiveSign::ZERO,
            resistance: ZeroOne::ZERO,
            restitution: PositiveSign::ONE,
        }
    }

    /// Replaces the velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector3D<FreeCoordinate, Velocity>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Replaces the constant acceleration.
    #[must_use]
    pub fn with_acceleration(mut self, acceleration: Vector3D<FreeCoordinate, Velocity>) -> Self {
        self.acceleration = acceleration;
        self
    }

    /// Replaces the drag.
    #[must_use]
    pub fn with_drag(mut self, drag: PositiveSign) -> Self {
        self.drag = drag;
        self
    }

    /// Replaces the gravity resistance.
    #[must_use]
    pub fn with_resistance(mut self, resistance: ZeroOne) -> Self {
        self.resistance = resistance;
        self
    }

    /// Replaces the restitution.
    #[must_use]
    pub fn with_restitution(mut self, restitution: PositiveSign) -> Self {
        self.restitution = restitution;
        self
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::new(PositiveSign::ONE)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            velocity,
            acceleration,
            impulse,
            mass,
            drag,
            resistance,
            restitution,
        } = self;
        fmt.debug_struct("Body")
            .field("velocity", &velocity.refmt(&ConciseDebug))
            .field("acceleration", &acceleration.refmt(&ConciseDebug))
            .field("impulse", &impulse.refmt(&ConciseDebug))
            .field("mass", mass)
            .field("drag", drag)
            .field("resistance", resistance)
            .field("restitution", restitution)
            .finish()
    }
}

// -------------------------------------------------------------------------------------------------

/// Position of an entity, relative to its parent if it has one.
#[derive(Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct Transform {
    /// Position relative to the parent's world position, or the world origin if there is
    /// no parent.
    pub local_position: FreePoint,
    /// Entity this one is attached to, forming a compound. Must not form a cycle.
    pub parent: Option<EntityId>,
}

impl Transform {
    /// A root transform at the given position.
    pub fn at(local_position: FreePoint) -> Self {
        Self {
            local_position,
            parent: None,
        }
    }

    /// Attaches this transform to `parent`, keeping `local_position` as the offset from it.
    #[must_use]
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Transform")
            .field("local_position", &self.local_position.refmt(&ConciseDebug))
            .field("parent", &self.parent)
            .finish()
    }
}

// -------------------------------------------------------------------------------------------------

/// Spherical collision volume centered on the entity's world position.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct Collider {
    /// Radius of the sphere.
    pub size: PositiveSign,
    /// Extra penetration depth added to each contact this collider takes part in, so that
    /// resting contacts keep being pushed apart slightly.
    pub skin: PositiveSign,

    /// Output: whether a contact involving this collider was resolved in the last sub-step.
    pub colliding: bool,
    /// Output: whether this collider was part of any broadphase candidate pair in the last
    /// sub-step.
    pub broad_hit: bool,
}

impl Collider {
    /// A sphere of the given radius with no skin.
    pub fn sphere(radius: PositiveSign) -> Self {
        Self {
            size: radius,
            skin: PositiveSign::ZERO,
            colliding: false,
            broad_hit: false,
        }
    }

    /// Replaces the skin.
    #[must_use]
    pub fn with_skin(mut self, skin: PositiveSign) -> Self {
        self.skin = skin;
        self
    }
}
