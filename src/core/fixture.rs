use crate::utils::arena::Id;

use super::body::BodyId;
use super::shape::Shape;

pub type ContactId = Id<crate::dynamics::contact::Contact>;
pub type FixtureId = Id<Fixture>;

/// Configuration record for fixture creation. The shape is cloned into
/// the fixture; hull and mesh geometry is shared, not copied.
#[derive(Debug, Clone)]
pub struct FixtureDef {
    pub shape: Shape,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Sensors report contact events but produce no impulses.
    pub is_sensor: bool,
    pub user_data: u64,
}

impl FixtureDef {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            density: 1.0,
            friction: 0.3,
            restitution: 0.0,
            is_sensor: false,
            user_data: 0,
        }
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        debug_assert!((0.0..=1.0).contains(&friction));
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        debug_assert!((0.0..=1.0).contains(&restitution));
        self.restitution = restitution;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }
}

/// Binds a shape to a body with material properties and a broad-phase
/// proxy. Owned by the world's fixture arena; the body keeps an id list.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub body: BodyId,
    pub shape: Shape,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_sensor: bool,
    pub user_data: u64,
    /// Handle into the broad-phase tree.
    pub(crate) proxy: u32,
    /// Contact edges incident to this fixture.
    pub(crate) contacts: Vec<ContactId>,
}

impl Fixture {
    pub(crate) fn new(body: BodyId, def: &FixtureDef) -> Self {
        Self {
            body,
            shape: def.shape.clone(),
            density: def.density,
            friction: def.friction,
            restitution: def.restitution,
            is_sensor: def.is_sensor,
            user_data: def.user_data,
            proxy: u32::MAX,
            contacts: Vec::new(),
        }
    }

    pub fn proxy_id(&self) -> u32 {
        self.proxy
    }
}
