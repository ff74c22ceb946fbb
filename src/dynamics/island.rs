use glam::{Mat3, Quat, Vec3};

use crate::config;
use crate::core::body::{BodyId, BodyType, RigidBody};
use crate::core::fixture::Fixture;
use crate::core::transform::{integrate_orientation, rotate_to_frame, skew};
use crate::utils::arena::Arena;

use super::contact::{Contact, ContactId};
use super::contact_solver::{ContactConstraintSource, ContactSolver};
use super::joints::{Joint, JointContext, JointId};

/// Linear state of one island body.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Position {
    /// World center of mass.
    pub c: Vec3,
    pub q: Quat,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Velocity {
    pub v: Vec3,
    pub w: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SolverProps {
    pub inv_mass: f32,
    pub local_center: Vec3,
}

/// Solver tuning for one island run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IslandFlags {
    pub warm_starting: bool,
    pub allow_sleep: bool,
}

/// One Newton iteration of the implicit rigid-body Euler equation, giving
/// a stable gyroscopic update for rapidly spinning bodies.
///
/// Solves `J·Δω = -h·(ω × Iω)` with `J = I + h·(skew(ω)·I − skew(Iω))`,
/// in the body's local frame.
pub(crate) fn solve_gyroscopic(q: Quat, local_inertia: &Mat3, w: Vec3, h: f32) -> Vec3 {
    let mut w_body = q.conjugate() * w;

    let jacobian = *local_inertia
        + h * (skew(w_body) * *local_inertia - skew(*local_inertia * w_body));
    let residual = h * w_body.cross(*local_inertia * w_body);

    if jacobian.determinant().abs() > f32::EPSILON {
        w_body -= jacobian.inverse() * residual;
    }

    q * w_body
}

/// A self-contained group of bodies connected by contacts and joints.
/// Built fresh each step; solving it cannot affect any body outside it.
pub(crate) struct Island {
    pub bodies: Vec<BodyId>,
    pub contacts: Vec<ContactId>,
    pub joints: Vec<JointId>,

    positions: Vec<Position>,
    velocities: Vec<Velocity>,
    inv_inertias: Vec<Mat3>,
    props: Vec<SolverProps>,
}

impl Island {
    pub fn with_capacity(bodies: usize, contacts: usize, joints: usize) -> Self {
        Self {
            bodies: Vec::with_capacity(bodies),
            contacts: Vec::with_capacity(contacts),
            joints: Vec::with_capacity(joints),
            positions: Vec::new(),
            velocities: Vec::new(),
            inv_inertias: Vec::new(),
            props: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.joints.clear();
    }

    /// Runs the full solve sequence and writes the results back to the
    /// bodies.
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &mut self,
        bodies: &mut Arena<RigidBody>,
        fixtures: &Arena<Fixture>,
        contacts: &mut Arena<Contact>,
        joints: &mut Arena<Joint>,
        gravity: Vec3,
        dt: f32,
        velocity_iterations: u32,
        position_iterations: u32,
        flags: IslandFlags,
    ) {
        let h = dt;
        let count = self.bodies.len();
        self.positions.clear();
        self.velocities.clear();
        self.inv_inertias.clear();
        self.props.clear();

        // 1. Integrate velocities: forces, gyroscopic torque, damping.
        for (island_index, id) in self.bodies.iter().enumerate() {
            let body = bodies.get_mut(*id).expect("island body disappeared");
            body.island_index = island_index;

            let mut v = body.linear_velocity;
            let mut w = body.angular_velocity;

            // Remember the start-of-step state for sweeps.
            body.sweep.world_center0 = body.sweep.world_center;
            body.sweep.orientation0 = body.sweep.orientation;

            if body.body_type == BodyType::Dynamic {
                v += h * (body.gravity_scale * gravity + body.inv_mass * body.force);

                let dw1 = h * body.world_inv_inertia * body.torque;
                let w2 = solve_gyroscopic(body.sweep.orientation, &body.local_inertia, w, h);
                w += dw1 + (w2 - w);

                body.force = Vec3::ZERO;
                body.torque = Vec3::ZERO;

                // Implicit Padé damping, per axis.
                v.x /= 1.0 + h * body.linear_damping.x;
                v.y /= 1.0 + h * body.linear_damping.y;
                v.z /= 1.0 + h * body.linear_damping.z;
                w.x /= 1.0 + h * body.angular_damping.x;
                w.y /= 1.0 + h * body.angular_damping.y;
                w.z /= 1.0 + h * body.angular_damping.z;
            }

            self.positions.push(Position {
                c: body.sweep.world_center,
                q: body.sweep.orientation,
            });
            self.velocities.push(Velocity { v, w });
            self.inv_inertias.push(body.world_inv_inertia);
            self.props.push(SolverProps {
                inv_mass: body.inv_mass,
                local_center: body.sweep.local_center,
            });
        }

        // 2. Initialize constraints.
        let mut contact_solver = ContactSolver::new();
        for (island_contact, contact_id) in self.contacts.iter().enumerate() {
            let contact = contacts.get(*contact_id).expect("island contact disappeared");
            let fixture_a = fixtures.get(contact.fixture_a).expect("fixture a");
            let fixture_b = fixtures.get(contact.fixture_b).expect("fixture b");
            let body_a = bodies.get(fixture_a.body).expect("body a");
            let body_b = bodies.get(fixture_b.body).expect("body b");

            contact_solver.add_constraint(
                ContactConstraintSource {
                    island_contact,
                    index_a: body_a.island_index,
                    index_b: body_b.island_index,
                    friction: contact.friction,
                    restitution: contact.restitution,
                    radius_a: fixture_a.shape.radius(),
                    radius_b: fixture_b.shape.radius(),
                    manifolds: &contact.manifolds,
                },
                &self.positions,
                &self.velocities,
                &self.inv_inertias,
                &self.props,
            );
        }

        for joint_id in &self.joints {
            let joint = joints.get_mut(*joint_id).expect("island joint disappeared");
            joint.index_a = bodies.get(joint.body_a).expect("joint body a").island_index;
            joint.index_b = bodies.get(joint.body_b).expect("joint body b").island_index;
            let mut ctx = JointContext {
                positions: &mut self.positions,
                velocities: &mut self.velocities,
                inv_inertias: &self.inv_inertias,
                props: &self.props,
                dt: h,
            };
            joint.initialize(&mut ctx);
        }

        if flags.warm_starting {
            contact_solver.warm_start(&mut self.velocities, &self.inv_inertias, &self.props);
            for joint_id in &self.joints {
                let joint = joints.get_mut(*joint_id).expect("island joint");
                let mut ctx = JointContext {
                    positions: &mut self.positions,
                    velocities: &mut self.velocities,
                    inv_inertias: &self.inv_inertias,
                    props: &self.props,
                    dt: h,
                };
                joint.warm_start(&mut ctx);
            }
        }

        // 3. Velocity iterations: joints first, then contacts.
        for _ in 0..velocity_iterations {
            for joint_id in &self.joints {
                let joint = joints.get_mut(*joint_id).expect("island joint");
                let mut ctx = JointContext {
                    positions: &mut self.positions,
                    velocities: &mut self.velocities,
                    inv_inertias: &self.inv_inertias,
                    props: &self.props,
                    dt: h,
                };
                joint.solve_velocity(&mut ctx);
            }
            contact_solver.solve_velocity(&mut self.velocities, &self.inv_inertias, &self.props);
        }

        // Cache impulses for next frame's warm start.
        if flags.warm_starting {
            contact_solver.store_impulses(|island_contact, m, p, normal, tangent| {
                let contact = contacts
                    .get_mut(self.contacts[island_contact])
                    .expect("island contact");
                let point = &mut contact.manifolds[m].points[p];
                point.normal_impulse = normal;
                point.tangent_impulse = tangent;
            });
        }

        // 4. Integrate positions, clamping large motion.
        for i in 0..count {
            let body = bodies.get(self.bodies[i]).expect("island body");
            if body.body_type == BodyType::Static {
                continue;
            }

            let mut v = self.velocities[i].v;
            let mut w = self.velocities[i].w;

            let translation = h * v;
            if translation.length_squared() > config::MAX_TRANSLATION_SQUARED {
                v *= config::MAX_TRANSLATION / translation.length();
            }
            let rotation = h * w;
            if rotation.length_squared() > config::MAX_ROTATION_SQUARED {
                w *= config::MAX_ROTATION / rotation.length();
            }

            self.positions[i].c += h * v;
            self.positions[i].q = integrate_orientation(self.positions[i].q, w, h);
            self.velocities[i] = Velocity { v, w };
            self.inv_inertias[i] =
                rotate_to_frame(body.inv_local_inertia, self.positions[i].q);
        }

        // 5. Position iterations with early out.
        let mut positions_solved = false;
        for _ in 0..position_iterations {
            let contacts_ok = contact_solver.solve_position(
                &mut self.positions,
                &self.inv_inertias,
                &self.props,
            );

            let mut joints_ok = true;
            for joint_id in &self.joints {
                let joint = joints.get_mut(*joint_id).expect("island joint");
                let mut ctx = JointContext {
                    positions: &mut self.positions,
                    velocities: &mut self.velocities,
                    inv_inertias: &self.inv_inertias,
                    props: &self.props,
                    dt: h,
                };
                joints_ok &= joint.solve_position(&mut ctx);
            }

            if contacts_ok && joints_ok {
                positions_solved = true;
                break;
            }
        }

        // 6. Copy state back to the bodies.
        for i in 0..count {
            let body = bodies.get_mut(self.bodies[i]).expect("island body");
            body.sweep.world_center = self.positions[i].c;
            body.sweep.orientation = self.positions[i].q.normalize();
            body.linear_velocity = self.velocities[i].v;
            body.angular_velocity = self.velocities[i].w;
            body.synchronize_transform();
            body.update_world_inertia();
        }

        // 7. Sleeping.
        if flags.allow_sleep {
            let mut min_sleep_time = f32::MAX;
            for id in &self.bodies {
                let body = bodies.get_mut(*id).expect("island body");
                if body.body_type == BodyType::Static {
                    continue;
                }

                let lin = body.linear_velocity.length_squared();
                let ang = body.angular_velocity.length_squared();
                let lin_tol = body.linear_sleep_tolerance * body.linear_sleep_tolerance;
                let ang_tol = body.angular_sleep_tolerance * body.angular_sleep_tolerance;

                if !body.allow_sleep || lin > lin_tol || ang > ang_tol {
                    body.sleep_time = 0.0;
                } else {
                    body.sleep_time += h;
                }
                min_sleep_time = min_sleep_time.min(body.sleep_time);
            }

            if min_sleep_time >= config::TIME_TO_SLEEP && positions_solved {
                for id in &self.bodies {
                    bodies.get_mut(*id).expect("island body").set_awake(false);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gyroscopic_step_conserves_magnitude_for_symmetric_inertia() {
        let inertia = Mat3::from_diagonal(Vec3::splat(0.4));
        let w = Vec3::new(10.0, 0.5, 0.0);
        let w2 = solve_gyroscopic(Quat::IDENTITY, &inertia, w, 1.0 / 60.0);
        // A spherical inertia has no gyroscopic torque.
        assert_relative_eq!(w2.x, w.x, epsilon = 1e-4);
        assert_relative_eq!(w2.y, w.y, epsilon = 1e-4);
    }

    #[test]
    fn gyroscopic_step_damps_unstable_axis() {
        // Asymmetric body spinning about its middle axis: the implicit
        // step must stay finite and close to the input magnitude.
        let inertia = Mat3::from_diagonal(Vec3::new(0.1, 0.5, 0.9));
        let mut w = Vec3::new(0.01, 20.0, 0.0);
        for _ in 0..120 {
            w = solve_gyroscopic(Quat::IDENTITY, &inertia, w, 1.0 / 60.0);
            assert!(w.is_finite());
        }
        assert!(w.length() <= 21.0);
    }
}
