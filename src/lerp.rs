use std::time::{Duration, Instant};

use crate::{
    entity::{Component, Entities},
    world::Vec3f,
};

/// Two timestamped position samples of a remote entity.
#[derive(Debug, Clone, PartialEq)]
pub struct LerpComp {
    start_pos: Vec3f,
    start_time: Option<Instant>,
    end_pos: Vec3f,
    end_time: Option<Instant>,
}

impl LerpComp {
    pub fn new(position: Vec3f) -> LerpComp {
        LerpComp {
            start_pos: position,
            start_time: None,
            end_pos: position,
            end_time: None,
        }
    }

    pub fn new_target(&mut self, end: Vec3f, now: Instant) {
        self.start_pos = self.end_pos;
        self.start_time = self.end_time;
        self.end_pos = end;
        self.end_time = Some(now);
    }

    /// Position at time `at`, moving from the start sample toward the end
    /// sample and never past it.
    pub fn current_position(&self, at: Instant) -> Vec3f {
        let (start_time, end_time) = match (self.start_time, self.end_time) {
            (Some(s), Some(e)) if e > s => (s, e),
            _ => return self.end_pos,
        };

        let span = (end_time - start_time).as_secs_f32();
        let since_end = signed_secs(at, end_time);
        let scalar = (since_end / span).clamp(-1.0, 0.0);

        self.end_pos + (self.end_pos - self.start_pos) * scalar
    }
}

fn signed_secs(a: Instant, b: Instant) -> f32 {
    if a >= b {
        (a - b).as_secs_f32()
    } else {
        -(b - a).as_secs_f32()
    }
}

/// Moves every interpolated entity to its position at `now - delay`.
pub fn lerp_system(entities: &mut Entities, now: Instant, delay: Duration) {
    let at = now.checked_sub(delay).unwrap_or(now);
    for id in entities.query(&[Component::Position, Component::Lerp]) {
        let target = entities.lerps[&id].current_position(at);
        if let Some(pos) = entities.positions.get_mut(&id) {
            *pos = target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityBuilder;

    fn approx(a: Vec3f, b: Vec3f) -> bool {
        (a - b).x.abs() < 1e-4 && (a - b).y.abs() < 1e-4 && (a - b).z.abs() < 1e-4
    }

    #[test]
    fn single_sample_returns_end() {
        let t0 = Instant::now();
        let mut lerp = LerpComp::new(Vec3f::ZERO);
        assert_eq!(lerp.current_position(t0), Vec3f::ZERO);

        lerp.new_target(Vec3f::new(1.0, 2.0, 3.0), t0);
        assert_eq!(
            lerp.current_position(t0 + Duration::from_secs(1)),
            Vec3f::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn equal_timestamps_return_end() {
        let t0 = Instant::now();
        let mut lerp = LerpComp::new(Vec3f::ZERO);
        lerp.new_target(Vec3f::new(1.0, 0.0, 0.0), t0);
        lerp.new_target(Vec3f::new(2.0, 0.0, 0.0), t0);
        assert_eq!(lerp.current_position(t0), Vec3f::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn no_overshoot_after_last_sample() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(50);
        let a = Vec3f::new(0.0, 64.0, 0.0);
        let b = Vec3f::new(1.0, 64.0, -2.0);

        let mut lerp = LerpComp::new(Vec3f::ZERO);
        lerp.new_target(a, t0);
        lerp.new_target(b, t1);

        for ms in [0, 10, 50, 500, 5000] {
            assert_eq!(lerp.current_position(t1 + Duration::from_millis(ms)), b);
        }
    }

    #[test]
    fn interpolates_between_samples() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(100);
        let mut lerp = LerpComp::new(Vec3f::ZERO);
        lerp.new_target(Vec3f::ZERO, t0);
        lerp.new_target(Vec3f::new(10.0, 0.0, 0.0), t1);

        assert!(approx(lerp.current_position(t0), Vec3f::ZERO));
        assert!(approx(
            lerp.current_position(t0 + Duration::from_millis(25)),
            Vec3f::new(2.5, 0.0, 0.0)
        ));
        // before the first sample clamps to the start
        assert!(approx(
            lerp.current_position(t0.checked_sub(Duration::from_millis(10)).unwrap_or(t0)),
            Vec3f::ZERO
        ));
    }

    #[test]
    fn system_uses_delayed_sample() {
        let mut entities = Entities::new();
        let id = entities.spawn(
            EntityBuilder::new("mc:remote_player")
                .position(Vec3f::ZERO)
                .lerp(),
        );

        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(100);
        let lerp = entities.lerps.get_mut(&id).unwrap();
        lerp.new_target(Vec3f::ZERO, t0);
        lerp.new_target(Vec3f::new(0.0, 0.0, 4.0), t1);

        lerp_system(&mut entities, t1 + Duration::from_millis(50), Duration::from_millis(100));
        assert!(approx(entities.positions[&id], Vec3f::new(0.0, 0.0, 2.0)));

        lerp_system(&mut entities, t1 + Duration::from_millis(200), Duration::from_millis(100));
        assert_eq!(entities.positions[&id], Vec3f::new(0.0, 0.0, 4.0));
    }
}
